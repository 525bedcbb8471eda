//! pl-core: Shared types for PitchLens
//!
//! This crate provides the foundational types used across all PitchLens
//! crates: analysis-frame snapshots, tuning math, and color primitives.

mod color;
mod frame;
mod tuning;

pub use color::*;
pub use frame::*;
pub use tuning::*;
