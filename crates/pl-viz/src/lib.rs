//! pl-viz: GPU-Accelerated Tuning Visualization for PitchLens
//!
//! Provides wgpu-based rendering for:
//! - Scrolling waterfall spectrogram (circular row history)
//! - Fisheye frequency warping centered on the target pitch
//! - Multi-ring tolerance and lock indicators
//! - Named color schemes with generated WGSL shader source
//!
//! CPU and GPU keep independent implementations of the shared math
//! (interpolation, fisheye) so a software fallback stays possible; the
//! parity tests hold the two within display precision of each other.

pub mod common;
pub mod fisheye;
pub mod overlay;
pub mod rings;
pub mod scene;
pub mod scheduler;
pub mod scheme;
pub mod shader;
pub mod waterfall;

pub use common::{GpuContext, Viewport, VizError, VizResult};
pub use fisheye::{DEFAULT_DISTORTION, PitchProjection, fisheye, normalized_position};
pub use overlay::{OverlayRenderer, OverlayVertex, build_overlay_mesh, marker_position};
pub use rings::{
    OPACITY_KNEE,
    OUTRANKED_DIM,
    RingIndication,
    RingSet,
    ToleranceRing,
    best_lock,
    evaluate_rings,
    ring_locked,
    strike_opacity,
};
pub use scene::{RenderOptions, TunerScene};
pub use scheduler::{FrameScheduler, TickCallback};
pub use scheme::{ColorScheme, ColorStop, OverlayColors, SchemeRegistry};
pub use shader::{
    FISHEYE_WGSL,
    scheme_color_source,
    shader_source_for,
    waterfall_color_source,
    waterfall_shader_source,
};
pub use waterfall::{
    DEFAULT_HISTORY_ROWS,
    WaterfallBuffer,
    WaterfallParams,
    WaterfallRenderer,
    WriteThrottle,
};
