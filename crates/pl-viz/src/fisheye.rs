//! Fisheye frequency mapping
//!
//! Nonlinear horizontal mapping shared by every plot: frequencies near the
//! tuning target get most of the screen, frequencies far away compress
//! toward the edges. The same math runs in the vertex shaders
//! ([`crate::shader::FISHEYE_WGSL`]); the two implementations are kept as
//! independent pure functions with an equivalence test so overlay markers
//! always line up with the warped texture beneath them.

use pl_core::cents_deviation;

/// Default distortion strength
pub const DEFAULT_DISTORTION: f32 = 4.0;

/// Map a cents deviation into 0.0-1.0 across a symmetric view range
///
/// 0.0 at -half_range, 0.5 on target, 1.0 at +half_range. A non-positive
/// half range reads as centered.
#[inline]
pub fn normalized_position(cents: f32, half_range_cents: f32) -> f32 {
    if half_range_cents <= 0.0 {
        return 0.5;
    }
    (cents + half_range_cents) / (2.0 * half_range_cents)
}

/// Fisheye warp on 0.0-1.0 with the fixed point at 0.5
///
/// distortion 0.0 is the identity map; larger values expand the center and
/// compress the edges. Inputs outside 0.0-1.0 keep compressing smoothly
/// past the edges, so out-of-range columns land just offscreen instead of
/// piling up on the border.
#[inline]
pub fn fisheye(x01: f32, distortion: f32) -> f32 {
    let x = (x01 - 0.5) * 2.0;
    let mut t = x / (1.0 + x.abs() * distortion);
    t *= 1.0 + distortion;
    (t + 1.0) / 2.0
}

/// Frequency-to-screen projection shared by every plot
///
/// Composes `cents_deviation -> normalized_position -> fisheye` with one
/// set of constants so the waterfall columns, ring indicators, and peak
/// marker all agree on where a frequency sits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchProjection {
    pub target_frequency: f32,
    pub half_range_cents: f32,
    pub distortion: f32,
}

impl PitchProjection {
    pub fn new(target_frequency: f32, half_range_cents: f32, distortion: f32) -> Self {
        Self {
            target_frequency,
            half_range_cents,
            distortion,
        }
    }

    /// No usable target; callers fall back to linear placement
    #[inline]
    pub fn is_neutral(&self) -> bool {
        self.target_frequency <= 0.0 || self.half_range_cents <= 0.0
    }

    /// Screen position as a fraction of display width
    ///
    /// On-target input maps to exactly 0.5. Frequencies beyond the view
    /// range land slightly outside 0.0-1.0 and get clipped by the
    /// rasterizer.
    pub fn project(&self, freq: f32) -> f32 {
        if self.is_neutral() {
            return 0.5;
        }
        let cents = cents_deviation(freq, self.target_frequency);
        fisheye(
            normalized_position(cents, self.half_range_cents),
            self.distortion,
        )
    }

}
