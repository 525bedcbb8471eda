//! Multi-ring tolerance and lock model
//!
//! A ring set is an ordered sequence of nested tolerance bands, widest
//! first. Each ring independently reports lock state, a deviation position
//! scaled to its own movement range, and an opacity driven by signal
//! strength so rings fade out near the noise floor instead of flickering.

use pl_core::{AnalysisFrame, Color, cents_deviation};
use serde::{Deserialize, Serialize};

use crate::fisheye::PitchProjection;

/// Relative strength below which ring opacity eases toward zero
pub const OPACITY_KNEE: f32 = 0.1;

/// Opacity multiplier for locked rings outranked by a tighter lock
pub const OUTRANKED_DIM: f32 = 0.8;

// ═══════════════════════════════════════════════════════════════════════════
// RING TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// One tolerance band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceRing {
    /// Half-range in cents mapped across the ring's travel
    pub movement_range: f32,
    /// Deviation magnitude in cents that counts as locked
    pub locking_tolerance: f32,
    pub color: Color,
    /// Draw radius as a fraction of the half viewport height
    pub radius: f32,
}

impl ToleranceRing {
    pub const fn new(movement_range: f32, locking_tolerance: f32, color: Color, radius: f32) -> Self {
        Self {
            movement_range,
            locking_tolerance,
            color,
            radius,
        }
    }
}

/// Named ring configuration, widest band first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingSet {
    pub name: String,
    pub rings: Vec<ToleranceRing>,
}

impl RingSet {
    /// Default three-band configuration
    pub fn standard() -> Self {
        Self {
            name: "standard".into(),
            rings: vec![
                ToleranceRing::new(50.0, 10.0, Color::from_srgb_hex(0x5a7d9a), 0.55),
                ToleranceRing::new(20.0, 5.0, Color::from_srgb_hex(0xd9a441), 0.38),
                ToleranceRing::new(8.0, 0.5, Color::from_srgb_hex(0x4fc36b), 0.22),
            ],
        }
    }

    /// Tight bands for fine passes
    pub fn precise() -> Self {
        Self {
            name: "precise".into(),
            rings: vec![
                ToleranceRing::new(20.0, 4.0, Color::from_srgb_hex(0x5a7d9a), 0.55),
                ToleranceRing::new(8.0, 1.5, Color::from_srgb_hex(0xd9a441), 0.38),
                ToleranceRing::new(3.0, 0.25, Color::from_srgb_hex(0x4fc36b), 0.22),
            ],
        }
    }

    /// Wide bands for rough passes
    pub fn relaxed() -> Self {
        Self {
            name: "relaxed".into(),
            rings: vec![
                ToleranceRing::new(80.0, 20.0, Color::from_srgb_hex(0x5a7d9a), 0.55),
                ToleranceRing::new(40.0, 10.0, Color::from_srgb_hex(0xd9a441), 0.38),
                ToleranceRing::new(15.0, 2.0, Color::from_srgb_hex(0x4fc36b), 0.22),
            ],
        }
    }

    /// Configuration by name, falling back to the standard set
    pub fn preset(name: &str) -> Self {
        match name {
            "precise" => Self::precise(),
            "relaxed" => Self::relaxed(),
            "standard" => Self::standard(),
            _ => Self::standard(),
        }
    }
}

impl Default for RingSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Per-ring evaluation result for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingIndication {
    /// Deviation position in [0, 1], 0.5 = on target
    pub position: f32,
    pub locked: bool,
    pub opacity: f32,
}

// ═══════════════════════════════════════════════════════════════════════════
// EVALUATION
// ═══════════════════════════════════════════════════════════════════════════

/// Whether the detected peak sits inside a ring's tolerance band
pub fn ring_locked(ring: &ToleranceRing, peak_frequency: f32, target_frequency: f32) -> bool {
    if peak_frequency <= 0.0 || target_frequency <= 0.0 {
        return false;
    }
    cents_deviation(peak_frequency, target_frequency).abs() <= ring.locking_tolerance
}

/// Index of the tightest locked ring, if any
///
/// Nested tolerances lock together; the one with the smallest tolerance
/// wins and the others are dimmed.
pub fn best_lock(rings: &[ToleranceRing], peak_frequency: f32, target_frequency: f32) -> Option<usize> {
    rings
        .iter()
        .enumerate()
        .filter(|(_, ring)| ring_locked(ring, peak_frequency, target_frequency))
        .min_by(|(_, a), (_, b)| a.locking_tolerance.total_cmp(&b.locking_tolerance))
        .map(|(i, _)| i)
}

/// Opacity for a relative signal strength
///
/// Full above the knee, cubic ease-in below it.
pub fn strike_opacity(relative_strength: f32) -> f32 {
    if relative_strength >= OPACITY_KNEE {
        1.0
    } else {
        let t = (relative_strength / OPACITY_KNEE).max(0.0);
        t * t * t
    }
}

/// Evaluate every ring against one frame
///
/// Locked rings snap to center; unlocked rings project the peak through
/// the fisheye using their own movement range as the half-range. Without
/// a valid peak (or target) every ring reports center and unlocked.
pub fn evaluate_rings(
    rings: &[ToleranceRing],
    frame: &AnalysisFrame,
    target_frequency: f32,
    distortion: f32,
) -> Vec<RingIndication> {
    let base_opacity = strike_opacity(frame.relative_strength(frame.peak_magnitude));
    let valid = frame.has_valid_peak() && target_frequency > 0.0;
    let best = if valid {
        best_lock(rings, frame.peak_frequency, target_frequency)
    } else {
        None
    };

    rings
        .iter()
        .enumerate()
        .map(|(i, ring)| {
            if !valid {
                return RingIndication {
                    position: 0.5,
                    locked: false,
                    opacity: base_opacity,
                };
            }
            let locked = ring_locked(ring, frame.peak_frequency, target_frequency);
            let position = if locked {
                0.5
            } else {
                PitchProjection::new(target_frequency, ring.movement_range, distortion)
                    .project(frame.peak_frequency)
            };
            let mut opacity = base_opacity;
            if locked && best != Some(i) {
                opacity *= OUTRANKED_DIM;
            }
            RingIndication {
                position,
                locked,
                opacity,
            }
        })
        .collect()
}
