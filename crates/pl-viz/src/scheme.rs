//! Color schemes for the waterfall display
//!
//! Named gradient palettes with:
//! - Validated stop lists (strictly ascending positions spanning 0.0-1.0)
//! - CPU interpolation matching the generated WGSL (see [`crate::shader`])
//! - Derived overlay colors that stay readable over any palette
//! - A registry with graceful fallback for unknown scheme names
//!
//! The registry is built once and passed by reference to consumers; there
//! is no process-wide scheme state.

use pl_core::{Color, Hsl};
use serde::{Deserialize, Serialize};

use crate::common::{VizError, VizResult};

// ═══════════════════════════════════════════════════════════════════════════
// COLOR STOPS
// ═══════════════════════════════════════════════════════════════════════════

/// One gradient stop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    /// Position along the gradient (0.0-1.0)
    pub position: f32,
    /// Color at this position
    pub color: Color,
}

impl ColorStop {
    pub const fn new(position: f32, color: Color) -> Self {
        Self { position, color }
    }
}

fn stop(position: f32, hex: u32) -> ColorStop {
    ColorStop::new(position, Color::from_srgb_hex(hex))
}

// ═══════════════════════════════════════════════════════════════════════════
// COLOR SCHEME
// ═══════════════════════════════════════════════════════════════════════════

/// Named gradient palette
///
/// Immutable once constructed. Host-supplied definitions go through
/// [`ColorScheme::new`] or [`SchemeRegistry::from_schemes`], which enforce
/// the stop invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScheme {
    /// Display name, also the registry key
    pub name: String,
    /// Gradient stops, ascending, first at 0.0, last at 1.0
    pub stops: Vec<ColorStop>,
    /// Usable under red-green color blindness
    #[serde(default)]
    pub color_blind_friendly: bool,
}

impl ColorScheme {
    /// Validated constructor
    pub fn new(
        name: impl Into<String>,
        stops: Vec<ColorStop>,
        color_blind_friendly: bool,
    ) -> VizResult<Self> {
        let scheme = Self {
            name: name.into(),
            stops,
            color_blind_friendly,
        };
        scheme.validate()?;
        Ok(scheme)
    }

    /// Check the stop-list invariants
    pub fn validate(&self) -> VizResult<()> {
        if self.stops.len() < 2 {
            return Err(VizError::Scheme(format!(
                "scheme '{}' needs at least 2 stops",
                self.name
            )));
        }
        if self.stops[0].position != 0.0 {
            return Err(VizError::Scheme(format!(
                "scheme '{}' must start at position 0.0",
                self.name
            )));
        }
        if self.stops[self.stops.len() - 1].position != 1.0 {
            return Err(VizError::Scheme(format!(
                "scheme '{}' must end at position 1.0",
                self.name
            )));
        }
        for pair in self.stops.windows(2) {
            if pair[1].position <= pair[0].position {
                return Err(VizError::Scheme(format!(
                    "scheme '{}' has non-ascending stops at {}",
                    self.name, pair[1].position
                )));
            }
        }
        Ok(())
    }

    /// Sample the gradient at position t (0.0-1.0, clamped)
    ///
    /// Scans stop pairs ascending and lerps inside the first pair whose
    /// upper position bounds t. The generated shader in [`crate::shader`]
    /// evaluates the same chain; the two must agree within 1e-3.
    pub fn interpolate(&self, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.position {
                let local = (t - a.position) / (b.position - a.position);
                return a.color.blend(b.color, local);
            }
        }
        self.stops[self.stops.len() - 1].color
    }

    /// Overlay colors that stay readable over this palette
    ///
    /// Picks a representative stop (scanning from the bright end for
    /// saturation >= 0.2, else the most saturated stop seen), rotates its
    /// hue 180 degrees, then pins saturation and lightness into ranges
    /// that contrast with the gradient in the requested UI mode.
    ///
    /// Near-gray palettes (base saturation < 0.08) skip the rotation and
    /// return fixed black/white/gray pairs instead, keyed by the base
    /// lightness.
    pub fn complementary(&self, dark_mode: bool) -> OverlayColors {
        let mut base: Option<Hsl> = None;
        let mut most_saturated = self.stops[self.stops.len() - 1].color.to_hsl();

        for stop in self.stops.iter().rev() {
            let hsl = stop.color.to_hsl();
            if hsl.s >= BASE_PICK_SATURATION {
                base = Some(hsl);
                break;
            }
            if hsl.s > most_saturated.s {
                most_saturated = hsl;
            }
        }
        let base = base.unwrap_or(most_saturated);

        if base.s < GRAY_SATURATION_CUTOFF {
            return OverlayColors::gray_fallback(base.l);
        }

        let rotated = base.rotate_hue(0.5);
        let primary = rotated
            .with_saturation(rotated.s.max(0.6))
            .with_lightness(if dark_mode { 0.8 } else { 0.25 })
            .to_color();
        let secondary = rotated
            .with_saturation(rotated.s.clamp(0.45, 0.7))
            .with_lightness(if dark_mode { 0.65 } else { 0.35 })
            .to_color();

        OverlayColors { primary, secondary }
    }
}

/// Minimum saturation for a stop to represent its scheme
const BASE_PICK_SATURATION: f32 = 0.2;

/// Below this the scheme counts as gray and hue rotation is meaningless
const GRAY_SATURATION_CUTOFF: f32 = 0.08;

/// Lightness above which a gray palette counts as light
const GRAY_LIGHTNESS_SPLIT: f32 = 0.6;

/// Derived overlay color pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayColors {
    /// Dominant overlay color (peak marker, locked rings)
    pub primary: Color,
    /// Quieter overlay color (center line, guides)
    pub secondary: Color,
}

impl OverlayColors {
    /// Fixed contrast pair for near-gray palettes
    fn gray_fallback(base_lightness: f32) -> Self {
        if base_lightness >= GRAY_LIGHTNESS_SPLIT {
            Self {
                primary: Color::new(0.1, 0.1, 0.1, 1.0),
                secondary: Color::new(0.35, 0.35, 0.35, 1.0),
            }
        } else {
            Self {
                primary: Color::new(0.9, 0.9, 0.9, 1.0),
                secondary: Color::new(0.65, 0.65, 0.65, 1.0),
            }
        }
    }

    /// Hex pair for hosts styling their own overlay widgets
    pub fn to_hex_pair(&self) -> (String, String) {
        (self.primary.to_hex_string(), self.secondary.to_hex_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════

/// Immutable scheme collection
///
/// Constructed once at startup and passed by reference to every consumer.
#[derive(Debug, Clone)]
pub struct SchemeRegistry {
    schemes: Vec<ColorScheme>,
}

impl SchemeRegistry {
    /// Name every lookup falls back to
    pub const DEFAULT_SCHEME: &'static str = "Viridis";

    /// Registry with the built-in palettes
    pub fn builtin() -> Self {
        Self {
            schemes: builtin_schemes(),
        }
    }

    /// Registry from host-supplied definitions (must be non-empty)
    pub fn from_schemes(schemes: Vec<ColorScheme>) -> VizResult<Self> {
        if schemes.is_empty() {
            return Err(VizError::Scheme("registry needs at least one scheme".into()));
        }
        for scheme in &schemes {
            scheme.validate()?;
        }
        Ok(Self { schemes })
    }

    /// Find a scheme by name, falling back to Viridis, then the first entry
    ///
    /// Never fails: an unknown name degrades instead of erroring.
    pub fn lookup(&self, name: &str) -> &ColorScheme {
        self.schemes
            .iter()
            .find(|s| s.name == name)
            .or_else(|| {
                self.schemes
                    .iter()
                    .find(|s| s.name == Self::DEFAULT_SCHEME)
            })
            .unwrap_or(&self.schemes[0])
    }

    pub fn schemes(&self) -> &[ColorScheme] {
        &self.schemes
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemes.iter().map(|s| s.name.as_str())
    }

    /// Schemes safe for red-green color blindness
    pub fn color_blind_friendly(&self) -> impl Iterator<Item = &ColorScheme> {
        self.schemes.iter().filter(|s| s.color_blind_friendly)
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Built-in palettes; anchor colors approximate the standard perceptual maps
fn builtin_schemes() -> Vec<ColorScheme> {
    vec![
        ColorScheme {
            name: "Viridis".into(),
            stops: vec![
                stop(0.0, 0x440154),
                stop(0.25, 0x3b528b),
                stop(0.5, 0x21918c),
                stop(0.75, 0x5ec962),
                stop(1.0, 0xfde725),
            ],
            color_blind_friendly: true,
        },
        ColorScheme {
            name: "Magma".into(),
            stops: vec![
                stop(0.0, 0x000004),
                stop(0.25, 0x51127c),
                stop(0.5, 0xb73779),
                stop(0.75, 0xfc8961),
                stop(1.0, 0xfcfdbf),
            ],
            color_blind_friendly: false,
        },
        ColorScheme {
            name: "Inferno".into(),
            stops: vec![
                stop(0.0, 0x000004),
                stop(0.25, 0x57106e),
                stop(0.5, 0xbc3754),
                stop(0.75, 0xf98e09),
                stop(1.0, 0xfcffa4),
            ],
            color_blind_friendly: false,
        },
        ColorScheme {
            name: "Plasma".into(),
            stops: vec![
                stop(0.0, 0x0d0887),
                stop(0.25, 0x7e03a8),
                stop(0.5, 0xcc4778),
                stop(0.75, 0xf89540),
                stop(1.0, 0xf0f921),
            ],
            color_blind_friendly: false,
        },
        ColorScheme {
            name: "Turbo".into(),
            stops: vec![
                stop(0.0, 0x30123b),
                stop(0.2, 0x28bbec),
                stop(0.4, 0x46f884),
                stop(0.6, 0xe1dd37),
                stop(0.8, 0xfa7d20),
                stop(1.0, 0x7a0403),
            ],
            color_blind_friendly: false,
        },
        ColorScheme {
            name: "Grayscale".into(),
            stops: vec![stop(0.0, 0x000000), stop(1.0, 0xffffff)],
            color_blind_friendly: true,
        },
        ColorScheme {
            name: "Pro Audio".into(),
            stops: vec![
                stop(0.0, 0x000033),
                stop(0.2, 0x0000cc),
                stop(0.4, 0x00cccc),
                stop(0.6, 0x00cc00),
                stop(0.8, 0xffcc00),
                stop(1.0, 0xff0000),
            ],
            color_blind_friendly: false,
        },
    ]
}
