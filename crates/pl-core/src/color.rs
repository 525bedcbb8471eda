//! Color primitives
//!
//! RGBA color in linear space plus HSL conversion, used to derive overlay
//! colors from spectrogram palettes.

use serde::{Deserialize, Serialize};

/// RGBA color in linear space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create color from hex string (e.g., "#ff9040" or "ff9040")
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 && hex.len() != 8 {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()? as f32 / 255.0;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()? as f32 / 255.0;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()? as f32 / 255.0;
        let a = if hex.len() == 8 {
            u8::from_str_radix(&hex[6..8], 16).ok()? as f32 / 255.0
        } else {
            1.0
        };

        Some(Self::new(r, g, b, a))
    }

    /// Create from sRGB hex value
    pub fn from_srgb_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::new(r, g, b, 1.0)
    }

    /// Format as "#rrggbb"
    pub fn to_hex_string(self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
        )
    }

    /// Convert to array for GPU
    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Blend with another color
    pub fn blend(self, other: Self, t: f32) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    /// Set alpha
    pub fn with_alpha(self, a: f32) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// Convert to HSL
    ///
    /// Gray inputs (zero chroma) report hue 0 and saturation 0.
    pub fn to_hsl(self) -> Hsl {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (max + min) / 2.0;
        let delta = max - min;

        if delta < f32::EPSILON {
            return Hsl { h: 0.0, s: 0.0, l };
        }

        let s = if l > 0.5 {
            delta / (2.0 - max - min)
        } else {
            delta / (max + min)
        };

        let h = if max == self.r {
            let shift = if self.g < self.b { 6.0 } else { 0.0 };
            ((self.g - self.b) / delta + shift) / 6.0
        } else if max == self.g {
            ((self.b - self.r) / delta + 2.0) / 6.0
        } else {
            ((self.r - self.g) / delta + 4.0) / 6.0
        };

        Hsl { h, s, l }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// HSL color, all channels 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub const fn new(h: f32, s: f32, l: f32) -> Self {
        Self { h, s, l }
    }

    /// Convert back to RGBA (alpha = 1.0)
    pub fn to_color(self) -> Color {
        if self.s <= 0.0 {
            return Color::new(self.l, self.l, self.l, 1.0);
        }

        let q = if self.l < 0.5 {
            self.l * (1.0 + self.s)
        } else {
            self.l + self.s - self.l * self.s
        };
        let p = 2.0 * self.l - q;

        Color::new(
            hue_to_rgb(p, q, self.h + 1.0 / 3.0),
            hue_to_rgb(p, q, self.h),
            hue_to_rgb(p, q, self.h - 1.0 / 3.0),
            1.0,
        )
    }

    /// Rotate hue, wrapping into [0, 1)
    pub fn rotate_hue(self, amount: f32) -> Self {
        Self {
            h: (self.h + amount).rem_euclid(1.0),
            ..self
        }
    }

    pub fn with_saturation(self, s: f32) -> Self {
        Self {
            s: s.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn with_lightness(self, l: f32) -> Self {
        Self {
            l: l.clamp(0.0, 1.0),
            ..self
        }
    }
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_color_from_hex() {
        let color = Color::from_hex("#ff9040").unwrap();
        assert!(close(color.r, 1.0));
        assert!((color.g - 0.56).abs() < 0.02);
        assert!(Color::from_hex("zzz").is_none());
        assert!(Color::from_hex("#ff90").is_none());
    }

    #[test]
    fn test_hex_round_trip() {
        let color = Color::from_srgb_hex(0x4a9eff);
        assert_eq!(color.to_hex_string(), "#4a9eff");
    }

    #[test]
    fn test_color_blend() {
        let mid = Color::BLACK.blend(Color::WHITE, 0.5);
        assert!(close(mid.r, 0.5));
        assert!(close(mid.g, 0.5));
        assert!(close(mid.b, 0.5));
    }

    #[test]
    fn test_hsl_round_trip() {
        let red = Color::new(1.0, 0.0, 0.0, 1.0);
        let hsl = red.to_hsl();
        assert!(close(hsl.h, 0.0));
        assert!(close(hsl.s, 1.0));
        assert!(close(hsl.l, 0.5));

        let back = hsl.to_color();
        assert!(close(back.r, 1.0));
        assert!(close(back.g, 0.0));
        assert!(close(back.b, 0.0));
    }

    #[test]
    fn test_gray_has_zero_saturation() {
        let gray = Color::new(0.5, 0.5, 0.5, 1.0);
        let hsl = gray.to_hsl();
        assert_eq!(hsl.s, 0.0);
        assert!(close(hsl.l, 0.5));

        assert_eq!(Color::WHITE.to_hsl().s, 0.0);
        assert_eq!(Color::BLACK.to_hsl().s, 0.0);
    }

    #[test]
    fn test_rotate_hue_wraps() {
        let hsl = Hsl::new(0.8, 1.0, 0.5);
        let rotated = hsl.rotate_hue(0.5);
        assert!(close(rotated.h, 0.3));

        let cyan = Color::new(0.0, 1.0, 1.0, 1.0).to_hsl();
        let complement = cyan.rotate_hue(0.5).to_color();
        // Complement of cyan is red
        assert!(complement.r > 0.9);
        assert!(complement.g < 0.1);
    }
}
