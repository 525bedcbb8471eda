//! Analysis frame snapshot
//!
//! Read-only per-frame output of the external pitch analysis engine:
//! - Magnitude spectrum over the analysis band
//! - Envelope bounds for display normalization
//! - Detected peak (frequency, magnitude, confidence)
//! - Strike detection state
//!
//! Frames are consumed and discarded each display tick; nothing here
//! persists between frames.

use serde::{Deserialize, Serialize};

/// Strike detection state reported by the analysis engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrikeState {
    /// No note in progress
    #[default]
    Waiting,
    /// Onset transient detected, pitch not yet stable
    Attack,
    /// Stable note being tracked
    Monitoring,
}

/// One spectral snapshot from the analysis engine
///
/// Every field tolerates zero; a silent or malformed frame must render as
/// an empty display, never as an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisFrame {
    /// Number of magnitude bins
    pub bin_count: usize,
    /// Frequency step between adjacent bins (Hz)
    pub frequency_per_bin: f32,
    /// Frequency of the first bin (Hz)
    pub start_frequency: f32,
    /// Frequency of the last bin (Hz)
    pub end_frequency: f32,
    /// Lower edge of the running magnitude envelope
    pub envelope_min: f32,
    /// Upper edge of the running magnitude envelope
    pub envelope_max: f32,
    /// Detected fundamental (Hz, 0 = no valid pitch)
    pub peak_frequency: f32,
    /// Magnitude at the detected peak
    pub peak_magnitude: f32,
    /// Detection confidence (0.0-1.0)
    pub peak_confidence: f32,
    /// Bin index of the detected peak
    pub peak_bin: usize,
    /// Largest magnitude in this frame
    pub highest_magnitude: f32,
    /// Magnitude bins (len == bin_count)
    pub magnitudes: Vec<f32>,
    /// Strike detection state
    pub strike_state: StrikeState,
}

impl AnalysisFrame {
    /// All-zero frame, safe to render before any analysis has run
    pub fn silent() -> Self {
        Self::default()
    }

    /// Whether the engine reported a usable pitch estimate
    #[inline]
    pub fn has_valid_peak(&self) -> bool {
        self.peak_frequency > 0.0
    }

    /// Envelope span, never negative
    #[inline]
    pub fn envelope_range(&self) -> f32 {
        (self.envelope_max - self.envelope_min).max(0.0)
    }

    /// Normalize a magnitude against the envelope, clamped to 0.0-1.0
    ///
    /// A degenerate envelope (max ≤ min) reads as zero strength.
    pub fn relative_strength(&self, magnitude: f32) -> f32 {
        let range = self.envelope_range();
        if range <= 0.0 {
            return 0.0;
        }
        ((magnitude - self.envelope_min) / range).clamp(0.0, 1.0)
    }

    /// Center frequency of a bin (Hz)
    #[inline]
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        self.start_frequency + bin as f32 * self.frequency_per_bin
    }
}
