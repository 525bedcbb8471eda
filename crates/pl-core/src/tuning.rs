//! Tuning math
//!
//! Cents, MIDI, and note-name conversions with the A4 = 440 Hz reference.

/// Cents per octave
pub const CENTS_PER_OCTAVE: f32 = 1200.0;

/// Note names
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Deviation of `freq` from `target` in cents
///
/// A non-positive frequency on either side means "no valid pitch" and
/// short-circuits to a neutral 0.0 instead of producing NaN or infinity.
#[inline]
pub fn cents_deviation(freq: f32, target: f32) -> f32 {
    if freq <= 0.0 || target <= 0.0 {
        return 0.0;
    }
    CENTS_PER_OCTAVE * (freq / target).log2()
}

/// Convert frequency to MIDI note number
pub fn freq_to_midi(freq: f32) -> f32 {
    69.0 + 12.0 * (freq / 440.0).log2()
}

/// Convert MIDI note number to frequency
pub fn midi_to_freq(midi: f32) -> f32 {
    440.0 * 2.0f32.powf((midi - 69.0) / 12.0)
}

/// Get note name from MIDI number
pub fn midi_to_note_name(midi: f32) -> String {
    let note = midi.round() as i32;
    let octave = note.div_euclid(12) - 1;
    let note_idx = note.rem_euclid(12) as usize;
    format!("{}{}", NOTE_NAMES[note_idx], octave)
}

/// Name of the nearest equal-tempered note, None for unpitched input
pub fn nearest_note_name(freq: f32) -> Option<String> {
    if freq <= 0.0 {
        return None;
    }
    Some(midi_to_note_name(freq_to_midi(freq)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cents_deviation() {
        // One octave up = +1200 cents
        assert!((cents_deviation(880.0, 440.0) - 1200.0).abs() < 0.01);
        // One octave down = -1200 cents
        assert!((cents_deviation(220.0, 440.0) + 1200.0).abs() < 0.01);
        // On target = 0 cents
        assert_eq!(cents_deviation(440.0, 440.0), 0.0);
    }

    #[test]
    fn test_cents_deviation_invalid() {
        assert_eq!(cents_deviation(0.0, 440.0), 0.0);
        assert_eq!(cents_deviation(-10.0, 440.0), 0.0);
        assert_eq!(cents_deviation(440.0, 0.0), 0.0);
    }

    #[test]
    fn test_freq_to_midi() {
        // A4 = 440 Hz = MIDI 69
        assert!((freq_to_midi(440.0) - 69.0).abs() < 0.01);

        // C4 = 261.63 Hz = MIDI 60
        assert!((freq_to_midi(261.63) - 60.0).abs() < 0.1);
    }

    #[test]
    fn test_midi_to_freq() {
        assert!((midi_to_freq(69.0) - 440.0).abs() < 0.01);
        assert!((midi_to_freq(60.0) - 261.63).abs() < 0.1);
    }

    #[test]
    fn test_note_name() {
        assert_eq!(midi_to_note_name(60.0), "C4");
        assert_eq!(midi_to_note_name(69.0), "A4");
        assert_eq!(midi_to_note_name(72.0), "C5");
    }

    #[test]
    fn test_nearest_note_name() {
        assert_eq!(nearest_note_name(440.0).as_deref(), Some("A4"));
        // 442 Hz is still closest to A4
        assert_eq!(nearest_note_name(442.0).as_deref(), Some("A4"));
        assert_eq!(nearest_note_name(0.0), None);
        assert_eq!(nearest_note_name(-5.0), None);
    }
}
