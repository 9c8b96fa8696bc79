//! MIDI note number and frequency conversion utilities.

/// Reference pitch for A4 in Hz.
pub const A4_FREQ: f64 = 440.0;

/// MIDI note number of A4.
pub const A4_MIDI: u8 = 69;

/// Highest valid MIDI note number.
pub const MIDI_NOTE_MAX: u8 = 127;

/// Convert a MIDI note number to frequency in Hz.
///
/// Uses the standard formula: f = 440 * 2^((n-69)/12)
/// where n is the MIDI note number and 69 is A4.
///
/// # Examples
/// ```
/// use pitchscribe_midi::note::midi_to_freq;
///
/// let a4 = midi_to_freq(69);
/// assert!((a4 - 440.0).abs() < 0.001);
///
/// let c4 = midi_to_freq(60);
/// assert!((c4 - 261.626).abs() < 0.01);
/// ```
pub fn midi_to_freq(midi_note: u8) -> f64 {
    A4_FREQ * 2.0_f64.powf((midi_note as f64 - A4_MIDI as f64) / 12.0)
}

/// Fractional MIDI note for a frequency: `69 + 12 * log2(freq / 440)`.
pub fn freq_to_midi_exact(freq: f64) -> f64 {
    A4_MIDI as f64 + 12.0 * (freq / A4_FREQ).log2()
}

/// Convert a frequency in Hz to the nearest MIDI note number.
///
/// Halfway values round to the even note. Returns `None` for non-positive
/// or non-finite frequencies and for notes outside 0-127; out-of-range
/// values are never clamped.
///
/// # Examples
/// ```
/// use pitchscribe_midi::note::freq_to_midi;
///
/// assert_eq!(freq_to_midi(440.0), Some(69)); // A4
/// assert_eq!(freq_to_midi(261.626), Some(60)); // C4
/// assert_eq!(freq_to_midi(0.0), None);
/// assert_eq!(freq_to_midi(20_000.0), None);
/// ```
pub fn freq_to_midi(freq: f64) -> Option<u8> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }

    let note = freq_to_midi_exact(freq).round_ties_even();
    if (0.0..=MIDI_NOTE_MAX as f64).contains(&note) {
        Some(note as u8)
    } else {
        None
    }
}
