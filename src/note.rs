//! Frequency to note mapping in 12-tone equal temperament (A4 = 440 Hz).
//!
//! Every note the engine reports goes through [`note_from_frequency`], so the
//! mapping is computed in `f64` with no state: the same frequency always
//! yields the same letter, octave and cents.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference pitch for A4
pub const A4_HZ: f64 = 440.0;

/// MIDI index of A4
pub const A4_MIDI: i32 = 69;

/// Pitch class of a note, C = 0 through B = 11
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteLetter {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

impl NoteLetter {
    pub const ALL: [NoteLetter; 12] = [
        NoteLetter::C,
        NoteLetter::CSharp,
        NoteLetter::D,
        NoteLetter::DSharp,
        NoteLetter::E,
        NoteLetter::F,
        NoteLetter::FSharp,
        NoteLetter::G,
        NoteLetter::GSharp,
        NoteLetter::A,
        NoteLetter::ASharp,
        NoteLetter::B,
    ];

    /// Letter for a pitch class; negative classes wrap around.
    pub fn from_pitch_class(pitch_class: i32) -> Self {
        Self::ALL[pitch_class.rem_euclid(12) as usize]
    }

    pub fn pitch_class(self) -> i32 {
        self as i32
    }

    pub fn symbol(self) -> &'static str {
        match self {
            NoteLetter::C => "C",
            NoteLetter::CSharp => "C#",
            NoteLetter::D => "D",
            NoteLetter::DSharp => "D#",
            NoteLetter::E => "E",
            NoteLetter::F => "F",
            NoteLetter::FSharp => "F#",
            NoteLetter::G => "G",
            NoteLetter::GSharp => "G#",
            NoteLetter::A => "A",
            NoteLetter::ASharp => "A#",
            NoteLetter::B => "B",
        }
    }
}

impl fmt::Display for NoteLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Musical coordinates of a frequency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteInfo {
    pub letter: NoteLetter,
    pub octave: i32,
    /// Deviation from the nearest note, in [-50, 50]
    pub cents: i32,
    /// Letter plus octave, e.g. "C#4"
    pub display_name: String,
}

impl NoteInfo {
    /// Note at an exact MIDI index (zero cents)
    pub fn from_midi(midi: i32) -> Self {
        let letter = NoteLetter::from_pitch_class(midi);
        let octave = midi.div_euclid(12) - 1;
        Self {
            letter,
            octave,
            cents: 0,
            display_name: format!("{}{}", letter, octave),
        }
    }

    /// MIDI index of the nearest note (A4 = 69)
    pub fn midi(&self) -> i32 {
        (self.octave + 1) * 12 + self.letter.pitch_class()
    }
}

impl fmt::Display for NoteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// Semitones between `frequency_hz` and A4, unrounded
pub fn semitone_offset(frequency_hz: f64) -> f64 {
    12.0 * (frequency_hz / A4_HZ).log2()
}

/// Signed semitone distance from `from_hz` to `to_hz`
pub fn semitone_distance(from_hz: f32, to_hz: f32) -> f64 {
    12.0 * (to_hz as f64 / from_hz as f64).log2()
}

/// Map a frequency to its nearest note.
///
/// Returns `None` for non-positive or non-finite input.
pub fn note_from_frequency(frequency_hz: f32) -> Option<NoteInfo> {
    let frequency_hz = frequency_hz as f64;
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return None;
    }

    let offset = semitone_offset(frequency_hz);
    let nearest = offset.round();
    let cents = ((offset - nearest) * 100.0).floor() as i32;
    let midi = nearest as i32 + A4_MIDI;

    let mut note = NoteInfo::from_midi(midi);
    note.cents = cents;
    Some(note)
}

/// Equal-tempered frequency of a MIDI index
pub fn midi_to_frequency(midi: i32) -> f32 {
    (A4_HZ * 2f64.powf((midi - A4_MIDI) as f64 / 12.0)) as f32
}

/// Parse a note name such as `E2`, `C#4`, `Db3` or `A-1` into a MIDI index.
pub fn parse_note_name(name: &str) -> Option<i32> {
    let name = name.trim();
    let mut chars = name.chars();
    let base = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave_str) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    let octave: i32 = octave_str.parse().ok()?;
    Some((octave + 1) * 12 + base + accidental)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_maps_exactly() {
        let note = note_from_frequency(440.0).unwrap();
        assert_eq!(note.letter, NoteLetter::A);
        assert_eq!(note.octave, 4);
        assert_eq!(note.cents, 0);
        assert_eq!(note.display_name, "A4");
        assert_eq!(note.midi(), 69);
    }

    #[test]
    fn test_middle_c_within_one_cent() {
        let note = note_from_frequency(261.63).unwrap();
        assert_eq!(note.letter, NoteLetter::C);
        assert_eq!(note.octave, 4);
        assert!(note.cents.abs() <= 1, "cents was {}", note.cents);
        assert_eq!(note.display_name, "C4");
    }

    #[test]
    fn test_mapping_is_deterministic() {
        for freq in [65.0_f32, 82.41, 110.0, 196.0, 311.13, 523.25, 1318.5] {
            let first = note_from_frequency(freq);
            for _ in 0..5 {
                assert_eq!(note_from_frequency(freq), first);
            }
        }
    }

    #[test]
    fn test_sharps_and_octave_boundaries() {
        let note = note_from_frequency(277.18).unwrap();
        assert_eq!(note.display_name, "C#4");

        let note = note_from_frequency(246.94).unwrap();
        assert_eq!(note.display_name, "B3");

        let note = note_from_frequency(82.41).unwrap();
        assert_eq!(note.display_name, "E2");
        assert_eq!(note.midi(), 40);
    }

    #[test]
    fn test_cents_stay_in_range() {
        // A quarter tone above A4 is the rounding boundary
        let quarter_tone = (440.0 * 2f64.powf(0.49 / 12.0)) as f32;
        let note = note_from_frequency(quarter_tone).unwrap();
        assert_eq!(note.display_name, "A4");
        assert!((48..=50).contains(&note.cents));

        let flat = (440.0 * 2f64.powf(-0.2 / 12.0)) as f32;
        let note = note_from_frequency(flat).unwrap();
        assert_eq!(note.display_name, "A4");
        assert!((-21..=-19).contains(&note.cents));
    }

    #[test]
    fn test_rejects_invalid_frequencies() {
        assert!(note_from_frequency(0.0).is_none());
        assert!(note_from_frequency(-440.0).is_none());
        assert!(note_from_frequency(f32::NAN).is_none());
        assert!(note_from_frequency(f32::INFINITY).is_none());
    }

    #[test]
    fn test_midi_round_trip_through_frequency() {
        for midi in [28, 40, 52, 60, 69, 84] {
            let note = note_from_frequency(midi_to_frequency(midi)).unwrap();
            assert_eq!(note.midi(), midi);
            assert!(note.cents.abs() <= 1);
        }
    }

    #[test]
    fn test_parse_note_name() {
        assert_eq!(parse_note_name("A4"), Some(69));
        assert_eq!(parse_note_name("C4"), Some(60));
        assert_eq!(parse_note_name("E2"), Some(40));
        assert_eq!(parse_note_name("C#4"), Some(61));
        assert_eq!(parse_note_name("Db4"), Some(61));
        assert_eq!(parse_note_name("a-1"), Some(9));
        assert_eq!(parse_note_name("H2"), None);
        assert_eq!(parse_note_name("C"), None);
    }
}
