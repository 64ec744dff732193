// RangeClassifier - voice type and span from a finished range
//
// The average MIDI index of the two extremes is bucketed against ordered
// thresholds into one of six voice types. The span is reported in whole
// semitones and in octaves.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capture::CapturedExtreme;
use crate::config::ClassifierConfig;
use crate::error::CaptureError;

/// Voice type, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceType {
    Bass,
    Baritone,
    Tenor,
    Alto,
    MezzoSoprano,
    Soprano,
}

impl VoiceType {
    /// All voice types in ascending order
    pub const ALL: [VoiceType; 6] = [
        VoiceType::Bass,
        VoiceType::Baritone,
        VoiceType::Tenor,
        VoiceType::Alto,
        VoiceType::MezzoSoprano,
        VoiceType::Soprano,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            VoiceType::Bass => "Bass",
            VoiceType::Baritone => "Baritone",
            VoiceType::Tenor => "Tenor",
            VoiceType::Alto => "Alto",
            VoiceType::MezzoSoprano => "Mezzo-soprano",
            VoiceType::Soprano => "Soprano",
        }
    }
}

impl fmt::Display for VoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Bucket an average MIDI index into a voice type
pub fn voice_type_for(average_midi: f32, config: &ClassifierConfig) -> VoiceType {
    config
        .midi_thresholds
        .iter()
        .position(|&threshold| average_midi < threshold)
        .map(|index| VoiceType::ALL[index])
        .unwrap_or(VoiceType::Soprano)
}

/// Whole semitones between two frequencies
pub fn span_semitones(lowest_hz: f32, highest_hz: f32) -> i32 {
    (12.0 * (highest_hz as f64 / lowest_hz as f64).log2()).round() as i32
}

/// Final result of a capture session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocalRangeResult {
    pub lowest: CapturedExtreme,
    pub highest: CapturedExtreme,
    pub voice_type: VoiceType,
    pub semitones: i32,
    pub octaves: f32,
}

impl VocalRangeResult {
    /// Classify a finished range.
    ///
    /// # Errors
    /// `InvalidFinalize` unless `highest` is strictly above `lowest`.
    pub fn new(
        lowest: CapturedExtreme,
        highest: CapturedExtreme,
        config: &ClassifierConfig,
    ) -> Result<Self, CaptureError> {
        if !(highest.frequency_hz > lowest.frequency_hz) {
            return Err(CaptureError::InvalidFinalize {
                reason: format!(
                    "highest note {} ({:.1} Hz) is not above lowest note {} ({:.1} Hz)",
                    highest.note, highest.frequency_hz, lowest.note, lowest.frequency_hz
                ),
            });
        }

        let average_midi = (lowest.note.midi() + highest.note.midi()) as f32 / 2.0;
        let voice_type = voice_type_for(average_midi, config);
        let semitones = span_semitones(lowest.frequency_hz, highest.frequency_hz);

        Ok(Self {
            lowest,
            highest,
            voice_type,
            semitones,
            octaves: semitones as f32 / 12.0,
        })
    }
}
