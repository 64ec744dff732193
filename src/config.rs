//! Configuration management for engine tuning
//!
//! This module provides runtime configuration loading from JSON files so the
//! empirically chosen thresholds (dropout gap, stability tolerance, clarity
//! tiers) can be tuned without recompilation. Every section falls back to
//! defaults field by field, so a config file only needs the values it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub estimator: EstimatorConfig,
    pub voice_gate: VoiceGateConfig,
    pub capture: CaptureConfig,
    pub classifier: ClassifierConfig,
    pub audio: AudioConfig,
}

/// McLeod pitch estimator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// First key maximum at or above this fraction of the highest one wins
    pub peak_threshold: f32,
    /// Frames quieter than this RMS are treated as silence
    pub silence_rms: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            peak_threshold: 0.9,
            silence_rms: 1e-4,
        }
    }
}

/// Human-voice validity gate applied to every estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceGateConfig {
    /// Lower edge of the extended vocal band (Hz)
    pub min_frequency_hz: f32,
    /// Upper edge of the extended vocal band (Hz)
    pub max_frequency_hz: f32,
    /// Upper edge of the low clarity tier (Hz)
    pub low_tier_max_hz: f32,
    /// Upper edge of the middle clarity tier (Hz)
    pub mid_tier_max_hz: f32,
    /// Minimum clarity below `low_tier_max_hz`
    pub low_tier_clarity: f32,
    /// Minimum clarity between the low and middle tier edges
    pub mid_tier_clarity: f32,
    /// Minimum clarity above `mid_tier_max_hz`
    pub high_tier_clarity: f32,
    /// Minimum frame RMS
    pub min_volume_rms: f32,
}

impl Default for VoiceGateConfig {
    fn default() -> Self {
        Self {
            min_frequency_hz: 65.0,
            max_frequency_hz: 1320.0,
            low_tier_max_hz: 150.0,
            mid_tier_max_hz: 300.0,
            low_tier_clarity: 0.75,
            mid_tier_clarity: 0.80,
            high_tier_clarity: 0.85,
            min_volume_rms: 0.01,
        }
    }
}

/// How the session orchestrates the lowest and highest gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Starting one gate stops the other if it is mid-attempt
    Sequential,
    /// Both gates may listen to the same frames at once
    Independent,
}

/// Capture gate timing and robust-extremum parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Lead-in ticks before listening starts
    pub countdown_ticks: u8,
    /// Duration of one lead-in tick
    pub tick_ms: u64,
    /// Detection window measured from entering `Listening`
    pub max_detection_ms: u64,
    /// Continuous valid signal required before capturing
    pub min_hold_ms: u64,
    /// Longest gap between valid samples that does not break a run
    pub dropout_tolerance_ms: u64,
    /// Share of the most extreme window samples feeding the trimmed median
    pub trim_fraction: f32,
    /// Half-width of the stability band around the candidate, in semitones
    pub stability_semitones: f32,
    /// Share of the window the stability band must cover
    pub stable_coverage: f32,
    pub mode: CaptureMode,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 3,
            tick_ms: 1000,
            max_detection_ms: 15_000,
            min_hold_ms: 3000,
            dropout_tolerance_ms: 500,
            trim_fraction: 0.3,
            stability_semitones: 1.5,
            stable_coverage: 0.7,
            mode: CaptureMode::Sequential,
        }
    }
}

impl CaptureConfig {
    /// Total lead-in duration
    pub fn countdown_ms(&self) -> u64 {
        (self.countdown_ticks as u64).saturating_mul(self.tick_ms)
    }
}

/// Voice type bucket edges over the average MIDI index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Ascending exclusive upper bounds for bass, baritone, tenor, alto and
    /// mezzo-soprano; anything above the last edge is soprano
    pub midi_thresholds: [f32; 5],
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            midi_thresholds: [55.0, 62.0, 65.0, 68.0, 71.0],
        }
    }
}

/// Frame source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Samples per analysis frame
    pub frame_size: usize,
    /// Sample rate for synthetic sources
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            sample_rate: 44_100,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or defaults if the file doesn't exist or the
    /// JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/vocal_range_config.json")
    }
}
