// Human-voice validity gate
//
// The estimator reports any periodicity it finds; this gate decides whether a
// sample is plausibly a sung note. Three independent checks: frequency inside
// the extended vocal band, clarity above a frequency-tiered threshold, and
// RMS volume above a floor. Long periods give intrinsically lower NSDF peaks,
// so low notes get the most permissive clarity threshold.

use serde::{Deserialize, Serialize};

use super::PitchSample;
use crate::config::VoiceGateConfig;

/// Why a sample failed the validity gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Estimator found no periodicity
    NoPitch,
    /// Frequency outside the extended vocal band
    OutOfBand,
    /// Clarity below the tier threshold for this frequency
    LowClarity,
    /// RMS below the volume floor
    TooQuiet,
}

/// Validity gate applied to every pitch sample
#[derive(Debug, Clone)]
pub struct VoiceGate {
    config: VoiceGateConfig,
}

impl VoiceGate {
    pub fn new(config: VoiceGateConfig) -> Self {
        Self { config }
    }

    /// Clarity a sample at `frequency_hz` must reach
    pub fn min_clarity_for(&self, frequency_hz: f32) -> f32 {
        if frequency_hz < self.config.low_tier_max_hz {
            self.config.low_tier_clarity
        } else if frequency_hz <= self.config.mid_tier_max_hz {
            self.config.mid_tier_clarity
        } else {
            self.config.high_tier_clarity
        }
    }

    /// Validate a sample, returning its frequency when it passes every check
    pub fn check(&self, sample: &PitchSample) -> Result<f32, Rejection> {
        let frequency_hz = sample
            .frequency_hz
            .filter(|f| f.is_finite())
            .ok_or(Rejection::NoPitch)?;

        if frequency_hz < self.config.min_frequency_hz
            || frequency_hz > self.config.max_frequency_hz
        {
            return Err(Rejection::OutOfBand);
        }

        if sample.clarity < self.min_clarity_for(frequency_hz) {
            return Err(Rejection::LowClarity);
        }

        if sample.volume < self.config.min_volume_rms {
            return Err(Rejection::TooQuiet);
        }

        Ok(frequency_hz)
    }

    /// Frequency of a valid sample, `None` otherwise
    pub fn valid_frequency(&self, sample: &PitchSample) -> Option<f32> {
        self.check(sample).ok()
    }
}

impl Default for VoiceGate {
    fn default() -> Self {
        Self::new(VoiceGateConfig::default())
    }
}
