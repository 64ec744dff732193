// Analysis module - per-frame pitch, clarity and volume
//
// Each amplitude frame becomes one PitchSample:
// 1. McLeodDetector estimates frequency and clarity
// 2. compute_rms measures the frame volume
// 3. VoiceGate (applied later by the capture gate) decides validity

pub mod peak;
pub mod pitch;
pub mod validity;

use serde::{Deserialize, Serialize};

pub use pitch::{McLeodDetector, PitchDetector, PitchEstimate};
pub use validity::{Rejection, VoiceGate};

/// Estimator output for one analysis frame, stamped with its frame time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchSample {
    /// Raw estimated frequency; `None` when no periodicity was found
    pub frequency_hz: Option<f32>,
    /// Estimator confidence in [0, 1]
    pub clarity: f32,
    /// RMS of the frame
    pub volume: f32,
    pub timestamp_ms: u64,
}

impl PitchSample {
    /// Sample carrying no pitch, e.g. a silent frame
    pub fn silent(timestamp_ms: u64) -> Self {
        Self {
            frequency_hz: None,
            clarity: 0.0,
            volume: 0.0,
            timestamp_ms,
        }
    }
}

/// Root mean square of a frame; 0.0 for empty frames
pub fn compute_rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = frame.iter().map(|&s| s * s).sum();
    (sum_sq / frame.len() as f32).sqrt()
}

/// Run the detector over one frame and stamp the result
pub fn analyze_frame(
    detector: &mut dyn PitchDetector,
    frame: &[f32],
    sample_rate: u32,
    timestamp_ms: u64,
) -> PitchSample {
    let estimate = detector.estimate(frame, sample_rate);
    let volume = compute_rms(frame);

    PitchSample {
        frequency_hz: estimate.frequency_hz,
        clarity: estimate.clarity,
        volume: if volume.is_finite() { volume } else { 0.0 },
        timestamp_ms,
    }
}
