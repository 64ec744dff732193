// Capture error types and constants

use crate::capture::Extreme;
use crate::error::ErrorCode;
use log::error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capture error code constants
///
/// These constants are the single source of truth for error codes shared
/// with the host UI.
///
/// Error code range: 3001-3005
pub struct CaptureErrorCodes {}

impl CaptureErrorCodes {
    /// Detection window elapsed without a single valid sample
    pub const NO_AUDIO_SIGNAL: i32 = 3001;

    /// Detection window elapsed with valid samples but never enough hold time
    pub const UNSTABLE_PITCH: i32 = 3002;

    /// Captured or manual extreme violates ordering against the paired extreme
    pub const RANGE_CONFLICT: i32 = 3003;

    /// Finalize called with a missing or invalid extreme pair
    pub const INVALID_FINALIZE: i32 = 3004;

    /// Manual frequency is not a positive finite number
    pub const INVALID_MANUAL_PITCH: i32 = 3005;
}

/// Log a capture error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_capture_error(err: &CaptureError, context: &str) {
    error!(
        "Capture error in {}: code={}, component=CaptureGate, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Capture-related errors
///
/// Every variant is recoverable: the affected extreme can be retried without
/// disturbing the other one.
///
/// Error code range: 3001-3005
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureError {
    /// Timed out with zero valid samples in the detection window
    NoAudioSignal { window_ms: u64 },

    /// Timed out with some valid samples but never a long enough hold
    UnstablePitch { held_ms: u64, required_ms: u64 },

    /// Candidate extreme is not strictly beyond the paired extreme
    RangeConflict {
        extreme: Extreme,
        candidate_note: String,
        candidate_hz: f32,
        paired_note: String,
        paired_hz: f32,
    },

    /// Finalize called before both extremes are valid
    InvalidFinalize { reason: String },

    /// Manual frequency rejected before cross-validation
    InvalidManualPitch { frequency_hz: f32 },
}

impl ErrorCode for CaptureError {
    fn code(&self) -> i32 {
        match self {
            CaptureError::NoAudioSignal { .. } => CaptureErrorCodes::NO_AUDIO_SIGNAL,
            CaptureError::UnstablePitch { .. } => CaptureErrorCodes::UNSTABLE_PITCH,
            CaptureError::RangeConflict { .. } => CaptureErrorCodes::RANGE_CONFLICT,
            CaptureError::InvalidFinalize { .. } => CaptureErrorCodes::INVALID_FINALIZE,
            CaptureError::InvalidManualPitch { .. } => CaptureErrorCodes::INVALID_MANUAL_PITCH,
        }
    }

    fn message(&self) -> String {
        match self {
            CaptureError::NoAudioSignal { window_ms } => format!(
                "No clear, sustained pitch detected: no voice heard within {} ms",
                window_ms
            ),
            CaptureError::UnstablePitch {
                held_ms,
                required_ms,
            } => format!(
                "No clear, sustained pitch detected: longest hold {} ms, need {} ms",
                held_ms, required_ms
            ),
            CaptureError::RangeConflict {
                extreme,
                candidate_note,
                candidate_hz,
                paired_note,
                paired_hz,
            } => match extreme {
                Extreme::Lowest => format!(
                    "Lowest note {} ({:.1} Hz) must be below the highest note {} ({:.1} Hz). Try a lower note.",
                    candidate_note, candidate_hz, paired_note, paired_hz
                ),
                Extreme::Highest => format!(
                    "Highest note {} ({:.1} Hz) must be above the lowest note {} ({:.1} Hz). Try a higher note.",
                    candidate_note, candidate_hz, paired_note, paired_hz
                ),
            },
            CaptureError::InvalidFinalize { reason } => {
                format!("Cannot finalize vocal range: {}", reason)
            }
            CaptureError::InvalidManualPitch { frequency_hz } => {
                format!("Manual pitch must be a positive frequency (got {})", frequency_hz)
            }
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaptureError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for CaptureError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(extreme: Extreme) -> CaptureError {
        CaptureError::RangeConflict {
            extreme,
            candidate_note: "G3".to_string(),
            candidate_hz: 196.0,
            paired_note: "D4".to_string(),
            paired_hz: 293.7,
        }
    }

    #[test]
    fn test_capture_error_codes() {
        assert_eq!(
            CaptureError::NoAudioSignal { window_ms: 15_000 }.code(),
            CaptureErrorCodes::NO_AUDIO_SIGNAL
        );
        assert_eq!(
            CaptureError::UnstablePitch {
                held_ms: 1200,
                required_ms: 3000
            }
            .code(),
            CaptureErrorCodes::UNSTABLE_PITCH
        );
        assert_eq!(
            conflict(Extreme::Highest).code(),
            CaptureErrorCodes::RANGE_CONFLICT
        );
        assert_eq!(
            CaptureError::InvalidFinalize {
                reason: "test".to_string()
            }
            .code(),
            CaptureErrorCodes::INVALID_FINALIZE
        );
        assert_eq!(
            CaptureError::InvalidManualPitch { frequency_hz: -1.0 }.code(),
            CaptureErrorCodes::INVALID_MANUAL_PITCH
        );
    }

    #[test]
    fn test_range_conflict_names_both_notes() {
        let message = conflict(Extreme::Highest).message();
        assert!(message.contains("G3"));
        assert!(message.contains("D4"));
        assert!(message.contains("196.0 Hz"));
        assert!(message.contains("higher"));

        let message = conflict(Extreme::Lowest).message();
        assert!(message.contains("lower"));
    }

    #[test]
    fn test_unstable_pitch_message() {
        let err = CaptureError::UnstablePitch {
            held_ms: 1200,
            required_ms: 3000,
        };
        assert_eq!(
            err.message(),
            "No clear, sustained pitch detected: longest hold 1200 ms, need 3000 ms"
        );
    }

    #[test]
    fn test_capture_error_display() {
        let err = CaptureError::NoAudioSignal { window_ms: 15_000 };
        let display = format!("{}", err);
        assert!(display.contains("CaptureError"));
        assert!(display.contains(&err.code().to_string()));
    }

    #[test]
    fn test_serialized_kind_tag() {
        let json = serde_json::to_string(&CaptureError::NoAudioSignal { window_ms: 10 }).unwrap();
        assert!(json.contains("\"kind\":\"no_audio_signal\""));
    }
}
