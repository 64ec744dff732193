// Frame source error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Frame source error code constants
///
/// Error code range: 1001-1002
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Frame source could not be opened or read
    pub const STREAM_FAILURE: i32 = 1001;

    /// Sample rate is zero or otherwise unusable
    pub const INVALID_SAMPLE_RATE: i32 = 1002;
}

/// Log a frame source error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=FrameSource, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by frame sources
///
/// The engine itself never fails on malformed frames; these errors only cover
/// acquiring frames (opening a WAV file, bad source configuration).
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Source could not be opened or decoded
    StreamFailure { reason: String },

    /// Sample rate must be greater than zero
    InvalidSampleRate { sample_rate: u32 },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
            AudioError::InvalidSampleRate { .. } => AudioErrorCodes::INVALID_SAMPLE_RATE,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::StreamFailure { reason } => format!("Frame source failure: {}", reason),
            AudioError::InvalidSampleRate { sample_rate } => {
                format!("Sample rate must be greater than 0 (got {})", sample_rate)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}
