// Error types for the vocal range engine
//
// This module defines custom error types for frame sources and capture
// operations, providing structured error handling with numeric error codes
// that a host UI can switch on.

mod audio;
mod capture;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use capture::{log_capture_error, CaptureError, CaptureErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the engine/UI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
