// Capture module - sustained-pitch capture of one range extreme
//
// This module provides:
// - State and result types for a capture attempt
// - Dropout-tolerant hold tracking
// - Robust extremum selection over the held window
// - The CaptureGate state machine tying them together

pub mod extremum;
pub mod gate;
pub mod hold;
pub mod progress;
pub mod state;

pub use extremum::robust_extremum;
pub use gate::{cross_validate, CaptureGate};
pub use hold::{HoldTracker, HoldUpdate};
pub use progress::CaptureEvent;
pub use state::{CaptureSource, CaptureState, CapturedExtreme, Extreme};
