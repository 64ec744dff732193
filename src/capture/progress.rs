// Per-sample progress reported by a capture gate
//
// One CaptureEvent is produced for every sample a gate sees, carrying what a
// UI needs to render live feedback: current note, remaining time, countdown
// and the terminal outcome once there is one.

use serde::{Deserialize, Serialize};

use super::state::{CaptureState, CapturedExtreme, Extreme};
use crate::analysis::Rejection;
use crate::error::CaptureError;
use crate::note::{note_from_frequency, NoteInfo};

/// Live progress of one gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureEvent {
    /// Gate that produced the event
    pub extreme: Extreme,
    /// State after processing
    pub state: CaptureState,
    /// Time of the sample that produced the event, if any
    pub timestamp_ms: Option<u64>,
    /// Frequency of the sample when it passed the validity gate
    pub current_frequency_hz: Option<f32>,
    /// Note of `current_frequency_hz`
    pub current_note: Option<NoteInfo>,
    /// Remaining detection time while listening
    pub time_left_ms: Option<u64>,
    /// Remaining countdown ticks while counting down
    pub countdown_remaining: Option<u8>,
    /// Accumulated hold time of the current run
    pub held_ms: u64,
    /// Why the sample failed the validity gate, while listening
    pub rejection: Option<Rejection>,
    /// Accepted extreme, once captured
    pub captured: Option<CapturedExtreme>,
    /// Conflict or timeout reported by this sample
    pub error: Option<CaptureError>,
}

impl CaptureEvent {
    /// Create a bare event for `extreme` in `state`
    pub fn new(extreme: Extreme, state: CaptureState) -> Self {
        Self {
            extreme,
            state,
            timestamp_ms: None,
            current_frequency_hz: None,
            current_note: None,
            time_left_ms: None,
            countdown_remaining: None,
            held_ms: 0,
            rejection: None,
            captured: None,
            error: None,
        }
    }

    pub fn at(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Attach the current valid frequency and its note
    pub fn with_frequency(mut self, frequency_hz: f32) -> Self {
        self.current_frequency_hz = Some(frequency_hz);
        self.current_note = note_from_frequency(frequency_hz);
        self
    }

    pub fn with_time_left(mut self, time_left_ms: u64) -> Self {
        self.time_left_ms = Some(time_left_ms);
        self
    }

    pub fn with_countdown(mut self, remaining: u8) -> Self {
        self.countdown_remaining = Some(remaining);
        self
    }

    pub fn with_held(mut self, held_ms: u64) -> Self {
        self.held_ms = held_ms;
        self
    }

    pub fn with_rejection(mut self, rejection: Option<Rejection>) -> Self {
        self.rejection = rejection;
        self
    }

    pub fn with_captured(mut self, captured: Option<CapturedExtreme>) -> Self {
        self.captured = captured;
        self
    }

    pub fn with_error(mut self, error: Option<CaptureError>) -> Self {
        self.error = error;
        self
    }

    /// Check if the gate reached a terminal state with this event
    pub fn is_settled(&self) -> bool {
        self.state.is_terminal()
    }
}
