// Capture state and captured-extreme types
//
// A CaptureGate moves through:
//   Idle -> CountingDown -> Listening -> Captured | TimedOut | Error
// and only returns to Idle through an explicit reset (or stop while active).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::note::{note_from_frequency, NoteInfo};

/// Which end of the range a gate searches for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extreme {
    Lowest,
    Highest,
}

impl Extreme {
    /// The extreme a capture is cross-validated against
    pub fn paired(&self) -> Extreme {
        match self {
            Extreme::Lowest => Extreme::Highest,
            Extreme::Highest => Extreme::Lowest,
        }
    }

    /// Whether `candidate` is strictly beyond `reference` in this direction
    pub fn is_beyond(&self, candidate: f32, reference: f32) -> bool {
        match self {
            Extreme::Lowest => candidate < reference,
            Extreme::Highest => candidate > reference,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Extreme::Lowest => "Lowest",
            Extreme::Highest => "Highest",
        }
    }
}

impl fmt::Display for Extreme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Lifecycle state of one capture gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    /// Waiting for a start command
    Idle,
    /// Lead-in before listening; samples are ignored
    CountingDown,
    /// Consuming samples and accumulating hold time
    Listening,
    /// Extreme accepted
    Captured,
    /// Detection window elapsed without a capture
    TimedOut,
    /// Manual extreme rejected by cross-validation
    Error,
}

impl CaptureState {
    /// Whether the gate is mid-attempt and consuming time
    pub fn is_active(&self) -> bool {
        matches!(self, CaptureState::CountingDown | CaptureState::Listening)
    }

    /// Whether only a reset leaves this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CaptureState::Captured | CaptureState::TimedOut | CaptureState::Error
        )
    }
}

/// How an extreme was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    /// Held by the singer and accepted by the gate
    Sung,
    /// Supplied directly by the UI
    Manual,
}

/// An accepted lowest or highest pitch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedExtreme {
    pub note: NoteInfo,
    pub frequency_hz: f32,
    pub source: CaptureSource,
}

impl CapturedExtreme {
    /// Build from a frequency; `None` for non-positive or non-finite input
    pub fn from_frequency(frequency_hz: f32, source: CaptureSource) -> Option<Self> {
        note_from_frequency(frequency_hz).map(|note| Self {
            note,
            frequency_hz,
            source,
        })
    }
}
