//! Engine event types published to telemetry sinks.

use serde::{Deserialize, Serialize};

use crate::analysis::Rejection;
use crate::capture::{CaptureSource, CaptureState, Extreme};

/// Structured engine events covering gate lifecycle and capture outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EngineEvent {
    StateChanged {
        extreme: Extreme,
        from: CaptureState,
        to: CaptureState,
        timestamp_ms: Option<u64>,
    },
    /// A valid sample arrived after a gap longer than the dropout tolerance
    RunRestarted {
        extreme: Extreme,
        gap_ms: u64,
        timestamp_ms: u64,
    },
    Captured {
        extreme: Extreme,
        frequency_hz: f32,
        note: String,
        source: CaptureSource,
    },
    Rejected {
        extreme: Extreme,
        code: i32,
        message: String,
    },
    ManualPitch {
        extreme: Extreme,
        frequency_hz: f32,
        accepted: bool,
    },
    /// First invalid sample after a valid one, with the failing check
    SampleRejected {
        extreme: Extreme,
        reason: Rejection,
        timestamp_ms: u64,
    },
}

impl EngineEvent {
    /// Extreme the event concerns
    pub fn extreme(&self) -> Extreme {
        match self {
            EngineEvent::StateChanged { extreme, .. }
            | EngineEvent::RunRestarted { extreme, .. }
            | EngineEvent::Captured { extreme, .. }
            | EngineEvent::Rejected { extreme, .. }
            | EngineEvent::ManualPitch { extreme, .. }
            | EngineEvent::SampleRejected { extreme, .. } => *extreme,
        }
    }
}
