//! Engine telemetry sinks.
//!
//! Gates and the session report lifecycle transitions through an
//! [`EventSink`]. The collector keeps a bounded history plus an async
//! broadcast stream; the tracing sink forwards events to `tracing`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

pub mod events;

pub use events::EngineEvent;

/// Destination for engine events.
///
/// Implementations must not block; they are called on the frame path.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: EngineEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: EngineEvent) {}
}

/// Shared sink that discards every event.
pub fn null_sink() -> Arc<dyn EventSink> {
    Arc::new(NullSink)
}

/// Sink forwarding events to `tracing` at a level matching their weight.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: EngineEvent) {
        match &event {
            EngineEvent::Captured {
                extreme,
                frequency_hz,
                note,
                source,
            } => tracing::info!(
                ?extreme,
                frequency_hz,
                note = note.as_str(),
                ?source,
                "[Telemetry] extreme captured"
            ),
            EngineEvent::Rejected {
                extreme,
                code,
                message,
            } => tracing::warn!(?extreme, code, reason = message.as_str(), "[Telemetry] rejected"),
            EngineEvent::SampleRejected { .. } => {
                tracing::trace!(event = ?event, "[Telemetry] sample rejected")
            }
            _ => tracing::debug!(event = ?event, "[Telemetry] engine event"),
        }
    }
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<EngineEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of engine events.
pub struct TelemetryCollector {
    tx: broadcast::Sender<EngineEvent>,
    history: Mutex<VecDeque<EngineEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self.lock_history();
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }

    fn lock_history(&self) -> MutexGuard<'_, VecDeque<EngineEvent>> {
        // A panicking publisher cannot leave the deque half-updated
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for TelemetryCollector {
    fn publish(&self, event: EngineEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if self.history_capacity > 0 {
            let mut history = self.lock_history();
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        // No subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}
