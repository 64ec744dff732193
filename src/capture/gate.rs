// CaptureGate - one extreme's capture state machine
//
// A gate is parametrised by the extreme it seeks and is driven purely by the
// samples handed to it, each stamped with its frame time. Workflow:
// 1. start() arms a countdown; samples during the lead-in are ignored
// 2. Listening accumulates dropout-tolerant hold time over valid samples
// 3. Once the hold reaches min_hold_ms the robust extremum of the window is
//    cross-validated against the paired extreme and captured
// 4. Without a capture inside max_detection_ms the gate times out
//
// Terminal states (Captured, TimedOut, Error) are only left through reset()
// or a fresh start().

use std::sync::Arc;

use tracing::{debug, info};

use super::extremum::robust_extremum;
use super::hold::{HoldTracker, HoldUpdate};
use super::progress::CaptureEvent;
use super::state::{CaptureSource, CaptureState, CapturedExtreme, Extreme};
use crate::analysis::{PitchSample, VoiceGate};
use crate::config::CaptureConfig;
use crate::error::{log_capture_error, CaptureError, ErrorCode};
use crate::note::note_from_frequency;
use crate::telemetry::{null_sink, EngineEvent, EventSink};

/// Check that `candidate_hz` lies strictly beyond the paired extreme.
///
/// # Arguments
/// * `extreme` - Extreme the candidate is for
/// * `candidate_hz` - Frequency about to be captured
/// * `paired` - Captured extreme of the other gate, if any
///
/// # Returns
/// * `Ok(())` - No paired extreme, or the ordering holds
/// * `Err(CaptureError::RangeConflict)` - Ordering violated; names both notes
pub fn cross_validate(
    extreme: Extreme,
    candidate_hz: f32,
    paired: Option<&CapturedExtreme>,
) -> Result<(), CaptureError> {
    let Some(paired) = paired else {
        return Ok(());
    };
    if extreme.is_beyond(candidate_hz, paired.frequency_hz) {
        return Ok(());
    }

    Err(CaptureError::RangeConflict {
        extreme,
        candidate_note: note_from_frequency(candidate_hz)
            .map(|note| note.display_name)
            .unwrap_or_else(|| format!("{:.1} Hz", candidate_hz)),
        candidate_hz,
        paired_note: paired.note.display_name.clone(),
        paired_hz: paired.frequency_hz,
    })
}

/// Capture gate for a single extreme
pub struct CaptureGate {
    extreme: Extreme,
    config: CaptureConfig,
    voice_gate: VoiceGate,
    sink: Arc<dyn EventSink>,
    state: CaptureState,
    countdown_started_ms: Option<u64>,
    listening_started_ms: Option<u64>,
    hold: HoldTracker,
    captured: Option<CapturedExtreme>,
    last_error: Option<CaptureError>,
    last_timestamp_ms: Option<u64>,
    last_sample_valid: bool,
}

impl CaptureGate {
    /// Create a new gate in `Idle`
    ///
    /// # Arguments
    /// * `extreme` - Which end of the range to search for
    /// * `config` - Timing and extremum parameters
    /// * `voice_gate` - Validity gate applied to every sample
    /// * `sink` - Receiver of lifecycle telemetry
    pub fn new(
        extreme: Extreme,
        config: CaptureConfig,
        voice_gate: VoiceGate,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            extreme,
            config,
            voice_gate,
            sink,
            state: CaptureState::Idle,
            countdown_started_ms: None,
            listening_started_ms: None,
            hold: HoldTracker::new(),
            captured: None,
            last_error: None,
            last_timestamp_ms: None,
            last_sample_valid: false,
        }
    }

    /// Gate with default configuration and no telemetry
    pub fn with_defaults(extreme: Extreme) -> Self {
        Self::new(
            extreme,
            CaptureConfig::default(),
            VoiceGate::default(),
            null_sink(),
        )
    }

    pub fn extreme(&self) -> Extreme {
        self.extreme
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Accepted extreme, sung or manual
    pub fn captured(&self) -> Option<&CapturedExtreme> {
        self.captured.as_ref()
    }

    /// Most recent conflict or timeout
    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }

    /// Accumulated hold time of the current run
    pub fn held_ms(&self) -> u64 {
        self.hold.held_ms()
    }

    /// Begin an attempt at `now_ms`.
    ///
    /// Any previous attempt, capture or error is discarded and all timers are
    /// re-armed.
    pub fn start(&mut self, now_ms: u64) -> CaptureEvent {
        if self.state != CaptureState::Idle {
            info!(
                "[CaptureGate] {} restarting from {:?}",
                self.extreme, self.state
            );
        }

        self.clear_attempt();
        self.captured = None;
        self.last_error = None;
        self.last_timestamp_ms = Some(now_ms);
        self.countdown_started_ms = Some(now_ms);

        if self.config.countdown_ms() == 0 {
            self.enter_listening(now_ms);
            return self
                .event(now_ms)
                .with_time_left(self.config.max_detection_ms);
        }

        self.transition(CaptureState::CountingDown, Some(now_ms));
        self.event(now_ms)
            .with_countdown(self.config.countdown_ticks)
    }

    /// Halt an in-progress attempt.
    ///
    /// An already captured extreme is kept; accumulation is discarded.
    pub fn stop(&mut self) -> CaptureEvent {
        if self.state.is_active() {
            self.clear_attempt();
            self.transition(CaptureState::Idle, self.last_timestamp_ms);
        }
        self.snapshot()
    }

    /// Discard everything and return to `Idle`
    pub fn reset(&mut self) -> CaptureEvent {
        self.clear_attempt();
        self.captured = None;
        self.last_error = None;
        self.transition(CaptureState::Idle, self.last_timestamp_ms);
        self.snapshot()
    }

    /// Feed one sample.
    ///
    /// # Arguments
    /// * `sample` - Estimator output stamped with its frame time
    /// * `paired` - The other gate's captured extreme, for cross-validation
    ///
    /// # Returns
    /// Progress after the sample. Idle and terminal gates do not consume it.
    pub fn process(
        &mut self,
        sample: &PitchSample,
        paired: Option<&CapturedExtreme>,
    ) -> CaptureEvent {
        let now_ms = sample.timestamp_ms;

        match self.state {
            CaptureState::CountingDown => {
                let started = self.countdown_started_ms.unwrap_or(now_ms);
                let elapsed = now_ms.saturating_sub(started);
                let countdown_ms = self.config.countdown_ms();

                if elapsed < countdown_ms {
                    self.last_timestamp_ms = Some(now_ms);
                    let remaining_ms = countdown_ms - elapsed;
                    let ticks = remaining_ms.div_ceil(self.config.tick_ms.max(1));
                    return self
                        .event(now_ms)
                        .with_countdown(ticks.min(u8::MAX as u64) as u8);
                }

                self.enter_listening(now_ms);
                self.listen(sample, paired)
            }
            CaptureState::Listening => self.listen(sample, paired),
            CaptureState::Idle
            | CaptureState::Captured
            | CaptureState::TimedOut
            | CaptureState::Error => self.snapshot(),
        }
    }

    /// Accept a manually supplied extreme.
    ///
    /// Bypasses listening entirely. The frequency must map to a note and pass
    /// cross-validation; a conflict moves the gate to `Error`.
    pub fn set_manual(
        &mut self,
        frequency_hz: f32,
        paired: Option<&CapturedExtreme>,
    ) -> Result<CapturedExtreme, CaptureError> {
        let Some(candidate) = CapturedExtreme::from_frequency(frequency_hz, CaptureSource::Manual)
        else {
            let err = CaptureError::InvalidManualPitch { frequency_hz };
            log_capture_error(&err, "CaptureGate::set_manual");
            self.publish_manual(frequency_hz, false);
            return Err(err);
        };

        if let Err(err) = cross_validate(self.extreme, frequency_hz, paired) {
            log_capture_error(&err, "CaptureGate::set_manual");
            self.clear_attempt();
            self.captured = None;
            self.publish_manual(frequency_hz, false);
            self.publish_rejected(&err);
            self.last_error = Some(err.clone());
            self.transition(CaptureState::Error, self.last_timestamp_ms);
            return Err(err);
        }

        info!(
            "[CaptureGate] {} manual pitch {:.2} Hz ({})",
            self.extreme, frequency_hz, candidate.note
        );
        self.clear_attempt();
        self.last_error = None;
        self.captured = Some(candidate.clone());
        self.publish_manual(frequency_hz, true);
        self.publish_captured(&candidate);
        self.transition(CaptureState::Captured, self.last_timestamp_ms);
        Ok(candidate)
    }

    fn listen(&mut self, sample: &PitchSample, paired: Option<&CapturedExtreme>) -> CaptureEvent {
        let now_ms = sample.timestamp_ms;
        self.last_timestamp_ms = Some(now_ms);

        let started = self.listening_started_ms.unwrap_or(now_ms);
        let elapsed = now_ms.saturating_sub(started);
        let max_ms = self.config.max_detection_ms;
        if elapsed > max_ms {
            return self.time_out(now_ms);
        }

        let mut conflict = None;
        let (frequency_hz, rejection) = match self.voice_gate.check(sample) {
            Ok(frequency_hz) => (Some(frequency_hz), None),
            Err(rejection) => (None, Some(rejection)),
        };

        if let Some(frequency_hz) = frequency_hz {
            self.last_sample_valid = true;
            let update = self.hold.record_valid(
                now_ms,
                frequency_hz,
                self.config.dropout_tolerance_ms,
                self.config.min_hold_ms,
            );
            if let HoldUpdate::Restarted { gap_ms } = update {
                debug!(
                    "[CaptureGate] {} run restarted after {} ms gap",
                    self.extreme, gap_ms
                );
                self.sink.publish(EngineEvent::RunRestarted {
                    extreme: self.extreme,
                    gap_ms,
                    timestamp_ms: now_ms,
                });
            }

            if self.hold.held_ms() >= self.config.min_hold_ms {
                match self.try_capture(now_ms, paired) {
                    Ok(()) => return self.event(now_ms).with_frequency(frequency_hz),
                    Err(err) => conflict = Some(err),
                }
            }
        } else if let Some(reason) = rejection {
            if self.last_sample_valid {
                self.sink.publish(EngineEvent::SampleRejected {
                    extreme: self.extreme,
                    reason,
                    timestamp_ms: now_ms,
                });
            }
            self.last_sample_valid = false;
        }

        if elapsed >= max_ms {
            return self.time_out(now_ms);
        }

        let mut event = self
            .event(now_ms)
            .with_time_left(max_ms - elapsed)
            .with_rejection(rejection)
            .with_error(conflict);
        if let Some(frequency_hz) = frequency_hz {
            event = event.with_frequency(frequency_hz);
        }
        event
    }

    fn try_capture(
        &mut self,
        now_ms: u64,
        paired: Option<&CapturedExtreme>,
    ) -> Result<(), CaptureError> {
        let window = self.hold.window(now_ms, self.config.min_hold_ms);
        let captured = robust_extremum(&window, self.extreme, &self.config)
            .and_then(|frequency_hz| {
                CapturedExtreme::from_frequency(frequency_hz, CaptureSource::Sung)
            })
            .ok_or(CaptureError::UnstablePitch {
                held_ms: self.hold.held_ms(),
                required_ms: self.config.min_hold_ms,
            })?;

        if let Err(err) = cross_validate(self.extreme, captured.frequency_hz, paired) {
            log_capture_error(&err, "CaptureGate::process");
            self.hold.discard_run();
            self.publish_rejected(&err);
            self.last_error = Some(err.clone());
            return Err(err);
        }

        info!(
            "[CaptureGate] {} captured {} ({:.2} Hz) from {} samples",
            self.extreme,
            captured.note,
            captured.frequency_hz,
            window.len()
        );
        self.last_error = None;
        self.captured = Some(captured.clone());
        self.publish_captured(&captured);
        self.transition(CaptureState::Captured, Some(now_ms));
        Ok(())
    }

    fn time_out(&mut self, now_ms: u64) -> CaptureEvent {
        // A held note that kept conflicting is reported as the conflict
        let err = if let Some(conflict @ CaptureError::RangeConflict { .. }) =
            self.last_error.take()
        {
            conflict
        } else if self.hold.valid_samples() == 0 {
            CaptureError::NoAudioSignal {
                window_ms: self.config.max_detection_ms,
            }
        } else {
            CaptureError::UnstablePitch {
                held_ms: self.hold.longest_hold_ms(),
                required_ms: self.config.min_hold_ms,
            }
        };

        log_capture_error(&err, "CaptureGate::process");
        self.publish_rejected(&err);
        self.last_error = Some(err);
        self.transition(CaptureState::TimedOut, Some(now_ms));
        self.event(now_ms).with_time_left(0)
    }

    fn enter_listening(&mut self, now_ms: u64) {
        self.listening_started_ms = Some(now_ms);
        self.transition(CaptureState::Listening, Some(now_ms));
    }

    fn clear_attempt(&mut self) {
        self.hold.reset();
        self.countdown_started_ms = None;
        self.listening_started_ms = None;
        self.last_sample_valid = false;
    }

    fn transition(&mut self, to: CaptureState, timestamp_ms: Option<u64>) {
        let from = self.state;
        if from == to {
            return;
        }
        info!("[CaptureGate] {} {:?} -> {:?}", self.extreme, from, to);
        self.state = to;
        self.sink.publish(EngineEvent::StateChanged {
            extreme: self.extreme,
            from,
            to,
            timestamp_ms,
        });
    }

    fn publish_captured(&self, captured: &CapturedExtreme) {
        self.sink.publish(EngineEvent::Captured {
            extreme: self.extreme,
            frequency_hz: captured.frequency_hz,
            note: captured.note.display_name.clone(),
            source: captured.source,
        });
    }

    fn publish_rejected(&self, err: &CaptureError) {
        self.sink.publish(EngineEvent::Rejected {
            extreme: self.extreme,
            code: err.code(),
            message: err.message(),
        });
    }

    fn publish_manual(&self, frequency_hz: f32, accepted: bool) {
        self.sink.publish(EngineEvent::ManualPitch {
            extreme: self.extreme,
            frequency_hz,
            accepted,
        });
    }

    fn event(&self, now_ms: u64) -> CaptureEvent {
        let event = CaptureEvent::new(self.extreme, self.state)
            .at(now_ms)
            .with_held(self.hold.held_ms())
            .with_captured(self.captured.clone());
        if self.state.is_terminal() {
            event.with_error(self.last_error.clone())
        } else {
            event
        }
    }

    /// Progress of the gate as of its last sample, without consuming one
    pub fn snapshot(&self) -> CaptureEvent {
        match self.last_timestamp_ms {
            Some(now_ms) => self.event(now_ms),
            None => CaptureEvent::new(self.extreme, self.state)
                .with_captured(self.captured.clone()),
        }
    }
}
