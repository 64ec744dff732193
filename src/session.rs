// SessionController - one vocal range capture session
//
// Owns the pitch detector and the two capture gates sharing a single frame
// stream. Frames are pushed explicitly through process_frame(); every active
// gate sees the resulting sample along with the other gate's captured
// extreme for cross-validation. Per-sample progress is returned to the caller
// and also broadcast to subscribers.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::analysis::{analyze_frame, McLeodDetector, PitchDetector, PitchSample, VoiceGate};
use crate::audio::{FrameRead, FrameSource};
use crate::capture::{CaptureEvent, CaptureGate, CapturedExtreme, Extreme};
use crate::classifier::VocalRangeResult;
use crate::config::{AppConfig, CaptureMode};
use crate::error::{log_audio_error, log_capture_error, AudioError, CaptureError};
use crate::telemetry::EventSink;

/// Capacity of the progress broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Coordinates the lowest and highest capture gates
pub struct SessionController {
    config: AppConfig,
    detector: Box<dyn PitchDetector>,
    lowest: CaptureGate,
    highest: CaptureGate,
    events_tx: broadcast::Sender<CaptureEvent>,
}

impl SessionController {
    /// Create a session using the McLeod detector
    pub fn new(config: AppConfig, sink: Arc<dyn EventSink>) -> Self {
        let detector = Box::new(McLeodDetector::new(config.estimator.clone()));
        Self::with_detector(config, sink, detector)
    }

    /// Create a session with a custom detector
    pub fn with_detector(
        config: AppConfig,
        sink: Arc<dyn EventSink>,
        detector: Box<dyn PitchDetector>,
    ) -> Self {
        let voice_gate = VoiceGate::new(config.voice_gate.clone());
        let lowest = CaptureGate::new(
            Extreme::Lowest,
            config.capture.clone(),
            voice_gate.clone(),
            sink.clone(),
        );
        let highest = CaptureGate::new(Extreme::Highest, config.capture.clone(), voice_gate, sink);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config,
            detector,
            lowest,
            highest,
            events_tx,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn gate(&self, extreme: Extreme) -> &CaptureGate {
        match extreme {
            Extreme::Lowest => &self.lowest,
            Extreme::Highest => &self.highest,
        }
    }

    /// Captured extreme of `extreme`, if any
    pub fn captured(&self, extreme: Extreme) -> Option<&CapturedExtreme> {
        self.gate(extreme).captured()
    }

    /// Subscribe to per-sample progress of both gates
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events_tx.subscribe()
    }

    // Target gate plus the other gate's captured extreme
    fn split(&mut self, extreme: Extreme) -> (&mut CaptureGate, Option<&CapturedExtreme>) {
        match extreme {
            Extreme::Lowest => (&mut self.lowest, self.highest.captured()),
            Extreme::Highest => (&mut self.highest, self.lowest.captured()),
        }
    }

    fn gate_mut(&mut self, extreme: Extreme) -> &mut CaptureGate {
        self.split(extreme).0
    }

    fn emit(&self, event: CaptureEvent) -> CaptureEvent {
        // No subscribers is fine
        let _ = self.events_tx.send(event.clone());
        event
    }

    /// Start capturing `extreme` at `now_ms`.
    ///
    /// In sequential mode an in-progress attempt on the other extreme is
    /// stopped first so only one gate listens at a time.
    pub fn start(&mut self, extreme: Extreme, now_ms: u64) -> CaptureEvent {
        if self.config.capture.mode == CaptureMode::Sequential
            && self.gate(extreme.paired()).state().is_active()
        {
            info!(
                "[Session] sequential mode: stopping {} to start {}",
                extreme.paired(),
                extreme
            );
            let stopped = self.gate_mut(extreme.paired()).stop();
            self.emit(stopped);
        }

        info!("[Session] start {} at {} ms", extreme, now_ms);
        let event = self.gate_mut(extreme).start(now_ms);
        self.emit(event)
    }

    /// Halt an in-progress attempt; a captured extreme is kept
    pub fn stop(&mut self, extreme: Extreme) -> CaptureEvent {
        let event = self.gate_mut(extreme).stop();
        self.emit(event)
    }

    /// Discard everything about `extreme`
    pub fn reset(&mut self, extreme: Extreme) -> CaptureEvent {
        let event = self.gate_mut(extreme).reset();
        self.emit(event)
    }

    /// Accept a manually supplied extreme, subject to cross-validation
    pub fn provide_manual_pitch(
        &mut self,
        extreme: Extreme,
        frequency_hz: f32,
    ) -> Result<CapturedExtreme, CaptureError> {
        let (gate, paired) = self.split(extreme);
        let result = gate.set_manual(frequency_hz, paired);
        self.emit(self.gate(extreme).snapshot());
        result
    }

    /// Estimate one frame and feed it to every active gate.
    ///
    /// Frames arriving while no gate is active are not analysed.
    pub fn process_frame(
        &mut self,
        frame: &[f32],
        sample_rate: u32,
        timestamp_ms: u64,
    ) -> Vec<CaptureEvent> {
        if !self.lowest.state().is_active() && !self.highest.state().is_active() {
            return Vec::new();
        }
        let sample = analyze_frame(self.detector.as_mut(), frame, sample_rate, timestamp_ms);
        self.process_sample(&sample)
    }

    /// Feed an already estimated sample to every active gate
    pub fn process_sample(&mut self, sample: &PitchSample) -> Vec<CaptureEvent> {
        let mut events = Vec::with_capacity(2);
        for extreme in [Extreme::Lowest, Extreme::Highest] {
            if !self.gate(extreme).state().is_active() {
                continue;
            }
            let (gate, paired) = self.split(extreme);
            let event = gate.process(sample, paired);
            events.push(self.emit(event));
        }
        events
    }

    /// Build the final result from both captured extremes.
    ///
    /// # Errors
    /// `InvalidFinalize` if either extreme is missing or they are not
    /// strictly ordered.
    pub fn finalize(&self) -> Result<VocalRangeResult, CaptureError> {
        let missing = |extreme: Extreme| CaptureError::InvalidFinalize {
            reason: format!("{} note has not been captured", extreme),
        };

        let result = match (self.lowest.captured(), self.highest.captured()) {
            (Some(lowest), Some(highest)) => {
                VocalRangeResult::new(lowest.clone(), highest.clone(), &self.config.classifier)
            }
            (None, _) => Err(missing(Extreme::Lowest)),
            (_, None) => Err(missing(Extreme::Highest)),
        };

        match &result {
            Ok(range) => info!(
                "[Session] finalized {} - {}: {} ({} semitones)",
                range.lowest.note, range.highest.note, range.voice_type, range.semitones
            ),
            Err(err) => log_capture_error(err, "SessionController::finalize"),
        }
        result
    }

    /// Capture `extreme` from a frame source.
    ///
    /// Starts the gate at the beginning of the stream and stamps each frame
    /// with the time of its first sample. Returns the gate's last event once
    /// it settles or the source runs out.
    pub fn run_source(
        &mut self,
        source: &mut dyn FrameSource,
        extreme: Extreme,
    ) -> Result<CaptureEvent, AudioError> {
        let sample_rate = source.sample_rate();
        if sample_rate == 0 {
            let err = AudioError::InvalidSampleRate { sample_rate };
            log_audio_error(&err, "SessionController::run_source");
            return Err(err);
        }

        let mut frame = vec![0.0f32; self.config.audio.frame_size.max(1)];
        let mut samples_consumed: u64 = 0;
        let mut last = self.start(extreme, 0);

        loop {
            let frames_written = match source.read_frame(&mut frame) {
                FrameRead::Data { frames_written, .. } => frames_written,
                FrameRead::Finished => break,
            };

            let timestamp_ms = samples_consumed * 1000 / sample_rate as u64;
            samples_consumed += frames_written as u64;

            if let Some(event) = self
                .process_frame(&frame, sample_rate, timestamp_ms)
                .into_iter()
                .find(|event| event.extreme == extreme)
            {
                last = event;
            }
            if !self.gate(extreme).state().is_active() {
                break;
            }
        }

        debug!(
            "[Session] run_source {} ended in {:?} after {} samples",
            extreme, last.state, samples_consumed
        );
        Ok(last)
    }
}
