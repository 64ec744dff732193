//! Integration tests for the vocal range capture workflow
//!
//! These tests drive a SessionController end to end through its public API:
//! - Synthetic frame sources through the real McLeod detector
//! - Dropout tolerance and timeouts on the frame clock
//! - Cross-validation between the two extremes
//! - Manual overrides and finalization
//! - Progress broadcast and telemetry delivery
//!
//! Signals are generated in-process, so no audio hardware or fixtures on disk
//! are needed.

use std::sync::Arc;

use vocal_range::audio::{FrameRead, FrameSource, SyntheticFrameSource};
use vocal_range::capture::{CaptureSource, CaptureState, Extreme};
use vocal_range::classifier::VoiceType;
use vocal_range::config::{AppConfig, CaptureMode};
use vocal_range::error::{CaptureError, CaptureErrorCodes, ErrorCode};
use vocal_range::session::SessionController;
use vocal_range::telemetry::{null_sink, EngineEvent, TelemetryCollector};
use vocal_range::PitchSample;

const SAMPLE_RATE: u32 = 44_100;
const LISTEN_AT: u64 = 3_000;

fn session() -> SessionController {
    SessionController::new(AppConfig::default(), null_sink())
}

fn voiced(frequency_hz: f32, timestamp_ms: u64) -> PitchSample {
    PitchSample {
        frequency_hz: Some(frequency_hz),
        clarity: 0.95,
        volume: 0.1,
        timestamp_ms,
    }
}

/// Feed samples every 20 ms in [from_ms, to_ms)
fn feed(
    session: &mut SessionController,
    from_ms: u64,
    to_ms: u64,
    sample: impl Fn(u64) -> PitchSample,
) {
    let mut t = from_ms;
    while t < to_ms {
        session.process_sample(&sample(t));
        t += 20;
    }
}

/// Drive a full capture of one extreme from a synthetic tone
fn capture_tone(session: &mut SessionController, extreme: Extreme, frequency_hz: f32) {
    let mut source = SyntheticFrameSource::script(SAMPLE_RATE)
        .unwrap()
        .silence(3_000)
        .tone(frequency_hz, 0.4, 4_000);
    let event = session.run_source(&mut source, extreme).unwrap();
    assert_eq!(
        event.state,
        CaptureState::Captured,
        "{} at {} Hz did not capture: {:?}",
        extreme,
        frequency_hz,
        event.error
    );
}

/// Full workflow: sing both extremes, then finalize
///
/// Test steps:
/// 1. Capture the lowest note from an E2 tone
/// 2. Capture the highest note from an E4 tone
/// 3. Finalize and check ordering, span and voice type
#[test]
fn test_full_capture_workflow() {
    let mut session = session();

    capture_tone(&mut session, Extreme::Lowest, 82.41);
    capture_tone(&mut session, Extreme::Highest, 329.63);

    let range = session.finalize().unwrap();
    assert!(range.lowest.frequency_hz < range.highest.frequency_hz);
    assert_eq!(range.lowest.note.display_name, "E2");
    assert_eq!(range.highest.note.display_name, "E4");
    assert_eq!(range.lowest.source, CaptureSource::Sung);
    assert_eq!(range.semitones, 24);
    assert_eq!(range.octaves, 2.0);
    assert_eq!(range.voice_type, VoiceType::Bass);
}

/// A 300 ms gap inside a held note does not reset accumulation
#[test]
fn test_short_dropout_still_captures() {
    let mut session = session();
    session.start(Extreme::Lowest, 0);

    feed(&mut session, LISTEN_AT, LISTEN_AT + 1_500, |t| voiced(196.0, t));
    feed(&mut session, LISTEN_AT + 1_500, LISTEN_AT + 1_800, PitchSample::silent);
    feed(&mut session, LISTEN_AT + 1_800, LISTEN_AT + 3_400, |t| voiced(196.0, t));

    assert_eq!(
        session.gate(Extreme::Lowest).state(),
        CaptureState::Captured
    );
}

/// A 600 ms gap restarts the run; capture needs a fresh full hold
#[test]
fn test_long_dropout_resets_hold() {
    let mut session = session();
    session.start(Extreme::Lowest, 0);

    feed(&mut session, LISTEN_AT, LISTEN_AT + 1_500, |t| voiced(196.0, t));
    feed(&mut session, LISTEN_AT + 1_500, LISTEN_AT + 2_100, PitchSample::silent);
    feed(&mut session, LISTEN_AT + 2_100, LISTEN_AT + 3_700, |t| voiced(196.0, t));
    assert_eq!(
        session.gate(Extreme::Lowest).state(),
        CaptureState::Listening
    );

    feed(&mut session, LISTEN_AT + 3_700, LISTEN_AT + 5_120, |t| voiced(196.0, t));
    assert_eq!(
        session.gate(Extreme::Lowest).state(),
        CaptureState::Captured
    );
}

/// Silence for the whole window times out with NoAudioSignal
#[test]
fn test_silent_source_times_out() {
    let mut session = session();
    let mut source = SyntheticFrameSource::script(SAMPLE_RATE)
        .unwrap()
        .silence(20_000);

    let event = session.run_source(&mut source, Extreme::Highest).unwrap();
    assert_eq!(event.state, CaptureState::TimedOut);
    assert_eq!(
        event.error.map(|err| err.code()),
        Some(CaptureErrorCodes::NO_AUDIO_SIGNAL)
    );
    assert!(session.captured(Extreme::Highest).is_none());
}

/// Noise is never captured as a pitch
#[test]
fn test_noise_source_is_not_captured() {
    let mut session = session();
    let mut source = SyntheticFrameSource::script(SAMPLE_RATE)
        .unwrap()
        .white_noise(0.3, 20_000);

    let event = session.run_source(&mut source, Extreme::Lowest).unwrap();
    assert_eq!(event.state, CaptureState::TimedOut);
    assert!(session.captured(Extreme::Lowest).is_none());
}

/// Highest below an already captured lowest is a conflict, not a capture
#[test]
fn test_highest_below_lowest_conflicts() {
    let mut session = session();
    capture_tone(&mut session, Extreme::Lowest, 300.0);

    session.start(Extreme::Highest, 0);
    let mut conflict = None;
    let mut t = LISTEN_AT;
    while t < LISTEN_AT + 3_100 {
        for event in session.process_sample(&voiced(200.0, t)) {
            if event.error.is_some() {
                conflict = event.error;
            }
        }
        t += 20;
    }

    assert!(matches!(
        conflict,
        Some(CaptureError::RangeConflict {
            extreme: Extreme::Highest,
            ..
        })
    ));
    assert_eq!(
        session.gate(Extreme::Highest).state(),
        CaptureState::Listening
    );
    assert!(session.captured(Extreme::Highest).is_none());
}

/// Manual override replaces a missing sung extreme
#[test]
fn test_manual_override_then_finalize() {
    let mut session = session();
    capture_tone(&mut session, Extreme::Lowest, 130.81);

    let manual = session
        .provide_manual_pitch(Extreme::Highest, 523.25)
        .unwrap();
    assert_eq!(manual.source, CaptureSource::Manual);
    assert_eq!(manual.note.display_name, "C5");

    let range = session.finalize().unwrap();
    assert_eq!(range.semitones, 24);
    assert_eq!(range.lowest.note.display_name, "C3");
}

/// reset discards the captured extreme; finalize then fails
#[test]
fn test_reset_discards_capture() {
    let mut session = session();
    session
        .provide_manual_pitch(Extreme::Lowest, 110.0)
        .unwrap();
    session
        .provide_manual_pitch(Extreme::Highest, 440.0)
        .unwrap();
    assert!(session.finalize().is_ok());

    session.reset(Extreme::Highest);
    let err = session.finalize().unwrap_err();
    assert_eq!(err.code(), CaptureErrorCodes::INVALID_FINALIZE);
}

/// Frames pushed explicitly follow the same path as run_source
#[test]
fn test_explicit_frame_processing() {
    let mut session = session();
    let mut source = SyntheticFrameSource::script(SAMPLE_RATE)
        .unwrap()
        .tone(246.94, 0.3, 8_000);
    let mut frame = vec![0.0f32; 2048];
    let mut samples: u64 = 0;

    session.start(Extreme::Highest, 0);
    while let FrameRead::Data { frames_written, .. } = source.read_frame(&mut frame) {
        let timestamp_ms = samples * 1000 / SAMPLE_RATE as u64;
        samples += frames_written as u64;
        session.process_frame(&frame, SAMPLE_RATE, timestamp_ms);
    }

    let captured = session.captured(Extreme::Highest).unwrap();
    assert_eq!(captured.note.display_name, "B3");
}

/// Sequential mode never lets both gates listen at once
#[test]
fn test_sequential_mode_single_listener() {
    let mut session = session();
    assert_eq!(session.config().capture.mode, CaptureMode::Sequential);

    session.start(Extreme::Lowest, 0);
    feed(&mut session, LISTEN_AT, LISTEN_AT + 1_000, |t| voiced(110.0, t));
    session.start(Extreme::Highest, LISTEN_AT + 1_000);

    assert_eq!(session.gate(Extreme::Lowest).state(), CaptureState::Idle);
    assert_eq!(session.gate(Extreme::Lowest).held_ms(), 0);
    assert!(session.gate(Extreme::Highest).state().is_active());
}

/// Telemetry sink sees every transition of a capture
#[test]
fn test_telemetry_records_capture_lifecycle() {
    let collector = Arc::new(TelemetryCollector::new(64, 256));
    let mut session = SessionController::new(AppConfig::default(), collector.clone());

    session.start(Extreme::Lowest, 0);
    feed(&mut session, LISTEN_AT, LISTEN_AT + 1_000, |t| voiced(110.0, t));
    feed(&mut session, LISTEN_AT + 1_000, LISTEN_AT + 1_700, PitchSample::silent);
    feed(&mut session, LISTEN_AT + 1_700, LISTEN_AT + 4_720, |t| voiced(110.0, t));

    let recent = collector.snapshot().recent;
    assert!(recent
        .iter()
        .any(|event| matches!(event, EngineEvent::RunRestarted { gap_ms, .. } if *gap_ms > 500)));
    assert!(recent.iter().any(|event| matches!(
        event,
        EngineEvent::Captured {
            extreme: Extreme::Lowest,
            source: CaptureSource::Sung,
            ..
        }
    )));
    assert!(matches!(
        recent.last(),
        Some(EngineEvent::StateChanged {
            to: CaptureState::Captured,
            ..
        })
    ));
}

/// Progress events reach async subscribers
#[tokio::test]
async fn test_progress_broadcast() {
    let mut session = session();
    let mut rx = session.subscribe();

    session.start(Extreme::Lowest, 0);
    feed(&mut session, LISTEN_AT, LISTEN_AT + 3_020, |t| voiced(98.0, t));

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    let last = last.unwrap();
    assert_eq!(last.state, CaptureState::Captured);
    assert_eq!(last.captured.unwrap().note.display_name, "G2");
}
