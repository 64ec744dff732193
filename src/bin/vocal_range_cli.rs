use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use vocal_range::analysis::{analyze_frame, McLeodDetector, VoiceGate};
use vocal_range::audio::{FrameRead, FrameSource, SyntheticFrameSource, WavFrameSource};
use vocal_range::capture::{CaptureState, Extreme};
use vocal_range::config::AppConfig;
use vocal_range::note::{midi_to_frequency, note_from_frequency, parse_note_name, NoteInfo};
use vocal_range::session::SessionController;
use vocal_range::telemetry::{null_sink, EventSink, TelemetryCollector};

#[derive(Parser, Debug)]
#[command(
    name = "vocal_range_cli",
    about = "Offline harness for the vocal range capture engine"
)]
struct Cli {
    /// JSON config file (defaults to assets/vocal_range_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Map a frequency to its note
    Note { frequency_hz: f32 },
    /// Print per-frame pitch estimates for a WAV file as JSON lines
    Pitch {
        #[arg(long)]
        wav: PathBuf,
    },
    /// Capture one extreme from a WAV file or a synthetic tone
    Capture {
        #[arg(long, conflicts_with = "tone", required_unless_present = "tone")]
        wav: Option<PathBuf>,
        /// Synthetic tone frequency, played after the countdown
        #[arg(long)]
        tone: Option<f32>,
        #[arg(long, default_value_t = 4_000)]
        tone_ms: u64,
        #[arg(long, value_enum)]
        extreme: ExtremeArg,
        /// Also print engine telemetry events as JSON lines
        #[arg(long)]
        events: bool,
    },
    /// Classify a range from two manual extremes (note names or Hz)
    Classify {
        #[arg(long)]
        lowest: String,
        #[arg(long)]
        highest: String,
    },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum ExtremeArg {
    Lowest,
    Highest,
}

impl From<ExtremeArg> for Extreme {
    fn from(arg: ExtremeArg) -> Self {
        match arg {
            ExtremeArg::Lowest => Extreme::Lowest,
            ExtremeArg::Highest => Extreme::Highest,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Note { frequency_hz } => run_note(frequency_hz),
        Commands::Pitch { wav } => run_pitch(&config, wav),
        Commands::Capture {
            wav,
            tone,
            tone_ms,
            extreme,
            events,
        } => run_capture(config, wav, tone, tone_ms, extreme.into(), events),
        Commands::Classify { lowest, highest } => run_classify(config, &lowest, &highest),
    }
}

fn run_note(frequency_hz: f32) -> Result<ExitCode> {
    let note = note_from_frequency(frequency_hz)
        .ok_or_else(|| anyhow!("{} is not a positive frequency", frequency_hz))?;
    println!("{}", serde_json::to_string(&note)?);
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct PitchLine {
    timestamp_ms: u64,
    frequency_hz: Option<f32>,
    clarity: f32,
    volume: f32,
    valid: bool,
    note: Option<NoteInfo>,
}

fn run_pitch(config: &AppConfig, wav: PathBuf) -> Result<ExitCode> {
    let mut source =
        WavFrameSource::open(&wav).with_context(|| format!("opening {}", wav.display()))?;
    let sample_rate = source.sample_rate();
    let mut detector = McLeodDetector::new(config.estimator.clone());
    let voice_gate = VoiceGate::new(config.voice_gate.clone());

    let mut frame = vec![0.0f32; config.audio.frame_size.max(1)];
    let mut samples_consumed: u64 = 0;
    while let FrameRead::Data { frames_written, .. } = source.read_frame(&mut frame) {
        let timestamp_ms = samples_consumed * 1000 / sample_rate as u64;
        samples_consumed += frames_written as u64;

        let sample = analyze_frame(&mut detector, &frame, sample_rate, timestamp_ms);
        let valid = voice_gate.valid_frequency(&sample);
        let line = PitchLine {
            timestamp_ms,
            frequency_hz: sample.frequency_hz,
            clarity: sample.clarity,
            volume: sample.volume,
            valid: valid.is_some(),
            note: valid.and_then(note_from_frequency),
        };
        println!("{}", serde_json::to_string(&line)?);
    }

    Ok(ExitCode::from(0))
}

fn run_capture(
    config: AppConfig,
    wav: Option<PathBuf>,
    tone: Option<f32>,
    tone_ms: u64,
    extreme: Extreme,
    print_events: bool,
) -> Result<ExitCode> {
    let mut source: Box<dyn FrameSource> = match (wav, tone) {
        (Some(path), _) => Box::new(
            WavFrameSource::open(&path).with_context(|| format!("opening {}", path.display()))?,
        ),
        (None, Some(frequency_hz)) => Box::new(
            SyntheticFrameSource::script(config.audio.sample_rate)
                .context("building synthetic source")?
                .silence(config.capture.countdown_ms())
                .tone(frequency_hz, 0.4, tone_ms)
                .silence(500),
        ),
        (None, None) => return Err(anyhow!("either --wav or --tone is required")),
    };

    let collector = Arc::new(TelemetryCollector::new(16, 4096));
    let sink: Arc<dyn EventSink> = if print_events {
        collector.clone()
    } else {
        null_sink()
    };

    let mut session = SessionController::new(config, sink);
    let event = session
        .run_source(source.as_mut(), extreme)
        .context("running capture")?;

    if print_events {
        for engine_event in collector.snapshot().recent {
            println!("{}", serde_json::to_string(&engine_event)?);
        }
    }
    println!("{}", serde_json::to_string_pretty(&event)?);

    if event.state == CaptureState::Captured {
        Ok(ExitCode::from(0))
    } else {
        Ok(ExitCode::from(2))
    }
}

fn parse_pitch(value: &str) -> Result<f32> {
    if let Ok(frequency_hz) = value.trim().parse::<f32>() {
        return Ok(frequency_hz);
    }
    parse_note_name(value)
        .map(midi_to_frequency)
        .ok_or_else(|| anyhow!("'{}' is neither a frequency nor a note name", value))
}

fn run_classify(config: AppConfig, lowest: &str, highest: &str) -> Result<ExitCode> {
    let lowest_hz = parse_pitch(lowest)?;
    let highest_hz = parse_pitch(highest)?;

    let mut session = SessionController::new(config, null_sink());
    session
        .provide_manual_pitch(Extreme::Lowest, lowest_hz)
        .context("setting lowest note")?;
    session
        .provide_manual_pitch(Extreme::Highest, highest_hz)
        .context("setting highest note")?;
    let range = session.finalize().context("classifying range")?;

    println!("{}", serde_json::to_string_pretty(&range)?);
    Ok(ExitCode::from(0))
}
