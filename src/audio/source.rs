//! Frame sources feeding the capture engine.
//!
//! The engine is frame-synchronous: a host pulls fixed-length `f32` frames
//! from a [`FrameSource`] and hands them to the session. Two sources ship with
//! the crate, a WAV file reader (mixed down to mono) and a scripted synthetic
//! generator used by tests and the CLI.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::Path;

use crate::error::AudioError;

/// Result of filling a frame from a [`FrameSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRead {
    /// Frame holds `frames_written` samples, zero-padded after them;
    /// `finished` indicates end-of-stream.
    Data {
        frames_written: usize,
        finished: bool,
    },
    /// No more samples available (source exhausted).
    Finished,
}

/// Source of mono amplitude frames at a fixed sample rate.
pub trait FrameSource: Send {
    fn sample_rate(&self) -> u32;
    fn read_frame(&mut self, frame: &mut [f32]) -> FrameRead;
    fn rewind(&mut self);
}

/// Mono PCM loaded from a WAV file.
pub struct WavFrameSource {
    samples: Vec<f32>,
    sample_rate: u32,
    cursor: usize,
}

impl WavFrameSource {
    /// Load and mix down a WAV file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AudioError> {
        let (samples, sample_rate) = read_wav(path.as_ref())?;
        Self::from_samples(samples, sample_rate)
    }

    /// Wrap samples already in memory.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate { sample_rate });
        }
        Ok(Self {
            samples,
            sample_rate,
            cursor: 0,
        })
    }

    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

impl FrameSource for WavFrameSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_frame(&mut self, frame: &mut [f32]) -> FrameRead {
        let remaining = self.samples.len().saturating_sub(self.cursor);
        if remaining == 0 {
            frame.fill(0.0);
            return FrameRead::Finished;
        }

        let frames_written = remaining.min(frame.len());
        frame[..frames_written]
            .copy_from_slice(&self.samples[self.cursor..self.cursor + frames_written]);
        frame[frames_written..].fill(0.0);
        self.cursor += frames_written;

        FrameRead::Data {
            frames_written,
            finished: self.cursor >= self.samples.len(),
        }
    }

    fn rewind(&mut self) {
        self.cursor = 0;
    }
}

/// One scripted stretch of synthetic signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Tone {
        frequency_hz: f32,
        amplitude: f32,
        duration_ms: u64,
    },
    Silence {
        duration_ms: u64,
    },
    WhiteNoise {
        amplitude: f32,
        duration_ms: u64,
    },
}

impl Segment {
    pub fn duration_ms(&self) -> u64 {
        match self {
            Segment::Tone { duration_ms, .. }
            | Segment::Silence { duration_ms }
            | Segment::WhiteNoise { duration_ms, .. } => *duration_ms,
        }
    }
}

/// Deterministic generator playing a list of segments back to back.
pub struct SyntheticFrameSource {
    segments: Vec<Segment>,
    sample_rate: u32,
    rng: StdRng,
    seed: u64,
    segment_index: usize,
    frames_in_segment: usize,
    phase: f32,
}

impl SyntheticFrameSource {
    pub fn new(sample_rate: u32, segments: Vec<Segment>) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate { sample_rate });
        }
        let seed = 0x5A5A_FFF0;
        Ok(Self {
            segments,
            sample_rate,
            rng: StdRng::seed_from_u64(seed),
            seed,
            segment_index: 0,
            frames_in_segment: 0,
            phase: 0.0,
        })
    }

    /// Empty script at `sample_rate`, extended with the builder methods.
    pub fn script(sample_rate: u32) -> Result<Self, AudioError> {
        Self::new(sample_rate, Vec::new())
    }

    pub fn tone(mut self, frequency_hz: f32, amplitude: f32, duration_ms: u64) -> Self {
        self.segments.push(Segment::Tone {
            frequency_hz,
            amplitude,
            duration_ms,
        });
        self
    }

    pub fn silence(mut self, duration_ms: u64) -> Self {
        self.segments.push(Segment::Silence { duration_ms });
        self
    }

    pub fn white_noise(mut self, amplitude: f32, duration_ms: u64) -> Self {
        self.segments.push(Segment::WhiteNoise {
            amplitude,
            duration_ms,
        });
        self
    }

    /// Total scripted length.
    pub fn duration_ms(&self) -> u64 {
        self.segments.iter().map(Segment::duration_ms).sum()
    }

    fn segment_frames(&self, segment: &Segment) -> usize {
        (segment.duration_ms() * self.sample_rate as u64 / 1000) as usize
    }

    fn next_sample(&mut self) -> Option<f32> {
        loop {
            let segment = *self.segments.get(self.segment_index)?;
            if self.frames_in_segment >= self.segment_frames(&segment) {
                self.segment_index += 1;
                self.frames_in_segment = 0;
                continue;
            }

            self.frames_in_segment += 1;
            let value = match segment {
                Segment::Tone {
                    frequency_hz,
                    amplitude,
                    ..
                } => {
                    let value = (2.0 * PI * self.phase).sin() * amplitude;
                    self.phase += frequency_hz / self.sample_rate as f32;
                    if self.phase >= 1.0 {
                        self.phase -= self.phase.floor();
                    }
                    value
                }
                Segment::Silence { .. } => 0.0,
                Segment::WhiteNoise { amplitude, .. } if amplitude > 0.0 => {
                    self.rng.gen_range(-amplitude..amplitude)
                }
                Segment::WhiteNoise { .. } => 0.0,
            };
            return Some(value);
        }
    }
}

impl FrameSource for SyntheticFrameSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_frame(&mut self, frame: &mut [f32]) -> FrameRead {
        let mut frames_written = 0usize;
        for slot in frame.iter_mut() {
            match self.next_sample() {
                Some(value) => {
                    *slot = value;
                    frames_written += 1;
                }
                None => break,
            }
        }
        frame[frames_written..].fill(0.0);

        if frames_written == 0 {
            return FrameRead::Finished;
        }
        let finished = self.segment_index >= self.segments.len()
            || (self.segment_index + 1 == self.segments.len()
                && self.frames_in_segment >= self.segment_frames(&self.segments[self.segment_index]));
        FrameRead::Data {
            frames_written,
            finished,
        }
    }

    fn rewind(&mut self) {
        self.segment_index = 0;
        self.frames_in_segment = 0;
        self.phase = 0.0;
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

fn read_wav(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
    let stream_failure = |what: &str, err: hound::Error| AudioError::StreamFailure {
        reason: format!("{} {}: {err}", what, path.display()),
    };

    let mut reader = hound::WavReader::open(path).map_err(|err| stream_failure("failed to open", err))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(AudioError::StreamFailure {
            reason: format!("{} has zero channels", path.display()),
        });
    }
    if spec.sample_rate == 0 {
        return Err(AudioError::InvalidSampleRate {
            sample_rate: spec.sample_rate,
        });
    }

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, _) => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| stream_failure("error reading", err)))
            .collect::<Result<Vec<f32>, _>>()?,
        (hound::SampleFormat::Int, bits @ 8..=32) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| {
                    sample
                        .map(|v| v as f32 / scale)
                        .map_err(|err| stream_failure("error reading", err))
                })
                .collect::<Result<Vec<f32>, _>>()?
        }
        (_, bits) => {
            return Err(AudioError::StreamFailure {
                reason: format!(
                    "unsupported bits_per_sample={} for {}",
                    bits,
                    path.display()
                ),
            })
        }
    };

    if spec.channels == 1 {
        return Ok((samples, spec.sample_rate));
    }

    let channels = spec.channels as usize;
    let mono = samples
        .chunks(channels)
        .map(|chunk| chunk.iter().copied().sum::<f32>() / channels as f32)
        .collect();

    Ok((mono, spec.sample_rate))
}
