//! McLeod pitch estimation.
//!
//! The McLeod Pitch Method works on the *normalized square difference
//! function* of a frame `x` of length `N`:
//!
//! > nsdf(τ) = 2·r(τ) / m(τ),  r(τ) = Σ x_i·x_{i+τ},  m(τ) = Σ (x_i² + x_{i+τ}²)
//!
//! `nsdf` lies in [-1, 1] and reaches 1 at lags where the frame lines up with
//! itself. The autocorrelation `r` is computed with an FFT on a zero-padded
//! buffer so it is linear rather than circular. The first key maximum close
//! to the highest one gives the period; its height is reported as clarity.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use super::compute_rms;
use super::peak::{choose_peak, key_maxima, refine_peak};
use crate::config::EstimatorConfig;

/// Raw estimator output for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Fundamental frequency, `None` when no periodicity was found
    pub frequency_hz: Option<f32>,
    /// NSDF peak height in [0, 1]
    pub clarity: f32,
}

impl PitchEstimate {
    pub fn none() -> Self {
        Self {
            frequency_hz: None,
            clarity: 0.0,
        }
    }
}

/// Single-frame pitch detector
///
/// Implementations must not panic on malformed frames; they degrade to
/// [`PitchEstimate::none`] instead.
pub trait PitchDetector: Send {
    fn estimate(&mut self, frame: &[f32], sample_rate: u32) -> PitchEstimate;
}

/// McLeod Pitch Method detector
pub struct McLeodDetector {
    config: EstimatorConfig,
    planner: FftPlanner<f32>,
    spectrum: Vec<Complex<f32>>,
    nsdf: Vec<f32>,
}

impl McLeodDetector {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            planner: FftPlanner::new(),
            spectrum: Vec::new(),
            nsdf: Vec::new(),
        }
    }

    /// Fill `self.nsdf` with the normalized square difference of `frame`.
    fn normalized_square_difference(&mut self, frame: &[f32]) {
        let n = frame.len();
        let fft_len = (2 * n).next_power_of_two();

        self.spectrum.clear();
        self.spectrum
            .extend(frame.iter().map(|&sample| Complex::new(sample, 0.0)));
        self.spectrum.resize(fft_len, Complex::new(0.0, 0.0));

        let fft = self.planner.plan_fft_forward(fft_len);
        let inv_fft = self.planner.plan_fft_inverse(fft_len);

        // Autocorrelation = IFFT(|FFT(x)|^2); rustfft leaves the 1/len scale to us
        fft.process(&mut self.spectrum);
        self.spectrum
            .iter_mut()
            .for_each(|c| *c = Complex::new(c.norm_sqr(), 0.0));
        inv_fft.process(&mut self.spectrum);
        let scale = 1.0 / fft_len as f32;

        self.nsdf.clear();
        self.nsdf.resize(n, 0.0);

        let mut m = 2.0 * frame.iter().map(|&s| s * s).sum::<f32>();
        for tau in 0..n {
            if tau > 0 {
                m -= frame[tau - 1] * frame[tau - 1] + frame[n - tau] * frame[n - tau];
            }
            let r = self.spectrum[tau].re * scale;
            self.nsdf[tau] = if m > f32::EPSILON { 2.0 * r / m } else { 0.0 };
        }
    }
}

/// Longest lag searched for a period.
///
/// Lags past three quarters of the frame overlap by too few samples for the
/// NSDF to be trusted.
fn max_lag(frame_len: usize) -> usize {
    frame_len - frame_len / 4
}

impl PitchDetector for McLeodDetector {
    fn estimate(&mut self, frame: &[f32], sample_rate: u32) -> PitchEstimate {
        if frame.len() < 4 || sample_rate == 0 {
            return PitchEstimate::none();
        }
        if frame.iter().any(|s| !s.is_finite()) {
            return PitchEstimate::none();
        }
        if compute_rms(frame) < self.config.silence_rms {
            return PitchEstimate::none();
        }

        self.normalized_square_difference(frame);

        let maxima = key_maxima(&self.nsdf, max_lag(frame.len()));
        let Some(peak) = choose_peak(&maxima, self.config.peak_threshold) else {
            return PitchEstimate::none();
        };

        let (lag, height) = refine_peak(peak, &self.nsdf);
        if lag <= 0.0 {
            return PitchEstimate::none();
        }

        PitchEstimate {
            frequency_hz: Some(sample_rate as f32 / lag),
            clarity: height.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::f32::consts::PI;

    const SAMPLE_RATE: u32 = 44_100;
    const SIZE: usize = 2048;

    fn sine(freq: f32, amplitude: f32) -> Vec<f32> {
        (0..SIZE)
            .map(|i| (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin() * amplitude)
            .collect()
    }

    fn detector() -> McLeodDetector {
        McLeodDetector::new(EstimatorConfig::default())
    }

    fn assert_close(estimate: PitchEstimate, expected: f32) {
        let freq = estimate.frequency_hz.expect("expected a pitch");
        assert!(
            (freq - expected).abs() / expected < 0.01,
            "expected ~{} Hz, got {} Hz",
            expected,
            freq
        );
    }

    #[test]
    fn test_sine_frequencies_across_vocal_band() {
        let mut detector = detector();
        for freq in [82.41, 110.0, 220.0, 440.0, 880.0] {
            let estimate = detector.estimate(&sine(freq, 0.5), SAMPLE_RATE);
            assert_close(estimate, freq);
            assert!(estimate.clarity > 0.9, "clarity {}", estimate.clarity);
        }
    }

    #[test]
    fn test_low_voice_in_short_frame() {
        // 1024 samples hold less than two periods of these pitches
        let mut detector = detector();
        for freq in [70.0f32, 82.41] {
            let frame: Vec<f32> = sine(freq, 0.5).into_iter().take(1024).collect();
            let estimate = detector.estimate(&frame, SAMPLE_RATE);
            assert_close(estimate, freq);
            assert!(estimate.clarity > 0.9, "clarity {}", estimate.clarity);
        }
    }

    #[test]
    fn test_max_lag_leaves_overlap() {
        assert_eq!(max_lag(1024), 768);
        assert_eq!(max_lag(2048), 1536);
    }

    #[test]
    fn test_harmonic_rich_signal_reports_fundamental() {
        let signal: Vec<f32> = (0..SIZE)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                0.6 * (2.0 * PI * 196.0 * t).sin()
                    + 0.3 * (2.0 * PI * 392.0 * t).sin()
                    + 0.15 * (2.0 * PI * 588.0 * t).sin()
            })
            .collect();
        let estimate = detector().estimate(&signal, SAMPLE_RATE);
        assert_close(estimate, 196.0);
    }

    #[test]
    fn test_noisy_sine_still_detected() {
        let mut rng = StdRng::seed_from_u64(7);
        let signal: Vec<f32> = sine(150.0, 0.5)
            .into_iter()
            .map(|s| s + rng.gen_range(-0.05..0.05))
            .collect();
        let estimate = detector().estimate(&signal, SAMPLE_RATE);
        assert_close(estimate, 150.0);
        assert!(estimate.clarity > 0.8);
    }

    #[test]
    fn test_silence_yields_no_pitch() {
        let estimate = detector().estimate(&vec![0.0; SIZE], SAMPLE_RATE);
        assert_eq!(estimate, PitchEstimate::none());
    }

    #[test]
    fn test_white_noise_has_low_clarity() {
        let mut rng = StdRng::seed_from_u64(42);
        let noise: Vec<f32> = (0..SIZE).map(|_| rng.gen_range(-0.5..0.5)).collect();
        let estimate = detector().estimate(&noise, SAMPLE_RATE);
        assert!(estimate.frequency_hz.is_none() || estimate.clarity < 0.5);
    }

    #[test]
    fn test_malformed_frames_degrade_to_none() {
        let mut detector = detector();
        assert!(detector.estimate(&[], SAMPLE_RATE).frequency_hz.is_none());
        assert!(detector.estimate(&[0.1, 0.2], SAMPLE_RATE).frequency_hz.is_none());

        let mut frame = sine(220.0, 0.5);
        frame[100] = f32::NAN;
        assert!(detector.estimate(&frame, SAMPLE_RATE).frequency_hz.is_none());

        assert!(detector.estimate(&sine(220.0, 0.5), 0).frequency_hz.is_none());
    }
}
