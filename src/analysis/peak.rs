// Peak picking over a normalized square difference function
//
// Key maxima are the highest values between each positive-going zero
// crossing and the following negative-going one. The region around lag 0 is
// skipped because the NSDF always starts at 1.0 there.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyMaximum {
    pub lag: usize,
    pub value: f32,
}

/// Collect key maxima of `nsdf` for lags below `max_lag`.
pub fn key_maxima(nsdf: &[f32], max_lag: usize) -> Vec<KeyMaximum> {
    let end = max_lag.min(nsdf.len());
    let mut maxima = Vec::new();

    // Skip the positive lobe around lag 0
    let start = match nsdf[..end].iter().position(|&v| v <= 0.0) {
        Some(idx) => idx,
        None => return maxima,
    };

    let mut current: Option<KeyMaximum> = None;
    for lag in start..end {
        let value = nsdf[lag];
        if value > 0.0 {
            match current.as_mut() {
                Some(peak) if value > peak.value => {
                    peak.lag = lag;
                    peak.value = value;
                }
                Some(_) => {}
                None => current = Some(KeyMaximum { lag, value }),
            }
        } else if let Some(peak) = current.take() {
            maxima.push(peak);
        }
    }

    // A lobe still open at the search limit only counts if it already turned down
    if let Some(peak) = current {
        if peak.lag + 1 < end {
            maxima.push(peak);
        }
    }

    maxima
}

/// Pick the first key maximum at or above `threshold` times the highest one.
pub fn choose_peak(maxima: &[KeyMaximum], threshold: f32) -> Option<KeyMaximum> {
    let highest = maxima
        .iter()
        .map(|peak| peak.value)
        .fold(f32::NEG_INFINITY, f32::max);
    if !highest.is_finite() || highest <= 0.0 {
        return None;
    }

    let cutoff = highest * threshold;
    maxima.iter().copied().find(|peak| peak.value >= cutoff)
}

/// Refine a peak with parabolic interpolation through its two neighbours.
///
/// Returns the fractional lag and the interpolated height.
pub fn refine_peak(peak: KeyMaximum, data: &[f32]) -> (f32, f32) {
    let idx = peak.lag;
    if idx == 0 || idx + 1 >= data.len() {
        return (idx as f32, peak.value);
    }

    let left = data[idx - 1];
    let center = data[idx];
    let right = data[idx + 1];
    let denominator = 2.0 * center - left - right;
    if denominator.abs() < f32::EPSILON {
        return (idx as f32, center);
    }

    let shift = 0.5 * (right - left) / denominator;
    let x = idx as f32 + shift;
    let y = center + 0.25 * (right - left) * shift;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parabolic_refinement_finds_vertex() {
        // y = 4 - (x - 10.5)^2 sampled at 9, 10, 11
        let mut data = vec![0.0; 13];
        for (i, slot) in data.iter_mut().enumerate() {
            let x = i as f32 - 10.5;
            *slot = 4.0 - x * x;
        }
        let (x, y) = refine_peak(KeyMaximum { lag: 10, value: data[10] }, &data);
        assert!((x - 10.5).abs() < 1e-4);
        assert!((y - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_key_maxima_skip_lag_zero_lobe() {
        let nsdf = [1.0, 0.5, -0.2, 0.3, 0.8, 0.4, -0.1, 0.2, 0.9, 0.1, -0.3];
        let maxima = key_maxima(&nsdf, nsdf.len());
        assert_eq!(
            maxima,
            vec![
                KeyMaximum { lag: 4, value: 0.8 },
                KeyMaximum { lag: 8, value: 0.9 },
            ]
        );
    }

    #[test]
    fn test_choose_first_peak_near_highest() {
        let maxima = [
            KeyMaximum { lag: 4, value: 0.3 },
            KeyMaximum { lag: 8, value: 0.85 },
            KeyMaximum { lag: 16, value: 0.9 },
        ];
        let chosen = choose_peak(&maxima, 0.9).unwrap();
        assert_eq!(chosen.lag, 8);
    }

    #[test]
    fn test_choose_peak_empty() {
        assert!(choose_peak(&[], 0.9).is_none());
        let nsdf = [1.0, 0.9, 0.8];
        assert!(key_maxima(&nsdf, nsdf.len()).is_empty());
    }
}
