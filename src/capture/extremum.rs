// Robust extremum selection over a held window
//
// A single stray frame must not become the reported lowest or highest note.
// The window is ranked in the search direction, the best fraction is taken
// and its median becomes the candidate. When most of the window sits within
// a narrow band around the candidate the singer was steady, and the true
// extreme inside that band is reported instead.

use super::state::Extreme;
use crate::config::CaptureConfig;
use crate::note::semitone_distance;

/// Pick the extreme frequency of `window` in direction `extreme`.
///
/// Returns `None` for an empty window.
pub fn robust_extremum(window: &[f32], extreme: Extreme, config: &CaptureConfig) -> Option<f32> {
    let mut ranked: Vec<f32> = window.iter().copied().filter(|f| f.is_finite()).collect();
    if ranked.is_empty() {
        return None;
    }

    match extreme {
        Extreme::Lowest => ranked.sort_by(|a, b| a.total_cmp(b)),
        Extreme::Highest => ranked.sort_by(|a, b| b.total_cmp(a)),
    }

    let count = ranked.len();
    let best = ((count as f32 * config.trim_fraction).ceil() as usize).clamp(1, count);
    let candidate = median(&ranked[..best]);

    let band: Vec<f32> = ranked
        .iter()
        .copied()
        .filter(|&f| semitone_distance(candidate, f).abs() <= config.stability_semitones as f64)
        .collect();

    if (band.len() as f32) < config.stable_coverage * count as f32 {
        return Some(candidate);
    }

    let banded = match extreme {
        Extreme::Lowest => band.iter().copied().fold(f32::INFINITY, f32::min),
        Extreme::Highest => band.iter().copied().fold(f32::NEG_INFINITY, f32::max),
    };
    Some(banded)
}

// Median of a slice already sorted in either direction
fn median(sorted: &[f32]) -> f32 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
