// Dropout-tolerant hold timer
//
// Tracks how long a plausibly continuous pitch has been held. A valid sample
// arriving more than `dropout_tolerance_ms` after the previous valid one
// starts a fresh run; invalid samples never reset anything on their own, so
// single-frame detector glitches inside a steady note are absorbed.

use std::collections::VecDeque;

/// What a valid sample did to the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldUpdate {
    /// First valid sample of the attempt
    Started,
    /// Gap exceeded the tolerance; the run starts over
    Restarted { gap_ms: u64 },
    /// Run continues with this much accumulated hold time
    Continued { held_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TimedFrequency {
    timestamp_ms: u64,
    frequency_hz: f32,
}

/// Accumulation state for one capture attempt
#[derive(Debug, Clone, Default)]
pub struct HoldTracker {
    first_valid_ms: Option<u64>,
    last_valid_ms: Option<u64>,
    held_ms: u64,
    window: VecDeque<TimedFrequency>,
    valid_samples: usize,
    longest_hold_ms: u64,
}

impl HoldTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a valid sample.
    ///
    /// `window_ms` bounds how much history is kept for the extremum window.
    pub fn record_valid(
        &mut self,
        timestamp_ms: u64,
        frequency_hz: f32,
        dropout_tolerance_ms: u64,
        window_ms: u64,
    ) -> HoldUpdate {
        self.valid_samples += 1;

        let update = match self.last_valid_ms {
            None => {
                self.start_run(timestamp_ms);
                HoldUpdate::Started
            }
            Some(last) if timestamp_ms.saturating_sub(last) > dropout_tolerance_ms => {
                self.start_run(timestamp_ms);
                HoldUpdate::Restarted {
                    gap_ms: timestamp_ms.saturating_sub(last),
                }
            }
            Some(_) => {
                let first = self.first_valid_ms.unwrap_or(timestamp_ms);
                self.held_ms = timestamp_ms.saturating_sub(first);
                HoldUpdate::Continued {
                    held_ms: self.held_ms,
                }
            }
        };

        self.last_valid_ms = Some(timestamp_ms);
        self.longest_hold_ms = self.longest_hold_ms.max(self.held_ms);
        self.window.push_back(TimedFrequency {
            timestamp_ms,
            frequency_hz,
        });

        let cutoff = timestamp_ms.saturating_sub(window_ms);
        while self
            .window
            .front()
            .is_some_and(|entry| entry.timestamp_ms < cutoff)
        {
            self.window.pop_front();
        }

        update
    }

    fn start_run(&mut self, timestamp_ms: u64) {
        self.first_valid_ms = Some(timestamp_ms);
        self.held_ms = 0;
        self.window.clear();
    }

    /// Accumulated hold time of the current run
    pub fn held_ms(&self) -> u64 {
        self.held_ms
    }

    /// Longest run seen during the attempt
    pub fn longest_hold_ms(&self) -> u64 {
        self.longest_hold_ms
    }

    /// Valid samples seen during the attempt, across runs
    pub fn valid_samples(&self) -> usize {
        self.valid_samples
    }

    /// Frequencies of the current run within `span_ms` of `now_ms`
    pub fn window(&self, now_ms: u64, span_ms: u64) -> Vec<f32> {
        let cutoff = now_ms.saturating_sub(span_ms);
        self.window
            .iter()
            .filter(|entry| entry.timestamp_ms >= cutoff)
            .map(|entry| entry.frequency_hz)
            .collect()
    }

    /// Drop the current run but keep attempt statistics
    pub fn discard_run(&mut self) {
        self.first_valid_ms = None;
        self.last_valid_ms = None;
        self.held_ms = 0;
        self.window.clear();
    }

    /// Forget everything
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: u64 = 500;
    const WINDOW: u64 = 3000;

    fn feed(tracker: &mut HoldTracker, from_ms: u64, to_ms: u64, step_ms: u64) {
        let mut t = from_ms;
        while t <= to_ms {
            tracker.record_valid(t, 220.0, TOLERANCE, WINDOW);
            t += step_ms;
        }
    }

    #[test]
    fn test_short_gap_keeps_accumulating() {
        let mut tracker = HoldTracker::new();
        feed(&mut tracker, 0, 1500, 20);
        // 300 ms of invalid frames produce no calls at all
        feed(&mut tracker, 1800, 3000, 20);
        assert_eq!(tracker.held_ms(), 3000);
    }

    #[test]
    fn test_long_gap_restarts_run() {
        let mut tracker = HoldTracker::new();
        feed(&mut tracker, 0, 1500, 20);

        let update = tracker.record_valid(2100, 220.0, TOLERANCE, WINDOW);
        assert_eq!(update, HoldUpdate::Restarted { gap_ms: 600 });
        assert_eq!(tracker.held_ms(), 0);

        feed(&mut tracker, 2120, 4000, 20);
        assert_eq!(tracker.held_ms(), 1900);
        assert_eq!(tracker.longest_hold_ms(), 1900);
    }

    #[test]
    fn test_window_is_bounded_to_span() {
        let mut tracker = HoldTracker::new();
        feed(&mut tracker, 0, 5000, 100);
        let window = tracker.window(5000, WINDOW);
        assert_eq!(window.len(), 31);
        assert_eq!(tracker.valid_samples(), 51);
    }

    #[test]
    fn test_discard_run_keeps_statistics() {
        let mut tracker = HoldTracker::new();
        feed(&mut tracker, 0, 1000, 100);
        tracker.discard_run();

        assert_eq!(tracker.held_ms(), 0);
        assert!(tracker.window(1000, WINDOW).is_empty());
        assert_eq!(tracker.valid_samples(), 11);
        assert_eq!(
            tracker.record_valid(1100, 220.0, TOLERANCE, WINDOW),
            HoldUpdate::Started
        );
    }
}
