//! Rolling travel speed estimate used to pace marker animation
use crate::gps::{distance, Coordinate};

/// Number of recent samples averaged into the speed ratio
const SAMPLE_SLOTS: usize = 5;

/// Assumed milliseconds per meter before any observation arrives
pub const DEFAULT_SPEED_RATIO: f64 = 1000.0;

/// Maintains a rolling average of milliseconds spent per meter travelled
///
/// The ring buffer is pre seeded with a default ratio so the average is
/// defined before the first fix, and degenerate samples (no movement or no
/// elapsed time) are skipped instead of poisoning the buffer.
#[derive(Debug)]
pub struct SpeedEstimator {
    records: [f64; SAMPLE_SLOTS],
    index: usize,
    last_position: Option<Coordinate>,
    last_time_ms: u64,
    seed_ratio: f64,
}

impl SpeedEstimator {
    /// Create an estimator seeded with the given ratio in milliseconds per meter
    pub fn new(seed_ratio: f64) -> Self {
        SpeedEstimator {
            records: [seed_ratio; SAMPLE_SLOTS],
            index: 0,
            last_position: None,
            last_time_ms: 0,
            seed_ratio,
        }
    }

    /// Arithmetic mean of the sample buffer
    pub fn average_ratio(&self) -> f64 {
        self.records.iter().sum::<f64>() / self.records.len() as f64
    }

    /// Feed a new position fix into the rolling window
    ///
    /// The first call only anchors the position and timestamp. Later calls
    /// record elapsed milliseconds per meter travelled since the previous
    /// call, wrapping around the ring, then move the anchor forward.
    pub fn update(&mut self, position: Coordinate, now_ms: u64) {
        if let Some(last) = self.last_position {
            let elapsed = now_ms.saturating_sub(self.last_time_ms);
            let travelled = distance(&last, &position);
            if elapsed > 0 && travelled > 0.0 {
                self.records[self.index % SAMPLE_SLOTS] = elapsed as f64 / travelled;
                self.index += 1;
            }
        }
        self.last_position = Some(position);
        self.last_time_ms = now_ms;
    }

    /// Drop the anchor and re-seed the buffer for a fresh session
    pub fn reset(&mut self) {
        self.records = [self.seed_ratio; SAMPLE_SLOTS];
        self.index = 0;
        self.last_position = None;
        self.last_time_ms = 0;
    }
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        SpeedEstimator::new(DEFAULT_SPEED_RATIO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // one degree of longitude at the equator, roughly 111km
    fn step(i: u32) -> Coordinate {
        Coordinate::new(0.0, 0.01 * i as f64)
    }

    #[test]
    fn average_defaults_to_seed_before_any_update() {
        let estimator = SpeedEstimator::default();
        assert_eq!(estimator.average_ratio(), DEFAULT_SPEED_RATIO);
    }

    #[test]
    fn first_update_only_anchors() {
        let mut estimator = SpeedEstimator::default();
        estimator.update(step(0), 1_000);
        assert_eq!(estimator.average_ratio(), DEFAULT_SPEED_RATIO);
    }

    #[test]
    fn constant_pace_converges_to_its_ratio() {
        let mut estimator = SpeedEstimator::default();
        // each hop covers ~1113m, pick elapsed times that keep ms/m constant
        let hop = distance(&step(0), &step(1));
        let ratio = 2.0; // ms per meter
        let mut now = 0u64;
        estimator.update(step(0), now);
        for i in 1..=5 {
            now += (hop * ratio) as u64;
            estimator.update(step(i), now);
        }
        assert!((estimator.average_ratio() - ratio).abs() / ratio < 1e-3);
    }

    #[test]
    fn stationary_fix_is_skipped() {
        let mut estimator = SpeedEstimator::default();
        estimator.update(step(0), 0);
        estimator.update(step(0), 5_000);
        assert_eq!(estimator.average_ratio(), DEFAULT_SPEED_RATIO);
    }

    #[test]
    fn zero_elapsed_fix_is_skipped() {
        let mut estimator = SpeedEstimator::default();
        estimator.update(step(0), 1_000);
        estimator.update(step(1), 1_000);
        assert_eq!(estimator.average_ratio(), DEFAULT_SPEED_RATIO);
    }

    #[test]
    fn reset_restores_the_seed() {
        let mut estimator = SpeedEstimator::new(500.0);
        estimator.update(step(0), 0);
        estimator.update(step(1), 10_000);
        assert!(estimator.average_ratio() != 500.0);
        estimator.reset();
        assert_eq!(estimator.average_ratio(), 500.0);
    }
}
