//! Time driven marker interpolation between consecutive route points
//!
//! Presentation convenience only, nothing here feeds back into route
//! matching. The animator is polled with wall clock timestamps and lazily
//! yields interpolated positions, one per integer percent of progress.
use crate::gps::{distance, Coordinate};

/// A single in-flight interpolation between two route points
#[derive(Clone, Copy, Debug)]
struct AnimationTask {
    from: Coordinate,
    to: Coordinate,
    duration_ms: f64,
    started_at_ms: u64,
    last_percent: i64,
}

/// Interpolates the map marker between two coordinates over a duration
/// scaled by the current speed ratio
///
/// At most one task is live at a time, `start` replaces and thereby cancels
/// whatever was running. Nothing from a replaced task is ever emitted again.
#[derive(Debug, Default)]
pub struct MarkerAnimator {
    task: Option<AnimationTask>,
}

impl MarkerAnimator {
    pub fn new() -> Self {
        MarkerAnimator { task: None }
    }

    /// Begin animating from `from` to `to`, cancelling any running task
    ///
    /// The duration is the segment length in meters times the smoothed
    /// milliseconds-per-meter ratio, with a floor of one millisecond so a
    /// degenerate zero length segment still completes.
    pub fn start(&mut self, from: Coordinate, to: Coordinate, speed_ratio: f64, now_ms: u64) {
        let duration_ms = (distance(&from, &to) * speed_ratio).max(1.0);
        self.task = Some(AnimationTask {
            from,
            to,
            duration_ms,
            started_at_ms: now_ms,
            last_percent: 0,
        });
    }

    /// Stop the current animation, if any; no further positions are emitted
    pub fn cancel(&mut self) {
        self.task = None;
    }

    /// True while a task is still producing positions
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Poll the animator at the given wall clock time
    ///
    /// Emits the interpolated position only when the integer percent of
    /// elapsed time changed since the last emission, so redundant renders
    /// are dropped. Once 100% has been emitted the task is spent.
    pub fn sample(&mut self, now_ms: u64) -> Option<Coordinate> {
        let task = self.task.as_mut()?;

        let elapsed = now_ms.saturating_sub(task.started_at_ms) as f64;
        let percent = ((elapsed / task.duration_ms) * 100.0).floor().min(100.0) as i64;
        if percent == task.last_percent {
            return None;
        }
        task.last_percent = percent;

        let fraction = percent as f64 / 100.0;
        let latitude =
            task.from.latitude() + (task.to.latitude() - task.from.latitude()) * fraction;
        let longitude =
            task.from.longitude() + (task.to.longitude() - task.from.longitude()) * fraction;
        let position = Coordinate::new(latitude, longitude);

        if percent >= 100 {
            self.task = None;
        }
        Some(position)
    }
}
