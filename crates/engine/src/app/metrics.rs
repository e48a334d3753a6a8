use std::time::{Duration, Instant};

use super::loop_runner::StepPlan;

/// Loop figures averaged over one logging window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub dropped_backlog_ms: f32,
}

#[derive(Debug, Default)]
struct WindowTotals {
    frames: u32,
    steps: u32,
    frame_time: Duration,
    dropped: Duration,
}

/// Per-frame totals, handed out as a snapshot once the window has elapsed.
#[derive(Debug)]
pub(crate) struct LoopMetrics {
    window: Duration,
    window_start: Instant,
    totals: WindowTotals,
}

impl LoopMetrics {
    pub(crate) fn new(window: Duration, now: Instant) -> Self {
        Self {
            window,
            window_start: now,
            totals: WindowTotals::default(),
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration, plan: &StepPlan) {
        let totals = &mut self.totals;
        totals.frames = totals.frames.saturating_add(1);
        totals.steps = totals.steps.saturating_add(plan.ticks_to_run);
        totals.frame_time = totals.frame_time.saturating_add(frame_dt);
        totals.dropped = totals.dropped.saturating_add(plan.dropped_backlog);
    }

    /// Closes the window and starts a new one at `now` if it has run its length.
    pub(crate) fn take_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }
        let totals = std::mem::take(&mut self.totals);
        self.window_start = now;

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let mean_frame = totals.frame_time.checked_div(totals.frames);
        Some(LoopMetricsSnapshot {
            fps: totals.frames as f32 / seconds,
            tps: totals.steps as f32 / seconds,
            frame_time_ms: mean_frame.map_or(0.0, |mean| mean.as_secs_f32() * 1000.0),
            dropped_backlog_ms: totals.dropped.as_secs_f32() * 1000.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(ticks_to_run: u32, dropped_ms: u64) -> StepPlan {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: Duration::from_millis(dropped_ms),
        }
    }

    #[test]
    fn window_averages_frames_and_steps() {
        let start = Instant::now();
        let mut metrics = LoopMetrics::new(Duration::from_secs(2), start);
        metrics.record_frame(Duration::from_millis(10), &plan(1, 0));
        metrics.record_frame(Duration::from_millis(30), &plan(3, 40));

        let snapshot = metrics
            .take_snapshot(start + Duration::from_secs(2))
            .expect("window elapsed");

        assert!((snapshot.fps - 1.0).abs() < 1.0e-3);
        assert!((snapshot.tps - 2.0).abs() < 1.0e-3);
        assert!((snapshot.frame_time_ms - 20.0).abs() < 1.0e-3);
        assert!((snapshot.dropped_backlog_ms - 40.0).abs() < 1.0e-3);
    }

    #[test]
    fn open_window_yields_nothing() {
        let start = Instant::now();
        let mut metrics = LoopMetrics::new(Duration::from_secs(1), start);
        metrics.record_frame(Duration::from_millis(16), &plan(1, 0));
        assert_eq!(metrics.take_snapshot(start + Duration::from_millis(999)), None);
    }

    #[test]
    fn empty_window_reports_zero_frame_time() {
        let start = Instant::now();
        let mut metrics = LoopMetrics::new(Duration::from_secs(1), start);
        metrics.record_frame(Duration::from_millis(16), &plan(60, 0));
        metrics
            .take_snapshot(start + Duration::from_secs(1))
            .expect("first window");

        let idle = metrics
            .take_snapshot(start + Duration::from_secs(2))
            .expect("second window");
        assert_eq!(idle, LoopMetricsSnapshot::default());
    }
}
