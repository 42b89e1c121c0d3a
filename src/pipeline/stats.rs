use std::time::{Duration, Instant};

/// Per-run throughput counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionMetrics {
    pub frames_processed: u64,
    pub elapsed: Duration,
    pub instantaneous_fps: f64,
}

impl SessionMetrics {
    /// Count one frame processed `elapsed` after the run started
    pub fn record_frame(&mut self, elapsed: Duration) {
        self.frames_processed += 1;
        self.elapsed = self.elapsed.max(elapsed);

        let seconds = self.elapsed.as_secs_f64();
        self.instantaneous_fps = if seconds > 0.0 {
            self.frames_processed as f64 / seconds
        } else {
            0.0
        };
    }

    pub fn record_frame_since(&mut self, run_started: Instant) {
        self.record_frame(run_started.elapsed());
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
