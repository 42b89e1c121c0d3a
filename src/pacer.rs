use crate::config::PacingConfig;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Keeps delivered-frame cadence close to the source's nominal frame interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacer {
    nominal_interval: Duration,
    min_wait: Duration,
}

impl Pacer {
    /// Pacer with an explicit interval and the default 1 ms floor
    pub fn new(nominal_interval: Duration) -> Self {
        Self {
            nominal_interval,
            min_wait: Duration::from_millis(1),
        }
    }

    /// Pacer for a source-reported rate, falling back to the configured default
    pub fn for_source_fps(source_fps: Option<f64>, config: &PacingConfig) -> Self {
        let fps = effective_fps(source_fps, config.default_fps);
        debug!(
            "Pacing at {:.2} fps (source reported {:?})",
            fps, source_fps
        );

        Self {
            nominal_interval: Duration::from_secs_f64(1.0 / fps),
            min_wait: Duration::from_millis(config.min_wait_ms.max(1)),
        }
    }

    pub fn nominal_interval(&self) -> Duration {
        self.nominal_interval
    }

    pub fn nominal_fps(&self) -> f64 {
        1.0 / self.nominal_interval.as_secs_f64()
    }

    /// Wait to insert after a frame that took `processing_cost` to handle
    pub fn wait_for(&self, processing_cost: Duration) -> Duration {
        self.nominal_interval
            .saturating_sub(processing_cost)
            .max(self.min_wait)
    }

    /// Sleep out the rest of the interval that started at `frame_started`.
    ///
    /// Returns `false` if the token was cancelled during the wait.
    pub async fn pace(&self, frame_started: Instant, cancel: &CancellationToken) -> bool {
        let wait = self.wait_for(frame_started.elapsed());
        trace!("Pacing wait {:?}", wait);

        tokio::select! {
            _ = tokio::time::sleep(wait) => true,
            _ = cancel.cancelled() => false,
        }
    }
}

/// Source rate if usable, otherwise the default
pub fn effective_fps(source_fps: Option<f64>, default_fps: f64) -> f64 {
    match source_fps {
        Some(fps) if fps.is_finite() && fps > 0.0 => fps,
        _ => default_fps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_subtracts_processing_cost() {
        let pacer = Pacer::new(Duration::from_millis(33));
        assert_eq!(pacer.wait_for(Duration::from_millis(10)), Duration::from_millis(23));
        assert_eq!(pacer.wait_for(Duration::ZERO), Duration::from_millis(33));
    }

    #[test]
    fn test_overrun_waits_the_floor() {
        let pacer = Pacer::new(Duration::from_millis(33));
        assert_eq!(pacer.wait_for(Duration::from_millis(50)), Duration::from_millis(1));
        assert_eq!(pacer.wait_for(Duration::from_millis(33)), Duration::from_millis(1));
    }

    #[test]
    fn test_unknown_rate_uses_default() {
        let config = PacingConfig::default();

        for reported in [None, Some(0.0), Some(-5.0), Some(f64::NAN)] {
            let pacer = Pacer::for_source_fps(reported, &config);
            assert!((pacer.nominal_fps() - 30.0).abs() < 1e-6, "reported {:?}", reported);
        }

        let pacer = Pacer::for_source_fps(Some(25.0), &config);
        let interval = pacer.nominal_interval();
        let expected = Duration::from_millis(40);
        let diff = if interval > expected {
            interval - expected
        } else {
            expected - interval
        };
        assert!(diff < Duration::from_micros(1));
    }

    #[tokio::test]
    async fn test_pace_is_interrupted_by_cancel() {
        let pacer = Pacer::new(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let started = Instant::now();
        assert!(!pacer.pace(started, &cancel).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_pace_sleeps_remaining_interval() {
        let pacer = Pacer::new(Duration::from_millis(20));
        let cancel = CancellationToken::new();

        let started = Instant::now();
        assert!(pacer.pace(started, &cancel).await);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
