use super::types::AlarmNotification;
use crate::error::NotificationError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// External consumer of raised alarms (sound, email, durable log, ...)
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one raised alarm
    async fn notify(&self, notification: &AlarmNotification) -> Result<(), NotificationError>;

    /// Name used in logs
    fn sink_name(&self) -> &str;
}

/// Fans raised alarms out to every registered sink.
///
/// Sink failures and timeouts are logged and swallowed so that delivery
/// problems never reach the pipeline.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sinks: Vec<Arc<dyn NotificationSink>>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sinks: Vec::new(),
            timeout,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver to all sinks; returns how many succeeded
    pub async fn dispatch(&self, notification: &AlarmNotification) -> usize {
        let mut delivered = 0;

        for sink in &self.sinks {
            let result = tokio::time::timeout(self.timeout, sink.notify(notification))
                .await
                .unwrap_or_else(|_| {
                    Err(NotificationError::Timeout {
                        sink: sink.sink_name().to_string(),
                        timeout_ms: self.timeout.as_millis() as u64,
                    })
                });

            match result {
                Ok(()) => {
                    debug!(
                        "Alarm {} delivered to sink '{}'",
                        notification.id,
                        sink.sink_name()
                    );
                    delivered += 1;
                }
                Err(e) => {
                    warn!("Alarm notification dispatch failed: {}", e);
                }
            }
        }

        delivered
    }
}

/// Sink that records alarms in the tracing log
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, notification: &AlarmNotification) -> Result<(), NotificationError> {
        let raised: DateTime<Utc> = notification.timestamp.into();
        warn!(
            "FIRE ALARM [{}] at {} | location: {} | {}",
            notification.classification,
            raised.format("%H:%M:%S"),
            notification.location,
            notification.description
        );
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::types::ManualAlarm;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        count: AtomicUsize,
    }

    #[async_trait]
    impl NotificationSink for CountingSink {
        async fn notify(&self, _: &AlarmNotification) -> Result<(), NotificationError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn sink_name(&self) -> &str {
            "counting"
        }
    }

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn notify(&self, _: &AlarmNotification) -> Result<(), NotificationError> {
            Err(NotificationError::Dispatch {
                sink: "failing".to_string(),
                details: "smtp unreachable".to_string(),
            })
        }

        fn sink_name(&self) -> &str {
            "failing"
        }
    }

    struct StalledSink;

    #[async_trait]
    impl NotificationSink for StalledSink {
        async fn notify(&self, _: &AlarmNotification) -> Result<(), NotificationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        fn sink_name(&self) -> &str {
            "stalled"
        }
    }

    fn notification() -> AlarmNotification {
        AlarmNotification::manual(&ManualAlarm::new("hall", "test").unwrap())
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let counting = Arc::new(CountingSink {
            count: AtomicUsize::new(0),
        });
        let dispatcher = NotificationDispatcher::new(Duration::from_millis(50))
            .with_sink(Arc::new(FailingSink))
            .with_sink(Arc::new(StalledSink))
            .with_sink(counting.clone())
            .with_sink(Arc::new(LogNotifier));

        let delivered = dispatcher.dispatch(&notification()).await;

        assert_eq!(delivered, 2);
        assert_eq!(counting.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_dispatcher() {
        let dispatcher = NotificationDispatcher::new(Duration::from_millis(50));
        assert_eq!(dispatcher.sink_count(), 0);
        assert_eq!(dispatcher.dispatch(&notification()).await, 0);
    }
}
