use super::{Annotator, PipelineConfig, PipelineUpdate, RunOutcome, RunSummary, SessionMetrics};
use crate::alarm::{
    AlarmDebouncer, AlarmNotification, AlarmTransition, ManualAlarmQueue, NotificationDispatcher,
};
use crate::detector::FireDetector;
use crate::error::{FirewatchError, Result, SourceError};
use crate::events::{EventBus, FireEvent};
use crate::frame::FrameData;
use crate::pacer::Pacer;
use crate::source::FrameSource;
use std::sync::Arc;
use image::RgbImage;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-session run loop: source → detector → debouncer → presentation, paced
/// to the source's nominal frame rate.
pub struct FireWatchPipeline {
    config: PipelineConfig,
    detector: Arc<FireDetector>,
    annotator: Annotator,
    dispatcher: NotificationDispatcher,
    event_bus: Option<Arc<EventBus>>,
    manual_alarms: Option<ManualAlarmQueue>,
}

/// Builder for [`FireWatchPipeline`]
pub struct FireWatchPipelineBuilder {
    config: PipelineConfig,
    annotator: Option<Annotator>,
    dispatcher: Option<NotificationDispatcher>,
    event_bus: Option<Arc<EventBus>>,
    manual_alarms: Option<ManualAlarmQueue>,
}

impl FireWatchPipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            annotator: None,
            dispatcher: None,
            event_bus: None,
            manual_alarms: None,
        }
    }

    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = Some(annotator);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_manual_alarms(mut self, queue: ManualAlarmQueue) -> Self {
        self.manual_alarms = Some(queue);
        self
    }

    pub fn build(self) -> Result<FireWatchPipeline> {
        self.config.detector.validate()?;

        let annotator = self
            .annotator
            .unwrap_or_else(|| Annotator::new(&self.config.overlay));
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| NotificationDispatcher::new(DEFAULT_DISPATCH_TIMEOUT));

        info!(
            "Fire watch pipeline built with {} notification sink(s)",
            dispatcher.sink_count()
        );

        Ok(FireWatchPipeline {
            detector: Arc::new(FireDetector::new(self.config.detector.clone())),
            config: self.config,
            annotator,
            dispatcher,
            event_bus: self.event_bus,
            manual_alarms: self.manual_alarms,
        })
    }
}

impl FireWatchPipeline {
    pub fn builder(config: PipelineConfig) -> FireWatchPipelineBuilder {
        FireWatchPipelineBuilder::new(config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process `source` until end of stream, stop, or presentation shutdown.
    ///
    /// The source is closed before this returns, whatever the outcome.
    pub async fn run(
        &mut self,
        mut source: Box<dyn FrameSource>,
        updates: mpsc::Sender<PipelineUpdate>,
        cancel: CancellationToken,
    ) -> Result<RunSummary> {
        let session_id = Uuid::new_v4();
        let source_name = source.name();
        let pacer = Pacer::for_source_fps(source.nominal_fps(), &self.config.pacing);
        let mut debouncer = AlarmDebouncer::new(self.config.debounce, self.config.labels.clone());
        let mut metrics = SessionMetrics::default();

        info!(
            "Session {} started on {} ({:.2} fps)",
            session_id,
            source_name,
            pacer.nominal_fps()
        );
        self.publish(FireEvent::SessionStarted {
            session_id,
            source: source_name.clone(),
            nominal_fps: pacer.nominal_fps(),
        });

        let mut deliveries = JoinSet::new();
        let result = self
            .run_loop(
                source.as_mut(),
                &pacer,
                &mut debouncer,
                &mut metrics,
                &mut deliveries,
                &updates,
                &cancel,
            )
            .await;

        source.close().await;
        debug!("Released source {}", source_name);

        if matches!(result, Ok(RunOutcome::Stopped)) {
            // Sinks keep their own timeout; stop does not wait on them
            if !deliveries.is_empty() {
                debug!("Leaving {} notification deliveries in flight", deliveries.len());
            }
            deliveries.detach_all();
        } else {
            while deliveries.join_next().await.is_some() {}
        }

        match result {
            Ok(outcome) => {
                info!(
                    "Session {} finished ({:?}) after {} frames",
                    session_id, outcome, metrics.frames_processed
                );
                self.publish(FireEvent::SessionFinished {
                    session_id,
                    outcome,
                    frames_processed: metrics.frames_processed,
                });

                Ok(RunSummary {
                    session_id,
                    outcome,
                    metrics,
                    final_state: debouncer.state(),
                })
            }
            Err(e) => {
                error!("Session {} failed: {}", session_id, e);
                self.publish(FireEvent::SystemError {
                    component: "pipeline".to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_loop(
        &mut self,
        source: &mut dyn FrameSource,
        pacer: &Pacer,
        debouncer: &mut AlarmDebouncer,
        metrics: &mut SessionMetrics,
        deliveries: &mut JoinSet<()>,
        updates: &mpsc::Sender<PipelineUpdate>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let run_started = Instant::now();
        let mut last_timestamp = Duration::ZERO;

        loop {
            if cancel.is_cancelled() {
                return Ok(RunOutcome::Stopped);
            }

            while deliveries.try_join_next().is_some() {}
            self.handle_manual_alarms(debouncer, deliveries);

            let frame_started = Instant::now();
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(RunOutcome::Stopped),
                next = source.next_frame() => next,
            };
            let frame = match next {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(RunOutcome::EndOfStream),
                Err(SourceError::Decode { index, details }) => {
                    // Scored as a degenerate frame so the session survives
                    warn!("Frame {} could not be decoded: {}", index, details);
                    FrameData::new(index, last_timestamp, RgbImage::new(0, 0))
                }
                Err(e) => return Err(e.into()),
            };
            last_timestamp = frame.timestamp;

            let detector = Arc::clone(&self.detector);
            let (frame, detection) = tokio::task::spawn_blocking(move || {
                let detection = detector.detect(&frame);
                (frame, detection)
            })
            .await
            .map_err(|e| {
                FirewatchError::component("fire_detector", format!("Detection task failed: {}", e))
            })?;

            metrics.record_frame_since(run_started);

            match debouncer.observe(detection.fire_detected, frame.timestamp) {
                Some(AlarmTransition::Raised(notification)) => {
                    warn!("{}", alarm_warning(frame.id, detection.fire_ratio, metrics));
                    self.raise(notification, deliveries);
                }
                Some(AlarmTransition::Cleared { frame_time }) => {
                    self.publish(FireEvent::AlarmCleared {
                        frame_time,
                        timestamp: SystemTime::now(),
                    });
                }
                None => {}
            }

            let alarm_state = debouncer.state();
            let frame_id = frame.id;
            let mut annotated_frame = frame.into_image();
            self.annotator.annotate(
                &mut annotated_frame,
                &detection,
                alarm_state.active,
                metrics.instantaneous_fps,
            );

            let update = PipelineUpdate {
                frame_id,
                annotated_frame,
                metrics: *metrics,
                alarm_state,
                detection,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(RunOutcome::Stopped),
                sent = updates.send(update) => {
                    if sent.is_err() {
                        info!("Presentation receiver closed, ending session");
                        return Ok(RunOutcome::PresentationClosed);
                    }
                }
            }

            if !pacer.pace(frame_started, cancel).await {
                return Ok(RunOutcome::Stopped);
            }
        }
    }

    fn handle_manual_alarms(&mut self, debouncer: &AlarmDebouncer, deliveries: &mut JoinSet<()>) {
        let requests = match self.manual_alarms.as_mut() {
            Some(queue) => queue.drain(),
            None => return,
        };

        for request in requests {
            let notification = debouncer.manual(&request);
            self.raise(notification, deliveries);
        }
    }

    /// Publish the alarm and hand delivery to a background task so a slow
    /// sink never holds up frames or stop
    fn raise(&self, notification: AlarmNotification, deliveries: &mut JoinSet<()>) {
        if self.dispatcher.sink_count() > 0 {
            let dispatcher = self.dispatcher.clone();
            let pending = notification.clone();
            deliveries.spawn(async move {
                let delivered = dispatcher.dispatch(&pending).await;
                if delivered < dispatcher.sink_count() {
                    warn!(
                        "Alarm {} reached {}/{} sinks",
                        pending.id,
                        delivered,
                        dispatcher.sink_count()
                    );
                }
            });
        }

        self.publish(FireEvent::AlarmRaised { notification });
    }

    fn publish(&self, event: FireEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish_lossy(event);
        }
    }

    /// Run on its own task; the pipeline is handed back with the summary
    pub fn spawn(
        mut self,
        source: Box<dyn FrameSource>,
        updates: mpsc::Sender<PipelineUpdate>,
        cancel: CancellationToken,
    ) -> JoinHandle<(Self, Result<RunSummary>)> {
        tokio::spawn(async move {
            let result = self.run(source, updates, cancel).await;
            (self, result)
        })
    }
}

/// Operator-facing line logged when an alarm is raised
fn alarm_warning(frame_id: u64, fire_ratio: f64, metrics: &SessionMetrics) -> String {
    format!(
        "Possible fire detected at frame {} (ratio {:.4}, FPS: {:.1})",
        frame_id, fire_ratio, metrics.instantaneous_fps
    )
}
