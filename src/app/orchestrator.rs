use super::monitor::{alarm_receiver, watch_alarm_events, AlarmActivity};
use super::presenter::{Presenter, PresenterStats};
use super::runtime::setup_signal_handlers;
use super::ShutdownReason;
use crate::alarm::{manual_alarm_channel, AlarmLog, LogNotifier, NotificationDispatcher};
use crate::config::FirewatchConfig;
use crate::error::{FirewatchError, Result};
use crate::events::EventBus;
use crate::keyboard_input::KeyboardInputHandler;
use crate::pipeline::{FireWatchPipeline, RunSummary};
use crate::source::{open_source, SourceSpec};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Wires one fire watch session together: source, pipeline, notification
/// sinks, presentation and operator controls
pub struct FirewatchApp {
    config: FirewatchConfig,
    source_spec: SourceSpec,
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
    keyboard_enabled: bool,
}

impl FirewatchApp {
    pub fn new(config: FirewatchConfig, source_spec: SourceSpec) -> Self {
        let event_bus = Arc::new(EventBus::new(config.output.event_bus_capacity));

        Self {
            config,
            source_spec,
            event_bus,
            cancellation_token: CancellationToken::new(),
            keyboard_enabled: false,
        }
    }

    /// Enable the 'm'/'q' terminal controls
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Token that stops the session when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    async fn build_dispatcher(&self) -> Result<NotificationDispatcher> {
        let mut dispatcher = NotificationDispatcher::new(self.config.dispatch_timeout())
            .with_sink(Arc::new(LogNotifier));

        if let Some(log_path) = &self.config.alarm.log_path {
            let log = AlarmLog::open(log_path, &self.config.alarm.timezone).await?;
            info!("Recording alarms to {}", log.path().display());
            dispatcher.add_sink(Arc::new(log));
        }

        Ok(dispatcher)
    }

    /// Run the session to completion and report why it ended
    pub async fn run(&mut self) -> Result<ShutdownReason> {
        let pipeline_config = self.config.pipeline_config(&self.source_spec);
        let location = pipeline_config
            .labels
            .location
            .clone()
            .unwrap_or_else(|| self.source_spec.default_location());

        let (manual_handle, manual_queue) = manual_alarm_channel();
        let pipeline = FireWatchPipeline::builder(pipeline_config)
            .with_dispatcher(self.build_dispatcher().await?)
            .with_event_bus(Arc::clone(&self.event_bus))
            .with_manual_alarms(manual_queue)
            .build()?;

        let source = open_source(&self.source_spec, self.config.output.sequence_fps).await?;

        setup_signal_handlers(self.cancellation_token.clone());

        let keyboard = if self.keyboard_enabled {
            let handler = Arc::new(KeyboardInputHandler::new(
                manual_handle,
                location,
                self.cancellation_token.clone(),
            ));
            Arc::clone(&handler).start().await?;
            Some(handler)
        } else {
            None
        };

        let (updates_tx, updates_rx) = mpsc::channel(self.config.output.channel_capacity);
        let presenter = Presenter::new(self.config.output.snapshot_dir.as_ref().map(PathBuf::from));
        let presenter_task = tokio::spawn(presenter.run(updates_rx));

        let monitor_stop = CancellationToken::new();
        let monitor_task = tokio::spawn(watch_alarm_events(
            alarm_receiver(self.event_bus.subscribe()),
            monitor_stop.clone(),
        ));

        let pipeline_task =
            pipeline.spawn(source, updates_tx, self.cancellation_token.clone());

        let joined = pipeline_task.await;

        if let Some(handler) = keyboard {
            handler.stop().await?;
        }
        // Wake the signal tasks so they exit
        self.cancellation_token.cancel();

        let stats = presenter_task.await.unwrap_or_else(|e| {
            error!("Presenter task failed: {}", e);
            PresenterStats::default()
        });

        monitor_stop.cancel();
        let activity = monitor_task.await.unwrap_or_else(|e| {
            error!("Alarm activity task failed: {}", e);
            AlarmActivity::default()
        });

        let (_, result) = joined.map_err(|e| {
            FirewatchError::component("pipeline", format!("Pipeline task failed: {}", e))
        })?;

        match result {
            Ok(summary) => {
                log_summary(&summary, &stats, &activity);
                Ok(ShutdownReason::from(summary.outcome))
            }
            Err(e) => {
                error!("Fire watch session failed: {}", e);
                Err(e)
            }
        }
    }
}

fn log_summary(summary: &RunSummary, stats: &PresenterStats, activity: &AlarmActivity) {
    info!(
        "Session {} ended ({:?}): {} frames in {:.1}s ({:.1} fps), {} alarmed frame(s), {} snapshot(s)",
        summary.session_id,
        summary.outcome,
        summary.metrics.frames_processed,
        summary.metrics.elapsed.as_secs_f64(),
        summary.metrics.instantaneous_fps,
        stats.alarmed_frames,
        stats.snapshots_saved
    );
    info!(
        "Alarms raised: {} automatic, {} manual; {} cleared",
        activity.automatic_raised, activity.manual_raised, activity.cleared
    );
}
