pub mod alarm;
pub mod app;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod frame;
pub mod keyboard_input;
pub mod pacer;
pub mod pipeline;
pub mod source;

pub use alarm::{
    manual_alarm_channel, AlarmClassification, AlarmDebouncer, AlarmLabels, AlarmLog,
    AlarmNotification, AlarmState, AlarmTransition, LogNotifier, ManualAlarm, ManualAlarmHandle,
    NotificationDispatcher, NotificationSink,
};
pub use app::{AlarmActivity, FirewatchApp, ShutdownReason};
pub use config::FirewatchConfig;
pub use detector::{detect, DetectionResult, FireDetector, Region};
pub use error::{FirewatchError, Result, SourceError};
pub use events::{EventBus, EventFilter, EventReceiver, FireEvent};
pub use frame::FrameData;
pub use pacer::Pacer;
pub use pipeline::{
    FireWatchPipeline, PipelineConfig, PipelineUpdate, RunOutcome, RunSummary, SessionMetrics,
};
pub use source::{open_source, FrameSource, ImageSequenceSource, MemoryFrameSource, SourceSpec};
