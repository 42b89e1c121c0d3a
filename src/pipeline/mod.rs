mod overlay;
mod runner;
mod stats;

pub use overlay::Annotator;
pub use runner::{FireWatchPipeline, FireWatchPipelineBuilder};
pub use stats::SessionMetrics;

use crate::alarm::{AlarmLabels, AlarmState};
use crate::config::{DebounceConfig, DetectorConfig, OverlayConfig, PacingConfig};
use crate::detector::DetectionResult;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything one run needs; fixed for the duration of the run
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub detector: DetectorConfig,
    pub pacing: PacingConfig,
    pub debounce: DebounceConfig,
    pub labels: AlarmLabels,
    pub overlay: OverlayConfig,
}

/// Why a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// The source had no more frames
    EndOfStream,
    /// The stop signal was observed
    Stopped,
    /// The presentation receiver went away
    PresentationClosed,
}

/// Returned when a run finishes
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub session_id: Uuid,
    pub outcome: RunOutcome,
    pub metrics: SessionMetrics,
    pub final_state: AlarmState,
}

/// One processed frame as handed to the presentation layer
#[derive(Debug, Clone)]
pub struct PipelineUpdate {
    pub frame_id: u64,
    pub annotated_frame: RgbImage,
    pub metrics: SessionMetrics,
    pub alarm_state: AlarmState,
    pub detection: DetectionResult,
}
