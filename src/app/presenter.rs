use crate::error::{FirewatchError, Result};
use crate::pipeline::PipelineUpdate;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const PROGRESS_EVERY: u64 = 100;

/// Counters reported when the presentation channel closes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenterStats {
    pub updates_received: u64,
    pub alarmed_frames: u64,
    pub snapshots_saved: u64,
}

/// Headless presentation sink: logs progress and saves the annotated frame
/// whenever the automatic alarm goes active
pub struct Presenter {
    snapshot_dir: Option<PathBuf>,
}

impl Presenter {
    pub fn new(snapshot_dir: Option<PathBuf>) -> Self {
        Self { snapshot_dir }
    }

    /// Consume updates until the pipeline drops its sender
    pub async fn run(self, mut updates: mpsc::Receiver<PipelineUpdate>) -> PresenterStats {
        if let Some(dir) = &self.snapshot_dir {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                warn!(
                    "Failed to create snapshot directory {}: {}",
                    dir.display(),
                    e
                );
            }
        }

        let mut stats = PresenterStats::default();
        let mut was_active = false;

        while let Some(update) = updates.recv().await {
            stats.updates_received += 1;

            let active = update.alarm_state.active;
            if active {
                stats.alarmed_frames += 1;
            }

            if active && !was_active {
                info!(
                    "Alarm active from frame {} ({} region(s), ratio {:.4})",
                    update.frame_id,
                    update.detection.regions.len(),
                    update.detection.fire_ratio
                );

                match self.save_snapshot(&update).await {
                    Ok(Some(path)) => {
                        stats.snapshots_saved += 1;
                        info!("Saved alarm snapshot to {}", path.display());
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Failed to save alarm snapshot: {}", e),
                }
            } else if !active && was_active {
                info!("Alarm inactive from frame {}", update.frame_id);
            }
            was_active = active;

            if update.metrics.frames_processed % PROGRESS_EVERY == 0 {
                info!(
                    "Processed {} frames ({:.1} fps)",
                    update.metrics.frames_processed, update.metrics.instantaneous_fps
                );
            } else {
                debug!(
                    "Frame {}: fire={} ratio={:.4}",
                    update.frame_id, update.detection.fire_detected, update.detection.fire_ratio
                );
            }
        }

        debug!("Presentation channel closed");
        stats
    }

    async fn save_snapshot(&self, update: &PipelineUpdate) -> Result<Option<PathBuf>> {
        let Some(dir) = &self.snapshot_dir else {
            return Ok(None);
        };

        let stamp = DateTime::<Utc>::from(SystemTime::now()).format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("alarm_{}_frame{:06}.jpg", stamp, update.frame_id));

        let image = update.annotated_frame.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || image.save(&target))
            .await
            .map_err(|e| FirewatchError::component("presenter", e.to_string()))?
            .map_err(|e| {
                FirewatchError::component(
                    "presenter",
                    format!("Failed to write {}: {}", path.display(), e),
                )
            })?;

        Ok(Some(path))
    }
}
