use super::notify::NotificationSink;
use super::types::AlarmNotification;
use crate::error::{FirewatchError, NotificationError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// One line of the alarm log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmLogEntry {
    pub id: Uuid,
    pub alarm_time: String,
    pub alarm_type: String,
    pub location: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_time_ms: Option<u64>,
}

/// Resolve configured timezone, falling back to UTC on parse errors
pub(crate) fn resolve_timezone(tz_name: &str) -> Tz {
    match tz_name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!("Invalid alarm log timezone '{}', falling back to UTC", tz_name);
            chrono_tz::UTC
        }
    }
}

/// Durable alarm history kept as JSON lines, one entry per raised alarm
pub struct AlarmLog {
    path: PathBuf,
    timezone: Tz,
    write_lock: Mutex<()>,
}

impl AlarmLog {
    /// Open (creating parent directories if needed) an alarm log
    pub async fn open<P: AsRef<Path>>(path: P, timezone: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    FirewatchError::component(
                        "alarm_log",
                        format!("Failed to create log directory: {}", e),
                    )
                })?;
                info!("Created alarm log directory: {}", parent.display());
            }
        }

        Ok(Self {
            path,
            timezone: resolve_timezone(timezone),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_for(&self, notification: &AlarmNotification) -> AlarmLogEntry {
        let raised = DateTime::<Utc>::from(notification.timestamp).with_timezone(&self.timezone);

        AlarmLogEntry {
            id: notification.id,
            alarm_time: raised.format("%Y-%m-%d %H:%M:%S").to_string(),
            alarm_type: notification.classification.as_str().to_string(),
            location: notification.location.clone(),
            description: notification.description.clone(),
            frame_time_ms: notification.frame_time.map(|t| t.as_millis() as u64),
        }
    }

    /// Append one entry to the log file
    pub async fn append(&self, entry: &AlarmLogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Appended alarm {} to {}", entry.id, self.path.display());
        Ok(())
    }

    /// Read every entry currently in the log
    pub async fn read_entries(&self) -> Result<Vec<AlarmLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path).await?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(FirewatchError::from))
            .collect()
    }
}

#[async_trait]
impl NotificationSink for AlarmLog {
    async fn notify(&self, notification: &AlarmNotification) -> std::result::Result<(), NotificationError> {
        let entry = self.entry_for(notification);
        self.append(&entry)
            .await
            .map_err(|e| NotificationError::Dispatch {
                sink: self.sink_name().to_string(),
                details: e.to_string(),
            })
    }

    fn sink_name(&self) -> &str {
        "alarm_log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::types::ManualAlarm;
    use std::time::Duration;

    #[tokio::test]
    async fn test_appends_one_line_per_alarm() {
        let dir = tempfile::tempdir().unwrap();
        let log = AlarmLog::open(dir.path().join("logs/alarms.jsonl"), "UTC")
            .await
            .unwrap();

        let automatic = AlarmNotification::automatic(
            Duration::from_millis(1500),
            Some("video file: demo.mp4"),
            Some("automatic detection found possible fire"),
        );
        let manual = AlarmNotification::manual(&ManualAlarm::new("kitchen", "").unwrap());

        log.notify(&automatic).await.unwrap();
        log.notify(&manual).await.unwrap();

        let entries = log.read_entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].alarm_type, "automatic");
        assert_eq!(entries[0].location, "video file: demo.mp4");
        assert_eq!(entries[0].frame_time_ms, Some(1500));
        assert_eq!(entries[1].alarm_type, "manual");
        assert_eq!(entries[1].description, "no reason given");
        assert_eq!(entries[1].frame_time_ms, None);

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_alarm_time_format() {
        let dir = tempfile::tempdir().unwrap();
        let log = AlarmLog::open(dir.path().join("alarms.jsonl"), "Not/AZone")
            .await
            .unwrap();

        let entry = log.entry_for(&AlarmNotification::automatic(Duration::ZERO, None, None));
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(entry.alarm_time.len(), 19);
        assert_eq!(&entry.alarm_time[4..5], "-");
        assert_eq!(&entry.alarm_time[10..11], " ");
    }

    #[tokio::test]
    async fn test_missing_log_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = AlarmLog::open(dir.path().join("none.jsonl"), "UTC").await.unwrap();
        assert!(log.read_entries().await.unwrap().is_empty());
    }
}
