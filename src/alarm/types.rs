use crate::error::NotificationError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

pub(crate) const UNKNOWN_LOCATION: &str = "unknown";
pub(crate) const NO_DESCRIPTION: &str = "none";
pub(crate) const NO_REASON: &str = "no reason given";

/// Which channel raised an alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmClassification {
    Automatic,
    Manual,
}

impl AlarmClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmClassification::Automatic => "automatic",
            AlarmClassification::Manual => "manual",
        }
    }
}

impl std::fmt::Display for AlarmClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload handed to notification sinks when an alarm is raised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmNotification {
    pub id: Uuid,
    pub classification: AlarmClassification,
    /// Wall-clock time the alarm was raised
    pub timestamp: SystemTime,
    /// Stream position of the raising frame (automatic alarms only)
    pub frame_time: Option<Duration>,
    pub location: String,
    pub description: String,
}

impl AlarmNotification {
    pub(crate) fn automatic(
        frame_time: Duration,
        location: Option<&str>,
        description: Option<&str>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            classification: AlarmClassification::Automatic,
            timestamp: SystemTime::now(),
            frame_time: Some(frame_time),
            location: non_empty_or(location, UNKNOWN_LOCATION),
            description: non_empty_or(description, NO_DESCRIPTION),
        }
    }

    pub(crate) fn manual(request: &ManualAlarm) -> Self {
        Self {
            id: Uuid::new_v4(),
            classification: AlarmClassification::Manual,
            timestamp: SystemTime::now(),
            frame_time: None,
            location: request.location.clone(),
            description: non_empty_or(Some(request.reason.as_str()), NO_REASON),
        }
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

/// Operator-initiated alarm request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualAlarm {
    location: String,
    reason: String,
}

impl ManualAlarm {
    /// Build a manual alarm; the location must not be blank
    pub fn new<L: Into<String>, R: Into<String>>(
        location: L,
        reason: R,
    ) -> Result<Self, NotificationError> {
        let location = location.into().trim().to_string();
        if location.is_empty() {
            return Err(NotificationError::InvalidRequest {
                details: "manual alarm requires a location".to_string(),
            });
        }

        Ok(Self {
            location,
            reason: reason.into().trim().to_string(),
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Snapshot of the automatic alarm channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmState {
    pub active: bool,
    /// Frame time of the transition that raised the alarm
    pub raised_at: Option<Duration>,
}

/// State change produced by the debouncer
#[derive(Debug, Clone, PartialEq)]
pub enum AlarmTransition {
    Raised(AlarmNotification),
    Cleared { frame_time: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_alarm_requires_location() {
        assert!(ManualAlarm::new("", "smoke").is_err());
        assert!(ManualAlarm::new("   ", "smoke").is_err());

        let alarm = ManualAlarm::new(" loading dock ", "smoke seen").unwrap();
        assert_eq!(alarm.location(), "loading dock");
        assert_eq!(alarm.reason(), "smoke seen");
    }

    #[test]
    fn test_manual_notification_defaults_reason() {
        let alarm = ManualAlarm::new("lab 2", "").unwrap();
        let notification = AlarmNotification::manual(&alarm);

        assert_eq!(notification.classification, AlarmClassification::Manual);
        assert_eq!(notification.location, "lab 2");
        assert_eq!(notification.description, NO_REASON);
        assert!(notification.frame_time.is_none());
    }

    #[test]
    fn test_automatic_notification_defaults() {
        let notification = AlarmNotification::automatic(Duration::from_secs(2), None, Some(""));

        assert_eq!(notification.classification.as_str(), "automatic");
        assert_eq!(notification.location, UNKNOWN_LOCATION);
        assert_eq!(notification.description, NO_DESCRIPTION);
        assert_eq!(notification.frame_time, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_classification_serializes_lowercase() {
        let json = serde_json::to_string(&AlarmClassification::Manual).unwrap();
        assert_eq!(json, "\"manual\"");
    }
}
