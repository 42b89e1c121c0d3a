use crate::alarm::AlarmNotification;
use crate::error::EventBusError;
use crate::pipeline::RunOutcome;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events that can occur during a fire watch session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FireEvent {
    /// A pipeline run has opened its source and entered the loop
    SessionStarted {
        session_id: Uuid,
        source: String,
        nominal_fps: f64,
    },
    /// An alarm was raised (automatic or manual)
    AlarmRaised { notification: AlarmNotification },
    /// The automatic alarm returned to idle
    AlarmCleared {
        frame_time: Duration,
        timestamp: SystemTime,
    },
    /// A pipeline run has ended
    SessionFinished {
        session_id: Uuid,
        outcome: RunOutcome,
        frames_processed: u64,
    },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
}

impl FireEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            FireEvent::SessionStarted {
                source,
                nominal_fps,
                ..
            } => format!("Session started on {} at {:.1} fps", source, nominal_fps),
            FireEvent::AlarmRaised { notification } => format!(
                "{} alarm raised at {}: {}",
                notification.classification, notification.location, notification.description
            ),
            FireEvent::AlarmCleared { frame_time, .. } => {
                format!("Alarm cleared at frame time {:?}", frame_time)
            }
            FireEvent::SessionFinished {
                outcome,
                frames_processed,
                ..
            } => format!(
                "Session finished ({:?}) after {} frames",
                outcome, frames_processed
            ),
            FireEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            FireEvent::SessionStarted { .. } => "session_started",
            FireEvent::AlarmRaised { .. } => "alarm_raised",
            FireEvent::AlarmCleared { .. } => "alarm_cleared",
            FireEvent::SessionFinished { .. } => "session_finished",
            FireEvent::SystemError { .. } => "system_error",
        }
    }
}

/// Async event bus for UI-facing notifications using broadcast channels
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FireEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<FireEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: FireEvent) -> Result<usize, EventBusError> {
        debug!("Publishing event: {}", event.description());

        match &event {
            FireEvent::AlarmRaised { notification } => {
                warn!(
                    "Alarm raised ({}) at {}",
                    notification.classification, notification.location
                );
            }
            FireEvent::AlarmCleared { .. } => {
                info!("Alarm cleared");
            }
            FireEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            _ => {}
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish, treating "nobody is listening" as success
    pub fn publish_lossy(&self, event: FireEvent) {
        if self.has_subscribers() {
            if let Err(e) = self.publish(event) {
                debug!("Dropped event with no receivers: {}", e);
            }
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &FireEvent) -> bool {
        match self {
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<FireEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(receiver: broadcast::Receiver<FireEvent>, filter: EventFilter, name: String) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<FireEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
