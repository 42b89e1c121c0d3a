use super::types::ManualAlarm;
use crate::error::{EventBusError, NotificationError};
use tokio::sync::mpsc;
use tracing::debug;

/// Cloneable handle for raising manual alarms from any thread.
///
/// Requests are queued and picked up by the pipeline at its next iteration.
#[derive(Debug, Clone)]
pub struct ManualAlarmHandle {
    sender: mpsc::UnboundedSender<ManualAlarm>,
}

/// Pipeline side of the manual alarm queue
#[derive(Debug)]
pub struct ManualAlarmQueue {
    receiver: mpsc::UnboundedReceiver<ManualAlarm>,
}

/// Create a connected handle/queue pair
pub fn manual_alarm_channel() -> (ManualAlarmHandle, ManualAlarmQueue) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ManualAlarmHandle { sender }, ManualAlarmQueue { receiver })
}

impl ManualAlarmHandle {
    /// Validate and enqueue a manual alarm
    pub fn trigger<L: Into<String>, R: Into<String>>(
        &self,
        location: L,
        reason: R,
    ) -> Result<(), NotificationError> {
        let request = ManualAlarm::new(location, reason)?;
        self.send(request).map_err(|e| NotificationError::Dispatch {
            sink: "manual_alarm_queue".to_string(),
            details: e.to_string(),
        })
    }

    /// Enqueue an already validated request
    pub fn send(&self, request: ManualAlarm) -> Result<(), EventBusError> {
        debug!("Queueing manual alarm for '{}'", request.location());
        self.sender
            .send(request)
            .map_err(|_| EventBusError::ChannelClosed)
    }

    /// True once the pipeline has finished and dropped its queue
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl ManualAlarmQueue {
    /// Take every request queued so far without waiting
    pub fn drain(&mut self) -> Vec<ManualAlarm> {
        let mut requests = Vec::new();
        while let Ok(request) = self.receiver.try_recv() {
            requests.push(request);
        }
        requests
    }
}
