use crate::alarm::AlarmClassification;
use crate::error::EventBusError;
use crate::events::{EventFilter, EventReceiver, FireEvent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Alarm traffic seen on the bus during one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmActivity {
    pub automatic_raised: u64,
    pub manual_raised: u64,
    pub cleared: u64,
    pub system_errors: u64,
}

impl AlarmActivity {
    pub fn total_raised(&self) -> u64 {
        self.automatic_raised + self.manual_raised
    }
}

pub(super) fn alarm_receiver(receiver: tokio::sync::broadcast::Receiver<FireEvent>) -> EventReceiver {
    let filter = EventFilter::EventTypes(vec![
        "alarm_raised",
        "alarm_cleared",
        "session_finished",
        "system_error",
    ]);
    EventReceiver::new(receiver, filter, "alarm_activity".to_string())
}

/// Tally alarm events until the session finishes or fails.
///
/// Events already queued are counted before `stop` is honoured.
pub(super) async fn watch_alarm_events(
    mut receiver: EventReceiver,
    stop: CancellationToken,
) -> AlarmActivity {
    let mut activity = AlarmActivity::default();

    loop {
        let received = tokio::select! {
            biased;
            received = receiver.recv() => received,
            _ = stop.cancelled() => break,
        };

        match received {
            Ok(FireEvent::AlarmRaised { notification }) => match notification.classification {
                AlarmClassification::Automatic => activity.automatic_raised += 1,
                AlarmClassification::Manual => activity.manual_raised += 1,
            },
            Ok(FireEvent::AlarmCleared { .. }) => activity.cleared += 1,
            Ok(FireEvent::SystemError { .. }) => {
                activity.system_errors += 1;
                break;
            }
            Ok(FireEvent::SessionFinished { .. }) => break,
            Ok(_) => {}
            Err(EventBusError::ChannelClosed) => break,
            Err(e) => warn!("Alarm activity count may be incomplete: {}", e),
        }
    }

    debug!("Alarm activity: {:?}", activity);
    activity
}
