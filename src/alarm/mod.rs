mod debouncer;
mod history;
mod manual;
mod notify;
mod types;

pub use debouncer::{AlarmDebouncer, AlarmLabels};
pub use history::{AlarmLog, AlarmLogEntry};
pub use manual::{manual_alarm_channel, ManualAlarmHandle, ManualAlarmQueue};
pub use notify::{LogNotifier, NotificationDispatcher, NotificationSink};
pub use types::{AlarmClassification, AlarmNotification, AlarmState, AlarmTransition, ManualAlarm};
