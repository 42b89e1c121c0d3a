use crate::alarm::ManualAlarmHandle;
use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const MANUAL_REASON: &str = "raised from the keyboard";

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    ManualAlarm,
    Stop,
    Ignore,
}

impl KeyAction {
    pub fn from_key(code: KeyCode) -> Self {
        match code {
            KeyCode::Char('m') | KeyCode::Char('M') => KeyAction::ManualAlarm,
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => KeyAction::Stop,
            _ => KeyAction::Ignore,
        }
    }
}

/// Terminal keys for operating a session: `m` raises a manual alarm, `q` stops
pub struct KeyboardInputHandler {
    manual_alarms: ManualAlarmHandle,
    location: String,
    session_cancel: CancellationToken,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(
        manual_alarms: ManualAlarmHandle,
        location: String,
        session_cancel: CancellationToken,
    ) -> Self {
        Self {
            manual_alarms,
            location,
            session_cancel,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Apply one action; returns false once the handler should exit
    fn apply(&self, action: KeyAction) -> bool {
        match action {
            KeyAction::ManualAlarm => {
                info!("Manual alarm key pressed");
                if let Err(e) = self.manual_alarms.trigger(self.location.as_str(), MANUAL_REASON) {
                    warn!("Failed to queue manual alarm: {}", e);
                }
                true
            }
            KeyAction::Stop => {
                info!("Quit key pressed - stopping session");
                self.session_cancel.cancel();
                false
            }
            KeyAction::Ignore => true,
        }
    }

    /// Start listening for keyboard input
    pub async fn start(self: std::sync::Arc<Self>) -> Result<()> {
        info!("Starting keyboard input handler - press 'm' for a manual alarm, 'q' to stop");

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if self.cancellation_token.is_cancelled() || self.session_cancel.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        if let Ok(Event::Key(key_event)) = event::read() {
                            // Only handle key press events (not release)
                            if key_event.kind == KeyEventKind::Press {
                                debug!("Key pressed: {:?}", key_event.code);
                                if !self.apply(KeyAction::from_key(key_event.code)) {
                                    break;
                                }
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to clean up and disable raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;

        let _ = disable_raw_mode();

        Ok(())
    }
}
