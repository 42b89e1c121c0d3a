mod monitor;
mod orchestrator;
mod presenter;
mod runtime;
mod types;

#[cfg(test)]
mod tests;

pub use monitor::AlarmActivity;
pub use orchestrator::FirewatchApp;
pub use presenter::{Presenter, PresenterStats};
pub use types::ShutdownReason;
