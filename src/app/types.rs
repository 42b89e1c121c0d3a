use crate::pipeline::RunOutcome;

/// Why a session ended, as reported to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    EndOfStream,
    /// Stopped by a signal or the operator
    UserRequest,
    PresentationClosed,
}

impl From<RunOutcome> for ShutdownReason {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::EndOfStream => ShutdownReason::EndOfStream,
            RunOutcome::Stopped => ShutdownReason::UserRequest,
            RunOutcome::PresentationClosed => ShutdownReason::PresentationClosed,
        }
    }
}
