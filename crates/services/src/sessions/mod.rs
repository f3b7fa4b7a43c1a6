mod progress;
mod queries;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::{NextSlot, SessionProgress};
pub use view::{ItemReport, ResultsService, SessionResults};
pub use workflow::{AttemptOutcome, DEFAULT_TRANSCRIPTION_TIMEOUT, TestRunService};
