mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::{SessionProgress, SessionTally};
pub use service::{ReviewSession, SessionReview};
pub use workflow::{ReviewSessionService, SessionAnswerResult};
