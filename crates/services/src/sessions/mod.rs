mod controller;
mod driver;
mod presentation;
mod progress;
mod result;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{Advance, Countdown, QuizSession, SessionPhase, TeamTurn, Tick};
pub use driver::{SessionDriver, SessionEvent, SessionHandle};
pub use presentation::Presentation;
pub use progress::SessionProgress;
pub use result::{QuestionOutcome, SessionResult};
