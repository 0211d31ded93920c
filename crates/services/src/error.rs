//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuizError, QuizId, SubmissionError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::sessions::SessionPhase;

/// Errors emitted by the session controller for events that do not fit the current state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("event not accepted while {0:?}")]
    WrongPhase(SessionPhase),
    #[error("option {index} out of range for {len} options")]
    OptionOutOfRange { index: usize, len: usize },
    #[error("card must be flipped before answering")]
    CardNotRevealed,
    #[error("answer mechanic not available for this question")]
    UnsupportedInput,
}

/// Errors emitted by `ProgressionLedger`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressionError {
    #[error("quiz {0} not found")]
    UnknownQuiz(QuizId),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the finalize operation.
///
/// The session result is never consumed by a failed finalize, so callers can retry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FinalizeError {
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(#[source] StorageError),
    #[error("quiz {0} not found")]
    UnknownQuiz(QuizId),
    #[error(transparent)]
    InvalidSubmission(#[from] SubmissionError),
}

impl From<StorageError> for FinalizeError {
    fn from(err: StorageError) -> Self {
        Self::PersistenceUnavailable(err)
    }
}

impl From<ProgressionError> for FinalizeError {
    fn from(err: ProgressionError) -> Self {
        match err {
            ProgressionError::UnknownQuiz(id) => Self::UnknownQuiz(id),
            ProgressionError::Submission(e) => Self::InvalidSubmission(e),
            ProgressionError::Storage(e) => Self::PersistenceUnavailable(e),
        }
    }
}

/// Errors emitted by `SubmissionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionServiceError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
