#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod completion_service;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod ledger;
pub mod locks;
pub mod sessions;
pub mod submission_service;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use completion_service::{Completion, CompletionService, ProgressionStatus};
pub use dashboard::{DashboardService, QuizBuckets, StudentDashboard};
pub use error::{
    AppServicesError, CatalogError, FinalizeError, ProgressionError, SessionError,
    SubmissionServiceError,
};
pub use events::{EventBus, ProgressEvent};
pub use ledger::{LedgerOutcome, NoOpReason, ProgressionLedger};
pub use locks::{StudentGuard, StudentLocks};
pub use sessions::{
    Advance, QuizSession, SessionDriver, SessionEvent, SessionHandle, SessionPhase, SessionResult,
};
pub use submission_service::SubmissionService;
