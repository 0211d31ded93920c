use std::sync::Arc;

use quiz_core::badges;
use quiz_core::model::{
    Badge, BadgeTree, ClassId, NewSubmission, ProfileStats, StudentId, SubmissionRecord,
};
use storage::repository::{BadgeRepository, SubmissionFilter, SubmissionRepository};

use crate::error::FinalizeError;
use crate::events::{EventBus, ProgressEvent};
use crate::ledger::{LedgerOutcome, NoOpReason, ProgressionLedger};
use crate::sessions::SessionResult;

/// What happened to progression in a finalize call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressionStatus {
    Applied,
    DuplicateSubmissionIgnored,
    AlreadyRecorded,
}

/// Everything a finalize call produced, returned as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub record: SubmissionRecord,
    pub status: ProgressionStatus,
    pub stats: ProfileStats,
    pub badges: BadgeTree,
    pub newly_unlocked: Vec<Badge>,
}

/// Finalizes attempts: record, progression, badges, notifications.
pub struct CompletionService {
    ledger: Arc<ProgressionLedger>,
    submissions: Arc<dyn SubmissionRepository>,
    badges: Arc<dyn BadgeRepository>,
    events: EventBus,
}

impl CompletionService {
    #[must_use]
    pub fn new(
        ledger: Arc<ProgressionLedger>,
        submissions: Arc<dyn SubmissionRepository>,
        badges: Arc<dyn BadgeRepository>,
        events: EventBus,
    ) -> Self {
        Self {
            ledger,
            submissions,
            badges,
            events,
        }
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Finalize a completed session for `student_id`.
    ///
    /// # Errors
    ///
    /// See [`CompletionService::finalize`].
    pub async fn finalize_session(
        &self,
        result: &SessionResult,
        student_id: StudentId,
        class_id: Option<ClassId>,
    ) -> Result<Completion, FinalizeError> {
        self.finalize(result.to_submission(student_id, class_id))
            .await
    }

    /// Create the submission record, apply progression at most once, and
    /// recompute badges from the full history.
    ///
    /// Safe to retry with the same submission after a failure: the record is
    /// never duplicated and progression is never applied twice.
    ///
    /// # Errors
    ///
    /// Returns `FinalizeError::PersistenceUnavailable` when storage fails, or
    /// a validation variant when the submission cannot be scored.
    pub async fn finalize(&self, submission: NewSubmission) -> Result<Completion, FinalizeError> {
        let student_id = submission.student_id.clone();
        // held until the badge tree is written; both rows belong to the student
        let guard = self.ledger.lock_student(&student_id).await;
        let outcome = self.ledger.apply_locked(submission, &guard).await?;

        if outcome.created_record() {
            let record = outcome.record();
            self.events.publish(ProgressEvent::SubmissionCreated {
                submission_id: record.id(),
                quiz_id: record.quiz_id(),
                student_id: student_id.clone(),
                percent: record.percent(),
            });
        }
        if outcome.is_applied() {
            self.events.publish(ProgressEvent::ProgressApplied {
                submission_id: outcome.record().id(),
                stats: outcome.stats().clone(),
            });
        }

        // recomputed even for no-ops so a retry repairs a failed badge write
        let history = self
            .submissions
            .list_submissions(&SubmissionFilter::for_student(student_id.clone()))
            .await?;
        let current = self
            .badges
            .get_badges(&student_id)
            .await?
            .unwrap_or_else(BadgeTree::catalogue);
        let recompute = badges::recompute(&history, &current);
        if recompute.tree != current {
            self.badges.upsert_badges(&student_id, &recompute.tree).await?;
        }
        drop(guard);

        if !recompute.newly_unlocked.is_empty() {
            tracing::info!(
                student_id = %student_id,
                badges = ?recompute.newly_unlocked.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
                "badges unlocked"
            );
            self.events.publish(ProgressEvent::BadgesUnlocked {
                student_id,
                badges: recompute.newly_unlocked.clone(),
            });
        }

        let status = match &outcome {
            LedgerOutcome::Applied { .. } => ProgressionStatus::Applied,
            LedgerOutcome::NoOp {
                reason: NoOpReason::DuplicateSubmissionIgnored,
                ..
            } => ProgressionStatus::DuplicateSubmissionIgnored,
            LedgerOutcome::NoOp {
                reason: NoOpReason::AlreadyRecorded,
                ..
            } => ProgressionStatus::AlreadyRecorded,
        };
        let (record, stats) = match outcome {
            LedgerOutcome::Applied { record, stats } | LedgerOutcome::NoOp { record, stats, .. } => {
                (record, stats)
            }
        };

        Ok(Completion {
            record,
            status,
            stats,
            badges: recompute.tree,
            newly_unlocked: recompute.newly_unlocked,
        })
    }
}
