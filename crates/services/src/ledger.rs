use std::sync::Arc;

use quiz_core::model::{
    AnswerEntry, NewSubmission, ProfileStats, Quiz, QuizId, StudentId, SubmissionRecord,
};
use quiz_core::{Clock, progression, scoring};
use storage::repository::{
    ProfileRepository, ProgressionRepository, QuizRepository, StorageError, SubmissionFilter,
    SubmissionRepository,
};
use crate::error::ProgressionError;
use crate::locks::{StudentGuard, StudentLocks};

/// Why the ledger left the profile untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// A progressed attempt already exists for this quiz and student. The new
    /// attempt was recorded for audit only.
    DuplicateSubmissionIgnored,
    /// This exact submission was stored by an earlier call.
    AlreadyRecorded,
}

/// Result of handing one attempt to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    Applied {
        record: SubmissionRecord,
        stats: ProfileStats,
    },
    NoOp {
        record: SubmissionRecord,
        stats: ProfileStats,
        reason: NoOpReason,
    },
}

impl LedgerOutcome {
    #[must_use]
    pub fn record(&self) -> &SubmissionRecord {
        match self {
            Self::Applied { record, .. } | Self::NoOp { record, .. } => record,
        }
    }

    /// Profile after this call; unchanged for `NoOp`.
    #[must_use]
    pub fn stats(&self) -> &ProfileStats {
        match self {
            Self::Applied { stats, .. } | Self::NoOp { stats, .. } => stats,
        }
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// A new record was written by this call.
    #[must_use]
    pub fn created_record(&self) -> bool {
        !matches!(
            self,
            Self::NoOp {
                reason: NoOpReason::AlreadyRecorded,
                ..
            }
        )
    }
}

/// Converts finished attempts into profile progression, at most once per quiz and student.
///
/// Calls for the same student are serialized by a per-student lock, since the
/// profile row is shared by all of that student's quizzes. The storage layer
/// additionally rejects a second progressed record.
pub struct ProgressionLedger {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    profiles: Arc<dyn ProfileRepository>,
    progression: Arc<dyn ProgressionRepository>,
    locks: StudentLocks,
}

impl ProgressionLedger {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        profiles: Arc<dyn ProfileRepository>,
        progression: Arc<dyn ProgressionRepository>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            submissions,
            profiles,
            progression,
            locks: StudentLocks::new(),
        }
    }

    /// Exclusive access to `student_id`'s profile. Callers that go on to
    /// rewrite other per-student rows keep the guard across those writes.
    pub async fn lock_student(&self, student_id: &StudentId) -> StudentGuard {
        self.locks.lock(student_id).await
    }

    #[cfg(test)]
    pub(crate) fn tracked_students(&self) -> usize {
        self.locks.tracked()
    }

    async fn current_stats(&self, student_id: &StudentId) -> Result<ProfileStats, StorageError> {
        Ok(self
            .profiles
            .get_profile(student_id)
            .await?
            .unwrap_or_else(|| ProfileStats::new(student_id.clone())))
    }

    /// Record `submission` and apply its progression unless this quiz already
    /// progressed for the student.
    ///
    /// Retrying with the same submission id returns the stored record without
    /// writing anything.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::Storage` on persistence failure (nothing is
    /// half-applied), `UnknownQuiz` when a score must be computed for a missing
    /// quiz, or `Submission` when the provided figures are inconsistent.
    pub async fn apply(&self, submission: NewSubmission) -> Result<LedgerOutcome, ProgressionError> {
        let guard = self.lock_student(&submission.student_id).await;
        self.apply_locked(submission, &guard).await
    }

    /// [`ProgressionLedger::apply`] for a caller already holding the student's lock.
    pub(crate) async fn apply_locked(
        &self,
        submission: NewSubmission,
        guard: &StudentGuard,
    ) -> Result<LedgerOutcome, ProgressionError> {
        debug_assert_eq!(guard.student_id(), &submission.student_id);

        match self.submissions.get_submission(submission.id).await {
            Ok(record) => {
                let stats = self.current_stats(record.student_id()).await?;
                tracing::debug!(submission_id = %record.id(), "submission already recorded");
                return Ok(LedgerOutcome::NoOp {
                    record,
                    stats,
                    reason: NoOpReason::AlreadyRecorded,
                });
            }
            Err(StorageError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let record = self.score(submission).await?;
        let quiz_id = record.quiz_id();
        let student_id = record.student_id().clone();

        if self
            .submissions
            .has_applied_progress(quiz_id, &student_id)
            .await?
        {
            return self.record_duplicate(record).await;
        }

        let current = self.current_stats(&student_id).await?;
        let history: Vec<SubmissionRecord> = self
            .submissions
            .list_submissions(&SubmissionFilter::for_student(student_id.clone()))
            .await?
            .into_iter()
            .filter(SubmissionRecord::progress_applied)
            .collect();
        let stats = progression::advance(&current, &record, &history);
        let record = record.with_progress_applied();

        match self.progression.commit_progression(&record, &stats).await {
            Ok(()) => {}
            // another writer progressed this quiz first
            Err(StorageError::Conflict) => {
                tracing::warn!(
                    %quiz_id,
                    student_id = %student_id,
                    "progression conflict, recording attempt without progress"
                );
                let record = SubmissionRecord::from_persisted(
                    record.id(),
                    record.quiz_id(),
                    record.student_id().clone(),
                    record.class_id().cloned(),
                    record.answers().to_vec(),
                    record.score(),
                    record.total_possible(),
                    record.percent(),
                    record.submitted_at(),
                    record.graded_at(),
                    false,
                )?;
                return self.record_duplicate(record).await;
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            %quiz_id,
            student_id = %student_id,
            percent = record.percent(),
            experience = stats.experience(),
            level = stats.level(),
            "progression applied"
        );
        Ok(LedgerOutcome::Applied { record, stats })
    }

    async fn record_duplicate(
        &self,
        record: SubmissionRecord,
    ) -> Result<LedgerOutcome, ProgressionError> {
        match self.submissions.insert_submission(&record).await {
            Ok(()) => {}
            Err(StorageError::Conflict) => {
                let stored = self.submissions.get_submission(record.id()).await?;
                let stats = self.current_stats(stored.student_id()).await?;
                return Ok(LedgerOutcome::NoOp {
                    record: stored,
                    stats,
                    reason: NoOpReason::AlreadyRecorded,
                });
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(
            quiz_id = %record.quiz_id(),
            student_id = %record.student_id(),
            "duplicate submission ignored for progression"
        );
        let stats = self.current_stats(record.student_id()).await?;
        Ok(LedgerOutcome::NoOp {
            record,
            stats,
            reason: NoOpReason::DuplicateSubmissionIgnored,
        })
    }

    /// Build the record, computing any missing figures from the quiz.
    async fn score(&self, submission: NewSubmission) -> Result<SubmissionRecord, ProgressionError> {
        let now = self.clock.now();
        let needs_quiz = submission.score.is_none() || submission.total_possible.is_none();

        let (answers, score, total) = if needs_quiz {
            let quiz = self.load_quiz(submission.quiz_id).await?;
            let tally = scoring::tally(&quiz, &submission.answers);
            let answers = judge_answers(&quiz, submission.answers.clone());
            (
                answers,
                submission.score.unwrap_or(tally.score),
                submission.total_possible.unwrap_or(tally.total_possible),
            )
        } else {
            (
                submission.answers.clone(),
                submission.score.unwrap_or_default(),
                submission.total_possible.unwrap_or_default(),
            )
        };
        let percent = submission
            .percent
            .map_or_else(|| scoring::percent(score, total), |p| p.min(100));

        let draft = NewSubmission {
            answers,
            ..submission
        };
        Ok(SubmissionRecord::new(draft, score, total, percent, now)?)
    }

    async fn load_quiz(&self, quiz_id: QuizId) -> Result<Quiz, ProgressionError> {
        match self.quizzes.get_quiz(quiz_id).await {
            Ok(quiz) => Ok(quiz),
            Err(StorageError::NotFound) => Err(ProgressionError::UnknownQuiz(quiz_id)),
            Err(e) => Err(e.into()),
        }
    }
}

fn judge_answers(quiz: &Quiz, answers: Vec<AnswerEntry>) -> Vec<AnswerEntry> {
    answers
        .into_iter()
        .map(|entry| match quiz.question(entry.question_id) {
            Some(question) => {
                let correct = scoring::judge(question.expected_answer(), &entry.answer);
                entry.judged(correct)
            }
            None => entry.judged(false),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionDraft, QuestionId, QuizDraft};
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn ledger(repo: &InMemoryRepository) -> ProgressionLedger {
        ProgressionLedger::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    async fn seed_quiz(repo: &InMemoryRepository) {
        let quiz = QuizDraft::new(1, "Cells")
            .with_question(QuestionDraft::identification(1, "Q1", "Alpha").with_points(40))
            .with_question(QuestionDraft::identification(2, "Q2", "Beta").with_points(60))
            .validate()
            .unwrap();
        repo.upsert_quiz(&quiz).await.unwrap();
    }

    fn answers(both: bool) -> Vec<AnswerEntry> {
        let mut out = vec![AnswerEntry::new(QuestionId::new(1), "alpha")];
        if both {
            out.push(AnswerEntry::new(QuestionId::new(2), "beta"));
        }
        out
    }

    #[tokio::test]
    async fn computes_missing_score_from_quiz() {
        let repo = InMemoryRepository::new();
        seed_quiz(&repo).await;
        let ledger = ledger(&repo);

        let outcome = ledger
            .apply(NewSubmission::new(QuizId::new(1), StudentId::new("s1"), answers(false)))
            .await
            .unwrap();

        let record = outcome.record();
        assert_eq!(record.score(), 40);
        assert_eq!(record.total_possible(), 100);
        assert_eq!(record.percent(), 40);
        assert_eq!(record.answers()[0].correct, Some(true));
        assert!(outcome.is_applied());
        assert_eq!(outcome.stats().experience(), 40);
    }

    #[tokio::test]
    async fn second_attempt_is_recorded_without_progress() {
        let repo = InMemoryRepository::new();
        seed_quiz(&repo).await;
        let ledger = ledger(&repo);
        let student = StudentId::new("s1");

        let first = ledger
            .apply(NewSubmission::new(QuizId::new(1), student.clone(), answers(false)))
            .await
            .unwrap();
        let second = ledger
            .apply(NewSubmission::new(QuizId::new(1), student.clone(), answers(true)))
            .await
            .unwrap();

        assert!(matches!(
            second,
            LedgerOutcome::NoOp {
                reason: NoOpReason::DuplicateSubmissionIgnored,
                ..
            }
        ));
        assert_eq!(second.stats(), first.stats());
        assert!(!second.record().progress_applied());
        assert_eq!(
            repo.get_profile(&student).await.unwrap().as_ref(),
            Some(first.stats())
        );
        let all = repo
            .list_submissions(&SubmissionFilter::for_student(student))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn retried_submission_is_not_stored_twice() {
        let repo = InMemoryRepository::new();
        seed_quiz(&repo).await;
        let ledger = ledger(&repo);
        let submission = NewSubmission::new(QuizId::new(1), StudentId::new("s1"), answers(true));

        let first = ledger.apply(submission.clone()).await.unwrap();
        let retry = ledger.apply(submission).await.unwrap();

        assert!(first.is_applied());
        assert!(!retry.created_record());
        assert_eq!(retry.record(), first.record());
        assert_eq!(retry.stats(), first.stats());
    }

    #[tokio::test]
    async fn concurrent_applies_progress_once() {
        let repo = InMemoryRepository::new();
        seed_quiz(&repo).await;
        let ledger = Arc::new(ledger(&repo));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            tasks.push(tokio::spawn(async move {
                ledger
                    .apply(NewSubmission::new(QuizId::new(1), StudentId::new("s1"), answers(true)))
                    .await
                    .unwrap()
            }));
        }
        let mut applied = 0;
        for task in tasks {
            if task.await.unwrap().is_applied() {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        let stats = repo.get_profile(&StudentId::new("s1")).await.unwrap().unwrap();
        assert_eq!(stats.experience(), 100);
        assert_eq!(stats.perfect_count(), 1);
    }

    #[tokio::test]
    async fn student_locks_are_released_after_apply() {
        let repo = InMemoryRepository::new();
        seed_quiz(&repo).await;
        let ledger = ledger(&repo);

        for n in 0..5 {
            ledger
                .apply(NewSubmission::new(QuizId::new(1), StudentId::new(format!("s{n}")), answers(true)))
                .await
                .unwrap();
        }
        assert_eq!(ledger.tracked_students(), 0);
    }

    #[tokio::test]
    async fn unknown_quiz_without_score_is_rejected() {
        let repo = InMemoryRepository::new();
        let ledger = ledger(&repo);
        let err = ledger
            .apply(NewSubmission::new(QuizId::new(5), StudentId::new("s1"), Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressionError::UnknownQuiz(id) if id == QuizId::new(5)));
    }

    #[tokio::test]
    async fn provided_score_is_trusted() {
        let repo = InMemoryRepository::new();
        let ledger = ledger(&repo);
        let outcome = ledger
            .apply(
                NewSubmission::new(QuizId::new(9), StudentId::new("s1"), Vec::new())
                    .with_score(8, 10, 80),
            )
            .await
            .unwrap();
        assert_eq!(outcome.record().percent(), 80);
        assert_eq!(outcome.stats().experience(), 80);
        assert_eq!(outcome.stats().accuracy(), 80);
    }
}
