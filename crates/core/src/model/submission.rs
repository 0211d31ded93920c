use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ClassId, QuestionId, QuizId, StudentId, SubmissionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("percent must be within 0..=100, got {0}")]
    PercentOutOfRange(u32),

    #[error("score {score} exceeds total possible {total}")]
    ScoreExceedsTotal { score: u32, total: u32 },

    #[error("graded_at is before submitted_at")]
    InvalidGradeTime,
}

/// One captured answer inside a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question_id: QuestionId,
    pub answer: String,
    #[serde(default)]
    pub correct: Option<bool>,
}

impl AnswerEntry {
    #[must_use]
    pub fn new(question_id: QuestionId, answer: impl Into<String>) -> Self {
        Self {
            question_id,
            answer: answer.into(),
            correct: None,
        }
    }

    #[must_use]
    pub fn judged(mut self, correct: bool) -> Self {
        self.correct = Some(correct);
        self
    }
}

/// Input to the progression ledger: one finished attempt, not yet persisted.
///
/// `score`, `total_possible` and `percent` may be absent; the ledger then
/// computes them from the quiz and the recorded answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub id: SubmissionId,
    pub quiz_id: QuizId,
    pub student_id: StudentId,
    pub class_id: Option<ClassId>,
    pub answers: Vec<AnswerEntry>,
    pub score: Option<u32>,
    pub total_possible: Option<u32>,
    pub percent: Option<u8>,
}

impl NewSubmission {
    #[must_use]
    pub fn new(quiz_id: QuizId, student_id: StudentId, answers: Vec<AnswerEntry>) -> Self {
        Self {
            id: SubmissionId::new_random(),
            quiz_id,
            student_id,
            class_id: None,
            answers,
            score: None,
            total_possible: None,
            percent: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: SubmissionId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_class(mut self, class_id: ClassId) -> Self {
        self.class_id = Some(class_id);
        self
    }

    #[must_use]
    pub fn with_score(mut self, score: u32, total_possible: u32, percent: u8) -> Self {
        self.score = Some(score);
        self.total_possible = Some(total_possible);
        self.percent = Some(percent);
        self
    }
}

/// Persisted record of one attempt.
///
/// At most one record per `(quiz_id, student_id)` may carry `progress_applied`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    id: SubmissionId,
    quiz_id: QuizId,
    student_id: StudentId,
    class_id: Option<ClassId>,
    answers: Vec<AnswerEntry>,
    score: u32,
    total_possible: u32,
    percent: u8,
    submitted_at: DateTime<Utc>,
    graded_at: Option<DateTime<Utc>>,
    progress_applied: bool,
}

impl SubmissionRecord {
    /// Build a fresh, not-yet-applied record from scored parts.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError` if the percent or score are out of range.
    pub fn new(
        draft: NewSubmission,
        score: u32,
        total_possible: u32,
        percent: u8,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, SubmissionError> {
        Self::from_persisted(
            draft.id,
            draft.quiz_id,
            draft.student_id,
            draft.class_id,
            draft.answers,
            score,
            total_possible,
            percent,
            submitted_at,
            None,
            false,
        )
    }

    /// Rehydrate a record from storage.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError` when persisted values violate record invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SubmissionId,
        quiz_id: QuizId,
        student_id: StudentId,
        class_id: Option<ClassId>,
        answers: Vec<AnswerEntry>,
        score: u32,
        total_possible: u32,
        percent: u8,
        submitted_at: DateTime<Utc>,
        graded_at: Option<DateTime<Utc>>,
        progress_applied: bool,
    ) -> Result<Self, SubmissionError> {
        if percent > 100 {
            return Err(SubmissionError::PercentOutOfRange(u32::from(percent)));
        }
        if score > total_possible {
            return Err(SubmissionError::ScoreExceedsTotal {
                score,
                total: total_possible,
            });
        }
        if graded_at.is_some_and(|g| g < submitted_at) {
            return Err(SubmissionError::InvalidGradeTime);
        }
        Ok(Self {
            id,
            quiz_id,
            student_id,
            class_id,
            answers,
            score,
            total_possible,
            percent,
            submitted_at,
            graded_at,
            progress_applied,
        })
    }

    #[must_use]
    pub fn id(&self) -> SubmissionId {
        self.id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    #[must_use]
    pub fn class_id(&self) -> Option<&ClassId> {
        self.class_id.as_ref()
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerEntry] {
        &self.answers
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_possible(&self) -> u32 {
        self.total_possible
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        self.percent
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    #[must_use]
    pub fn graded_at(&self) -> Option<DateTime<Utc>> {
        self.graded_at
    }

    #[must_use]
    pub fn progress_applied(&self) -> bool {
        self.progress_applied
    }

    /// Every available point was earned. Quizzes worth nothing are never perfect.
    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.total_possible > 0 && self.score == self.total_possible
    }

    #[must_use]
    pub fn with_progress_applied(mut self) -> Self {
        self.progress_applied = true;
        self
    }

    /// Apply a teacher regrade. Never touches `progress_applied`.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError` if the new values are out of range.
    pub fn regrade(
        &mut self,
        score: Option<u32>,
        percent: Option<u8>,
        graded_at: DateTime<Utc>,
    ) -> Result<(), SubmissionError> {
        let score = score.unwrap_or(self.score);
        let percent = percent.unwrap_or(self.percent);
        if percent > 100 {
            return Err(SubmissionError::PercentOutOfRange(u32::from(percent)));
        }
        if score > self.total_possible {
            return Err(SubmissionError::ScoreExceedsTotal {
                score,
                total: self.total_possible,
            });
        }
        if graded_at < self.submitted_at {
            return Err(SubmissionError::InvalidGradeTime);
        }
        self.score = score;
        self.percent = percent;
        self.graded_at = Some(graded_at);
        Ok(())
    }
}
