use quiz_core::model::{
    AnswerEntry, ClassId, NewSubmission, QuestionId, QuizId, StudentId, SubmissionId,
};
use quiz_core::scoring;

/// How one question ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    /// Pending answer at submission time; `None` when nothing was captured.
    pub answer: Option<String>,
    pub expected_answer: String,
    pub correct: bool,
    pub points_earned: u32,
    pub points_possible: u32,
    /// The countdown forced this submission.
    pub timed_out: bool,
    /// Team member credited by round-robin on question index, not by who interacted.
    pub attributed_to: Option<String>,
}

/// Finalized result emitted when a session reaches `Completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub quiz_id: QuizId,
    pub submission_id: SubmissionId,
    pub outcomes: Vec<QuestionOutcome>,
    pub total_score: u32,
    pub total_possible: u32,
}

impl SessionResult {
    pub(crate) fn empty(quiz_id: QuizId, submission_id: SubmissionId) -> Self {
        Self {
            quiz_id,
            submission_id,
            outcomes: Vec::new(),
            total_score: 0,
            total_possible: 0,
        }
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        scoring::percent(self.total_score, self.total_possible)
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.correct).count()
    }

    /// Per-question correctness in question order.
    #[must_use]
    pub fn correctness(&self) -> Vec<(QuestionId, bool)> {
        self.outcomes
            .iter()
            .map(|o| (o.question_id, o.correct))
            .collect()
    }

    /// Judged answers; unanswered questions are recorded with an empty answer.
    #[must_use]
    pub fn answers(&self) -> Vec<AnswerEntry> {
        self.outcomes
            .iter()
            .map(|o| {
                AnswerEntry::new(o.question_id, o.answer.clone().unwrap_or_default())
                    .judged(o.correct)
            })
            .collect()
    }

    /// Submission for the ledger, scored and carrying the session's id.
    #[must_use]
    pub fn to_submission(&self, student_id: StudentId, class_id: Option<ClassId>) -> NewSubmission {
        let mut submission = NewSubmission::new(self.quiz_id, student_id, self.answers())
            .with_id(self.submission_id)
            .with_score(self.total_score, self.total_possible, self.percent());
        submission.class_id = class_id;
        submission
    }
}
