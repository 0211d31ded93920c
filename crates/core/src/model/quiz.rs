use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ClassId, QuestionId, QuizId};
use crate::{board, scoring};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Validation failures for teacher-authored quiz content.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("question {0} has an empty prompt")]
    EmptyPrompt(QuestionId),

    #[error("question {0} has an empty expected answer")]
    EmptyAnswer(QuestionId),

    #[error("question {0} must be worth at least one point")]
    ZeroPoints(QuestionId),

    #[error("question {0} has a zero-second time limit")]
    ZeroTimeLimit(QuestionId),

    #[error("multiple-choice question {0} has no options")]
    NoOptions(QuestionId),

    #[error("expected answer of question {0} is not one of its options")]
    AnswerNotAnOption(QuestionId),

    #[error("question id {0} appears more than once")]
    DuplicateQuestion(QuestionId),

    #[error("answer of question {0} has characters a board grid cannot spell")]
    NotSpellableOnBoard(QuestionId),
}

//
// ─── MODES ─────────────────────────────────────────────────────────────────────
//

/// How questions are rendered and how answers are captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresentationMode {
    #[default]
    Normal,
    CardGame,
    BoardGame,
}

impl PresentationMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::CardGame => "card-game",
            Self::BoardGame => "board-game",
        }
    }

    #[must_use]
    pub fn from_str_lossy(raw: &str) -> Option<Self> {
        match raw {
            "normal" => Some(Self::Normal),
            "card-game" => Some(Self::CardGame),
            "board-game" => Some(Self::BoardGame),
            _ => None,
        }
    }
}

/// Who takes the quiz. Affects turn display and attribution only, never scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParticipationMode {
    #[default]
    Solo,
    Team,
    Classroom,
}

impl ParticipationMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solo => "solo",
            Self::Team => "team",
            Self::Classroom => "classroom",
        }
    }

    #[must_use]
    pub fn from_str_lossy(raw: &str) -> Option<Self> {
        match raw {
            "solo" => Some(Self::Solo),
            "team" => Some(Self::Team),
            "classroom" => Some(Self::Classroom),
            _ => None,
        }
    }
}

/// Publication state of a quiz as seen by students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizStatus {
    #[default]
    Draft,
    Posted,
}

impl QuizStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
        }
    }

    #[must_use]
    pub fn from_str_lossy(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(Self::Draft),
            "posted" => Some(Self::Posted),
            _ => None,
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Answer mechanic of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice { options: Vec<String> },
    Identification,
}

/// Unvalidated question as authored or imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub id: QuestionId,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub prompt: String,
    #[serde(rename = "answer")]
    pub expected_answer: String,
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub time_limit_secs: Option<u32>,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl QuestionDraft {
    #[must_use]
    pub fn identification(id: u64, prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: QuestionId::new(id),
            kind: QuestionKind::Identification,
            prompt: prompt.into(),
            expected_answer: answer.into(),
            points: None,
            time_limit_secs: None,
            image_ref: None,
            category: None,
        }
    }

    #[must_use]
    pub fn multiple_choice(
        id: u64,
        prompt: impl Into<String>,
        options: &[&str],
        answer: impl Into<String>,
    ) -> Self {
        Self {
            kind: QuestionKind::MultipleChoice {
                options: options.iter().map(|o| (*o).to_owned()).collect(),
            },
            ..Self::identification(id, prompt, answer)
        }
    }

    #[must_use]
    pub fn with_points(mut self, points: u32) -> Self {
        self.points = Some(points);
        self
    }

    #[must_use]
    pub fn with_time_limit(mut self, secs: u32) -> Self {
        self.time_limit_secs = Some(secs);
        self
    }

    /// Validate into an immutable `Question`. Missing points default to 1.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` when the prompt or answer is blank, points or time limit
    /// are zero, or a multiple-choice question has no matching option.
    pub fn validate(self) -> Result<Question, QuizError> {
        let id = self.id;
        if self.prompt.trim().is_empty() {
            return Err(QuizError::EmptyPrompt(id));
        }
        if self.expected_answer.trim().is_empty() {
            return Err(QuizError::EmptyAnswer(id));
        }
        let points = self.points.unwrap_or(1);
        if points == 0 {
            return Err(QuizError::ZeroPoints(id));
        }
        if self.time_limit_secs == Some(0) {
            return Err(QuizError::ZeroTimeLimit(id));
        }
        if let QuestionKind::MultipleChoice { options } = &self.kind {
            if options.is_empty() {
                return Err(QuizError::NoOptions(id));
            }
            if !options
                .iter()
                .any(|option| scoring::judge(&self.expected_answer, option))
            {
                return Err(QuizError::AnswerNotAnOption(id));
            }
        }

        Ok(Question {
            id,
            kind: self.kind,
            prompt: self.prompt,
            expected_answer: self.expected_answer,
            points,
            time_limit_secs: self.time_limit_secs,
            image_ref: self.image_ref,
            category: self.category,
        })
    }
}

/// A validated question. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    kind: QuestionKind,
    prompt: String,
    expected_answer: String,
    points: u32,
    time_limit_secs: Option<u32>,
    image_ref: Option<String>,
    category: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    #[must_use]
    pub fn is_identification(&self) -> bool {
        matches!(self.kind, QuestionKind::Identification)
    }

    /// Options of a multiple-choice question; empty for identification.
    #[must_use]
    pub fn options(&self) -> &[String] {
        match &self.kind {
            QuestionKind::MultipleChoice { options } => options,
            QuestionKind::Identification => &[],
        }
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn expected_answer(&self) -> &str {
        &self.expected_answer
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn image_ref(&self) -> Option<&str> {
        self.image_ref.as_deref()
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            id: self.id,
            kind: self.kind.clone(),
            prompt: self.prompt.clone(),
            expected_answer: self.expected_answer.clone(),
            points: Some(self.points),
            time_limit_secs: self.time_limit_secs,
            image_ref: self.image_ref.clone(),
            category: self.category.clone(),
        }
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// Unvalidated quiz as authored, imported, or loaded from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDraft {
    pub id: QuizId,
    pub title: String,
    #[serde(default)]
    pub presentation_mode: PresentationMode,
    #[serde(default)]
    pub participation_mode: ParticipationMode,
    #[serde(default)]
    pub status: QuizStatus,
    #[serde(default)]
    pub class_ids: Vec<ClassId>,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

impl QuizDraft {
    #[must_use]
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id: QuizId::new(id),
            title: title.into(),
            presentation_mode: PresentationMode::Normal,
            participation_mode: ParticipationMode::Solo,
            status: QuizStatus::Draft,
            class_ids: Vec::new(),
            questions: Vec::new(),
            due_at: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: PresentationMode) -> Self {
        self.presentation_mode = mode;
        self
    }

    #[must_use]
    pub fn with_participation(mut self, mode: ParticipationMode) -> Self {
        self.participation_mode = mode;
        self
    }

    #[must_use]
    pub fn with_question(mut self, question: QuestionDraft) -> Self {
        self.questions.push(question);
        self
    }

    #[must_use]
    pub fn posted_to(mut self, class_ids: &[&str], due_at: Option<DateTime<Utc>>) -> Self {
        self.status = QuizStatus::Posted;
        self.class_ids = class_ids.iter().map(|c| ClassId::new(*c)).collect();
        self.due_at = due_at;
        self
    }

    /// Validate the quiz and every question in order.
    ///
    /// An empty question list is accepted; sessions complete immediately.
    ///
    /// # Errors
    ///
    /// Returns the first `QuizError` found.
    pub fn validate(self) -> Result<Quiz, QuizError> {
        if self.title.trim().is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        let mut seen = HashSet::with_capacity(self.questions.len());
        let mut questions = Vec::with_capacity(self.questions.len());
        for draft in self.questions {
            if !seen.insert(draft.id) {
                return Err(QuizError::DuplicateQuestion(draft.id));
            }
            let question = draft.validate()?;
            if self.presentation_mode == PresentationMode::BoardGame
                && question.is_identification()
                && !spellable_on_board(question.expected_answer())
            {
                return Err(QuizError::NotSpellableOnBoard(question.id()));
            }
            questions.push(question);
        }

        Ok(Quiz {
            id: self.id,
            title: self.title,
            presentation_mode: self.presentation_mode,
            participation_mode: self.participation_mode,
            status: self.status,
            class_ids: self.class_ids,
            questions,
            due_at: self.due_at,
        })
    }
}

/// Teacher-owned quiz; read-only to the session engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    presentation_mode: PresentationMode,
    participation_mode: ParticipationMode,
    status: QuizStatus,
    class_ids: Vec<ClassId>,
    questions: Vec<Question>,
    due_at: Option<DateTime<Utc>>,
}

impl Quiz {
    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn presentation_mode(&self) -> PresentationMode {
        self.presentation_mode
    }

    #[must_use]
    pub fn participation_mode(&self) -> ParticipationMode {
        self.participation_mode
    }

    #[must_use]
    pub fn status(&self) -> QuizStatus {
        self.status
    }

    #[must_use]
    pub fn class_ids(&self) -> &[ClassId] {
        &self.class_ids
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due_at
    }

    /// Sum of question points.
    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.questions
            .iter()
            .fold(0_u32, |acc, q| acc.saturating_add(q.points()))
    }

    #[must_use]
    pub fn to_draft(&self) -> QuizDraft {
        QuizDraft {
            id: self.id,
            title: self.title.clone(),
            presentation_mode: self.presentation_mode,
            participation_mode: self.participation_mode,
            status: self.status,
            class_ids: self.class_ids.clone(),
            questions: self.questions.iter().map(Question::to_draft).collect(),
            due_at: self.due_at,
        }
    }
}

/// The grid holds letters only, so digits in the judged answer can never be traced.
fn spellable_on_board(answer: &str) -> bool {
    scoring::normalize(answer) == board::letters_only(answer)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_points_default_to_one() {
        let q = QuestionDraft::identification(1, "Powerhouse of the cell?", "Mitochondria")
            .validate()
            .unwrap();
        assert_eq!(q.points(), 1);
        assert!(q.is_identification());
        assert!(q.options().is_empty());
    }

    #[test]
    fn zero_points_rejected() {
        let err = QuestionDraft::identification(1, "Q", "A")
            .with_points(0)
            .validate()
            .unwrap_err();
        assert_eq!(err, QuizError::ZeroPoints(QuestionId::new(1)));
    }

    #[test]
    fn multiple_choice_answer_must_be_an_option() {
        let err = QuestionDraft::multiple_choice(2, "2+2?", &["3", "5"], "4")
            .validate()
            .unwrap_err();
        assert_eq!(err, QuizError::AnswerNotAnOption(QuestionId::new(2)));

        let ok = QuestionDraft::multiple_choice(2, "2+2?", &["3", "4"], " 4 ").validate();
        assert!(ok.is_ok());
    }

    #[test]
    fn duplicate_question_ids_rejected() {
        let err = QuizDraft::new(1, "Cells")
            .with_question(QuestionDraft::identification(1, "Q1", "A"))
            .with_question(QuestionDraft::identification(1, "Q2", "B"))
            .validate()
            .unwrap_err();
        assert_eq!(err, QuizError::DuplicateQuestion(QuestionId::new(1)));
    }

    #[test]
    fn board_quiz_rejects_answers_with_digits() {
        let err = QuizDraft::new(3, "Chemistry")
            .with_mode(PresentationMode::BoardGame)
            .with_question(QuestionDraft::identification(1, "Water?", "H2O"))
            .validate()
            .unwrap_err();
        assert_eq!(err, QuizError::NotSpellableOnBoard(QuestionId::new(1)));

        // punctuation and spaces are dropped on both sides
        let ok = QuizDraft::new(3, "Chemistry")
            .with_mode(PresentationMode::BoardGame)
            .with_question(QuestionDraft::identification(1, "Salt?", "Sodium chloride"))
            .with_question(QuestionDraft::multiple_choice(2, "Water?", &["H2O", "CO2"], "H2O"))
            .validate();
        assert!(ok.is_ok());

        let normal = QuizDraft::new(3, "Chemistry")
            .with_question(QuestionDraft::identification(1, "Water?", "H2O"))
            .validate();
        assert!(normal.is_ok());
    }

    #[test]
    fn empty_quiz_is_valid() {
        let quiz = QuizDraft::new(9, "Empty").validate().unwrap();
        assert!(quiz.questions().is_empty());
        assert_eq!(quiz.total_points(), 0);
    }

    #[test]
    fn total_points_sums_questions() {
        let quiz = QuizDraft::new(1, "Mixed")
            .with_question(QuestionDraft::identification(1, "Q1", "A").with_points(40))
            .with_question(QuestionDraft::identification(2, "Q2", "B").with_points(60))
            .validate()
            .unwrap();
        assert_eq!(quiz.total_points(), 100);
    }

    #[test]
    fn draft_deserializes_from_json() {
        let raw = r#"{
            "id": 3,
            "title": "Planets",
            "presentation_mode": "board-game",
            "questions": [
                {"id": 1, "type": "identification", "prompt": "Red planet?", "answer": "Mars", "points": 10},
                {"id": 2, "type": "multiple-choice", "prompt": "Largest?", "options": ["Jupiter", "Venus"], "answer": "Jupiter"}
            ]
        }"#;
        let quiz = serde_json::from_str::<QuizDraft>(raw)
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(quiz.presentation_mode(), PresentationMode::BoardGame);
        assert_eq!(quiz.questions()[1].options().len(), 2);
        assert_eq!(quiz.total_points(), 11);
    }
}
