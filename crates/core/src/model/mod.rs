mod badge;
mod ids;
mod profile;
mod quiz;
mod settings;
mod submission;

pub use ids::{BadgeId, ClassId, ParseIdError, QuestionId, QuizId, StudentId, SubmissionId};

pub use badge::{Badge, BadgeCategory, BadgeCategoryKind, BadgeTree};
pub use profile::{ProfileError, ProfileStats, XP_PER_LEVEL, level_for_experience};
pub use quiz::{
    ParticipationMode, PresentationMode, Question, QuestionDraft, QuestionKind, Quiz, QuizDraft,
    QuizError, QuizStatus,
};
pub use settings::{EngineSettings, SettingsError};
pub use submission::{AnswerEntry, NewSubmission, SubmissionError, SubmissionRecord};
