use std::sync::Arc;

use quiz_core::model::{ClassId, Quiz, QuizDraft, QuizId, StudentId};
use storage::repository::{QuizRepository, RosterRepository};

use crate::error::CatalogError;

/// Quiz import and class enrollment for the hosting shell.
pub struct CatalogService {
    quizzes: Arc<dyn QuizRepository>,
    rosters: Arc<dyn RosterRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(quizzes: Arc<dyn QuizRepository>, rosters: Arc<dyn RosterRepository>) -> Self {
        Self { quizzes, rosters }
    }

    /// Validate and store an authored quiz, replacing any quiz with the same id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Quiz` for invalid content or `Storage` on write failure.
    pub async fn import(&self, draft: QuizDraft) -> Result<Quiz, CatalogError> {
        let quiz = draft.validate()?;
        self.quizzes.upsert_quiz(&quiz).await?;
        tracing::info!(quiz_id = %quiz.id(), questions = quiz.questions().len(), "quiz imported");
        Ok(quiz)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if missing or on read failure.
    pub async fn get(&self, id: QuizId) -> Result<Quiz, CatalogError> {
        Ok(self.quizzes.get_quiz(id).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` on read failure.
    pub async fn list(&self) -> Result<Vec<Quiz>, CatalogError> {
        Ok(self.quizzes.list_quizzes().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` on write failure.
    pub async fn enroll(&self, class_id: &ClassId, student_id: &StudentId) -> Result<(), CatalogError> {
        Ok(self.rosters.add_member(class_id, student_id).await?)
    }
}
