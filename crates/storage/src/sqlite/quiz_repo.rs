use quiz_core::model::{Quiz, QuizId};

use super::SqliteRepository;
use super::mapping::{conn, map_quiz_row, quiz_id_to_i64, ser};
use crate::repository::{QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let draft = quiz.to_draft();
        let class_ids = serde_json::to_string(&draft.class_ids).map_err(ser)?;
        let questions = serde_json::to_string(&draft.questions).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO quizzes (id, title, presentation_mode, participation_mode, status, class_ids, questions, due_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                presentation_mode = excluded.presentation_mode,
                participation_mode = excluded.participation_mode,
                status = excluded.status,
                class_ids = excluded.class_ids,
                questions = excluded.questions,
                due_at = excluded.due_at
            ",
        )
        .bind(quiz_id_to_i64(quiz.id())?)
        .bind(draft.title)
        .bind(draft.presentation_mode.as_str())
        .bind(draft.participation_mode.as_str())
        .bind(draft.status.as_str())
        .bind(class_ids)
        .bind(questions)
        .bind(draft.due_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, presentation_mode, participation_mode, status, class_ids, questions, due_at
            FROM quizzes WHERE id = ?1
            ",
        )
        .bind(quiz_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_quiz_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, presentation_mode, participation_mode, status, class_ids, questions, due_at
            FROM quizzes
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_quiz_row).collect()
    }
}
