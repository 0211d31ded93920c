use quiz_core::model::{ProfileStats, QuizId, StudentId, SubmissionId, SubmissionRecord};
use sqlx::{Executor, Sqlite};

use super::SqliteRepository;
use super::mapping::{
    conn, map_submission_row, quiz_id_to_i64, ser, submission_id_to_text, write_err,
};
use super::profile_repo::upsert_profile_row;
use crate::repository::{
    ProgressionRepository, StorageError, SubmissionFilter, SubmissionRepository,
};

const SELECT_COLUMNS: &str = r"
    SELECT id, quiz_id, student_id, class_id, answers, score, total_possible, percent,
           submitted_at, graded_at, progress_applied
    FROM submissions
";

pub(super) async fn insert_submission_row<'e, E>(
    executor: E,
    record: &SubmissionRecord,
) -> Result<(), StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let answers = serde_json::to_string(record.answers()).map_err(ser)?;

    sqlx::query(
        r"
        INSERT INTO submissions (id, quiz_id, student_id, class_id, answers, score, total_possible, percent, submitted_at, graded_at, progress_applied)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ",
    )
    .bind(submission_id_to_text(record.id()))
    .bind(quiz_id_to_i64(record.quiz_id())?)
    .bind(record.student_id().as_str().to_owned())
    .bind(record.class_id().map(|c| c.as_str().to_owned()))
    .bind(answers)
    .bind(i64::from(record.score()))
    .bind(i64::from(record.total_possible()))
    .bind(i64::from(record.percent()))
    .bind(record.submitted_at())
    .bind(record.graded_at())
    .bind(i64::from(record.progress_applied()))
    .execute(executor)
    .await
    .map_err(write_err)?;

    Ok(())
}

#[async_trait::async_trait]
impl SubmissionRepository for SqliteRepository {
    async fn insert_submission(&self, record: &SubmissionRecord) -> Result<(), StorageError> {
        insert_submission_row(&self.pool, record).await
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<SubmissionRecord, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(submission_id_to_text(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => map_submission_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRecord>, StorageError> {
        let sql = format!(
            r"{SELECT_COLUMNS}
            WHERE (?1 IS NULL OR quiz_id = ?1)
              AND (?2 IS NULL OR student_id = ?2)
              AND (?3 IS NULL OR class_id = ?3)
            ORDER BY submitted_at ASC, rowid ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(filter.quiz_id.map(quiz_id_to_i64).transpose()?)
            .bind(filter.student_id.as_ref().map(|s| s.as_str().to_owned()))
            .bind(filter.class_id.as_ref().map(|c| c.as_str().to_owned()))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_submission_row).collect()
    }

    async fn has_applied_progress(
        &self,
        quiz_id: QuizId,
        student_id: &StudentId,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query(
            r"
            SELECT 1 FROM submissions
            WHERE quiz_id = ?1 AND student_id = ?2 AND progress_applied = 1
            ",
        )
        .bind(quiz_id_to_i64(quiz_id)?)
        .bind(student_id.as_str().to_owned())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        Ok(row.is_some())
    }

    async fn update_grade(&self, record: &SubmissionRecord) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE submissions
            SET score = ?2, percent = ?3, graded_at = ?4
            WHERE id = ?1
            ",
        )
        .bind(submission_id_to_text(record.id()))
        .bind(i64::from(record.score()))
        .bind(i64::from(record.percent()))
        .bind(record.graded_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_submission(&self, id: SubmissionId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM submissions WHERE id = ?1")
            .bind(submission_id_to_text(id))
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProgressionRepository for SqliteRepository {
    async fn commit_progression(
        &self,
        record: &SubmissionRecord,
        stats: &ProfileStats,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        insert_submission_row(&mut *tx, record).await?;
        upsert_profile_row(&mut *tx, stats).await?;
        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
