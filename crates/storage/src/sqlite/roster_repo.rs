use quiz_core::model::{ClassId, StudentId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{RosterRepository, StorageError};

#[async_trait::async_trait]
impl RosterRepository for SqliteRepository {
    async fn add_member(
        &self,
        class_id: &ClassId,
        student_id: &StudentId,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO class_members (class_id, student_id)
            VALUES (?1, ?2)
            ON CONFLICT(class_id, student_id) DO NOTHING
            ",
        )
        .bind(class_id.as_str().to_owned())
        .bind(student_id.as_str().to_owned())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn classes_for(&self, student_id: &StudentId) -> Result<Vec<ClassId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT class_id FROM class_members
            WHERE student_id = ?1
            ORDER BY class_id ASC
            ",
        )
        .bind(student_id.as_str().to_owned())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("class_id")
                    .map(ClassId::new)
                    .map_err(ser)
            })
            .collect()
    }
}
