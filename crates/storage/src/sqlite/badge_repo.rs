use quiz_core::model::{BadgeTree, StudentId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{BadgeRepository, StorageError};

#[async_trait::async_trait]
impl BadgeRepository for SqliteRepository {
    async fn get_badges(&self, student_id: &StudentId) -> Result<Option<BadgeTree>, StorageError> {
        let row = sqlx::query("SELECT tree FROM badge_trees WHERE student_id = ?1")
            .bind(student_id.as_str().to_owned())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("tree").map_err(ser)?;
        serde_json::from_str(&raw).map(Some).map_err(ser)
    }

    async fn upsert_badges(
        &self,
        student_id: &StudentId,
        tree: &BadgeTree,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(tree).map_err(ser)?;
        sqlx::query(
            r"
            INSERT INTO badge_trees (student_id, tree)
            VALUES (?1, ?2)
            ON CONFLICT(student_id) DO UPDATE SET tree = excluded.tree
            ",
        )
        .bind(student_id.as_str().to_owned())
        .bind(raw)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
