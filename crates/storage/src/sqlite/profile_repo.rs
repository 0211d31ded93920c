use quiz_core::model::{ProfileStats, StudentId};
use sqlx::{Executor, Sqlite};

use super::SqliteRepository;
use super::mapping::{conn, map_profile_row};
use crate::repository::{ProfileRepository, StorageError};

pub(super) async fn upsert_profile_row<'e, E>(
    executor: E,
    stats: &ProfileStats,
) -> Result<(), StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r"
        INSERT INTO profiles (student_id, level, experience, accuracy, perfect_count)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(student_id) DO UPDATE SET
            level = excluded.level,
            experience = excluded.experience,
            accuracy = excluded.accuracy,
            perfect_count = excluded.perfect_count
        ",
    )
    .bind(stats.student_id().as_str().to_owned())
    .bind(i64::from(stats.level()))
    .bind(i64::from(stats.experience()))
    .bind(i64::from(stats.accuracy()))
    .bind(i64::from(stats.perfect_count()))
    .execute(executor)
    .await
    .map_err(conn)?;

    Ok(())
}

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<ProfileStats>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT student_id, level, experience, accuracy, perfect_count
            FROM profiles WHERE student_id = ?1
            ",
        )
        .bind(student_id.as_str().to_owned())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn upsert_profile(&self, stats: &ProfileStats) -> Result<(), StorageError> {
        upsert_profile_row(&self.pool, stats).await
    }
}
