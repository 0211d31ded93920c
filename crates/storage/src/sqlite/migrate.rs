use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quizzes (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    presentation_mode TEXT NOT NULL,
                    participation_mode TEXT NOT NULL,
                    status TEXT NOT NULL,
                    class_ids TEXT NOT NULL,
                    questions TEXT NOT NULL,
                    due_at TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS profiles (
                    student_id TEXT PRIMARY KEY,
                    level INTEGER NOT NULL CHECK (level >= 1),
                    experience INTEGER NOT NULL CHECK (experience >= 0),
                    accuracy INTEGER NOT NULL CHECK (accuracy BETWEEN 0 AND 100),
                    perfect_count INTEGER NOT NULL CHECK (perfect_count >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS submissions (
                    id TEXT PRIMARY KEY,
                    quiz_id INTEGER NOT NULL,
                    student_id TEXT NOT NULL,
                    class_id TEXT,
                    answers TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score >= 0),
                    total_possible INTEGER NOT NULL CHECK (total_possible >= score),
                    percent INTEGER NOT NULL CHECK (percent BETWEEN 0 AND 100),
                    submitted_at TEXT NOT NULL,
                    graded_at TEXT,
                    progress_applied INTEGER NOT NULL CHECK (progress_applied IN (0, 1))
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS badge_trees (
                    student_id TEXT PRIMARY KEY,
                    tree TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS class_members (
                    class_id TEXT NOT NULL,
                    student_id TEXT NOT NULL,
                    PRIMARY KEY (class_id, student_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // at most one progressed attempt per quiz and student
        sqlx::query(
            r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_submissions_applied_once
                    ON submissions (quiz_id, student_id)
                    WHERE progress_applied = 1;
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_submissions_student_submitted
                    ON submissions (student_id, submitted_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_class_members_student
                    ON class_members (student_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
