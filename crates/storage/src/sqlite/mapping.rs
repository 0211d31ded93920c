use quiz_core::model::{
    AnswerEntry, ClassId, ParticipationMode, PresentationMode, ProfileStats, QuestionDraft, Quiz,
    QuizDraft, QuizId, QuizStatus, StudentId, SubmissionId, SubmissionRecord,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Unique and primary-key violations become `Conflict`; everything else is a connection error.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        StorageError::Conflict
    } else {
        conn(e)
    }
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn quiz_id_to_i64(id: QuizId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("quiz_id overflow".into()))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    u64::try_from(v)
        .map(QuizId::new)
        .map_err(|_| StorageError::Serialization("quiz_id sign overflow".into()))
}

pub(crate) fn submission_id_to_text(id: SubmissionId) -> String {
    id.as_uuid().hyphenated().to_string()
}

fn submission_id_from_text(raw: &str) -> Result<SubmissionId, StorageError> {
    Uuid::parse_str(raw)
        .map(SubmissionId::from_uuid)
        .map_err(ser)
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let mode: String = row.try_get("presentation_mode").map_err(ser)?;
    let participation: String = row.try_get("participation_mode").map_err(ser)?;
    let status: String = row.try_get("status").map_err(ser)?;
    let class_ids: String = row.try_get("class_ids").map_err(ser)?;
    let questions: String = row.try_get("questions").map_err(ser)?;

    let draft = QuizDraft {
        id: quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        presentation_mode: PresentationMode::from_str_lossy(&mode)
            .ok_or_else(|| StorageError::Serialization(format!("invalid mode: {mode}")))?,
        participation_mode: ParticipationMode::from_str_lossy(&participation).ok_or_else(
            || StorageError::Serialization(format!("invalid participation: {participation}")),
        )?,
        status: QuizStatus::from_str_lossy(&status)
            .ok_or_else(|| StorageError::Serialization(format!("invalid status: {status}")))?,
        class_ids: serde_json::from_str::<Vec<ClassId>>(&class_ids).map_err(ser)?,
        questions: serde_json::from_str::<Vec<QuestionDraft>>(&questions).map_err(ser)?,
        due_at: row.try_get("due_at").map_err(ser)?,
    };
    draft.validate().map_err(ser)
}

pub(crate) fn map_submission_row(row: &SqliteRow) -> Result<SubmissionRecord, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let answers: String = row.try_get("answers").map_err(ser)?;
    let class_id: Option<String> = row.try_get("class_id").map_err(ser)?;

    SubmissionRecord::from_persisted(
        submission_id_from_text(&id)?,
        quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        StudentId::new(row.try_get::<String, _>("student_id").map_err(ser)?),
        class_id.map(ClassId::new),
        serde_json::from_str::<Vec<AnswerEntry>>(&answers).map_err(ser)?,
        u32_from_i64("score", row.try_get("score").map_err(ser)?)?,
        u32_from_i64("total_possible", row.try_get("total_possible").map_err(ser)?)?,
        u8_from_i64("percent", row.try_get("percent").map_err(ser)?)?,
        row.try_get("submitted_at").map_err(ser)?,
        row.try_get("graded_at").map_err(ser)?,
        row.try_get::<i64, _>("progress_applied").map_err(ser)? != 0,
    )
    .map_err(ser)
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<ProfileStats, StorageError> {
    ProfileStats::from_persisted(
        StudentId::new(row.try_get::<String, _>("student_id").map_err(ser)?),
        u32_from_i64("level", row.try_get("level").map_err(ser)?)?,
        u32_from_i64("experience", row.try_get("experience").map_err(ser)?)?,
        u8_from_i64("accuracy", row.try_get("accuracy").map_err(ser)?)?,
        u32_from_i64("perfect_count", row.try_get("perfect_count").map_err(ser)?)?,
    )
    .map_err(ser)
}
