use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{SubmissionId, SubmissionRecord};
use storage::repository::{SubmissionFilter, SubmissionRepository};

use crate::error::SubmissionServiceError;

/// Read, regrade and delete submission records.
///
/// Regrading never re-applies progression.
pub struct SubmissionService {
    clock: Clock,
    submissions: Arc<dyn SubmissionRepository>,
}

impl SubmissionService {
    #[must_use]
    pub fn new(clock: Clock, submissions: Arc<dyn SubmissionRepository>) -> Self {
        Self { clock, submissions }
    }

    /// # Errors
    ///
    /// Returns `SubmissionServiceError::Storage` on read failure.
    pub async fn list(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRecord>, SubmissionServiceError> {
        Ok(self.submissions.list_submissions(filter).await?)
    }

    /// # Errors
    ///
    /// Returns `SubmissionServiceError::Storage` if missing or on read failure.
    pub async fn get(&self, id: SubmissionId) -> Result<SubmissionRecord, SubmissionServiceError> {
        Ok(self.submissions.get_submission(id).await?)
    }

    /// Overwrite score and/or percent and stamp the grade time.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionServiceError::Submission` for out-of-range values, or
    /// `Storage` if the record is missing.
    pub async fn regrade(
        &self,
        id: SubmissionId,
        score: Option<u32>,
        percent: Option<u8>,
    ) -> Result<SubmissionRecord, SubmissionServiceError> {
        let mut record = self.submissions.get_submission(id).await?;
        record.regrade(score, percent, self.clock.now())?;
        self.submissions.update_grade(&record).await?;
        tracing::info!(submission_id = %id, score = record.score(), "submission regraded");
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `SubmissionServiceError::Storage` if missing or on write failure.
    pub async fn delete(&self, id: SubmissionId) -> Result<(), SubmissionServiceError> {
        self.submissions.delete_submission(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{NewSubmission, QuizId, StudentId};
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryRepository, StorageError};

    #[tokio::test]
    async fn regrade_keeps_progress_flag() {
        let repo = InMemoryRepository::new();
        let record = SubmissionRecord::new(
            NewSubmission::new(QuizId::new(1), StudentId::new("s1"), Vec::new()),
            10,
            30,
            33,
            fixed_now(),
        )
        .unwrap()
        .with_progress_applied();
        repo.insert_submission(&record).await.unwrap();

        let service = SubmissionService::new(
            fixed_clock().advanced(Duration::hours(1)),
            Arc::new(repo.clone()),
        );
        let updated = service
            .regrade(record.id(), Some(25), Some(83))
            .await
            .unwrap();
        assert_eq!(updated.score(), 25);
        assert!(updated.progress_applied());
        assert_eq!(
            service.get(record.id()).await.unwrap().graded_at(),
            Some(fixed_now() + Duration::hours(1))
        );

        let err = service.regrade(record.id(), Some(31), None).await.unwrap_err();
        assert!(matches!(err, SubmissionServiceError::Submission(_)));

        service.delete(record.id()).await.unwrap();
        assert!(matches!(
            service.get(record.id()).await,
            Err(SubmissionServiceError::Storage(StorageError::NotFound))
        ));
    }
}
