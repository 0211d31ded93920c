use async_trait::async_trait;
use quiz_core::model::{
    BadgeTree, ClassId, ProfileStats, Quiz, QuizId, StudentId, SubmissionId, SubmissionRecord,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Optional filters for listing submissions. Empty filter lists everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub quiz_id: Option<QuizId>,
    pub student_id: Option<StudentId>,
    pub class_id: Option<ClassId>,
}

impl SubmissionFilter {
    #[must_use]
    pub fn for_student(student_id: StudentId) -> Self {
        Self {
            student_id: Some(student_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_quiz(mut self, quiz_id: QuizId) -> Self {
        self.quiz_id = Some(quiz_id);
        self
    }

    #[must_use]
    pub fn with_class(mut self, class_id: ClassId) -> Self {
        self.class_id = Some(class_id);
        self
    }

    #[must_use]
    pub fn matches(&self, record: &SubmissionRecord) -> bool {
        self.quiz_id.is_none_or(|q| record.quiz_id() == q)
            && self
                .student_id
                .as_ref()
                .is_none_or(|s| record.student_id() == s)
            && self
                .class_id
                .as_ref()
                .is_none_or(|c| record.class_id() == Some(c))
    }
}

/// Quiz catalogue as authored by teachers.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist or replace a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// Fetch a quiz with all of its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError>;

    /// All quizzes ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failure.
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError>;
}

/// Submission records, one per attempt.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Insert a record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id already exists, or if the
    /// record is progress-applied and another applied record exists for the
    /// same quiz and student.
    async fn insert_submission(&self, record: &SubmissionRecord) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_submission(&self, id: SubmissionId) -> Result<SubmissionRecord, StorageError>;

    /// Records matching `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failure.
    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRecord>, StorageError>;

    /// Whether any record for `(quiz_id, student_id)` carries `progress_applied`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failure.
    async fn has_applied_progress(
        &self,
        quiz_id: QuizId,
        student_id: &StudentId,
    ) -> Result<bool, StorageError>;

    /// Overwrite score, percent and grade time. The progress flag is left alone.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist.
    async fn update_grade(&self, record: &SubmissionRecord) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist.
    async fn delete_submission(&self, id: SubmissionId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failure.
    async fn get_profile(&self, student_id: &StudentId)
    -> Result<Option<ProfileStats>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_profile(&self, stats: &ProfileStats) -> Result<(), StorageError>;
}

#[async_trait]
pub trait BadgeRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failure.
    async fn get_badges(&self, student_id: &StudentId) -> Result<Option<BadgeTree>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the tree cannot be stored.
    async fn upsert_badges(
        &self,
        student_id: &StudentId,
        tree: &BadgeTree,
    ) -> Result<(), StorageError>;
}

/// Class membership, owned by classroom management.
#[async_trait]
pub trait RosterRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the membership cannot be stored.
    async fn add_member(&self, class_id: &ClassId, student_id: &StudentId)
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failure.
    async fn classes_for(&self, student_id: &StudentId) -> Result<Vec<ClassId>, StorageError>;
}

/// Atomic write of a progressed submission together with the new stats.
#[async_trait]
pub trait ProgressionRepository: Send + Sync {
    /// Insert `record` and store `stats` as one unit. Nothing is written on error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id exists or a progress-applied
    /// record already exists for the same quiz and student.
    async fn commit_progression(
        &self,
        record: &SubmissionRecord,
        stats: &ProfileStats,
    ) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    quizzes: HashMap<QuizId, Quiz>,
    submissions: Vec<SubmissionRecord>,
    profiles: HashMap<StudentId, ProfileStats>,
    badges: HashMap<StudentId, BadgeTree>,
    rosters: HashMap<StudentId, BTreeSet<ClassId>>,
}

impl MemoryState {
    fn check_insert(&self, record: &SubmissionRecord) -> Result<(), StorageError> {
        let clash = self.submissions.iter().any(|existing| {
            existing.id() == record.id()
                || (record.progress_applied()
                    && existing.progress_applied()
                    && existing.quiz_id() == record.quiz_id()
                    && existing.student_id() == record.student_id())
        });
        if clash {
            Err(StorageError::Conflict)
        } else {
            Ok(())
        }
    }
}

/// In-memory repository for tests and prototyping.
///
/// All collections sit behind a single mutex so `commit_progression` is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        self.lock()?.quizzes.insert(quiz.id(), quiz.clone());
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        self.lock()?
            .quizzes
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        let guard = self.lock()?;
        let mut quizzes: Vec<Quiz> = guard.quizzes.values().cloned().collect();
        quizzes.sort_by_key(Quiz::id);
        Ok(quizzes)
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryRepository {
    async fn insert_submission(&self, record: &SubmissionRecord) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.check_insert(record)?;
        guard.submissions.push(record.clone());
        Ok(())
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<SubmissionRecord, StorageError> {
        self.lock()?
            .submissions
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRecord>, StorageError> {
        let guard = self.lock()?;
        let mut found: Vec<SubmissionRecord> = guard
            .submissions
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        // stable sort keeps insertion order for equal timestamps
        found.sort_by_key(SubmissionRecord::submitted_at);
        Ok(found)
    }

    async fn has_applied_progress(
        &self,
        quiz_id: QuizId,
        student_id: &StudentId,
    ) -> Result<bool, StorageError> {
        Ok(self.lock()?.submissions.iter().any(|r| {
            r.progress_applied() && r.quiz_id() == quiz_id && r.student_id() == student_id
        }))
    }

    async fn update_grade(&self, record: &SubmissionRecord) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let stored = guard
            .submissions
            .iter_mut()
            .find(|r| r.id() == record.id())
            .ok_or(StorageError::NotFound)?;
        let graded_at = record
            .graded_at()
            .ok_or_else(|| StorageError::Serialization("regrade without graded_at".into()))?;
        stored
            .regrade(Some(record.score()), Some(record.percent()), graded_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn delete_submission(&self, id: SubmissionId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let before = guard.submissions.len();
        guard.submissions.retain(|r| r.id() != id);
        if guard.submissions.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<ProfileStats>, StorageError> {
        Ok(self.lock()?.profiles.get(student_id).cloned())
    }

    async fn upsert_profile(&self, stats: &ProfileStats) -> Result<(), StorageError> {
        self.lock()?
            .profiles
            .insert(stats.student_id().clone(), stats.clone());
        Ok(())
    }
}

#[async_trait]
impl BadgeRepository for InMemoryRepository {
    async fn get_badges(&self, student_id: &StudentId) -> Result<Option<BadgeTree>, StorageError> {
        Ok(self.lock()?.badges.get(student_id).cloned())
    }

    async fn upsert_badges(
        &self,
        student_id: &StudentId,
        tree: &BadgeTree,
    ) -> Result<(), StorageError> {
        self.lock()?.badges.insert(student_id.clone(), tree.clone());
        Ok(())
    }
}

#[async_trait]
impl RosterRepository for InMemoryRepository {
    async fn add_member(
        &self,
        class_id: &ClassId,
        student_id: &StudentId,
    ) -> Result<(), StorageError> {
        self.lock()?
            .rosters
            .entry(student_id.clone())
            .or_default()
            .insert(class_id.clone());
        Ok(())
    }

    async fn classes_for(&self, student_id: &StudentId) -> Result<Vec<ClassId>, StorageError> {
        Ok(self
            .lock()?
            .rosters
            .get(student_id)
            .map(|classes| classes.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ProgressionRepository for InMemoryRepository {
    async fn commit_progression(
        &self,
        record: &SubmissionRecord,
        stats: &ProfileStats,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.check_insert(record)?;
        guard.submissions.push(record.clone());
        guard
            .profiles
            .insert(stats.student_id().clone(), stats.clone());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub submissions: Arc<dyn SubmissionRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub badges: Arc<dyn BadgeRepository>,
    pub rosters: Arc<dyn RosterRepository>,
    pub progression: Arc<dyn ProgressionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Wire every repository role to one backend.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: QuizRepository
            + SubmissionRepository
            + ProfileRepository
            + BadgeRepository
            + RosterRepository
            + ProgressionRepository
            + Clone
            + 'static,
    {
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let submissions: Arc<dyn SubmissionRepository> = Arc::new(repo.clone());
        let profiles: Arc<dyn ProfileRepository> = Arc::new(repo.clone());
        let badges: Arc<dyn BadgeRepository> = Arc::new(repo.clone());
        let rosters: Arc<dyn RosterRepository> = Arc::new(repo.clone());
        let progression: Arc<dyn ProgressionRepository> = Arc::new(repo);
        Self {
            quizzes,
            submissions,
            profiles,
            badges,
            rosters,
            progression,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{NewSubmission, QuestionDraft, QuizDraft};
    use quiz_core::time::fixed_now;

    fn record(quiz: u64, student: &str) -> SubmissionRecord {
        let draft = NewSubmission::new(QuizId::new(quiz), StudentId::new(student), Vec::new());
        SubmissionRecord::new(draft, 5, 10, 50, fixed_now()).unwrap()
    }

    #[tokio::test]
    async fn round_trips_quiz() {
        let repo = InMemoryRepository::new();
        let quiz = QuizDraft::new(7, "Cells")
            .with_question(QuestionDraft::identification(1, "Powerhouse?", "Mitochondria"))
            .validate()
            .unwrap();
        repo.upsert_quiz(&quiz).await.unwrap();

        let fetched = repo.get_quiz(QuizId::new(7)).await.unwrap();
        assert_eq!(fetched, quiz);
        assert!(matches!(
            repo.get_quiz(QuizId::new(8)).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn second_applied_record_conflicts() {
        let repo = InMemoryRepository::new();
        let stats = ProfileStats::new(StudentId::new("s1"));
        repo.commit_progression(&record(1, "s1").with_progress_applied(), &stats)
            .await
            .unwrap();

        let again = repo
            .commit_progression(&record(1, "s1").with_progress_applied(), &stats)
            .await;
        assert!(matches!(again, Err(StorageError::Conflict)));

        // unapplied retakes are fine
        repo.insert_submission(&record(1, "s1")).await.unwrap();
        let all = repo
            .list_submissions(&SubmissionFilter::for_student(StudentId::new("s1")))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(
            repo.has_applied_progress(QuizId::new(1), &StudentId::new("s1"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn duplicate_id_conflicts() {
        let repo = InMemoryRepository::new();
        let rec = record(1, "s1");
        repo.insert_submission(&rec).await.unwrap();
        assert!(matches!(
            repo.insert_submission(&rec).await,
            Err(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn filter_by_quiz_and_class() {
        let repo = InMemoryRepository::new();
        let in_class = {
            let draft = NewSubmission::new(QuizId::new(2), StudentId::new("s2"), Vec::new())
                .with_class(ClassId::new("bio-1"));
            SubmissionRecord::new(draft, 1, 1, 100, fixed_now()).unwrap()
        };
        repo.insert_submission(&record(1, "s1")).await.unwrap();
        repo.insert_submission(&in_class).await.unwrap();

        let by_class = repo
            .list_submissions(&SubmissionFilter::default().with_class(ClassId::new("bio-1")))
            .await
            .unwrap();
        assert_eq!(by_class, vec![in_class]);

        let by_quiz = repo
            .list_submissions(&SubmissionFilter::default().with_quiz(QuizId::new(1)))
            .await
            .unwrap();
        assert_eq!(by_quiz.len(), 1);
    }

    #[tokio::test]
    async fn roster_lists_classes() {
        let repo = InMemoryRepository::new();
        let student = StudentId::new("s1");
        repo.add_member(&ClassId::new("b"), &student).await.unwrap();
        repo.add_member(&ClassId::new("a"), &student).await.unwrap();
        repo.add_member(&ClassId::new("a"), &student).await.unwrap();
        let classes = repo.classes_for(&student).await.unwrap();
        assert_eq!(classes, vec![ClassId::new("a"), ClassId::new("b")]);
        assert!(
            repo.classes_for(&StudentId::new("nobody"))
                .await
                .unwrap()
                .is_empty()
        );
    }
}
