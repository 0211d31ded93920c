//! Finalizes for one student racing on different quizzes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{
    AnswerEntry, BadgeId, BadgeTree, NewSubmission, ProfileStats, QuestionDraft, QuestionId,
    QuizDraft, QuizId, StudentId,
};
use quiz_core::time::fixed_clock;
use services::{CompletionService, EventBus, ProgressionLedger, ProgressionStatus};
use storage::repository::{
    BadgeRepository, InMemoryRepository, ProfileRepository, QuizRepository, StorageError,
};

/// Reads that take a while, like any real backend.
#[derive(Clone)]
struct SlowReads {
    inner: InMemoryRepository,
    delay: Duration,
}

#[async_trait]
impl ProfileRepository for SlowReads {
    async fn get_profile(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<ProfileStats>, StorageError> {
        let stats = self.inner.get_profile(student_id).await;
        tokio::time::sleep(self.delay).await;
        stats
    }

    async fn upsert_profile(&self, stats: &ProfileStats) -> Result<(), StorageError> {
        self.inner.upsert_profile(stats).await
    }
}

#[async_trait]
impl BadgeRepository for SlowReads {
    async fn get_badges(&self, student_id: &StudentId) -> Result<Option<BadgeTree>, StorageError> {
        let tree = self.inner.get_badges(student_id).await;
        tokio::time::sleep(self.delay).await;
        tree
    }

    async fn upsert_badges(
        &self,
        student_id: &StudentId,
        tree: &BadgeTree,
    ) -> Result<(), StorageError> {
        self.inner.upsert_badges(student_id, tree).await
    }
}

async fn seed(repo: &InMemoryRepository, id: u64) {
    let quiz = QuizDraft::new(id, format!("Quiz {id}"))
        .with_question(QuestionDraft::identification(1, "H2O is?", "Water").with_points(10))
        .validate()
        .unwrap();
    repo.upsert_quiz(&quiz).await.unwrap();
}

fn perfect(quiz: u64, student: &StudentId) -> NewSubmission {
    NewSubmission::new(
        QuizId::new(quiz),
        student.clone(),
        vec![AnswerEntry::new(QuestionId::new(1), "water")],
    )
}

fn wire(repo: &InMemoryRepository) -> (Arc<ProgressionLedger>, CompletionService) {
    let slow = Arc::new(SlowReads {
        inner: repo.clone(),
        delay: Duration::from_millis(30),
    });
    let ledger = Arc::new(ProgressionLedger::new(
        fixed_clock(),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        slow.clone(),
        Arc::new(repo.clone()),
    ));
    let completion = CompletionService::new(
        Arc::clone(&ledger),
        Arc::new(repo.clone()),
        slow,
        EventBus::default(),
    );
    (ledger, completion)
}

#[tokio::test]
async fn ledger_keeps_every_quiz_when_one_student_races() {
    let repo = InMemoryRepository::new();
    seed(&repo, 1).await;
    seed(&repo, 2).await;
    let (ledger, _) = wire(&repo);
    let student = StudentId::new("s1");

    let (first, second) = tokio::join!(
        ledger.apply(perfect(1, &student)),
        ledger.apply(perfect(2, &student)),
    );
    assert!(first.unwrap().is_applied());
    assert!(second.unwrap().is_applied());

    let stats = repo.get_profile(&student).await.unwrap().unwrap();
    assert_eq!(stats.experience(), 200);
    assert_eq!(stats.perfect_count(), 2);
    assert_eq!(stats.level(), 3);
    assert_eq!(stats.accuracy(), 100);
}

#[tokio::test]
async fn finalize_serializes_stats_and_badges_per_student() {
    let repo = InMemoryRepository::new();
    seed(&repo, 1).await;
    seed(&repo, 2).await;
    let (_, completion) = wire(&repo);
    let completion = Arc::new(completion);
    let student = StudentId::new("s1");

    let tasks: Vec<_> = [1, 2]
        .into_iter()
        .map(|quiz| {
            let completion = Arc::clone(&completion);
            let submission = perfect(quiz, &student);
            tokio::spawn(async move { completion.finalize(submission).await.unwrap() })
        })
        .collect();
    let mut done = Vec::new();
    for task in tasks {
        done.push(task.await.unwrap());
    }

    assert!(done.iter().all(|c| c.status == ProgressionStatus::Applied));
    let stats = repo.get_profile(&student).await.unwrap().unwrap();
    assert_eq!(stats.experience(), 200);
    assert_eq!(stats.perfect_count(), 2);

    let tree = repo.get_badges(&student).await.unwrap().unwrap();
    assert_eq!(tree.badge(BadgeId::new(9)).unwrap().progress, 2);
    assert_eq!(tree.badge(BadgeId::new(13)).unwrap().progress, 2);

    // each unlock is reported by exactly one of the two calls
    let mut unlocked: Vec<_> = done
        .iter()
        .flat_map(|c| c.newly_unlocked.iter().map(|b| b.id))
        .collect();
    unlocked.sort();
    assert_eq!(unlocked, vec![BadgeId::new(9), BadgeId::new(13)]);
}
