//! Student home view: quiz buckets, profile and badges.
//!
//! Every collaborator load is fail-open: a failure is logged and the view
//! continues with an empty collection.

use std::collections::HashSet;
use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{BadgeTree, ClassId, ProfileStats, Quiz, QuizId, QuizStatus, StudentId};
use storage::repository::{
    BadgeRepository, ProfileRepository, QuizRepository, RosterRepository, StorageError,
    SubmissionFilter, SubmissionRepository,
};

/// Posted quizzes visible to a student, bucketed by status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizBuckets {
    /// Not yet attempted and still open, soonest due first.
    pub new: Vec<Quiz>,
    /// Due date passed without an attempt, soonest due first.
    pub missed: Vec<Quiz>,
    /// At least one attempt recorded.
    pub done: Vec<Quiz>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDashboard {
    pub buckets: QuizBuckets,
    pub stats: ProfileStats,
    pub badges: BadgeTree,
}

pub struct DashboardService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    profiles: Arc<dyn ProfileRepository>,
    badges: Arc<dyn BadgeRepository>,
    rosters: Arc<dyn RosterRepository>,
}

fn or_empty<T: Default>(what: &'static str, loaded: Result<T, StorageError>) -> T {
    loaded.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "failed to load {what}; showing empty");
        T::default()
    })
}

impl DashboardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        profiles: Arc<dyn ProfileRepository>,
        badges: Arc<dyn BadgeRepository>,
        rosters: Arc<dyn RosterRepository>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            submissions,
            profiles,
            badges,
            rosters,
        }
    }

    /// Load the student's dashboard. Never fails.
    pub async fn load(&self, student_id: &StudentId) -> StudentDashboard {
        let classes: HashSet<ClassId> =
            or_empty("roster", self.rosters.classes_for(student_id).await)
                .into_iter()
                .collect();
        let quizzes = or_empty("quizzes", self.quizzes.list_quizzes().await);
        let attempted: HashSet<QuizId> = or_empty(
            "submissions",
            self.submissions
                .list_submissions(&SubmissionFilter::for_student(student_id.clone()))
                .await,
        )
        .iter()
        .map(|r| r.quiz_id())
        .collect();

        let stats = or_empty("profile", self.profiles.get_profile(student_id).await)
            .unwrap_or_else(|| ProfileStats::new(student_id.clone()));
        let badges = or_empty("badges", self.badges.get_badges(student_id).await)
            .unwrap_or_else(BadgeTree::catalogue);

        StudentDashboard {
            buckets: self.bucket(quizzes, &classes, &attempted),
            stats,
            badges,
        }
    }

    fn bucket(
        &self,
        quizzes: Vec<Quiz>,
        classes: &HashSet<ClassId>,
        attempted: &HashSet<QuizId>,
    ) -> QuizBuckets {
        let now = self.clock.now();
        let mut buckets = QuizBuckets::default();

        for quiz in quizzes {
            let visible = quiz.status() == QuizStatus::Posted
                && quiz.class_ids().iter().any(|c| classes.contains(c));
            if !visible {
                continue;
            }
            if attempted.contains(&quiz.id()) {
                buckets.done.push(quiz);
            } else if quiz.due_at().is_some_and(|due| due < now) {
                buckets.missed.push(quiz);
            } else {
                buckets.new.push(quiz);
            }
        }

        // undated quizzes sort last
        let by_due = |q: &Quiz| (q.due_at().is_none(), q.due_at(), q.id());
        buckets.new.sort_by_key(by_due);
        buckets.missed.sort_by_key(by_due);
        buckets
    }
}
