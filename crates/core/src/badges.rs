//! Badge progress, recomputed from the full completion history on every call.
//!
//! Counters are never incremented in place: the evaluator copies the current
//! tree, overwrites each tracked counter from history, and diffs the two trees
//! to find goal-crossings.

use std::collections::HashSet;

use crate::model::{Badge, BadgeCategoryKind, BadgeTree, QuizId, SubmissionRecord};

/// Counters derivable from completion history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionCounts {
    /// Distinct quizzes completed with progression.
    pub completed: u32,
    /// Distinct quizzes whose progressed attempt earned every point.
    pub perfect: u32,
}

impl CompletionCounts {
    /// Count over progressed records only; retakes never add to a counter.
    #[must_use]
    pub fn from_history(history: &[SubmissionRecord]) -> Self {
        let mut completed: HashSet<QuizId> = HashSet::new();
        let mut perfect: HashSet<QuizId> = HashSet::new();
        for record in history.iter().filter(|r| r.progress_applied()) {
            completed.insert(record.quiz_id());
            if record.is_perfect() {
                perfect.insert(record.quiz_id());
            }
        }
        Self {
            completed: u32::try_from(completed.len()).unwrap_or(u32::MAX),
            perfect: u32::try_from(perfect.len()).unwrap_or(u32::MAX),
        }
    }

    fn for_kind(self, kind: BadgeCategoryKind) -> Option<u32> {
        match kind {
            BadgeCategoryKind::QuizMilestone => Some(self.completed),
            BadgeCategoryKind::PerfectScore => Some(self.perfect),
            BadgeCategoryKind::Untracked => None,
        }
    }
}

/// Result of a recompute: the new tree and badges that crossed their goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeRecompute {
    pub tree: BadgeTree,
    pub newly_unlocked: Vec<Badge>,
}

/// Recompute every tracked category from `history`.
///
/// Pure: the same inputs always give the same outputs, and feeding the output
/// tree back in reports nothing newly unlocked.
#[must_use]
pub fn recompute(history: &[SubmissionRecord], current: &BadgeTree) -> BadgeRecompute {
    let counts = CompletionCounts::from_history(history);
    let mut tree = current.clone();
    let mut newly_unlocked = Vec::new();

    for category in tree.categories_mut() {
        let Some(progress) = counts.for_kind(category.kind) else {
            continue;
        };
        for badge in &mut category.badges {
            let was_unlocked = badge.is_unlocked();
            badge.progress = progress;
            if badge.is_unlocked() && !was_unlocked {
                newly_unlocked.push(badge.clone());
            }
        }
    }

    BadgeRecompute {
        tree,
        newly_unlocked,
    }
}
