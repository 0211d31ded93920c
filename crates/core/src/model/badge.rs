use serde::{Deserialize, Serialize};

use crate::model::ids::BadgeId;

/// What a category's progress counter measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadgeCategoryKind {
    /// Count of completed quizzes.
    QuizMilestone,
    /// Count of completed quizzes with every point earned.
    PerfectScore,
    /// Fed by a subsystem outside progression (leaderboards, answer speed).
    #[default]
    Untracked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    pub progress: u32,
    pub goal: u32,
}

impl Badge {
    #[must_use]
    pub fn new(id: u32, name: &str, description: &str, goal: u32) -> Self {
        Self {
            id: BadgeId::new(id),
            name: name.to_owned(),
            description: description.to_owned(),
            progress: 0,
            goal: goal.max(1),
        }
    }

    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.progress >= self.goal
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeCategory {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub kind: BadgeCategoryKind,
    pub badges: Vec<Badge>,
}

/// A student's full badge state, grouped by category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BadgeTree {
    categories: Vec<BadgeCategory>,
}

impl BadgeTree {
    #[must_use]
    pub fn new(categories: Vec<BadgeCategory>) -> Self {
        Self { categories }
    }

    /// The stock catalogue with all progress at zero.
    #[must_use]
    pub fn catalogue() -> Self {
        fn category(
            id: &str,
            title: &str,
            kind: BadgeCategoryKind,
            badges: Vec<Badge>,
        ) -> BadgeCategory {
            BadgeCategory {
                id: id.to_owned(),
                title: title.to_owned(),
                kind,
                badges,
            }
        }

        Self::new(vec![
            category(
                "consistent_performer",
                "Consistent Performer (Top 3 Leaderboard)",
                BadgeCategoryKind::Untracked,
                vec![
                    Badge::new(1, "Bronze Challenger", "Place in the top 3 on any leaderboard 5 times.", 5),
                    Badge::new(2, "Silver Contender", "Place in the top 3 on any leaderboard 15 times.", 15),
                    Badge::new(3, "Gold Guardian", "Place in the top 3 on any leaderboard 30 times.", 30),
                    Badge::new(4, "Diamond Dominator", "Place in the top 3 on any leaderboard 50 times.", 50),
                ],
            ),
            category(
                "apex_achiever",
                "Apex Achiever (Top 1 Leaderboard)",
                BadgeCategoryKind::Untracked,
                vec![
                    Badge::new(5, "Bronze Victor", "Place 1st on any leaderboard 3 times.", 3),
                    Badge::new(6, "Silver Champion", "Place 1st on any leaderboard 10 times.", 10),
                    Badge::new(7, "Gold Conqueror", "Place 1st on any leaderboard 25 times.", 25),
                    Badge::new(8, "Diamond Deity", "Place 1st on any leaderboard 50 times.", 50),
                ],
            ),
            category(
                "quiz_milestone",
                "Quiz Milestone Badges",
                BadgeCategoryKind::QuizMilestone,
                vec![
                    Badge::new(9, "First Flight", "Complete your very first quiz.", 1),
                    Badge::new(10, "Adept Apprentice", "Complete 5 quizzes.", 5),
                    Badge::new(11, "Seasoned Solver", "Complete 10 quizzes.", 10),
                    Badge::new(12, "Veteran Voyager", "Complete 20 quizzes.", 20),
                ],
            ),
            category(
                "perfect_score",
                "Perfect Score Badges",
                BadgeCategoryKind::PerfectScore,
                vec![
                    Badge::new(13, "Flawless Start", "Achieve your first perfect score.", 1),
                    Badge::new(14, "Precision Pundit", "Achieve 5 perfect scores.", 5),
                    Badge::new(15, "Immaculate Intellect", "Achieve 10 perfect scores.", 10),
                    Badge::new(16, "Zenith Genius", "Achieve 20 perfect scores.", 20),
                ],
            ),
            category(
                "speed_responder",
                "Speed Responder Badges",
                BadgeCategoryKind::Untracked,
                vec![
                    Badge::new(17, "Swift Spark", "Answer 10 questions correctly within 5 seconds each.", 10),
                    Badge::new(18, "Rapid Reflex", "Answer 50 questions correctly within 10 seconds each.", 50),
                    Badge::new(19, "Calculated Sprint", "Answer 100 questions correctly within 30 seconds each.", 100),
                ],
            ),
        ])
    }

    #[must_use]
    pub fn categories(&self) -> &[BadgeCategory] {
        &self.categories
    }

    pub fn categories_mut(&mut self) -> &mut [BadgeCategory] {
        &mut self.categories
    }

    pub fn badges(&self) -> impl Iterator<Item = &Badge> {
        self.categories.iter().flat_map(|c| c.badges.iter())
    }

    #[must_use]
    pub fn badge(&self, id: BadgeId) -> Option<&Badge> {
        self.badges().find(|b| b.id == id)
    }

    #[must_use]
    pub fn unlocked_count(&self) -> usize {
        self.badges().filter(|b| b.is_unlocked()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_starts_locked() {
        let tree = BadgeTree::catalogue();
        assert_eq!(tree.categories().len(), 5);
        assert_eq!(tree.badges().count(), 19);
        assert_eq!(tree.unlocked_count(), 0);
    }

    #[test]
    fn goal_is_never_zero() {
        let badge = Badge::new(99, "Odd", "zero goal", 0);
        assert_eq!(badge.goal, 1);
        assert!(!badge.is_unlocked());
    }
}
