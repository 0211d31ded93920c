use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::StudentId;

/// Experience needed to climb one level. Used by every level computation.
pub const XP_PER_LEVEL: u32 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("level {level} does not match experience {experience}")]
    LevelMismatch { level: u32, experience: u32 },

    #[error("accuracy must be within 0..=100, got {0}")]
    AccuracyOutOfRange(u32),
}

/// Level derived from cumulative experience. Level 1 starts at zero XP.
#[must_use]
pub fn level_for_experience(experience: u32) -> u32 {
    1 + experience / XP_PER_LEVEL
}

/// Progression figures owned by a student and mutated only by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    student_id: StudentId,
    level: u32,
    experience: u32,
    accuracy: u8,
    perfect_count: u32,
}

impl ProfileStats {
    /// Fresh profile: level 1, no experience.
    #[must_use]
    pub fn new(student_id: StudentId) -> Self {
        Self {
            student_id,
            level: 1,
            experience: 0,
            accuracy: 0,
            perfect_count: 0,
        }
    }

    /// Rehydrate from storage, checking the level agrees with the ladder.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` if the persisted level or accuracy is inconsistent.
    pub fn from_persisted(
        student_id: StudentId,
        level: u32,
        experience: u32,
        accuracy: u8,
        perfect_count: u32,
    ) -> Result<Self, ProfileError> {
        if level != level_for_experience(experience) {
            return Err(ProfileError::LevelMismatch { level, experience });
        }
        if accuracy > 100 {
            return Err(ProfileError::AccuracyOutOfRange(u32::from(accuracy)));
        }
        Ok(Self {
            student_id,
            level,
            experience,
            accuracy,
            perfect_count,
        })
    }

    #[must_use]
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Cumulative experience, never reset on level-up.
    #[must_use]
    pub fn experience(&self) -> u32 {
        self.experience
    }

    #[must_use]
    pub fn accuracy(&self) -> u8 {
        self.accuracy
    }

    /// Number of perfect attempts that received progression.
    #[must_use]
    pub fn perfect_count(&self) -> u32 {
        self.perfect_count
    }

    /// Experience earned inside the current level and the size of a level.
    #[must_use]
    pub fn level_progress(&self) -> (u32, u32) {
        (self.experience % XP_PER_LEVEL, XP_PER_LEVEL)
    }

    pub(crate) fn gain(&mut self, experience_delta: u32, accuracy: u8, perfect: bool) {
        self.experience = self.experience.saturating_add(experience_delta);
        self.level = level_for_experience(self.experience);
        self.accuracy = accuracy.min(100);
        if perfect {
            self.perfect_count = self.perfect_count.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_is_linear() {
        assert_eq!(level_for_experience(0), 1);
        assert_eq!(level_for_experience(99), 1);
        assert_eq!(level_for_experience(100), 2);
        assert_eq!(level_for_experience(250), 3);
    }

    #[test]
    fn persisted_level_must_match() {
        let err = ProfileStats::from_persisted(StudentId::new("s"), 3, 120, 50, 0).unwrap_err();
        assert_eq!(
            err,
            ProfileError::LevelMismatch {
                level: 3,
                experience: 120
            }
        );
        assert!(ProfileStats::from_persisted(StudentId::new("s"), 2, 120, 50, 0).is_ok());
    }

    #[test]
    fn level_progress_reports_remainder() {
        let stats = ProfileStats::from_persisted(StudentId::new("s"), 2, 145, 80, 1).unwrap();
        assert_eq!(stats.level_progress(), (45, XP_PER_LEVEL));
    }
}
