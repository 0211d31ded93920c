//! Arithmetic behind experience, level, accuracy and perfect-attempt counts.
//!
//! Storage and the exactly-once guard live in the services crate; this module
//! only turns a scored attempt into the next `ProfileStats`.

use crate::model::{ProfileStats, SubmissionRecord};
use crate::scoring;

/// Experience awarded for an attempt: one point per percentage point.
#[must_use]
pub fn experience_for(percent: u8) -> u32 {
    u32::from(percent.min(100))
}

/// Accuracy across every attempt that earned progression.
///
/// `sum(score) / sum(total_possible)` over `history`, rounded like
/// [`scoring::percent`]. Attempts that were not progressed are ignored so a
/// retake cannot move the figure.
#[must_use]
pub fn cumulative_accuracy<'a>(history: impl IntoIterator<Item = &'a SubmissionRecord>) -> u8 {
    let (earned, possible) = history
        .into_iter()
        .filter(|record| record.progress_applied())
        .fold((0_u32, 0_u32), |(earned, possible), record| {
            (
                earned.saturating_add(record.score()),
                possible.saturating_add(record.total_possible()),
            )
        });
    scoring::percent(earned, possible)
}

/// Stats after progressing `attempt` on top of `current`.
///
/// `applied_history` holds the student's already-progressed records and must
/// not include `attempt` itself.
#[must_use]
pub fn advance(
    current: &ProfileStats,
    attempt: &SubmissionRecord,
    applied_history: &[SubmissionRecord],
) -> ProfileStats {
    let attempt = attempt.clone().with_progress_applied();
    let accuracy = cumulative_accuracy(
        applied_history
            .iter()
            .filter(|r| r.id() != attempt.id())
            .chain(std::iter::once(&attempt)),
    );

    let mut next = current.clone();
    next.gain(
        experience_for(attempt.percent()),
        accuracy,
        attempt.is_perfect(),
    );
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewSubmission, QuizId, StudentId};
    use crate::time::fixed_now;

    fn attempt(quiz: u64, score: u32, total: u32) -> SubmissionRecord {
        let draft = NewSubmission::new(QuizId::new(quiz), StudentId::new("s1"), Vec::new());
        let percent = scoring::percent(score, total);
        SubmissionRecord::new(draft, score, total, percent, fixed_now()).unwrap()
    }

    #[test]
    fn perfect_attempt_levels_up() {
        let stats = ProfileStats::new(StudentId::new("s1"));
        let next = advance(&stats, &attempt(1, 30, 30), &[]);
        assert_eq!(next.experience(), 100);
        assert_eq!(next.level(), 2);
        assert_eq!(next.accuracy(), 100);
        assert_eq!(next.perfect_count(), 1);
    }

    #[test]
    fn accuracy_is_cumulative_over_progressed_attempts() {
        let stats = ProfileStats::new(StudentId::new("s1"));
        let first = attempt(1, 30, 30).with_progress_applied();
        let after_first = advance(&stats, &first, &[]);

        let second = attempt(2, 0, 10);
        let after_second = advance(&after_first, &second, &[first]);

        // 30 of 40 points overall
        assert_eq!(after_second.accuracy(), 75);
        assert_eq!(after_second.experience(), 100);
        assert_eq!(after_second.perfect_count(), 1);
    }

    #[test]
    fn unapplied_records_do_not_count() {
        let retake = attempt(1, 0, 30);
        assert_eq!(cumulative_accuracy([&retake]), 0);
        let applied = attempt(1, 15, 30).with_progress_applied();
        assert_eq!(cumulative_accuracy([&retake, &applied]), 50);
    }
}
