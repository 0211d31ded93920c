//! Answer judging and point tallies.
//!
//! Every comparison goes through [`normalize`]: uppercase, then keep only
//! ASCII letters and digits. Free-text answers, word-search selections and
//! multiple-choice option text are all judged the same way.

use std::collections::HashMap;

use crate::model::{AnswerEntry, Question, QuestionId, Quiz};

/// Canonical form used for answer comparison.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_uppercase)
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// True when both strings normalize to the same value.
#[must_use]
pub fn judge(expected: &str, submitted: &str) -> bool {
    normalize(expected) == normalize(submitted)
}

/// Points earned for one question.
#[must_use]
pub fn score(question: &Question, was_correct: bool) -> u32 {
    if was_correct { question.points() } else { 0 }
}

/// `round(100 * earned / total)`, clamped to 0..=100. Zero when nothing was possible.
#[must_use]
pub fn percent(earned: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let earned = u64::from(earned.min(total));
    let total = u64::from(total);
    // round half up without floats
    let rounded = (200 * earned + total) / (2 * total);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

/// Outcome of scoring a whole quiz against a set of answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub score: u32,
    pub total_possible: u32,
    pub percent: u8,
    pub per_question: Vec<(QuestionId, bool)>,
}

/// Score recorded answers against a quiz. Unanswered questions count as incorrect.
///
/// When the same question appears more than once, the last entry wins.
#[must_use]
pub fn tally(quiz: &Quiz, answers: &[AnswerEntry]) -> Tally {
    let by_question: HashMap<QuestionId, &str> = answers
        .iter()
        .map(|a| (a.question_id, a.answer.as_str()))
        .collect();

    let mut earned = 0_u32;
    let mut total = 0_u32;
    let mut per_question = Vec::with_capacity(quiz.questions().len());
    for question in quiz.questions() {
        total = total.saturating_add(question.points());
        let correct = by_question
            .get(&question.id())
            .is_some_and(|answer| judge(question.expected_answer(), answer));
        earned = earned.saturating_add(score(question, correct));
        per_question.push((question.id(), correct));
    }

    Tally {
        score: earned,
        total_possible: total,
        percent: percent(earned, total),
        per_question,
    }
}
