use std::collections::HashMap;

use quiz_core::model::{
    EngineSettings, ParticipationMode, Question, QuestionId, Quiz, SubmissionId,
};
use quiz_core::scoring;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::presentation::Presentation;
use super::progress::SessionProgress;
use super::result::{QuestionOutcome, SessionResult};
use crate::error::SessionError;

//
// ─── STATES AND SIGNALS ────────────────────────────────────────────────────────
//

/// Where the session stands. Indices are zero-based question positions.
///
/// `Checking` is transient: it is entered and left inside a single submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Presenting(usize),
    AwaitingAnswer(usize),
    Checking(usize),
    Feedback(usize),
    Completed,
}

/// Countdown to run for the question that was just presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub generation: u64,
    pub seconds: u32,
}

/// Result of feeding one countdown tick to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Tick from a countdown that no longer owns the question. Ignored.
    Stale,
    Running { remaining: u32 },
    /// Time ran out and the pending answer was submitted.
    Expired(QuestionOutcome),
}

/// Result of leaving `Feedback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next(usize),
    Completed(SessionResult),
}

/// Advisory turn display for team play. Never gates who may answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamTurn {
    pub index: usize,
    pub member: String,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One student's attempt at a quiz, driven question by question.
///
/// The session owns all transient state for the attempt. Dropping it abandons
/// the attempt without persisting anything.
pub struct QuizSession {
    quiz: Quiz,
    settings: EngineSettings,
    submission_id: SubmissionId,
    phase: SessionPhase,
    presentation: Presentation,
    pending: Option<String>,
    answers: HashMap<QuestionId, String>,
    outcomes: Vec<QuestionOutcome>,
    remaining_secs: u32,
    generation: u64,
    team: Vec<String>,
    rng: StdRng,
    result: Option<SessionResult>,
}

impl QuizSession {
    /// Start an attempt. A quiz without questions completes immediately.
    #[must_use]
    pub fn new(quiz: Quiz, settings: EngineSettings) -> Self {
        let submission_id = SubmissionId::new_random();
        let (phase, result) = if quiz.questions().is_empty() {
            (
                SessionPhase::Completed,
                Some(SessionResult::empty(quiz.id(), submission_id)),
            )
        } else {
            (SessionPhase::Presenting(0), None)
        };

        Self {
            quiz,
            settings,
            submission_id,
            phase,
            presentation: Presentation::Normal,
            pending: None,
            answers: HashMap::new(),
            outcomes: Vec::new(),
            remaining_secs: 0,
            generation: 0,
            team: Vec::new(),
            rng: StdRng::from_rng(&mut rand::rng()),
            result,
        }
    }

    /// Team members for turn display, in turn order.
    #[must_use]
    pub fn with_team<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.team = members.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    #[must_use]
    pub fn with_submission_id(mut self, id: SubmissionId) -> Self {
        self.submission_id = id;
        if let Some(result) = self.result.as_mut() {
            result.submission_id = id;
        }
        self
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    #[must_use]
    pub fn submission_id(&self) -> SubmissionId {
        self.submission_id
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            SessionPhase::Presenting(i)
            | SessionPhase::AwaitingAnswer(i)
            | SessionPhase::Checking(i)
            | SessionPhase::Feedback(i) => Some(i),
            SessionPhase::Completed => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.quiz.questions().get(i))
    }

    #[must_use]
    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    #[must_use]
    pub fn pending_answer(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Latest captured answer per question.
    #[must_use]
    pub fn answers(&self) -> &HashMap<QuestionId, String> {
        &self.answers
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Identifies the countdown that currently owns the question.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn outcomes(&self) -> &[QuestionOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.quiz.questions().len();
        let answered = self.outcomes.len();
        SessionProgress {
            total,
            answered,
            correct: self.outcomes.iter().filter(|o| o.correct).count(),
            remaining: total.saturating_sub(answered),
            is_complete: self.is_complete(),
        }
    }

    /// Whose turn it is in team play: member `index mod team size`.
    #[must_use]
    pub fn turn(&self) -> Option<TeamTurn> {
        let index = self.current_index()?;
        let member = self.member_for(index)?;
        Some(TeamTurn { index, member })
    }

    fn member_for(&self, index: usize) -> Option<String> {
        if self.quiz.participation_mode() != ParticipationMode::Team || self.team.is_empty() {
            return None;
        }
        self.team.get(index % self.team.len()).cloned()
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Load the current question and arm its countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` unless the session is `Presenting`.
    pub fn present(&mut self) -> Result<Countdown, SessionError> {
        let SessionPhase::Presenting(index) = self.phase else {
            return Err(SessionError::WrongPhase(self.phase));
        };
        let question = self
            .quiz
            .questions()
            .get(index)
            .ok_or(SessionError::WrongPhase(self.phase))?;

        self.presentation = Presentation::for_question(
            self.quiz.presentation_mode(),
            question,
            self.settings.grid_size(),
            &mut self.rng,
        );
        self.pending = None;
        self.remaining_secs = question
            .time_limit_secs()
            .unwrap_or(self.settings.default_time_limit_secs());
        self.generation += 1;
        self.phase = SessionPhase::AwaitingAnswer(index);

        Ok(Countdown {
            generation: self.generation,
            seconds: self.remaining_secs,
        })
    }

    /// Explicit submit of whatever answer is pending.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` unless the session is awaiting an answer.
    pub fn submit(&mut self) -> Result<QuestionOutcome, SessionError> {
        let index = self.awaiting()?;
        Ok(self.check(index, false))
    }

    /// Count one second off the countdown identified by `generation`.
    pub fn tick(&mut self, generation: u64) -> Tick {
        let SessionPhase::AwaitingAnswer(index) = self.phase else {
            return Tick::Stale;
        };
        if generation != self.generation {
            return Tick::Stale;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return Tick::Running {
                remaining: self.remaining_secs,
            };
        }

        let outcome = self.check(index, true);
        tracing::info!(
            quiz_id = %self.quiz.id(),
            question_id = %outcome.question_id,
            answered = outcome.answer.is_some(),
            "countdown expired, answer submitted"
        );
        Tick::Expired(outcome)
    }

    /// Leave `Feedback` for the next question or completion.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` unless the session is showing feedback.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        let SessionPhase::Feedback(index) = self.phase else {
            return Err(SessionError::WrongPhase(self.phase));
        };

        self.presentation = Presentation::Normal;
        self.pending = None;

        let next = index + 1;
        if next < self.quiz.questions().len() {
            self.phase = SessionPhase::Presenting(next);
            return Ok(Advance::Next(next));
        }

        let result = SessionResult {
            quiz_id: self.quiz.id(),
            submission_id: self.submission_id,
            outcomes: self.outcomes.clone(),
            total_score: self
                .outcomes
                .iter()
                .fold(0_u32, |acc, o| acc.saturating_add(o.points_earned)),
            total_possible: self.quiz.total_points(),
        };
        self.phase = SessionPhase::Completed;
        self.result = Some(result.clone());
        Ok(Advance::Completed(result))
    }

    fn check(&mut self, index: usize, timed_out: bool) -> QuestionOutcome {
        self.phase = SessionPhase::Checking(index);
        // any countdown still running for this question is now stale
        self.generation += 1;

        let attributed_to = self.member_for(index);
        let outcome = match self.quiz.questions().get(index) {
            Some(question) => {
                let correct = self
                    .pending
                    .as_deref()
                    .is_some_and(|answer| scoring::judge(question.expected_answer(), answer));
                QuestionOutcome {
                    question_id: question.id(),
                    answer: self.pending.clone(),
                    expected_answer: question.expected_answer().to_owned(),
                    correct,
                    points_earned: scoring::score(question, correct),
                    points_possible: question.points(),
                    timed_out,
                    attributed_to,
                }
            }
            None => QuestionOutcome {
                question_id: QuestionId::new(0),
                answer: None,
                expected_answer: String::new(),
                correct: false,
                points_earned: 0,
                points_possible: 0,
                timed_out,
                attributed_to,
            },
        };

        self.outcomes.push(outcome.clone());
        self.phase = SessionPhase::Feedback(index);
        outcome
    }

    //
    // ─── ANSWER CAPTURE ────────────────────────────────────────────────────────
    //

    fn awaiting(&self) -> Result<usize, SessionError> {
        match self.phase {
            SessionPhase::AwaitingAnswer(index) => Ok(index),
            other => Err(SessionError::WrongPhase(other)),
        }
    }

    fn set_pending(&mut self, index: usize, answer: Option<String>) {
        if let Some(question) = self.quiz.questions().get(index) {
            match &answer {
                Some(text) => {
                    self.answers.insert(question.id(), text.clone());
                }
                None => {
                    self.answers.remove(&question.id());
                }
            }
        }
        self.pending = answer;
    }

    /// Replace the pending free-text answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside `AwaitingAnswer`, for option questions,
    /// on word-search boards, or before a card is flipped.
    pub fn type_answer(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        let index = self.awaiting()?;
        if !self.presentation.is_revealed() {
            return Err(SessionError::CardNotRevealed);
        }
        let takes_text = self
            .current_question()
            .is_some_and(Question::is_identification)
            && self.presentation.grid().is_none();
        if !takes_text {
            return Err(SessionError::UnsupportedInput);
        }
        self.set_pending(index, Some(text.into()));
        Ok(())
    }

    /// Pick option `option` of a multiple-choice question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside `AwaitingAnswer`, for questions without
    /// options, for an out-of-range index, or before a card is flipped.
    pub fn select_option(&mut self, option: usize) -> Result<(), SessionError> {
        let index = self.awaiting()?;
        if !self.presentation.is_revealed() {
            return Err(SessionError::CardNotRevealed);
        }
        let options = self
            .current_question()
            .map(Question::options)
            .unwrap_or_default();
        if options.is_empty() {
            return Err(SessionError::UnsupportedInput);
        }
        let choice = options
            .get(option)
            .cloned()
            .ok_or(SessionError::OptionOutOfRange {
                index: option,
                len: options.len(),
            })?;
        self.set_pending(index, Some(choice));
        Ok(())
    }

    /// Turn the card face up. Flipping is one-way.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside `AwaitingAnswer` or when the question is not a card.
    pub fn flip_card(&mut self) -> Result<(), SessionError> {
        self.awaiting()?;
        match &mut self.presentation {
            Presentation::Card { flipped } => {
                *flipped = true;
                Ok(())
            }
            _ => Err(SessionError::UnsupportedInput),
        }
    }

    /// Pointer down on grid cell `cell`; clears any committed selection.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside `AwaitingAnswer` or without a grid.
    pub fn grid_press(&mut self, cell: usize) -> Result<(), SessionError> {
        let index = self.awaiting()?;
        let Presentation::Board { grid, selection } = &mut self.presentation else {
            return Err(SessionError::UnsupportedInput);
        };
        selection.press(grid, cell);
        self.set_pending(index, None);
        Ok(())
    }

    /// Pointer moved onto `cell` during a drag. True when the cell joined the path.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside `AwaitingAnswer` or without a grid.
    pub fn grid_enter(&mut self, cell: usize) -> Result<bool, SessionError> {
        self.awaiting()?;
        let Presentation::Board { grid, selection } = &mut self.presentation else {
            return Err(SessionError::UnsupportedInput);
        };
        Ok(selection.enter(grid, cell))
    }

    /// Pointer up: the selected letters become the pending answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside `AwaitingAnswer` or without a grid.
    pub fn grid_release(&mut self) -> Result<Option<String>, SessionError> {
        let index = self.awaiting()?;
        let Presentation::Board { grid, selection } = &mut self.presentation else {
            return Err(SessionError::UnsupportedInput);
        };
        let committed = selection.release(grid).map(str::to_owned);
        if committed.is_some() {
            self.set_pending(index, committed.clone());
        }
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{PresentationMode, QuestionDraft, QuizDraft};

    fn three_question_quiz(mode: PresentationMode) -> Quiz {
        QuizDraft::new(1, "Cells")
            .with_mode(mode)
            .with_question(QuestionDraft::identification(1, "Control center?", "Nucleus").with_points(10))
            .with_question(QuestionDraft::identification(2, "Powerhouse?", "Mitochondria").with_points(10))
            .with_question(
                QuestionDraft::multiple_choice(3, "Plant cell wall?", &["Cellulose", "Chitin"], "Cellulose")
                    .with_points(10),
            )
            .validate()
            .unwrap()
    }

    fn session(mode: PresentationMode) -> QuizSession {
        QuizSession::new(three_question_quiz(mode), EngineSettings::default())
            .with_rng(StdRng::seed_from_u64(11))
    }

    #[test]
    fn empty_quiz_completes_immediately() {
        let quiz = QuizDraft::new(9, "Nothing").validate().unwrap();
        let mut session = QuizSession::new(quiz, EngineSettings::default());
        assert!(session.is_complete());
        let result = session.result().unwrap();
        assert!(result.outcomes.is_empty());
        assert_eq!(result.total_possible, 0);
        assert_eq!(
            session.present(),
            Err(SessionError::WrongPhase(SessionPhase::Completed))
        );
    }

    #[test]
    fn all_correct_reaches_completed_with_full_score() {
        let mut session = session(PresentationMode::Normal);

        session.present().unwrap();
        session.type_answer("nucleus").unwrap();
        assert!(session.submit().unwrap().correct);
        assert_eq!(session.advance().unwrap(), Advance::Next(1));

        session.present().unwrap();
        session.type_answer("MITOCHONDRIA!").unwrap();
        session.submit().unwrap();
        session.advance().unwrap();

        session.present().unwrap();
        session.select_option(0).unwrap();
        session.submit().unwrap();
        let Advance::Completed(result) = session.advance().unwrap() else {
            panic!("expected completion");
        };

        assert_eq!(result.total_score, 30);
        assert_eq!(result.total_possible, 30);
        assert_eq!(result.percent(), 100);
        assert!(session.is_complete());
        assert_eq!(session.progress().correct, 3);
    }

    #[test]
    fn countdown_expiry_forces_incorrect_submission() {
        let mut session = session(PresentationMode::Normal);
        let countdown = session.present().unwrap();
        assert_eq!(countdown.seconds, 30);

        for remaining in (1..30).rev() {
            assert_eq!(
                session.tick(countdown.generation),
                Tick::Running { remaining }
            );
        }
        let Tick::Expired(outcome) = session.tick(countdown.generation) else {
            panic!("expected expiry");
        };
        assert!(outcome.timed_out);
        assert!(!outcome.correct);
        assert_eq!(outcome.answer, None);
        assert_eq!(session.phase(), SessionPhase::Feedback(0));
    }

    #[test]
    fn expiry_uses_latest_pending_answer() {
        let quiz = QuizDraft::new(2, "Quick")
            .with_question(QuestionDraft::identification(1, "H2O?", "Water").with_time_limit(2))
            .validate()
            .unwrap();
        let mut session = QuizSession::new(quiz, EngineSettings::default());
        let countdown = session.present().unwrap();
        assert_eq!(countdown.seconds, 2);

        session.type_answer("ice").unwrap();
        session.type_answer("water").unwrap();
        assert_eq!(session.pending_answer(), Some("water"));

        session.tick(countdown.generation);
        let Tick::Expired(outcome) = session.tick(countdown.generation) else {
            panic!("expected expiry");
        };
        assert!(outcome.correct);
        assert!(outcome.timed_out);
    }

    #[test]
    fn ticks_after_submit_are_stale() {
        let mut session = session(PresentationMode::Normal);
        let countdown = session.present().unwrap();
        session.submit().unwrap();
        assert_eq!(session.tick(countdown.generation), Tick::Stale);

        session.advance().unwrap();
        let next = session.present().unwrap();
        assert_eq!(session.tick(countdown.generation), Tick::Stale);
        assert_eq!(
            session.tick(next.generation),
            Tick::Running { remaining: 29 }
        );
    }

    #[test]
    fn events_outside_awaiting_answer_are_rejected() {
        let mut session = session(PresentationMode::Normal);
        assert_eq!(
            session.submit(),
            Err(SessionError::WrongPhase(SessionPhase::Presenting(0)))
        );
        session.present().unwrap();
        assert_eq!(
            session.advance(),
            Err(SessionError::WrongPhase(SessionPhase::AwaitingAnswer(0)))
        );
        session.submit().unwrap();
        assert_eq!(
            session.type_answer("late"),
            Err(SessionError::WrongPhase(SessionPhase::Feedback(0)))
        );
    }

    #[test]
    fn option_selection_is_bounds_checked() {
        let mut session = session(PresentationMode::Normal);
        for _ in 0..2 {
            session.present().unwrap();
            session.submit().unwrap();
            session.advance().unwrap();
        }
        session.present().unwrap();
        assert_eq!(
            session.type_answer("Cellulose"),
            Err(SessionError::UnsupportedInput)
        );
        assert_eq!(
            session.select_option(5),
            Err(SessionError::OptionOutOfRange { index: 5, len: 2 })
        );
        session.select_option(1).unwrap();
        assert!(!session.submit().unwrap().correct);
    }

    #[test]
    fn card_must_be_flipped_before_answering() {
        let mut session = session(PresentationMode::CardGame);
        session.present().unwrap();
        assert_eq!(
            session.type_answer("Nucleus"),
            Err(SessionError::CardNotRevealed)
        );
        session.flip_card().unwrap();
        session.type_answer("Nucleus").unwrap();
        assert!(session.submit().unwrap().correct);
    }

    #[test]
    fn board_selection_commits_on_release() {
        let mut session = session(PresentationMode::BoardGame);
        session.present().unwrap();
        let path = session.presentation().grid().unwrap().answer_cells();
        assert_eq!(path.len(), "NUCLEUS".len());

        assert_eq!(
            session.type_answer("Nucleus"),
            Err(SessionError::UnsupportedInput)
        );

        session.grid_press(path[0]).unwrap();
        for &cell in &path[1..] {
            assert!(session.grid_enter(cell).unwrap());
        }
        assert_eq!(session.pending_answer(), None);
        assert_eq!(session.grid_release().unwrap().as_deref(), Some("NUCLEUS"));
        assert_eq!(session.pending_answer(), Some("NUCLEUS"));

        // a new press clears the committed value
        session.grid_press(path[0]).unwrap();
        assert_eq!(session.pending_answer(), None);
        for &cell in &path[1..] {
            session.grid_enter(cell).unwrap();
        }
        session.grid_release().unwrap();
        assert!(session.submit().unwrap().correct);
    }

    #[test]
    fn board_mode_keeps_option_selection_for_choice_questions() {
        let mut session = session(PresentationMode::BoardGame);
        for _ in 0..2 {
            session.present().unwrap();
            assert!(session.presentation().grid().is_some());
            session.submit().unwrap();
            session.advance().unwrap();
        }
        session.present().unwrap();
        assert!(session.presentation().grid().is_none());
        session.select_option(0).unwrap();
        assert!(session.submit().unwrap().correct);
    }

    #[test]
    fn team_turns_rotate_by_question_index() {
        let quiz = QuizDraft::new(3, "Relay")
            .with_participation(ParticipationMode::Team)
            .with_question(QuestionDraft::identification(1, "1", "a"))
            .with_question(QuestionDraft::identification(2, "2", "b"))
            .with_question(QuestionDraft::identification(3, "3", "c"))
            .validate()
            .unwrap();
        let mut session =
            QuizSession::new(quiz, EngineSettings::default()).with_team(["Ana", "Ben"]);

        let mut members = Vec::new();
        loop {
            session.present().unwrap();
            members.push(session.turn().unwrap().member);
            session.submit().unwrap();
            if let Advance::Completed(result) = session.advance().unwrap() {
                let credited: Vec<_> = result
                    .outcomes
                    .iter()
                    .map(|o| o.attributed_to.clone().unwrap())
                    .collect();
                assert_eq!(credited, members);
                break;
            }
        }
        assert_eq!(members, vec!["Ana", "Ben", "Ana"]);
    }

    #[test]
    fn solo_sessions_have_no_turns() {
        let mut session = session(PresentationMode::Normal).with_team(["Ana"]);
        session.present().unwrap();
        assert_eq!(session.turn(), None);
    }
}
