use quiz_core::model::{BadgeId, EngineSettings, QuestionDraft, Quiz, QuizDraft, StudentId};
use quiz_core::time::fixed_clock;
use services::{
    Advance, AppServices, ProgressEvent, ProgressionStatus, QuizSession, SessionPhase, SessionResult,
};
use storage::repository::{Storage, SubmissionFilter, SubmissionRepository};

fn cell_quiz() -> QuizDraft {
    QuizDraft::new(1, "Cell Basics")
        .with_question(QuestionDraft::identification(1, "Control center?", "Nucleus").with_points(10))
        .with_question(QuestionDraft::identification(2, "Powerhouse?", "Mitochondria").with_points(10))
        .with_question(
            QuestionDraft::multiple_choice(3, "Plant wall?", &["Chitin", "Cellulose"], "Cellulose")
                .with_points(10),
        )
}

fn play(quiz: Quiz, expire_second: bool) -> SessionResult {
    let mut session = QuizSession::new(quiz, EngineSettings::default());

    session.present().unwrap();
    session.type_answer("nucleus").unwrap();
    session.submit().unwrap();
    session.advance().unwrap();

    let countdown = session.present().unwrap();
    if expire_second {
        for _ in 0..countdown.seconds {
            session.tick(countdown.generation);
        }
        assert_eq!(session.phase(), SessionPhase::Feedback(1));
    } else {
        session.type_answer("mitochondria").unwrap();
        session.submit().unwrap();
    }
    session.advance().unwrap();

    session.present().unwrap();
    session.select_option(1).unwrap();
    session.submit().unwrap();
    match session.advance().unwrap() {
        Advance::Completed(result) => result,
        Advance::Next(_) => panic!("quiz should be finished"),
    }
}

#[tokio::test]
async fn perfect_run_applies_progress_once_and_unlocks_badges() {
    let app = AppServices::in_memory(fixed_clock(), EngineSettings::default());
    let quiz = app.catalog().import(cell_quiz()).await.unwrap();
    let mut events = app.completion().events().subscribe();

    let result = play(quiz, false);
    assert_eq!(result.total_possible, 30);

    let student = StudentId::new("stu-1");
    let done = app
        .completion()
        .finalize_session(&result, student.clone(), None)
        .await
        .unwrap();

    assert_eq!(done.status, ProgressionStatus::Applied);
    assert_eq!(done.record.percent(), 100);
    assert!(done.record.progress_applied());
    assert_eq!(done.stats.perfect_count(), 1);
    assert_eq!(done.stats.experience(), 100);
    assert_eq!(done.stats.level(), 2);
    assert_eq!(done.badges.badge(BadgeId::new(9)).unwrap().progress, 1);
    let unlocked: Vec<_> = done.newly_unlocked.iter().map(|b| b.id).collect();
    assert_eq!(unlocked, vec![BadgeId::new(9), BadgeId::new(13)]);

    assert!(matches!(
        events.recv().await.unwrap(),
        ProgressEvent::SubmissionCreated { percent: 100, .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        ProgressEvent::ProgressApplied { .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        ProgressEvent::BadgesUnlocked { .. }
    ));
}

#[tokio::test]
async fn expired_question_counts_as_incorrect() {
    let app = AppServices::in_memory(fixed_clock(), EngineSettings::default());
    let quiz = app.catalog().import(cell_quiz()).await.unwrap();

    let result = play(quiz, true);
    assert!(result.outcomes[1].timed_out);
    assert!(!result.outcomes[1].correct);
    assert_eq!(result.total_score, 20);

    let done = app
        .completion()
        .finalize_session(&result, StudentId::new("stu-2"), None)
        .await
        .unwrap();
    assert_eq!(done.record.percent(), 67);
    assert_eq!(done.stats.perfect_count(), 0);
    assert_eq!(done.badges.badge(BadgeId::new(9)).unwrap().progress, 1);
    assert_eq!(done.badges.badge(BadgeId::new(13)).unwrap().progress, 0);
}

#[tokio::test]
async fn retake_and_retry_never_double_count() {
    let storage = Storage::in_memory();
    let app = AppServices::from_storage(&storage, fixed_clock(), EngineSettings::default());
    let quiz = app.catalog().import(cell_quiz()).await.unwrap();
    let student = StudentId::new("stu-3");

    let first = play(quiz.clone(), false);
    let applied = app
        .completion()
        .finalize_session(&first, student.clone(), None)
        .await
        .unwrap();

    // retry of the same finalize after, say, a dropped response
    let retried = app
        .completion()
        .finalize_session(&first, student.clone(), None)
        .await
        .unwrap();
    assert_eq!(retried.status, ProgressionStatus::AlreadyRecorded);
    assert_eq!(retried.stats, applied.stats);
    assert!(retried.newly_unlocked.is_empty());

    let retake = play(quiz, true);
    let ignored = app
        .completion()
        .finalize_session(&retake, student.clone(), None)
        .await
        .unwrap();
    assert_eq!(ignored.status, ProgressionStatus::DuplicateSubmissionIgnored);
    assert_eq!(ignored.stats, applied.stats);
    assert!(!ignored.record.progress_applied());
    assert_eq!(ignored.badges, applied.badges);

    let records = storage
        .submissions
        .list_submissions(&SubmissionFilter::for_student(student))
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records.iter().filter(|r| r.progress_applied()).count(), 1);
}

#[tokio::test]
async fn empty_quiz_finalizes_with_zero_score() {
    let app = AppServices::in_memory(fixed_clock(), EngineSettings::default());
    let quiz = app
        .catalog()
        .import(QuizDraft::new(2, "Placeholder"))
        .await
        .unwrap();

    let session = QuizSession::new(quiz, EngineSettings::default());
    let result = session.result().unwrap().clone();

    let done = app
        .completion()
        .finalize_session(&result, StudentId::new("stu-4"), None)
        .await
        .unwrap();
    assert_eq!(done.record.percent(), 0);
    assert_eq!(done.stats.perfect_count(), 0);
    assert_eq!(done.stats.experience(), 0);
}
