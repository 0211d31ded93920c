//! Interactive attempt: terminal input races the countdown of each question.

use anyhow::{Context, bail};
use quiz_core::board::BoardGrid;
use quiz_core::model::{ClassId, QuestionId, QuizId, StudentId};
use services::{
    Advance, AppServices, ProgressionStatus, QuizSession, SessionError, SessionEvent,
    SessionHandle,
};
use services::sessions::QuestionOutcome;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::{self, error::RecvError};

type Input = Lines<BufReader<Stdin>>;

pub async fn run(
    services: &AppServices,
    quiz_id: QuizId,
    student_id: StudentId,
    class_id: Option<ClassId>,
    team: Vec<String>,
) -> anyhow::Result<()> {
    let quiz = services
        .catalog()
        .get(quiz_id)
        .await
        .with_context(|| format!("loading quiz {quiz_id}"))?;
    println!(
        "{} ({} questions, {} points)\n",
        quiz.title(),
        quiz.questions().len(),
        quiz.total_points()
    );

    let mut session = QuizSession::new(quiz, services.settings());
    if !team.is_empty() {
        session = session.with_team(team);
    }

    let handle = services.driver().start_session(session).await;
    let mut events = handle.subscribe();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let result = loop {
        if let Some(result) = handle.inspect(|s| s.result().cloned()).await {
            break result;
        }
        let Some(question_id) = print_question(&handle).await else {
            bail!("session is not waiting for an answer");
        };

        let outcome = tokio::select! {
            captured = capture_answer(&handle, &mut input) => captured?,
            expired = next_timeout(&mut events, question_id) => {
                println!("\ntime's up!");
                expired
            }
        };
        print_feedback(&outcome);

        match handle.advance().await? {
            Advance::Next(_) => println!(),
            Advance::Completed(result) => break result,
        }
    };

    println!(
        "\nfinished: {}/{} ({}%), {} of {} correct",
        result.total_score,
        result.total_possible,
        result.percent(),
        result.correct_count(),
        result.outcomes.len()
    );

    let done = services
        .completion()
        .finalize_session(&result, student_id, class_id)
        .await?;
    match done.status {
        ProgressionStatus::Applied => println!(
            "level {} ({} xp), accuracy {}%",
            done.stats.level(),
            done.stats.experience(),
            done.stats.accuracy()
        ),
        ProgressionStatus::DuplicateSubmissionIgnored => {
            println!("attempt recorded; progress only counts the first attempt");
        }
        ProgressionStatus::AlreadyRecorded => println!("attempt was already recorded"),
    }
    for badge in &done.newly_unlocked {
        println!("badge unlocked: {} ({})", badge.name, badge.description);
    }
    Ok(())
}

/// Print the current question. Returns its id while an answer is awaited.
async fn print_question(handle: &SessionHandle) -> Option<QuestionId> {
    let view = handle
        .inspect(|s| {
            let question = s.current_question()?;
            let progress = s.progress();
            let mut lines = vec![format!(
                "[{}/{}] {}s",
                progress.answered + 1,
                progress.total,
                s.remaining_secs()
            )];
            if let Some(turn) = s.turn() {
                lines.push(format!("{}'s turn", turn.member));
            }
            if !s.presentation().is_revealed() {
                lines.push("(card face down: press enter to flip)".to_owned());
                return Some((question.id(), lines));
            }
            lines.push(question.prompt().to_owned());
            if let Some(grid) = s.presentation().grid() {
                lines.extend(render_grid(grid));
                lines.push("trace the answer as cells, e.g. `B2 C3 D4`".to_owned());
            } else if !question.options().is_empty() {
                for (n, option) in question.options().iter().enumerate() {
                    lines.push(format!("  {}) {option}", n + 1));
                }
            }
            Some((question.id(), lines))
        })
        .await;

    let (question_id, lines) = view?;
    for line in lines {
        println!("{line}");
    }
    Some(question_id)
}

/// Read lines until one is accepted and submitted.
async fn capture_answer(
    handle: &SessionHandle,
    input: &mut Input,
) -> anyhow::Result<QuestionOutcome> {
    loop {
        let Some(line) = input.next_line().await? else {
            bail!("input closed before the quiz finished");
        };
        let line = line.trim();

        if !handle.inspect(|s| s.presentation().is_revealed()).await {
            handle.flip_card().await?;
            print_question(handle).await;
            continue;
        }

        let (has_grid, option_count) = handle
            .inspect(|s| {
                (
                    s.presentation().grid().is_some(),
                    s.current_question().map_or(0, |q| q.options().len()),
                )
            })
            .await;

        let captured = if has_grid {
            trace_cells(handle, line).await
        } else if option_count > 0 {
            match line.parse::<usize>() {
                Ok(n) if n >= 1 => handle
                    .select_option(n - 1)
                    .await
                    .map_err(anyhow::Error::from),
                _ => Err(anyhow::anyhow!("pick an option between 1 and {option_count}")),
            }
        } else {
            handle.type_answer(line).await.map_err(anyhow::Error::from)
        };
        if let Err(err) = captured {
            println!("{err}");
            continue;
        }

        match handle.submit().await {
            Ok(outcome) => return Ok(outcome),
            // the countdown got there first
            Err(SessionError::WrongPhase(_)) => {
                if let Some(outcome) = handle.inspect(|s| s.outcomes().last().cloned()).await {
                    return Ok(outcome);
                }
                bail!("session is not waiting for an answer");
            }
            Err(err) => println!("{err}"),
        }
    }
}

async fn trace_cells(handle: &SessionHandle, line: &str) -> anyhow::Result<()> {
    let size = handle
        .inspect(|s| s.presentation().grid().map(BoardGrid::size))
        .await
        .unwrap_or_default();
    let cells = line
        .split([' ', ','])
        .filter(|token| !token.is_empty())
        .map(|token| parse_cell(token, size))
        .collect::<Option<Vec<_>>>()
        .context("cells look like `B3`: column letter then row number")?;
    let Some((&first, rest)) = cells.split_first() else {
        bail!("trace at least one cell");
    };

    handle.grid_press(first).await?;
    for &cell in rest {
        if !handle.grid_enter(cell).await? {
            bail!("cells must be neighbours and not repeat");
        }
    }
    let word = handle.grid_release().await?;
    if let Some(word) = word {
        println!("traced {word}");
    }
    Ok(())
}

/// `B3` is column B, row 3, as a flat index into a `size` x `size` grid.
fn parse_cell(token: &str, size: usize) -> Option<usize> {
    let mut chars = token.chars();
    let column = chars.next()?.to_ascii_uppercase();
    if !column.is_ascii_uppercase() {
        return None;
    }
    let col = usize::from(u8::try_from(column).ok()? - b'A');
    let row = chars.as_str().parse::<usize>().ok()?.checked_sub(1)?;
    (row < size && col < size).then_some(row * size + col)
}

fn render_grid(grid: &BoardGrid) -> Vec<String> {
    let header: String = (b'A'..)
        .take(grid.size())
        .map(|c| format!(" {}", char::from(c)))
        .collect();
    let mut lines = vec![format!("   {header}")];
    for (n, row) in grid.rows().iter().enumerate() {
        let cells: String = row.chars().map(|c| format!(" {c}")).collect();
        lines.push(format!("{:>2} {cells}", n + 1));
    }
    lines
}

/// Resolve once the countdown of `question_id` forces a submission.
async fn next_timeout(
    events: &mut broadcast::Receiver<SessionEvent>,
    question_id: QuestionId,
) -> QuestionOutcome {
    loop {
        match events.recv().await {
            Ok(SessionEvent::TimedOut(outcome)) if outcome.question_id == question_id => {
                return outcome;
            }
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

fn print_feedback(outcome: &QuestionOutcome) {
    if outcome.correct {
        println!(
            "correct! +{}/{}",
            outcome.points_earned, outcome.points_possible
        );
    } else {
        println!("wrong, the answer was {}", outcome.expected_answer);
    }
    if let Some(member) = &outcome.attributed_to {
        println!("(scored for {member})");
    }
}
