//! quizline: terminal shell for the quiz session engine.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use quiz_core::model::{ClassId, EngineSettings, QuizId, StudentId, SubmissionId};
use services::{AppServices, Clock};
use tracing_subscriber::EnvFilter;

mod commands;
mod db;

#[derive(Parser)]
#[command(name = "quizline", version, about = "Timed quizzes with progression and badges")]
struct Cli {
    /// SQLite database path or URL
    #[arg(long, env = "QUIZLINE_DB_URL", default_value = "sqlite://quizline.sqlite3")]
    db: String,

    /// Board game grid side length
    #[arg(long, env = "QUIZLINE_GRID_SIZE", default_value_t = 10)]
    grid_size: usize,

    /// Time limit for questions that don't set their own
    #[arg(long, env = "QUIZLINE_TIME_LIMIT", default_value_t = 30)]
    time_limit: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import (or replace) a quiz from a JSON file
    Import {
        /// Path to the quiz JSON
        file: PathBuf,
    },

    /// Add a student to a class roster
    Enroll {
        #[arg(long)]
        class: ClassId,
        #[arg(long)]
        student: StudentId,
    },

    /// List quizzes in the catalogue
    Quizzes,

    /// Take a quiz in the terminal
    Play {
        #[arg(long)]
        quiz: QuizId,
        #[arg(long)]
        student: StudentId,
        /// Class the attempt is submitted under
        #[arg(long)]
        class: Option<ClassId>,
        /// Team members, in turn order (team quizzes only)
        #[arg(long, value_delimiter = ',')]
        team: Vec<String>,
    },

    /// Show level, buckets and badges for a student
    Stats {
        #[arg(long)]
        student: StudentId,
    },

    /// List submissions, optionally filtered
    History {
        #[arg(long)]
        student: Option<StudentId>,
        #[arg(long)]
        quiz: Option<QuizId>,
        #[arg(long)]
        class: Option<ClassId>,
    },

    /// Overwrite the grade of a submission
    Regrade {
        id: SubmissionId,
        #[arg(long)]
        score: Option<u32>,
        #[arg(long)]
        percent: Option<u8>,
    },

    /// Delete a submission
    Delete { id: SubmissionId },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = EngineSettings::new(
        cli.grid_size,
        cli.time_limit,
        EngineSettings::default().tick_interval_ms(),
    )
    .context("invalid engine settings")?;

    let db_url = db::normalize_sqlite_url(&cli.db);
    db::prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(&db_url, Clock::system(), settings)
        .await
        .with_context(|| format!("opening {db_url}"))?;
    tracing::debug!(%db_url, "storage ready");

    match cli.command {
        Commands::Import { file } => commands::catalog::import(&services, &file).await,
        Commands::Enroll { class, student } => {
            commands::catalog::enroll(&services, &class, &student).await
        }
        Commands::Quizzes => commands::catalog::list(&services).await,
        Commands::Play {
            quiz,
            student,
            class,
            team,
        } => commands::play::run(&services, quiz, student, class, team).await,
        Commands::Stats { student } => commands::stats::show(&services, &student).await,
        Commands::History {
            student,
            quiz,
            class,
        } => commands::history::list(&services, student, quiz, class).await,
        Commands::Regrade { id, score, percent } => {
            commands::history::regrade(&services, id, score, percent).await
        }
        Commands::Delete { id } => commands::history::delete(&services, id).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        process::exit(2);
    }
}
