use std::path::Path;

use anyhow::Context;
use quiz_core::model::{ClassId, QuizDraft, StudentId};
use services::AppServices;

use super::format_due;

pub async fn import(services: &AppServices, file: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let draft: QuizDraft = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", file.display()))?;

    let quiz = services.catalog().import(draft).await?;
    println!(
        "imported quiz {} \"{}\" ({} questions, {} points, {})",
        quiz.id(),
        quiz.title(),
        quiz.questions().len(),
        quiz.total_points(),
        quiz.status().as_str(),
    );
    Ok(())
}

pub async fn enroll(
    services: &AppServices,
    class_id: &ClassId,
    student_id: &StudentId,
) -> anyhow::Result<()> {
    services.catalog().enroll(class_id, student_id).await?;
    println!("{student_id} enrolled in {class_id}");
    Ok(())
}

pub async fn list(services: &AppServices) -> anyhow::Result<()> {
    let quizzes = services.catalog().list().await?;
    if quizzes.is_empty() {
        println!("no quizzes yet; add one with `quizline import <file>`");
        return Ok(());
    }
    for quiz in quizzes {
        println!(
            "{:>4}  {:<32} {:<10} {:<6} {}",
            quiz.id(),
            quiz.title(),
            quiz.presentation_mode().as_str(),
            quiz.status().as_str(),
            format_due(quiz.due_at()),
        );
    }
    Ok(())
}
