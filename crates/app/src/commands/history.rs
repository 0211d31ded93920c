use quiz_core::model::{ClassId, QuizId, StudentId, SubmissionId, SubmissionRecord};
use services::AppServices;
use storage::repository::SubmissionFilter;

pub async fn list(
    services: &AppServices,
    student_id: Option<StudentId>,
    quiz_id: Option<QuizId>,
    class_id: Option<ClassId>,
) -> anyhow::Result<()> {
    let filter = SubmissionFilter {
        quiz_id,
        student_id,
        class_id,
    };
    let records = services.submissions().list(&filter).await?;
    if records.is_empty() {
        println!("no submissions");
    }
    for record in &records {
        print_record(record);
    }
    Ok(())
}

pub async fn regrade(
    services: &AppServices,
    id: SubmissionId,
    score: Option<u32>,
    percent: Option<u8>,
) -> anyhow::Result<()> {
    if score.is_none() && percent.is_none() {
        anyhow::bail!("nothing to change; pass --score and/or --percent");
    }
    let record = services.submissions().regrade(id, score, percent).await?;
    print_record(&record);
    Ok(())
}

pub async fn delete(services: &AppServices, id: SubmissionId) -> anyhow::Result<()> {
    services.submissions().delete(id).await?;
    println!("deleted {id}");
    Ok(())
}

fn print_record(record: &SubmissionRecord) {
    let progressed = if record.progress_applied() { "xp" } else { "  " };
    let graded = record
        .graded_at()
        .map(|at| format!(" regraded {}", at.format("%Y-%m-%d")))
        .unwrap_or_default();
    println!(
        "{}  quiz {:>4}  {:<12} {:>3}/{:<3} {:>3}%  {progressed}  {}{graded}",
        record.id(),
        record.quiz_id(),
        record.student_id(),
        record.score(),
        record.total_possible(),
        record.percent(),
        record.submitted_at().format("%Y-%m-%d %H:%M"),
    );
}
