use quiz_core::model::{Quiz, StudentId};
use services::AppServices;

use super::format_due;

pub async fn show(services: &AppServices, student_id: &StudentId) -> anyhow::Result<()> {
    let dashboard = services.dashboard().load(student_id).await;
    let stats = &dashboard.stats;
    let (into_level, level_size) = stats.level_progress();

    println!("{student_id}");
    println!(
        "  level {}  ({into_level}/{level_size} xp, {} total)",
        stats.level(),
        stats.experience()
    );
    println!("  accuracy {}%", stats.accuracy());
    println!("  perfect scores {}", stats.perfect_count());

    print_bucket("new", &dashboard.buckets.new);
    print_bucket("missed", &dashboard.buckets.missed);
    print_bucket("done", &dashboard.buckets.done);

    println!(
        "\nbadges {}/{}",
        dashboard.badges.unlocked_count(),
        dashboard.badges.badges().count()
    );
    for category in dashboard.badges.categories() {
        println!("  {}", category.title);
        for badge in &category.badges {
            let mark = if badge.is_unlocked() { '*' } else { ' ' };
            println!(
                "   {mark} {:<22} {}/{}  {}",
                badge.name,
                badge.progress.min(badge.goal),
                badge.goal,
                badge.description
            );
        }
    }
    Ok(())
}

fn print_bucket(label: &str, quizzes: &[Quiz]) {
    println!("\n{label} ({})", quizzes.len());
    for quiz in quizzes {
        println!("  {:>4}  {}  [{}]", quiz.id(), quiz.title(), format_due(quiz.due_at()));
    }
}
