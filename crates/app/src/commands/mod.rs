pub mod catalog;
pub mod history;
pub mod play;
pub mod stats;

use chrono::{DateTime, Utc};

fn format_due(due_at: Option<DateTime<Utc>>) -> String {
    due_at.map_or_else(
        || "no due date".to_owned(),
        |at| format!("due {}", at.format("%Y-%m-%d %H:%M")),
    )
}
