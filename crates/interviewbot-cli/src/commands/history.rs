//! The `interviewbot history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use interviewbot_providers::config::load_config_from;

use super::open_configured_store;

pub async fn execute(
    candidate: Option<String>,
    show_responses: bool,
    database: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = open_configured_store(&config, database.as_deref()).await?;

    let reports = store.list_reports(candidate.as_deref()).await?;
    if reports.is_empty() {
        println!("No reports found.");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["ID", "Candidate", "Score", "Feedback", "Eligible", "Date"]);
        for r in &reports {
            table.add_row(vec![
                Cell::new(r.id),
                Cell::new(&r.candidate),
                Cell::new(format!("{}/{}", r.score, r.total)),
                Cell::new(r.feedback.as_deref().unwrap_or("-")),
                Cell::new(match r.eligible {
                    Some(true) => "yes",
                    Some(false) => "no",
                    None => "-",
                }),
                Cell::new(
                    r.created_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".into()),
                ),
            ]);
        }
        println!("{table}");
    }

    if let (true, Some(name)) = (show_responses, candidate.as_deref()) {
        let responses = store.responses_for(name).await?;
        println!("\n{} recorded answer(s) for {name}:", responses.len());
        for r in &responses {
            println!("  [q{}] {}", r.question_id, r.response);
        }
    }

    Ok(())
}
