//! The `interviewbot seed` command.

use std::path::PathBuf;

use anyhow::Result;

use interviewbot_core::parser::{load_banks, validate_bank};
use interviewbot_providers::config::load_config_from;

use super::open_configured_store;

pub async fn execute(
    bank_path: PathBuf,
    database: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let banks = load_banks(&bank_path)?;
    anyhow::ensure!(!banks.is_empty(), "no question banks found in {}", bank_path.display());

    let store = open_configured_store(&config, database.as_deref()).await?;

    let mut total_inserted = 0;
    for bank in &banks {
        let warnings = validate_bank(bank);
        if !warnings.is_empty() {
            eprintln!(
                "{}: {} warning(s), run `interviewbot validate` for details",
                bank.id,
                warnings.len()
            );
        }

        let pairs: Vec<_> = bank
            .pairs()
            .into_iter()
            .filter(|p| !p.question.is_empty() && !p.answer.is_empty())
            .collect();
        let inserted = store.insert_questions(&pairs).await?;
        total_inserted += inserted;
        println!(
            "Seeded {}: {} new of {} questions",
            bank.name,
            inserted,
            pairs.len()
        );
    }

    let stored = store.count_questions().await?;
    println!("{total_inserted} question(s) added, {stored} in store.");
    Ok(())
}
