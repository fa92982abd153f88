pub mod history;
pub mod init;
pub mod interview;
pub mod list_models;
pub mod score;
pub mod seed;
pub mod validate;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use interviewbot_core::traits::QuestionStore;
use interviewbot_providers::InterviewConfig;

/// Open the store named on the command line, or the configured one.
pub async fn open_configured_store(
    config: &InterviewConfig,
    database: Option<&str>,
) -> Result<Arc<dyn QuestionStore>> {
    let url = database.unwrap_or(&config.database_url);
    interviewbot_store::open_store(url, Duration::from_secs(config.connect_timeout_secs))
        .await
        .context("could not open the question store")
}
