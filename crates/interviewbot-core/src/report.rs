//! Session outcome types with JSON transcripts and a markdown summary.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Report;
use crate::scoring::{Evaluation, SessionScore};

/// Everything a finished session produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// Identifier of the session this outcome belongs to.
    pub session_id: Uuid,
    /// Candidate name.
    pub candidate: String,
    /// Name of the scoring policy used.
    pub policy: String,
    /// Per-question breakdown, in the order asked.
    pub results: Vec<QuestionResult>,
    /// Aggregate score.
    pub score: SessionScore,
    /// The report row handed to the store.
    pub report: Report,
    /// Whether responses and report reached the store.
    pub persistence: PersistStatus,
    /// When the session was scored.
    pub finished_at: DateTime<Utc>,
}

/// One asked question with the candidate's answer and the verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: i64,
    pub question: String,
    pub expected: String,
    pub response: String,
    pub evaluation: Evaluation,
}

/// What happened when the outcome was written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PersistStatus {
    /// Responses and report were written.
    Saved,
    /// Nothing was answered, so nothing was written.
    Skipped,
    /// The store rejected the write.
    Failed(String),
}

impl SessionOutcome {
    /// Save the outcome as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize transcript")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write transcript to {}", path.display()))?;
        Ok(())
    }

    /// Load an outcome from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read transcript from {}", path.display()))?;
        let outcome: SessionOutcome =
            serde_json::from_str(&content).context("failed to parse transcript JSON")?;
        Ok(outcome)
    }

    /// Format the outcome as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## Interview: {}\n\n", self.candidate));
        md.push_str(&format!(
            "**Score:** {} / {} correct\n\n**Feedback:** {}\n\n",
            self.score.score, self.score.total, self.score.feedback
        ));
        md.push_str(&format!(
            "**Eligibility:** {}\n\n",
            if self.score.eligible {
                "Eligible"
            } else {
                "Not Eligible"
            }
        ));

        if !self.results.is_empty() {
            md.push_str("| Question | Your Answer | Expected | Result |\n");
            md.push_str("|----------|-------------|----------|--------|\n");
            for r in &self.results {
                md.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    escape_cell(&r.question),
                    escape_cell(&r.response),
                    escape_cell(&r.expected),
                    r.evaluation
                ));
            }
        }

        md
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
