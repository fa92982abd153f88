//! Core trait definitions for the generative fallback and the question store.
//!
//! These async traits are implemented by the `interviewbot-providers` and
//! `interviewbot-store` crates respectively.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{QaPair, Question, Report, Response, StoredReport};

// ---------------------------------------------------------------------------
// LLM Provider trait
// ---------------------------------------------------------------------------

/// Trait for text-generation back ends used to backfill the question bank.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Generate text from a prompt. The output carries no format guarantee.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// List known models for this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request to generate text from an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "llama3").
    pub model: String,
    /// The main prompt.
    pub prompt: String,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from an LLM generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response content.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens (0 when unknown).
    pub max_context: u32,
}

/// Default system prompt for question generation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You write short technical interview questions with concise reference answers. Respond ONLY with a JSON array. Do not add explanations or markdown.";

// ---------------------------------------------------------------------------
// Question store trait
// ---------------------------------------------------------------------------

/// The persistence boundary: questions, responses and reports.
///
/// Implementations must enforce uniqueness of the (question, answer) pair
/// themselves; callers never check for duplicates before inserting.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Short back-end name for logs (e.g. "sqlite").
    fn kind(&self) -> &str;

    /// Number of stored questions.
    async fn count_questions(&self) -> Result<u64, StoreError>;

    /// Insert pairs, skipping any that already exist. Returns the number of
    /// rows actually inserted.
    async fn insert_questions(&self, pairs: &[QaPair]) -> Result<usize, StoreError>;

    /// Every stored question.
    async fn all_questions(&self) -> Result<Vec<Question>, StoreError>;

    /// Append responses.
    async fn record_responses(&self, responses: &[Response]) -> Result<(), StoreError>;

    /// Append a report. Each call writes a new row.
    async fn record_report(&self, report: &Report) -> Result<(), StoreError>;

    /// Reports, newest first, optionally for a single candidate.
    async fn list_reports(&self, candidate: Option<&str>) -> Result<Vec<StoredReport>, StoreError>;

    /// Every response recorded for `candidate`, oldest first.
    async fn responses_for(&self, candidate: &str) -> Result<Vec<Response>, StoreError>;
}
