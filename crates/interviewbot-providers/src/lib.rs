//! interviewbot-providers: question generators.
//!
//! Implements the `LlmProvider` trait for Ollama and OpenAI-compatible
//! endpoints, and loads the shared `interviewbot.toml` configuration.

pub mod config;
pub mod error;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{create_provider, load_config_from, InterviewConfig, ProviderConfig};
pub use error::ProviderError;
