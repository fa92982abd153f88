//! Configuration loading and the provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use interviewbot_core::scoring::{PolicyKind, ScoringPolicy, DEFAULT_THRESHOLD};
use interviewbot_core::supplier::GenerationSettings;
use interviewbot_core::traits::LlmProvider;

use crate::ollama::{OllamaProvider, DEFAULT_BASE_URL};
use crate::openai::OpenAiProvider;

/// Configuration for a single question generator.
///
/// Custom Debug impl masks API keys so they never reach the logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// The `[scoring]` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub policy: PolicyKind,
    /// Similarity cut-off. Ignored by the containment policy.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ScoringConfig {
    pub fn build(&self) -> Box<dyn ScoringPolicy> {
        self.policy.build(self.threshold)
    }
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Top-level interviewbot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used for question backfill.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Model passed to the provider.
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Where questions, responses and reports live.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Give up connecting to the store after this many seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_model() -> String {
    "llama3".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_database_url() -> String {
    "sqlite://interviewbot.db".to_string()
}
fn default_connect_timeout() -> u64 {
    5
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            database_url: default_database_url(),
            connect_timeout_secs: default_connect_timeout(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl InterviewConfig {
    /// Generation settings for `model`, or the configured default model.
    pub fn generation_settings(&self, model: Option<&str>) -> GenerationSettings {
        GenerationSettings {
            model: model.unwrap_or(&self.default_model).to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            system_prompt: None,
        }
    }

    /// Look up a provider by name. A missing `ollama` entry falls back to
    /// the local default instance.
    pub fn provider_config(&self, name: &str) -> Option<ProviderConfig> {
        match self.providers.get(name) {
            Some(config) => Some(config.clone()),
            None if name == "ollama" => Some(ProviderConfig::Ollama {
                base_url: default_ollama_url(),
            }),
            None => None,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables expand to the empty string.
pub fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_deref().map(resolve_env_vars),
            org_id: org_id.as_deref().map(resolve_env_vars),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
    }
}

/// Load configuration from `path`, or from well-known paths.
///
/// Search order:
/// 1. `interviewbot.toml` in the current directory
/// 2. `~/.config/interviewbot/config.toml`
///
/// An explicit `path` skips the search and must exist.
///
/// Environment variable overrides: `INTERVIEWBOT_DATABASE_URL`,
/// `INTERVIEWBOT_OPENAI_KEY`.
pub fn load_config_from(path: Option<&Path>) -> Result<InterviewConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("interviewbot.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => InterviewConfig::default(),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a config document and expand `${VAR}` references.
pub fn parse_config_str(content: &str) -> Result<InterviewConfig> {
    let mut config: InterviewConfig = toml::from_str(content)?;
    config.database_url = resolve_env_vars(&config.database_url);
    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    Ok(config)
}

fn apply_env_overrides(config: &mut InterviewConfig) {
    if let Ok(url) = std::env::var("INTERVIEWBOT_DATABASE_URL") {
        if !url.trim().is_empty() {
            config.database_url = url;
        }
    }

    if let Ok(key) = std::env::var("INTERVIEWBOT_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("interviewbot"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            if api_key.trim().is_empty() {
                anyhow::bail!("openai provider has no api_key (set INTERVIEWBOT_OPENAI_KEY)");
            }
            Arc::new(OpenAiProvider::new(
                api_key,
                base_url.clone(),
                org_id.clone(),
            )?)
        }
        ProviderConfig::Ollama { base_url } => Arc::new(OllamaProvider::new(base_url)?),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_INTERVIEWBOT_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_INTERVIEWBOT_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_INTERVIEWBOT_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_INTERVIEWBOT_UNSET_VAR}x"), "x");
        assert_eq!(resolve_env_vars("no refs ${unclosed"), "no refs ${unclosed");
        std::env::remove_var("_INTERVIEWBOT_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = InterviewConfig::default();
        assert_eq!(config.default_provider, "ollama");
        assert_eq!(config.default_model, "llama3");
        assert_eq!(config.database_url, "sqlite://interviewbot.db");
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.scoring.policy, PolicyKind::Similarity);
        assert_eq!(config.scoring.threshold, 0.6);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
default_provider = "openai"
default_model = "gpt-4o-mini"
database_url = "postgres://bot@localhost/interviews"
connect_timeout_secs = 3

[scoring]
policy = "containment"

[providers.openai]
type = "openai"
api_key = "sk-openai"

[providers.local]
type = "ollama"
base_url = "http://gpu-box:11434"
"#;
        let config = parse_config_str(toml_str).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.scoring.policy, PolicyKind::Containment);
        assert_eq!(config.scoring.threshold, 0.6);
        assert_eq!(config.temperature, 0.7);
        assert!(matches!(
            config.providers.get("local"),
            Some(ProviderConfig::Ollama { base_url }) if base_url == "http://gpu-box:11434"
        ));
    }

    #[test]
    fn scoring_table_builds_its_policy() {
        let config = parse_config_str("[scoring]\npolicy = \"containment\"\n").unwrap();
        let policy = config.scoring.build();
        assert_eq!(policy.name(), "containment");
        assert!(!policy.is_correct("   ", "a stack"));

        let strict = ScoringConfig {
            policy: PolicyKind::Similarity,
            threshold: 1.0,
        }
        .build();
        assert!(strict.is_correct("A Stack", "a stack"));
        assert!(!strict.is_correct("a stack ", "a stack"));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(parse_config_str("[scoring]\npolicy = \"fuzzy\"\n").is_err());
    }

    #[test]
    fn missing_ollama_entry_uses_local_default() {
        let config = InterviewConfig::default();
        assert!(matches!(
            config.provider_config("ollama"),
            Some(ProviderConfig::Ollama { base_url }) if base_url == DEFAULT_BASE_URL
        ));
        assert!(config.provider_config("openai").is_none());
    }

    #[test]
    fn debug_masks_api_key() {
        let config = ProviderConfig::OpenAI {
            api_key: "sk-secret".into(),
            base_url: None,
            org_id: None,
        };
        let out = format!("{config:?}");
        assert!(!out.contains("sk-secret"));
        assert!(out.contains("***"));
    }

    #[test]
    fn openai_without_key_is_rejected() {
        let config = ProviderConfig::OpenAI {
            api_key: " ".into(),
            base_url: None,
            org_id: None,
        };
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interviewbot.toml");
        std::fs::write(&path, "default_model = \"mistral\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.default_model, "mistral");
        assert!(load_config_from(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
