//! The `interviewbot list-models` command.

use std::path::PathBuf;

use anyhow::Result;

use interviewbot_providers::config::load_config_from;
use interviewbot_providers::ollama::OllamaProvider;
use interviewbot_providers::{create_provider, ProviderConfig};

pub async fn execute(provider_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let mut names: Vec<String> = config.providers.keys().cloned().collect();
    if !names.iter().any(|n| n == "ollama") {
        names.push("ollama".into());
    }
    names.sort();

    let mut found_any = false;

    for name in &names {
        if provider_filter.as_ref().is_some_and(|f| f != name) {
            continue;
        }
        let Some(provider_config) = config.provider_config(name) else {
            continue;
        };

        let models = match &provider_config {
            ProviderConfig::Ollama { base_url } => {
                match OllamaProvider::new(base_url)?.list_models_async().await {
                    Ok(models) => models,
                    Err(e) => {
                        eprintln!("{name}: {e:#}");
                        continue;
                    }
                }
            }
            other => match create_provider(other) {
                Ok(provider) => provider.available_models(),
                Err(e) => {
                    eprintln!("{name}: {e:#}");
                    continue;
                }
            },
        };

        if !models.is_empty() {
            found_any = true;
            println!("Provider: {name}");
            for model in &models {
                if model.max_context > 0 {
                    println!("  {} ({}K context)", model.id, model.max_context / 1000);
                } else {
                    println!("  {}", model.id);
                }
            }
            println!();
        }
    }

    if !found_any {
        println!("No models found. Run `interviewbot init` to create a config file.");
    }

    Ok(())
}
