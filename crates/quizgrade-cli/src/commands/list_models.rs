//! The `quizgrade list-models` command.

use anyhow::Result;

use quizgrade_providers::config::ProviderConfig;
use quizgrade_providers::create_provider;
use quizgrade_providers::ollama::OllamaProvider;

use super::Context;

pub async fn execute(ctx: &Context, provider_filter: Option<String>) -> Result<()> {
    let config = ctx.load_config()?;

    let mut found_any = false;

    for (name, provider_config) in &config.providers {
        if let Some(filter) = &provider_filter {
            if name != filter {
                continue;
            }
        }

        let models = match provider_config {
            ProviderConfig::Ollama { base_url } => {
                let ollama = OllamaProvider::new(base_url, config.timeout_secs)?;
                match ollama.list_models_async().await {
                    Ok(models) => models,
                    Err(e) => {
                        tracing::warn!("could not list models for '{name}': {e}");
                        vec![]
                    }
                }
            }
            _ => create_provider(name, provider_config, config.timeout_secs)?
                .available_models(),
        };

        if !models.is_empty() {
            found_any = true;
            println!("Provider: {name}");
            for model in &models {
                let dims = if model.dimensions > 0 {
                    format!("{} dims", model.dimensions)
                } else {
                    "dims unknown".to_string()
                };
                println!(
                    "  {}  {} ({}, ${:.2} per 1M tokens)",
                    model.id, model.name, dims, model.cost_per_1m_tokens,
                );
            }
            println!();
        }
    }

    if !found_any {
        println!("No providers configured. Run `quizgrade init` to create a config file.");
    }

    Ok(())
}
