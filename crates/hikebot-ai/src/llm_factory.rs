use crate::llm_provider::*;
use crate::openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
use anyhow::{anyhow, Result};
use hikebot_core::LLMConfig;
use std::sync::Arc;

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create_from_config(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        if !config.enabled {
            return Err(anyhow!("LLM is not enabled in configuration"));
        }

        let provider_name = config.provider.to_lowercase();

        let compat_config = match provider_name.as_str() {
            "openai" => Self::openai_config(config)?,
            "ollama" => Self::local_config(config, &config.ollama_url, "ollama"),
            "lmstudio" => Self::local_config(config, &config.lmstudio_url, "lmstudio"),
            "openai-compatible" => Self::openai_compatible_config(config)?,
            _ => {
                return Err(anyhow!(
                    "Unsupported LLM provider: {}. Available providers: {}",
                    provider_name,
                    Self::supported_providers().join(", ")
                ))
            }
        };

        Ok(Arc::new(OpenAICompatibleProvider::new(compat_config)?))
    }

    fn openai_config(config: &LLMConfig) -> Result<OpenAICompatibleConfig> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            anyhow!(
                "OpenAI API key not found. Set 'openai_api_key' in config \
                 or OPENAI_API_KEY environment variable"
            )
        })?;

        Ok(OpenAICompatibleConfig {
            base_url: config.openai_base_url.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            ..OpenAICompatibleConfig::openai(api_key, config.model.clone())
        })
    }

    /// Ollama and LM Studio both expose the OpenAI API under `/v1`
    fn local_config(config: &LLMConfig, url: &str, name: &str) -> OpenAICompatibleConfig {
        OpenAICompatibleConfig {
            base_url: format!("{}/v1", url.trim_end_matches('/')),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            api_key: None,
            provider_name: name.to_string(),
            ..Default::default()
        }
    }

    fn openai_compatible_config(config: &LLMConfig) -> Result<OpenAICompatibleConfig> {
        let base_url = config.openai_compatible_url.clone().ok_or_else(|| {
            anyhow!("OpenAI-compatible base URL not found. Set 'openai_compatible_url' in config")
        })?;

        Ok(OpenAICompatibleConfig {
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            api_key: config.openai_api_key.clone(),
            ..OpenAICompatibleConfig::custom(
                base_url,
                config.model.clone(),
                "openai-compatible".to_string(),
            )
        })
    }

    /// Check if the provider answers
    pub async fn check_availability(provider: &Arc<dyn LLMProvider>) -> bool {
        provider.is_available().await
    }

    pub fn supported_providers() -> Vec<&'static str> {
        vec!["openai", "ollama", "lmstudio", "openai-compatible"]
    }
}
