use crate::llm_provider::*;
use crate::openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
use codeoptim_core::{CaptainConfig, MorphConfig};
use std::sync::Arc;
use tracing::{info, warn};

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Captain analysis provider, or `None` when no API key is configured
    pub fn captain(config: &CaptainConfig) -> Option<Arc<dyn LLMProvider>> {
        let Some(api_key) = config.api_key.clone() else {
            info!("CAPTAIN_API_KEY not set, code analysis will report an error result");
            return None;
        };

        let mut provider_config = OpenAICompatibleConfig {
            api_key: Some(api_key),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            ..OpenAICompatibleConfig::custom(
                config.base_url.trim_end_matches('/').to_string(),
                config.model.clone(),
                "captain".to_string(),
            )
        };
        if let Some(org_id) = &config.org_id {
            provider_config = provider_config.with_header("X-Organization-ID", org_id.clone());
        }

        Self::build(provider_config)
    }

    /// Morph Fast Apply provider, or `None` when no API key is configured
    pub fn morph(config: &MorphConfig) -> Option<Arc<dyn LLMProvider>> {
        let Some(api_key) = config.api_key.clone() else {
            info!("MORPH_API_KEY not set, variants will use the local fallback");
            return None;
        };

        let provider_config = OpenAICompatibleConfig {
            api_key: Some(api_key),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            ..OpenAICompatibleConfig::custom(
                config.base_url.trim_end_matches('/').to_string(),
                config.model.clone(),
                "morph".to_string(),
            )
        };

        Self::build(provider_config)
    }

    fn build(config: OpenAICompatibleConfig) -> Option<Arc<dyn LLMProvider>> {
        let name = config.provider_name.clone();
        match OpenAICompatibleProvider::new(config) {
            Ok(provider) => {
                info!(
                    provider = provider.provider_name(),
                    model = provider.model_name(),
                    "LLM provider ready"
                );
                Some(Arc::new(provider))
            }
            Err(e) => {
                warn!("Failed to create {} provider: {}", name, e);
                None
            }
        }
    }
}
