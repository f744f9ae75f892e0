//! LLM integration.
//!
//! The bot only needs single-shot text completions. [`LlmProvider`] is the
//! seam handlers depend on; [`RigAdapter`] wraps the rig OpenRouter model
//! used in production.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::LlmError;

const PROVIDER: &str = "openrouter";

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub base_url: String,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openrouter;

    let base_url = config.base_url.trim().trim_end_matches('/');
    if base_url.is_empty() {
        return Err(LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: "base URL is empty".to_string(),
        });
    }

    let client: openrouter::Client = openrouter::Client::builder()
        .api_key(config.api_key.expose_secret())
        .base_url(base_url)
        .build()
        .map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("Failed to create OpenRouter client: {}", e),
        })?;
    let model = client.completion_model(&config.model);
    tracing::info!("Using OpenRouter at {} (model: {})", base_url, config.model);
    Ok(Arc::new(RigAdapter::new(model, &config.model, PROVIDER)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            api_key: secrecy::SecretString::from("test-key"),
            base_url: base_url.to_string(),
            model: "openai/gpt-3.5-turbo".to_string(),
        }
    }

    #[test]
    fn test_create_openrouter_provider() {
        let provider = create_provider(&config("https://openrouter.ai/api/v1"));
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().model_name(), "openai/gpt-3.5-turbo");
    }

    #[test]
    fn test_create_provider_with_custom_base_url() {
        let provider = create_provider(&config("http://localhost:8080/v1/")).unwrap();
        assert_eq!(provider.model_name(), "openai/gpt-3.5-turbo");
    }

    #[test]
    fn test_create_provider_rejects_empty_base_url() {
        assert!(matches!(
            create_provider(&config("  ")),
            Err(LlmError::RequestFailed { .. })
        ));
    }
}
