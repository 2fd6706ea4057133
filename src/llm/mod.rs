//! LLM integration for Health Assess.
//!
//! The `LlmProvider` trait is the transport boundary used by the generation
//! client. `AnthropicProvider` talks to the Messages API over `reqwest`.

mod anthropic;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use provider::*;

use std::sync::Arc;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub base_url: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    if config.model.trim().is_empty() {
        return Err(LlmError::RequestFailed {
            provider: "anthropic".to_string(),
            reason: "model name is empty".to_string(),
        });
    }
    tracing::info!("Using Anthropic (model: {})", config.model);
    Ok(Arc::new(AnthropicProvider::new(
        config.api_key.clone(),
        &config.model,
        &config.base_url,
    )))
}
