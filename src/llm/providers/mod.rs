//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory: called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod openai_compatible;
pub mod scripted;

use tracing::warn;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Values that ship in `.env.example` files and must never reach the API.
const PLACEHOLDER_KEYS: &[&str] = &["your-groq-api-key-here", "your-api-key-here", "changeme"];

/// Construct a `LlmProvider` from config and an optional API key.
///
/// `api_key` is sourced from `LLM_API_KEY` / `GROQ_API_KEY` (never TOML).
/// A missing key is allowed for keyless local servers; a placeholder key
/// is rejected. `"auto"` picks the hosted endpoint when a key is present
/// and the dummy provider otherwise.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "auto" if api_key.is_none() => {
            warn!("no LLM API key set; running offline with the dummy provider");
            Ok(LlmProvider::Dummy(dummy::DummyProvider))
        }
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider)),
        "auto" | "openai" | "openai-compatible" | "groq" => {
            let api_key = check_api_key(api_key)?;
            if api_key.is_none() {
                warn!(
                    api_base_url = %config.openai.api_base_url,
                    "no LLM API key set; requests are sent unauthenticated"
                );
            }
            let oai = &config.openai;
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                oai.api_base_url.clone(),
                oai.model.clone(),
                oai.temperature,
                oai.max_tokens,
                oai.timeout_seconds,
                api_key,
            )?;
            Ok(LlmProvider::OpenAiCompatible(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}

fn check_api_key(api_key: Option<String>) -> Result<Option<String>, ProviderError> {
    match api_key {
        None => Ok(None),
        Some(key) => {
            let trimmed = key.trim();
            if trimmed.is_empty() || PLACEHOLDER_KEYS.contains(&trimmed) {
                Err(ProviderError::InvalidApiKey(
                    "placeholder value; set your real key in .env".into(),
                ))
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
    }
}
