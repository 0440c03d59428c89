//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities: clone them freely.
//! `complete` is an `async fn` on the enum so callers need no trait-object
//! machinery.

pub mod providers;

use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("invalid API key: {0}")]
    InvalidApiKey(String),
    #[error("provider request failed: {0}")]
    Request(String),
}

// ── Response ──────────────────────────────────────────────────────────────────

/// Token accounting reported by the provider, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A single completion: the reply text plus optional usage.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Option<LlmUsage>,
}

impl LlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), usage: None }
    }
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `complete` arm.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    Scripted(providers::scripted::ScriptedProvider),
}

impl LlmProvider {
    /// Send `content` as the user message, with `system` as the optional
    /// system prompt, and return the reply.
    pub async fn complete(
        &self,
        content: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(content).await,
            LlmProvider::OpenAiCompatible(p) => p.complete(content, system).await,
            LlmProvider::Scripted(p) => p.complete(content, system).await,
        }
    }

    /// Short provider name for logs and the health endpoint.
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::OpenAiCompatible(_) => "openai-compatible",
            LlmProvider::Scripted(_) => "scripted",
        }
    }
}
