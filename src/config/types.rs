//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs handed to the channels,
//! the conversation layer and the LLM factory. Raw TOML deserialization
//! types live in `raw.rs`.

use std::path::PathBuf;

// ── Comms ───────────────────────────────────────────────────────────────────

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Whether the console channel is started.
    pub enabled: bool,
}

/// Axum HTTP channel configuration.
#[derive(Debug, Clone)]
pub struct AxumChannelConfig {
    /// Whether the web channel is started.
    pub enabled: bool,
    /// Socket address to bind the listener to.
    pub bind: String,
}

/// Comms configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub axum_channel: AxumChannelConfig,
}

// ── LLM ──────────────────────────────────────────────────────────────────────

/// OpenAI-compatible provider configuration (`[llm.openai]`).
/// The defaults point at Groq's hosted endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    pub temperature: f32,
    /// Upper bound on completion tokens per reply.
    pub max_tokens: u32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"auto"`, `"dummy"`, `"openai"`, `"groq"`).
    /// Named `default` in the `[llm]` TOML table.
    pub provider: String,
    pub openai: OpenAiConfig,
}

// ── Conversation / outbox ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Exchanges retained per session.
    pub max_history: usize,
    /// Most recent exchanges rendered into the prompt context.
    pub context_window: usize,
    /// Live sessions kept in memory; the least recently used is evicted
    /// past this.
    pub max_sessions: usize,
    /// Sessions untouched for this long are dropped.
    pub session_idle_secs: u64,
}

#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Resolved outbox directory (relative values are joined onto `work_dir`).
    pub dir: PathBuf,
}

// ── Config (root) ────────────────────────────────────────────────────────────

/// Fully-resolved assistant configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    /// Working directory for persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    /// Append logs here instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Directory holding prompt templates.
    pub prompts_dir: PathBuf,
    pub outbox: OutboxConfig,
    pub conversation: ConversationConfig,
    pub llm: LlmConfig,
    pub comms: CommsConfig,
    /// API key from `LLM_API_KEY` (or `GROQ_API_KEY`): never sourced from TOML.
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Returns `true` if the console channel should be started.
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    /// Returns `true` if the web channel should be started.
    pub fn comms_axum_should_load(&self) -> bool {
        self.comms.axum_channel.enabled
    }
}
