//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape: serde target before resolution.
#[derive(Deserialize)]
pub(super) struct RawConfig {
    pub assistant: RawAssistant,
    #[serde(default)]
    pub outbox: RawOutbox,
    #[serde(default)]
    pub conversation: RawConversation,
    #[serde(default)]
    pub llm: RawLlm,
    #[serde(default)]
    pub comms: RawComms,
}

#[derive(Deserialize)]
pub(super) struct RawAssistant {
    #[serde(default = "default_name")]
    pub name: String,
    pub work_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: String,
}

#[derive(Deserialize)]
pub(super) struct RawOutbox {
    #[serde(default = "default_outbox_dir")]
    pub dir: String,
}

#[derive(Deserialize)]
pub(super) struct RawConversation {
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

// ── LLM ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub openai: RawOpenAiConfig,
}

#[derive(Deserialize)]
pub(super) struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_temperature")]
    pub temperature: f32,
    #[serde(default = "default_openai_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_openai_timeout_seconds")]
    pub timeout_seconds: u64,
}

// ── Comms ───────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub(super) struct RawComms {
    #[serde(default)]
    pub pty: RawPty,
    #[serde(default)]
    pub axum_channel: RawAxumChannel,
}

#[derive(Deserialize)]
pub(super) struct RawPty {
    #[serde(default = "default_false")]
    pub enabled: bool,
}

#[derive(Deserialize)]
pub(super) struct RawAxumChannel {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_axum_bind")]
    pub bind: String,
}

// ── Default impls for serde ──────────────────────────────────────────────────

impl Default for RawOutbox {
    fn default() -> Self {
        Self { dir: default_outbox_dir() }
    }
}

impl Default for RawConversation {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            context_window: default_context_window(),
            max_sessions: default_max_sessions(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            openai: RawOpenAiConfig::default(),
        }
    }
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            max_tokens: default_openai_max_tokens(),
            timeout_seconds: default_openai_timeout_seconds(),
        }
    }
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl Default for RawAxumChannel {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_axum_bind(),
        }
    }
}

// ── Default functions (used by serde) ────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_name() -> String {
    "assistant".to_string()
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_prompts_dir() -> String {
    "config/prompts".to_string()
}

pub(super) fn default_outbox_dir() -> String {
    "outbox".to_string()
}

pub(super) fn default_max_history() -> usize {
    10
}

pub(super) fn default_context_window() -> usize {
    5
}

pub(super) fn default_max_sessions() -> usize {
    1000
}

pub(super) fn default_session_idle_secs() -> u64 {
    3600
}

pub(super) fn default_axum_bind() -> String {
    "127.0.0.1:7860".to_string()
}

pub(super) fn default_llm_provider() -> String {
    "auto".to_string()
}

pub(super) fn default_openai_api_base_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

pub(super) fn default_openai_model() -> String {
    "llama3-8b-8192".to_string()
}

pub(super) fn default_openai_temperature() -> f32 {
    0.1
}

pub(super) fn default_openai_max_tokens() -> u32 {
    500
}

pub(super) fn default_openai_timeout_seconds() -> u64 {
    60
}
