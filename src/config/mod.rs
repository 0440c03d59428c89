//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or an explicit path), then applies the env overrides collected in
//! [`Overrides`].
//!
//! # Module layout
//!
//! - **types**: resolved structs consumed at startup (`Config`, `LlmConfig`, …).
//! - **raw**: TOML deserialization shapes with serde defaults; private.
//! - **load**: `merge_toml`, base-chain resolution, `load`, `load_from`,
//!   `expand_home`.

mod load;
mod raw;
mod types;

pub use load::{Overrides, expand_home, load, load_from};
pub use types::*;

impl Config {
    /// Safe `Config` for tests: dummy LLM, no API key, outbox under `work_dir`.
    pub fn test_default(work_dir: &std::path::Path) -> Self {
        Self {
            name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            log_file: None,
            prompts_dir: std::path::PathBuf::from("config/prompts"),
            outbox: OutboxConfig {
                dir: work_dir.join("outbox"),
            },
            conversation: ConversationConfig {
                max_history: 10,
                context_window: 5,
                max_sessions: 100,
                session_idle_secs: 3600,
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    max_tokens: 500,
                    timeout_seconds: 1,
                },
            },
            comms: CommsConfig {
                pty: PtyConfig { enabled: false },
                axum_channel: AxumChannelConfig {
                    enabled: true,
                    bind: raw::default_axum_bind(),
                },
            },
            llm_api_key: None,
        }
    }
}
