//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! and applies the overrides collected from the environment.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

use super::raw::RawConfig;
use super::types::*;

/// Values that take precedence over the TOML file.
///
/// Collected from the environment by [`Overrides::from_env`]; tests build
/// it directly instead of mutating process env vars.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `ASSISTANT_WORK_DIR`
    pub work_dir: Option<String>,
    /// `ASSISTANT_LOG_LEVEL`
    pub log_level: Option<String>,
    /// `OUTBOX_DIR`
    pub outbox_dir: Option<String>,
    /// `MAX_HISTORY`
    pub max_history: Option<usize>,
    /// `SERVER_PORT`: replaces the port of the web channel bind address.
    pub server_port: Option<u16>,
    /// `LLM_API_KEY`, falling back to `GROQ_API_KEY`.
    pub api_key: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        let non_empty = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            work_dir: non_empty("ASSISTANT_WORK_DIR"),
            log_level: non_empty("ASSISTANT_LOG_LEVEL"),
            outbox_dir: non_empty("OUTBOX_DIR"),
            max_history: non_empty("MAX_HISTORY").and_then(|v| v.parse().ok()),
            server_port: non_empty("SERVER_PORT").and_then(|v| v.parse().ok()),
            api_key: non_empty("LLM_API_KEY").or_else(|| non_empty("GROQ_API_KEY")),
        }
    }
}

/// Deep-merge two TOML values.
/// Tables merge recursively; any other overlay value replaces the base value.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// merged value. `visited` holds canonicalized paths already seen so cycles
/// are rejected.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Load config from the given path, or `config/default.toml`, then apply env
/// overrides. Without a path and without the default file, hardcoded
/// defaults with the `auto` provider are returned.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let overrides = Overrides::from_env();

    if let Some(path) = config_path {
        return load_from(Path::new(path), &overrides);
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        return load_from(default_path, &overrides);
    }

    let default_toml = "[assistant]\nwork_dir = \"~/.outbox-assistant\"\n";
    let value: toml::Value = toml::from_str(default_toml)
        .map_err(|e| AppError::Config(format!("builtin defaults: {e}")))?;
    resolve(value, &overrides, Path::new("<builtin>"))
}

/// Loader for an explicit path with explicit overrides.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let merged = load_raw_merged(path, &mut HashSet::new())?;
    resolve(merged, overrides, path)
}

fn resolve(value: toml::Value, overrides: &Overrides, origin: &Path) -> Result<Config, AppError> {
    let parsed: RawConfig = Deserialize::deserialize(value).map_err(|e: toml::de::Error| {
        AppError::Config(format!("config error in {}: {e}", origin.display()))
    })?;

    let a = parsed.assistant;

    let work_dir = expand_home(overrides.work_dir.as_deref().unwrap_or(&a.work_dir));
    let log_level = overrides.log_level.clone().unwrap_or(a.log_level);

    let outbox_dir = expand_home(overrides.outbox_dir.as_deref().unwrap_or(&parsed.outbox.dir));
    let outbox_dir = if outbox_dir.is_absolute() {
        outbox_dir
    } else {
        work_dir.join(outbox_dir)
    };

    let log_file = a.log_file.map(|f| {
        let p = expand_home(&f);
        if p.is_absolute() { p } else { work_dir.join(p) }
    });

    let max_history = overrides
        .max_history
        .unwrap_or(parsed.conversation.max_history)
        .max(1);
    let context_window = parsed.conversation.context_window.min(max_history);

    let bind = match overrides.server_port {
        Some(port) => with_port(&parsed.comms.axum_channel.bind, port),
        None => parsed.comms.axum_channel.bind,
    };

    Ok(Config {
        name: a.name,
        work_dir,
        log_level,
        log_file,
        prompts_dir: expand_home(&a.prompts_dir),
        outbox: OutboxConfig { dir: outbox_dir },
        conversation: ConversationConfig {
            max_history,
            context_window,
            max_sessions: parsed.conversation.max_sessions.max(1),
            session_idle_secs: parsed.conversation.session_idle_secs,
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                max_tokens: parsed.llm.openai.max_tokens,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        comms: CommsConfig {
            pty: PtyConfig {
                enabled: parsed.comms.pty.enabled,
            },
            axum_channel: AxumChannelConfig {
                enabled: parsed.comms.axum_channel.enabled,
                bind,
            },
        },
        llm_api_key: overrides.api_key.clone(),
    })
}

/// Replace the port of a `host:port` bind address.
fn with_port(bind: &str, port: u16) -> String {
    let host = bind.rsplit_once(':').map(|(h, _)| h).unwrap_or(bind);
    let host = if host.is_empty() { "127.0.0.1" } else { host };
    format!("{host}:{port}")
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
