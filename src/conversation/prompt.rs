//! Prompt template loading and `{{key}}` substitution.
//!
//! Templates live under `config/prompts/`. A missing layer falls back to
//! the built-in copy compiled into the binary, so the assistant runs from
//! any working directory.
//!
//! Substitution is single pass over the template: text inserted for one
//! variable is never scanned for further placeholders, so user input that
//! happens to contain `{{context}}` is left alone.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const SEPARATOR: &str = "\n\n";

pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            parts: Vec::new(),
            vars: HashMap::new(),
        }
    }

    /// Append `filename` from the prompts directory, or `fallback` when the
    /// file is missing or empty.
    pub fn layer_or(mut self, filename: &str, fallback: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) | Err(_) => {
                tracing::debug!(path = %path.display(), "prompt layer not found; using built-in");
                fallback.to_string()
            }
        };
        self.push(text);
        self
    }

    /// Append a text fragment directly.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        self.push(text.into());
        self
    }

    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> String {
        substitute(&self.parts.join(SEPARATOR), &self.vars)
    }

    fn push(&mut self, text: String) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
    }
}

/// Replace every `{{key}}` with its value. Unknown keys are kept verbatim.
fn substitute(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match vars.get(key.trim()) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
