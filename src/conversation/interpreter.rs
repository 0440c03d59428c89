//! Outbound LLM call: prompt in, structured [`LlmTurn`] out.
//!
//! `interpret` never fails. Provider errors and unreadable replies both
//! turn into an `error` turn with a user-facing apology, so the manager
//! can record the exchange and carry on.

use std::path::PathBuf;

use chrono::Local;
use tracing::{debug, warn};

use crate::llm::LlmProvider;

use super::prompt::PromptBuilder;
use super::state::{ConversationState, TurnContext};
use super::types::LlmTurn;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that responds only with valid JSON.";

const TEMPLATE_FILE: &str = "interpret.md";
const BUILTIN_TEMPLATE: &str = include_str!("../../config/prompts/interpret.md");
const NO_CONTEXT: &str = "No previous context.";

#[derive(Debug, Clone)]
pub struct Interpreter {
    provider: LlmProvider,
    prompts_dir: PathBuf,
    context_window: usize,
}

impl Interpreter {
    pub fn new(provider: LlmProvider, prompts_dir: impl Into<PathBuf>, context_window: usize) -> Self {
        Self {
            provider,
            prompts_dir: prompts_dir.into(),
            context_window,
        }
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    pub fn build_prompt(&self, user_input: &str, context: &TurnContext) -> String {
        PromptBuilder::new(&self.prompts_dir)
            .layer_or(TEMPLATE_FILE, BUILTIN_TEMPLATE)
            .var("today", Local::now().format("%A, %Y-%m-%d").to_string())
            .var("context", format_context(context))
            .var("user_input", user_input)
            .build()
    }

    pub async fn interpret(&self, user_input: &str, state: &ConversationState) -> LlmTurn {
        let context = state.context(self.context_window);
        let prompt = self.build_prompt(user_input, &context);

        let response = match self.provider.complete(&prompt, Some(SYSTEM_PROMPT)).await {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "LLM call failed");
                return LlmTurn::provider_failure(e.to_string());
            }
        };
        if let Some(usage) = response.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "LLM usage"
            );
        }
        parse_reply(&response.text)
    }
}

/// Render the context block of the prompt.
pub fn format_context(ctx: &TurnContext) -> String {
    if ctx.is_empty() {
        return NO_CONTEXT.to_string();
    }
    let intent = ctx.intent.map(|i| i.as_str()).unwrap_or("None");
    let entities = serde_json::to_string(&ctx.entities).unwrap_or_else(|_| "{}".into());

    let mut out = format!(
        "Current Intent: {intent}\n\
         Current Entities: {entities}\n\
         Awaiting Confirmation: {}\n\
         Awaiting Email Addresses: {}\n\
         Session Active: {}\n",
        ctx.awaiting_confirmation, ctx.awaiting_email_addresses, ctx.session_active,
    );
    if ctx.history.is_empty() {
        out.push_str("History: none");
    } else {
        out.push_str("History:");
        for ex in &ctx.history {
            out.push_str(&format!("\n- User: {}\n  Assistant: {}", ex.user_input, ex.bot_response));
        }
    }
    out
}

/// Read the model's reply as an [`LlmTurn`].
///
/// A surrounding ```` ```json ```` fence is stripped. If the whole reply is
/// not JSON, the outermost `{ … }` span is tried before giving up.
pub fn parse_reply(raw: &str) -> LlmTurn {
    let cleaned = strip_fence(raw);
    match serde_json::from_str::<LlmTurn>(cleaned) {
        Ok(turn) => turn,
        Err(first) => {
            if let Some(span) = object_span(cleaned) {
                if let Ok(turn) = serde_json::from_str::<LlmTurn>(span) {
                    debug!("LLM reply had text around the JSON object");
                    return turn;
                }
            }
            warn!(error = %first, raw_len = raw.len(), "LLM reply is not valid JSON");
            LlmTurn::parse_failure(raw, first.to_string())
        }
    }
}

fn strip_fence(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

fn object_span(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::types::{ActionKind, Intent};
    use crate::llm::providers::scripted::ScriptedProvider;

    fn interpreter(p: &ScriptedProvider) -> Interpreter {
        Interpreter::new(LlmProvider::Scripted(p.clone()), "/nonexistent-prompts", 5)
    }

    #[test]
    fn fenced_reply_is_parsed() {
        let t = parse_reply("```json\n{\"action_type\":\"new_intent\",\"intent\":\"send_email\"}\n```");
        assert_eq!(t.action_type, ActionKind::NewIntent);
        assert_eq!(t.intent, Some(Intent::SendEmail));
    }

    #[test]
    fn chatter_around_object_is_tolerated() {
        let t = parse_reply("Sure! {\"action_type\":\"cancellation\",\"response\":\"Cancelled.\"} Hope that helps.");
        assert_eq!(t.action_type, ActionKind::Cancellation);
        assert_eq!(t.response, "Cancelled.");
    }

    #[test]
    fn garbage_becomes_parse_failure() {
        let t = parse_reply("I cannot do that");
        assert!(t.is_error());
        assert!(t.parse_error.is_some());
        assert_eq!(t.raw_response.as_deref(), Some("I cannot do that"));
        assert_eq!(t.response, "I had trouble understanding that. Could you rephrase?");
    }

    #[test]
    fn empty_context_renders_placeholder() {
        let s = ConversationState::new(10);
        assert_eq!(format_context(&s.context(5)), NO_CONTEXT);
    }

    #[test]
    fn context_includes_state_and_history() {
        let mut s = ConversationState::new(10);
        s.intent = Some(Intent::ScheduleMeeting);
        s.entities.insert("time", "3pm");
        s.awaiting_confirmation = true;
        s.push_history("book it at 3pm", "Should I book it?");
        let text = format_context(&s.context(5));
        assert!(text.contains("Current Intent: schedule_meeting"));
        assert!(text.contains(r#""time":"3pm""#));
        assert!(text.contains("Awaiting Confirmation: true"));
        assert!(text.contains("- User: book it at 3pm"));
    }

    #[test]
    fn builtin_template_is_used_and_filled() {
        let p = ScriptedProvider::default();
        let prompt = interpreter(&p).build_prompt("hello there", &ConversationState::new(10).context(5));
        assert!(prompt.contains("USER INPUT: \"hello there\""));
        assert!(prompt.contains(NO_CONTEXT));
        assert!(!prompt.contains("{{today}}"));
    }

    #[tokio::test]
    async fn interpret_sends_system_prompt() {
        let p = ScriptedProvider::new([r#"{"action_type":"chitchat","response":"Hi!"}"#]);
        let turn = interpreter(&p).interpret("hi", &ConversationState::new(10)).await;
        assert_eq!(turn.response, "Hi!");
        let reqs = p.requests();
        assert_eq!(reqs[0].system.as_deref(), Some(SYSTEM_PROMPT));
        assert!(reqs[0].content.contains("USER INPUT: \"hi\""));
    }

    #[tokio::test]
    async fn provider_failure_becomes_error_turn() {
        let p = ScriptedProvider::default();
        p.push_failure("HTTP 503");
        let turn = interpreter(&p).interpret("hi", &ConversationState::new(10)).await;
        assert!(turn.is_error());
        assert!(turn.error.as_deref().unwrap().contains("HTTP 503"));
        assert_eq!(turn.response, "Sorry, I had trouble processing that. Could you try again?");
    }
}
