//! Dummy LLM provider: answers every turn with a chitchat envelope.
//! Lets the whole conversation loop run without an API key.

use serde_json::json;

use crate::llm::{LlmResponse, ProviderError};

const OFFLINE_REPLY: &str = "I'm running without a language model, so I can only chat. \
Set `[llm] default = \"groq\"` and LLM_API_KEY to book meetings and send emails.";

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, content: &str) -> Result<LlmResponse, ProviderError> {
        let reply = json!({
            "action_type": "chitchat",
            "intent": "chitchat",
            "entities": {},
            "response": OFFLINE_REPLY,
            "needs_confirmation": false,
            "ready_to_execute": false,
            "correction_detected": false,
            "prompt_chars": content.len(),
        });
        Ok(LlmResponse::text(reply.to_string()))
    }
}
