//! Shared state for comms channels: the capability boundary.
//!
//! Channels receive an `Arc<CommsState>` and are restricted to the typed
//! methods below; they never touch managers or the outbox directly.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::conversation::display::{IDLE_STATUS, render_actions, render_reply, render_status};
use crate::conversation::{ConversationState, ExecutionResult, Interpreter, SessionRegistry};
use crate::error::AppError;
use crate::llm::providers;
use crate::outbox::{ActionRecord, Outbox, OutboxError};

/// Everything a channel needs to show after one turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub session_id: Uuid,
    /// Bot reply with the execution footer.
    pub reply: String,
    /// Rendered status panel.
    pub status: String,
    pub state: ConversationState,
    pub execution: Option<ExecutionResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub status: String,
    pub state: ConversationState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionsView {
    pub actions: Vec<ActionRecord>,
    pub panel: String,
}

pub struct CommsState {
    registry: SessionRegistry,
    outbox: Outbox,
}

impl CommsState {
    pub fn new(registry: SessionRegistry, outbox: Outbox) -> Self {
        Self { registry, outbox }
    }

    /// Build the provider, interpreter, outbox and registry from config.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let provider = providers::build(&config.llm, config.llm_api_key.clone())?;
        let outbox = Outbox::new(&config.outbox.dir);
        outbox.ensure_dir()?;
        let interpreter = Interpreter::new(
            provider,
            &config.prompts_dir,
            config.conversation.context_window,
        );
        let registry = SessionRegistry::new(interpreter, outbox.clone(), config.conversation.max_history)
            .with_limits(
                config.conversation.max_sessions,
                Duration::from_secs(config.conversation.session_idle_secs),
            );
        Ok(Self::new(registry, outbox))
    }

    /// Run one turn for `session_id`; `None` or an unknown id starts a
    /// session under a new id, returned in the reply.
    pub async fn send_message(&self, session_id: Option<Uuid>, text: &str) -> ChatReply {
        let (session_id, manager) = self.registry.get_or_create(session_id);
        let mut manager = manager.lock().await;
        let outcome = manager.process_message(text).await;
        debug!(%session_id, executed = outcome.execution.is_some(), "turn complete");
        ChatReply {
            session_id,
            reply: render_reply(&outcome),
            status: render_status(manager.state()),
            state: manager.state().clone(),
            execution: outcome.execution,
        }
    }

    pub async fn session_snapshot(&self, session_id: Uuid) -> Option<SessionSnapshot> {
        let manager = self.registry.get(session_id)?;
        let manager = manager.lock().await;
        Some(SessionSnapshot {
            session_id,
            status: render_status(manager.state()),
            state: manager.state().clone(),
        })
    }

    /// Clear the session. Returns `false` if no such session exists.
    pub async fn reset_session(&self, session_id: Uuid) -> bool {
        self.registry.reset(session_id).await
    }

    pub fn idle_status(&self) -> &'static str {
        IDLE_STATUS
    }

    pub fn recent_actions(&self, limit: usize) -> Result<ActionsView, OutboxError> {
        let actions = self.outbox.list(Some(limit))?;
        let panel = render_actions(&actions);
        Ok(ActionsView { actions, panel })
    }

    pub fn clear_actions(&self) -> Result<usize, OutboxError> {
        self.outbox.clear()
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    pub fn provider_name(&self) -> &'static str {
        self.registry.provider_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_config_with_dummy_provider() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::test_default(dir.path());
        let state = CommsState::from_config(&config).unwrap();
        assert!(dir.path().join("outbox").is_dir());
        assert_eq!(state.provider_name(), "dummy");

        let reply = state.send_message(None, "hello").await;
        assert!(reply.reply.contains("without a language model"));
        assert_eq!(reply.status, IDLE_STATUS);
        assert_eq!(state.session_count(), 1);

        let snap = state.session_snapshot(reply.session_id).await.unwrap();
        assert_eq!(snap.state.history.len(), 1);
        assert!(state.session_snapshot(Uuid::new_v4()).await.is_none());
    }

    #[test]
    fn from_config_rejects_placeholder_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::test_default(dir.path());
        config.llm.provider = "groq".into();
        config.llm_api_key = Some("your-groq-api-key-here".into());
        assert!(matches!(CommsState::from_config(&config), Err(AppError::Llm(_))));
    }
}
