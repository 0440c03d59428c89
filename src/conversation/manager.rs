//! Conversation loop for one session: interpret, apply, maybe execute,
//! record.

use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::outbox::{ActionPayload, ActionRecord, EmailRecord, MeetingRecord, Outbox};

use super::interpreter::Interpreter;
use super::state::ConversationState;
use super::types::{ActionKind, Intent, LlmTurn};

/// Marker the model uses when it needs addresses before an email can go out.
const EMAIL_ADDRESSES: &str = "email_addresses";

/// What happened when a confirmed action was executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    Saved {
        filename: String,
        path: PathBuf,
        summary: String,
    },
    /// Confirmed, but required fields are still missing. Nothing written.
    Incomplete { missing: Vec<String> },
    /// The outbox refused or failed the write. State is kept for a retry.
    Failed { message: String },
}

impl ExecutionResult {
    pub fn is_saved(&self) -> bool {
        matches!(self, ExecutionResult::Saved { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub turn: LlmTurn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionResult>,
}

pub struct ConversationManager {
    id: Uuid,
    interpreter: Interpreter,
    outbox: Outbox,
    state: ConversationState,
}

impl ConversationManager {
    pub fn new(id: Uuid, interpreter: Interpreter, outbox: Outbox, max_history: usize) -> Self {
        Self {
            id,
            interpreter,
            outbox,
            state: ConversationState::new(max_history),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn reset(&mut self) {
        debug!(conversation_id = %self.id, "conversation reset");
        self.state.reset();
    }

    pub async fn process_message(&mut self, user_input: &str) -> TurnOutcome {
        let user_input = user_input.trim();
        let turn = self.interpreter.interpret(user_input, &self.state).await;
        debug!(
            conversation_id = %self.id,
            action_type = ?turn.action_type,
            intent = ?turn.intent,
            entities = turn.entities.len(),
            "turn interpreted"
        );

        let execution = self.apply(&turn);
        self.state.push_history(user_input, &turn.response);
        TurnOutcome { turn, execution }
    }

    fn apply(&mut self, turn: &LlmTurn) -> Option<ExecutionResult> {
        let s = &mut self.state;
        match turn.action_type {
            ActionKind::NewIntent => {
                let new_intent = turn.intent.unwrap_or(Intent::Chitchat);
                if new_intent == Intent::SendEmail
                    && s.intent == Some(Intent::ScheduleMeeting)
                    && turn.missing_entities.iter().any(|m| m == EMAIL_ADDRESSES)
                {
                    s.awaiting_confirmation = false;
                    s.awaiting_email_addresses = true;
                } else if new_intent == Intent::SendEmail && s.awaiting_email_addresses {
                    if let Some(recipient) = turn.entities.get("recipient") {
                        s.entities.insert("recipient", recipient.clone());
                        s.intent = Some(Intent::SendEmail);
                        s.awaiting_email_addresses = false;
                        s.awaiting_confirmation = turn.needs_confirmation;
                    }
                } else if new_intent.is_actionable() {
                    s.intent = Some(new_intent);
                    s.entities = turn.entities.clone();
                    s.awaiting_confirmation = turn.needs_confirmation;
                    s.awaiting_email_addresses = false;
                    s.session_active = true;
                } else if !s.session_active {
                    s.intent = Some(Intent::Chitchat);
                }
                None
            }
            ActionKind::Correction => {
                if turn.correction_detected || !turn.entities.is_empty() {
                    s.entities.merge(&turn.entities);
                    s.awaiting_confirmation = turn.needs_confirmation;
                    if let Some(intent) = turn.intent.filter(|i| i.is_actionable()) {
                        if !s.intent.is_some_and(Intent::is_actionable) {
                            s.intent = Some(intent);
                            s.session_active = true;
                        }
                    }
                }
                None
            }
            ActionKind::Confirmation => {
                if turn.ready_to_execute {
                    s.awaiting_confirmation = false;
                    self.execute()
                } else {
                    debug!(conversation_id = %self.id, "user declined; task cleared");
                    s.reset_task();
                    None
                }
            }
            ActionKind::Cancellation => {
                s.reset_task();
                None
            }
            ActionKind::EmailAddressRequest => {
                s.awaiting_email_addresses = true;
                s.awaiting_confirmation = false;
                None
            }
            ActionKind::Chitchat => {
                if !s.session_active {
                    s.intent = Some(Intent::Chitchat);
                }
                None
            }
            ActionKind::Error | ActionKind::Unknown => None,
        }
    }

    /// The record the current state would produce, if it is ready.
    pub fn action_for_execution(&self) -> Option<ActionRecord> {
        if !self.state.is_ready_for_execution() {
            return None;
        }
        let e = &self.state.entities;
        let text = |f: &str| e.text(f).unwrap_or_default();
        let list = |f: &str| e.get(f).map(|v| v.as_list()).unwrap_or_default();

        let payload = match self.state.intent? {
            Intent::ScheduleMeeting => ActionPayload::ScheduleMeeting(MeetingRecord {
                title: text("title"),
                date: text("date"),
                time: text("time"),
                participants: list("participants"),
            }),
            Intent::SendEmail => ActionPayload::SendEmail(EmailRecord {
                recipients: list("recipient"),
                subject: e.text("subject"),
                body: e.text("body"),
            }),
            Intent::Chitchat => return None,
        };
        Some(ActionRecord::new(payload, self.id, Local::now().fixed_offset()))
    }

    fn execute(&mut self) -> Option<ExecutionResult> {
        if !self.state.session_active || !self.state.intent.is_some_and(Intent::is_actionable) {
            debug!(conversation_id = %self.id, "confirmation with nothing pending");
            return None;
        }
        let Some(mut record) = self.action_for_execution() else {
            let missing = self.state.missing_entities();
            info!(conversation_id = %self.id, ?missing, "confirmed action is incomplete");
            return Some(ExecutionResult::Incomplete { missing });
        };

        match self.outbox.save(&mut record) {
            Ok(saved) => {
                let summary = record.summary();
                self.state.reset_task();
                Some(ExecutionResult::Saved {
                    filename: saved.filename,
                    path: saved.path,
                    summary,
                })
            }
            Err(e) => {
                warn!(conversation_id = %self.id, error = %e, "failed to save action");
                Some(ExecutionResult::Failed { message: e.to_string() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;
    use crate::llm::providers::scripted::ScriptedProvider;

    fn manager(dir: &std::path::Path, replies: &[&str]) -> (ConversationManager, ScriptedProvider) {
        let p = ScriptedProvider::new(replies.iter().copied());
        let interp = Interpreter::new(LlmProvider::Scripted(p.clone()), "/nonexistent-prompts", 5);
        (ConversationManager::new(Uuid::new_v4(), interp, Outbox::new(dir), 10), p)
    }

    const BOOK: &str = r#"{"action_type":"new_intent","intent":"schedule_meeting","entities":{"title":"meeting with Sara","date":"tomorrow","time":"3pm"},"response":"Should I book it?","needs_confirmation":true}"#;
    const MAKE_IT_4: &str = r#"{"action_type":"correction","intent":"schedule_meeting","entities":{"time":"4pm"},"correction_detected":true,"response":"Updated to 4pm.","needs_confirmation":true}"#;
    const YES: &str = r#"{"action_type":"confirmation","ready_to_execute":true,"response":"Done."}"#;
    const NO: &str = r#"{"action_type":"confirmation","ready_to_execute":false,"response":"OK, not booking."}"#;

    #[tokio::test]
    async fn book_correct_confirm_writes_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut m, _) = manager(dir.path(), &[BOOK, MAKE_IT_4, YES]);

        let o = m.process_message("Book meeting with Sara tomorrow at 3pm").await;
        assert!(o.execution.is_none());
        assert!(m.state().awaiting_confirmation);

        m.process_message("actually make it 4pm").await;
        assert_eq!(m.state().entities.text("time").as_deref(), Some("4pm"));
        assert_eq!(m.state().entities.text("title").as_deref(), Some("meeting with Sara"));

        let o = m.process_message("yes").await;
        match o.execution {
            Some(ExecutionResult::Saved { ref filename, .. }) => {
                assert!(filename.starts_with("schedule_meeting_"))
            }
            other => panic!("expected saved, got {other:?}"),
        }
        assert!(m.state().is_idle());
        assert_eq!(m.state().history.len(), 3);

        let records = Outbox::new(dir.path()).list(None).unwrap();
        assert_eq!(records.len(), 1);
        match &records[0].payload {
            ActionPayload::ScheduleMeeting(meeting) => assert_eq!(meeting.time, "4pm"),
            other => panic!("unexpected payload {other:?}"),
        }
        assert_eq!(records[0].conversation_id, m.id());
    }

    #[tokio::test]
    async fn declining_clears_task_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut m, _) = manager(dir.path(), &[BOOK, NO]);
        m.process_message("book it").await;
        let o = m.process_message("no").await;
        assert!(o.execution.is_none());
        assert!(m.state().is_idle());
        assert!(Outbox::new(dir.path()).list(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn confirming_incomplete_action_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let partial = r#"{"action_type":"new_intent","intent":"schedule_meeting","entities":{"title":"sync"},"response":"When?"}"#;
        let (mut m, _) = manager(dir.path(), &[partial, YES]);
        m.process_message("set up a sync").await;
        let o = m.process_message("yes").await;
        assert_eq!(
            o.execution,
            Some(ExecutionResult::Incomplete { missing: vec!["date".into(), "time".into()] })
        );
        assert!(m.state().session_active);
        assert!(Outbox::new(dir.path()).list(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn email_address_handoff() {
        let dir = tempfile::tempdir().unwrap();
        let switch = r#"{"action_type":"new_intent","intent":"send_email","missing_entities":["email_addresses"],"response":"What are their addresses?"}"#;
        let addresses = r#"{"action_type":"new_intent","intent":"send_email","entities":{"recipient":["sara@company.com"]},"response":"Send it?","needs_confirmation":true}"#;
        let (mut m, _) = manager(dir.path(), &[BOOK, switch, addresses]);

        m.process_message("book it").await;
        m.process_message("also email them").await;
        assert!(m.state().awaiting_email_addresses);
        assert_eq!(m.state().intent, Some(Intent::ScheduleMeeting));

        m.process_message("sara@company.com").await;
        assert_eq!(m.state().intent, Some(Intent::SendEmail));
        assert!(!m.state().awaiting_email_addresses);
        assert!(m.state().awaiting_confirmation);
        assert!(m.state().entities.has("recipient"));
    }

    #[tokio::test]
    async fn email_address_request_pauses_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let request = r#"{"action_type":"email_address_request","intent":"send_email","response":"What is Sara's email address?"}"#;
        let (mut m, _) = manager(dir.path(), &[BOOK, request, YES]);

        m.process_message("book it").await;
        assert!(m.state().awaiting_confirmation);

        let o = m.process_message("and send Sara the invite").await;
        assert!(o.execution.is_none());
        assert!(m.state().awaiting_email_addresses);
        assert!(!m.state().awaiting_confirmation);
        assert_eq!(m.state().intent, Some(Intent::ScheduleMeeting));
        assert_eq!(m.state().entities.text("title").as_deref(), Some("meeting with Sara"));

        // The meeting itself is still bookable.
        let o = m.process_message("yes").await;
        assert!(o.execution.is_some_and(|e| e.is_saved()));
    }

    #[tokio::test]
    async fn email_round_trip_to_outbox() {
        let dir = tempfile::tempdir().unwrap();
        let email = r#"{"action_type":"new_intent","intent":"send_email","entities":{"recipient":"john@company.com, amy@company.com","body":"about the delay"},"response":"Send it?","needs_confirmation":true}"#;
        let (mut m, _) = manager(dir.path(), &[email, YES]);
        m.process_message("Send email to john and amy about the delay").await;
        let o = m.process_message("yes").await;
        assert!(o.execution.as_ref().is_some_and(ExecutionResult::is_saved));

        let records = Outbox::new(dir.path()).list(None).unwrap();
        match &records[0].payload {
            ActionPayload::SendEmail(e) => {
                assert_eq!(e.recipients, vec!["john@company.com", "amy@company.com"]);
                assert_eq!(e.body.as_deref(), Some("about the delay"));
                assert!(e.subject.is_none());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn chitchat_does_not_disturb_active_task() {
        let dir = tempfile::tempdir().unwrap();
        let chat = r#"{"action_type":"chitchat","intent":"chitchat","response":"I'm fine!"}"#;
        let (mut m, _) = manager(dir.path(), &[chat, BOOK, chat]);
        m.process_message("how are you").await;
        assert_eq!(m.state().intent, Some(Intent::Chitchat));
        assert!(!m.state().session_active);

        m.process_message("book it").await;
        m.process_message("nice weather").await;
        assert_eq!(m.state().intent, Some(Intent::ScheduleMeeting));
        assert!(m.state().awaiting_confirmation);
    }

    #[tokio::test]
    async fn cancellation_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = r#"{"action_type":"cancellation","response":"Cancelled."}"#;
        let (mut m, p) = manager(dir.path(), &[BOOK, "not json at all"]);
        p.push_failure("HTTP 500");
        p.push_reply(cancel);

        m.process_message("book it").await;
        let o = m.process_message("???").await;
        assert!(o.turn.parse_error.is_some());
        assert!(m.state().session_active);

        let o = m.process_message("hello?").await;
        assert!(o.turn.error.is_some());
        assert!(m.state().session_active);

        m.process_message("cancel").await;
        assert!(m.state().is_idle());
        assert_eq!(m.state().history.len(), 4);
    }

    #[tokio::test]
    async fn confirmation_with_nothing_pending_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (mut m, _) = manager(dir.path(), &[YES]);
        let o = m.process_message("yes").await;
        assert!(o.execution.is_none());
    }

    #[tokio::test]
    async fn save_failure_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("outbox");
        std::fs::write(&blocker, "a file where the directory should be").unwrap();
        let p = ScriptedProvider::new([BOOK, YES]);
        let interp = Interpreter::new(LlmProvider::Scripted(p), "/nonexistent-prompts", 5);
        let mut m = ConversationManager::new(Uuid::new_v4(), interp, Outbox::new(&blocker), 10);

        m.process_message("book it").await;
        let o = m.process_message("yes").await;
        assert!(matches!(o.execution, Some(ExecutionResult::Failed { .. })));
        assert!(m.state().session_active);
        assert!(m.state().is_ready_for_execution());
    }
}
