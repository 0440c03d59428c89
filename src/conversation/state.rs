//! Per-session turn state: what the user wants, what has been collected so
//! far, and the recent exchanges.

use std::collections::VecDeque;

use chrono::{DateTime, FixedOffset, Local};
use serde::Serialize;

use super::types::{Entities, Intent};

const MEETING_FIELDS: [&str; 3] = ["title", "date", "time"];

/// One user message and the reply it got.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exchange {
    pub user_input: String,
    pub bot_response: String,
    pub timestamp: DateTime<FixedOffset>,
    /// Entities as they stood after the turn.
    pub state_snapshot: Entities,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    pub intent: Option<Intent>,
    pub entities: Entities,
    pub awaiting_confirmation: bool,
    pub awaiting_email_addresses: bool,
    pub session_active: bool,
    pub history: VecDeque<Exchange>,
    #[serde(skip)]
    max_history: usize,
}

/// The slice of state handed to the interpreter.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub intent: Option<Intent>,
    pub entities: Entities,
    pub awaiting_confirmation: bool,
    pub awaiting_email_addresses: bool,
    pub session_active: bool,
    pub history: Vec<Exchange>,
}

impl TurnContext {
    pub fn is_empty(&self) -> bool {
        self.intent.is_none()
            && self.entities.is_empty()
            && !self.awaiting_confirmation
            && !self.awaiting_email_addresses
            && self.history.is_empty()
    }
}

impl ConversationState {
    pub fn new(max_history: usize) -> Self {
        Self {
            intent: None,
            entities: Entities::new(),
            awaiting_confirmation: false,
            awaiting_email_addresses: false,
            session_active: false,
            history: VecDeque::new(),
            max_history: max_history.max(1),
        }
    }

    /// Forget the current task. History survives.
    pub fn reset_task(&mut self) {
        self.intent = None;
        self.entities = Entities::new();
        self.awaiting_confirmation = false;
        self.awaiting_email_addresses = false;
        self.session_active = false;
    }

    pub fn reset(&mut self) {
        self.reset_task();
        self.history.clear();
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn is_idle(&self) -> bool {
        !self.session_active && self.intent.is_none()
    }

    /// Required fields the current intent still lacks. Email content is
    /// reported as the single pseudo-field `body_or_subject`.
    pub fn missing_entities(&self) -> Vec<String> {
        let e = &self.entities;
        match self.intent {
            Some(Intent::ScheduleMeeting) => MEETING_FIELDS
                .iter()
                .filter(|f| !e.has(f))
                .map(|f| f.to_string())
                .collect(),
            Some(Intent::SendEmail) => {
                let mut missing = Vec::new();
                if !e.has("recipient") {
                    missing.push("recipient".to_string());
                }
                if !e.has("body") && !e.has("subject") {
                    missing.push("body_or_subject".to_string());
                }
                missing
            }
            Some(Intent::Chitchat) | None => Vec::new(),
        }
    }

    pub fn has_required_entities(&self) -> bool {
        self.missing_entities().is_empty()
    }

    pub fn is_ready_for_execution(&self) -> bool {
        self.session_active
            && self.intent.is_some_and(Intent::is_actionable)
            && self.has_required_entities()
            && !self.awaiting_confirmation
    }

    pub fn push_history(&mut self, user_input: &str, bot_response: &str) {
        self.history.push_back(Exchange {
            user_input: user_input.to_string(),
            bot_response: bot_response.to_string(),
            timestamp: Local::now().fixed_offset(),
            state_snapshot: self.entities.clone(),
        });
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
    }

    pub fn context(&self, window: usize) -> TurnContext {
        let skip = self.history.len().saturating_sub(window);
        TurnContext {
            intent: self.intent,
            entities: self.entities.clone(),
            awaiting_confirmation: self.awaiting_confirmation,
            awaiting_email_addresses: self.awaiting_email_addresses,
            session_active: self.session_active,
            history: self.history.iter().skip(skip).cloned().collect(),
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting_state(fields: &[(&str, &str)]) -> ConversationState {
        let mut s = ConversationState::new(10);
        s.intent = Some(Intent::ScheduleMeeting);
        s.session_active = true;
        s.entities = fields.iter().copied().collect();
        s
    }

    #[test]
    fn meeting_missing_fields_in_order() {
        let s = meeting_state(&[("title", "sync")]);
        assert_eq!(s.missing_entities(), vec!["date", "time"]);
        assert!(!s.has_required_entities());
    }

    #[test]
    fn email_needs_recipient_and_content() {
        let mut s = ConversationState::new(10);
        s.intent = Some(Intent::SendEmail);
        assert_eq!(s.missing_entities(), vec!["recipient", "body_or_subject"]);
        s.entities.insert("subject", "Delay");
        assert_eq!(s.missing_entities(), vec!["recipient"]);
        s.entities.insert("recipient", "john@company.com");
        assert!(s.has_required_entities());
    }

    #[test]
    fn ready_requires_active_complete_and_confirmed() {
        let mut s = meeting_state(&[("title", "sync"), ("date", "tomorrow"), ("time", "3pm")]);
        s.awaiting_confirmation = true;
        assert!(!s.is_ready_for_execution());
        s.awaiting_confirmation = false;
        assert!(s.is_ready_for_execution());
        s.session_active = false;
        assert!(!s.is_ready_for_execution());
    }

    #[test]
    fn chitchat_is_never_ready() {
        let mut s = ConversationState::new(10);
        s.intent = Some(Intent::Chitchat);
        s.session_active = true;
        assert!(s.has_required_entities());
        assert!(!s.is_ready_for_execution());
    }

    #[test]
    fn history_is_bounded() {
        let mut s = ConversationState::new(3);
        for i in 0..5 {
            s.push_history(&format!("u{i}"), &format!("b{i}"));
        }
        assert_eq!(s.history.len(), 3);
        assert_eq!(s.history.front().unwrap().user_input, "u2");
        let ctx = s.context(2);
        assert_eq!(ctx.history.len(), 2);
        assert_eq!(ctx.history[0].user_input, "u3");
    }

    #[test]
    fn reset_task_keeps_history() {
        let mut s = meeting_state(&[("title", "sync")]);
        s.push_history("book a sync", "when?");
        s.reset_task();
        assert!(s.is_idle());
        assert!(s.entities.is_empty());
        assert_eq!(s.history.len(), 1);
        s.reset();
        assert!(s.history.is_empty());
        assert!(s.context(5).is_empty());
    }
}
