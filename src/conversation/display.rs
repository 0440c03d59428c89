//! Markdown panels shown next to the chat: live status, the reply footer
//! and the recent-actions list.

use std::fmt::Write;

use crate::outbox::ActionRecord;

use super::manager::{ExecutionResult, TurnOutcome};
use super::state::ConversationState;
use super::types::Intent;

const BODY_PREVIEW_CHARS: usize = 50;
const ACTIONS_SHOWN: usize = 5;

pub const IDLE_STATUS: &str = "💬 **Idle**\n\nReady for your next request!";

pub fn render_status(state: &ConversationState) -> String {
    if !state.session_active {
        return IDLE_STATUS.to_string();
    }
    let e = &state.entities;
    let mut out = String::new();

    match state.intent {
        Some(Intent::ScheduleMeeting) => {
            out.push_str("📅 **Scheduling Meeting**\n\n");
            for (field, label) in [("title", "Meeting"), ("date", "Date"), ("time", "Time"), ("participants", "With")] {
                if let Some(v) = e.text(field) {
                    let _ = writeln!(out, "**{label}:** {v}");
                }
            }
        }
        Some(Intent::SendEmail) => {
            out.push_str("📧 **Composing Email**\n\n");
            if let Some(to) = e.text("recipient") {
                let _ = writeln!(out, "**To:** {to}");
            }
            if let Some(subject) = e.text("subject") {
                let _ = writeln!(out, "**Subject:** {subject}");
            }
            if let Some(body) = e.text("body") {
                let _ = writeln!(out, "**Message:** {}", preview(&body));
            }
        }
        Some(Intent::Chitchat) | None => out.push_str("💭 **Chatting**\n\n"),
    }

    if state.awaiting_confirmation {
        out.push_str("\n⏳ **Waiting for your confirmation**");
    } else if state.awaiting_email_addresses {
        out.push_str("\n📧 **Waiting for email addresses**");
    } else if state.is_ready_for_execution() {
        out.push_str("\n✅ **Ready to execute**");
    } else {
        let missing = state.missing_entities();
        if !missing.is_empty() {
            let _ = write!(out, "\n📝 **Need:** {}", missing.join(", ").replace('_', " "));
        }
    }
    out
}

fn preview(body: &str) -> String {
    if body.chars().count() > BODY_PREVIEW_CHARS {
        let cut: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        body.to_string()
    }
}

/// The bot reply plus its execution footer.
pub fn render_reply(outcome: &TurnOutcome) -> String {
    let mut out = outcome.turn.response.clone();
    match &outcome.execution {
        Some(ExecutionResult::Saved { filename, .. }) => {
            let _ = write!(out, "\n\n✅ **Action Completed!**\n📁 Saved as: `{filename}`");
        }
        Some(ExecutionResult::Incomplete { missing }) => {
            let _ = write!(out, "\n\n📝 **Still need:** {}", missing.join(", ").replace('_', " "));
        }
        Some(ExecutionResult::Failed { message }) => {
            let _ = write!(out, "\n\n❌ **Action Failed:** {message}");
        }
        None => {}
    }
    if outcome.turn.parse_error.is_some() {
        out.push_str("\n\n🔧 *Processing issue - please try rephrasing*");
    } else if let Some(err) = &outcome.turn.error {
        let _ = write!(out, "\n\n⚠️ *Error: {err}*");
    }
    out
}

pub fn render_actions(records: &[ActionRecord]) -> String {
    if records.is_empty() {
        return "📂 **No saved actions**\n\nCompleted meetings and emails will appear here.".to_string();
    }
    let mut out = format!("📊 **Recent Actions** ({} total)\n\n", records.len());
    for (i, r) in records.iter().take(ACTIONS_SHOWN).enumerate() {
        let when = r.saved_at.unwrap_or(r.created_at).format("%m/%d %H:%M");
        let _ = write!(out, "**{}.** {}\n    *{when}*\n\n", i + 1, r.summary());
    }
    if records.len() > ACTIONS_SHOWN {
        let _ = writeln!(out, "*+ {} more actions*", records.len() - ACTIONS_SHOWN);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::types::LlmTurn;
    use crate::outbox::{ActionPayload, EmailRecord};
    use chrono::DateTime;
    use uuid::Uuid;

    #[test]
    fn inactive_session_is_idle() {
        assert_eq!(render_status(&ConversationState::new(10)), IDLE_STATUS);
    }

    #[test]
    fn meeting_status_lists_fields_and_missing() {
        let mut s = ConversationState::new(10);
        s.intent = Some(Intent::ScheduleMeeting);
        s.session_active = true;
        s.entities.insert("title", "Sync");
        let out = render_status(&s);
        assert!(out.starts_with("📅 **Scheduling Meeting**"));
        assert!(out.contains("**Meeting:** Sync"));
        assert!(out.contains("**Need:** date, time"));

        s.awaiting_confirmation = true;
        assert!(render_status(&s).contains("Waiting for your confirmation"));
    }

    #[test]
    fn waiting_for_email_addresses_line() {
        let mut s = ConversationState::new(10);
        s.intent = Some(Intent::ScheduleMeeting);
        s.session_active = true;
        s.entities.insert("title", "Sync");
        s.awaiting_email_addresses = true;
        let out = render_status(&s);
        assert!(out.ends_with("\n📧 **Waiting for email addresses**"));
        assert!(!out.contains("**Need:**"));

        s.awaiting_confirmation = true;
        assert!(render_status(&s).ends_with("Waiting for your confirmation**"));
    }

    #[test]
    fn email_body_is_truncated() {
        let mut s = ConversationState::new(10);
        s.intent = Some(Intent::SendEmail);
        s.session_active = true;
        s.entities.insert("recipient", "a@x.com");
        s.entities.insert("body", "x".repeat(80));
        let out = render_status(&s);
        assert!(out.contains(&format!("**Message:** {}...", "x".repeat(50))));
        assert!(out.contains("Ready to execute"));
        assert!(render_status(&{
            let mut t = s.clone();
            t.entities = Default::default();
            t
        })
        .contains("**Need:** recipient, body or subject"));
    }

    #[test]
    fn reply_footer_for_each_outcome() {
        let saved = TurnOutcome {
            turn: LlmTurn::chitchat("Done."),
            execution: Some(ExecutionResult::Saved {
                filename: "send_email_x.json".into(),
                path: "outbox/send_email_x.json".into(),
                summary: String::new(),
            }),
        };
        assert!(render_reply(&saved).contains("Saved as: `send_email_x.json`"));

        let parse = TurnOutcome { turn: LlmTurn::parse_failure("??", "bad"), execution: None };
        assert!(render_reply(&parse).contains("try rephrasing"));

        let failed = TurnOutcome {
            turn: LlmTurn::provider_failure("HTTP 500"),
            execution: None,
        };
        assert!(render_reply(&failed).contains("Error: HTTP 500"));
    }

    #[test]
    fn actions_panel_caps_at_five() {
        let ts = DateTime::parse_from_rfc3339("2026-03-04T09:15:00+00:00").unwrap();
        let record = ActionRecord::new(
            ActionPayload::SendEmail(EmailRecord {
                recipients: vec!["a@x.com".into()],
                subject: Some("Hi".into()),
                body: None,
            }),
            Uuid::nil(),
            ts,
        );
        let records = vec![record; 7];
        let out = render_actions(&records);
        assert!(out.contains("(7 total)"));
        assert!(out.contains("**5.** Email to a@x.com: Hi"));
        assert!(!out.contains("**6.**"));
        assert!(out.contains("*03/04 09:15*"));
        assert!(out.contains("+ 2 more actions"));
        assert!(render_actions(&[]).contains("No saved actions"));
    }
}
