//! On-disk shape of a completed action.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::Intent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub title: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Action body, tagged by `type` in the JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionPayload {
    ScheduleMeeting(MeetingRecord),
    SendEmail(EmailRecord),
}

impl ActionPayload {
    pub fn kind(&self) -> Intent {
        match self {
            ActionPayload::ScheduleMeeting(_) => Intent::ScheduleMeeting,
            ActionPayload::SendEmail(_) => Intent::SendEmail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Queued,
}

/// One completed action. `saved_at` and `filename` are stamped by
/// [`Outbox::save`](super::Outbox::save).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(flatten)]
    pub payload: ActionPayload,
    pub status: ActionStatus,
    pub conversation_id: Uuid,
    pub created_at: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ActionRecord {
    pub fn new(payload: ActionPayload, conversation_id: Uuid, created_at: DateTime<FixedOffset>) -> Self {
        Self {
            payload,
            status: ActionStatus::Queued,
            conversation_id,
            created_at,
            saved_at: None,
            filename: None,
        }
    }

    pub fn kind(&self) -> Intent {
        self.payload.kind()
    }

    /// One-line human summary, e.g. `Team sync on tomorrow at 3pm with Sara`.
    pub fn summary(&self) -> String {
        match &self.payload {
            ActionPayload::ScheduleMeeting(m) => {
                let mut s = format!("{} on {} at {}", m.title, m.date, m.time);
                if !m.participants.is_empty() {
                    s.push_str(" with ");
                    s.push_str(&m.participants.join(", "));
                }
                s
            }
            ActionPayload::SendEmail(e) => {
                let to = if e.recipients.is_empty() {
                    "Unknown".to_string()
                } else {
                    e.recipients.join(", ")
                };
                let subject = e.subject.as_deref().unwrap_or("No subject");
                format!("Email to {to}: {subject}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-03-04T09:15:30.250+01:00").unwrap()
    }

    #[test]
    fn meeting_json_is_flat_and_tagged() {
        let r = ActionRecord::new(
            ActionPayload::ScheduleMeeting(MeetingRecord {
                title: "Team sync".into(),
                date: "tomorrow".into(),
                time: "3pm".into(),
                participants: vec!["Sara".into()],
            }),
            Uuid::nil(),
            ts(),
        );
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["type"], "schedule_meeting");
        assert_eq!(v["title"], "Team sync");
        assert_eq!(v["status"], "queued");
        assert!(v.get("saved_at").is_none());

        let back: ActionRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn email_summary_defaults_subject() {
        let r = ActionRecord::new(
            ActionPayload::SendEmail(EmailRecord {
                recipients: vec!["john@company.com".into()],
                subject: None,
                body: Some("about the delay".into()),
            }),
            Uuid::nil(),
            ts(),
        );
        assert_eq!(r.summary(), "Email to john@company.com: No subject");
        assert_eq!(r.kind(), Intent::SendEmail);
    }

    #[test]
    fn meeting_summary_lists_participants() {
        let r = ActionRecord::new(
            ActionPayload::ScheduleMeeting(MeetingRecord {
                title: "Review".into(),
                date: "Friday".into(),
                time: "10am".into(),
                participants: vec!["Ana".into(), "Bo".into()],
            }),
            Uuid::nil(),
            ts(),
        );
        assert_eq!(r.summary(), "Review on Friday at 10am with Ana, Bo");
    }
}
