//! Turn vocabulary shared by the interpreter, the state holder and the
//! manager: intents, action kinds, entities and the parsed LLM turn.
//!
//! The LLM is not a reliable serializer, so deserialization is lenient:
//! unknown enum tags map to a catch-all, nulls and placeholder values are
//! dropped, scalars are stringified.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Intent ────────────────────────────────────────────────────────────────────

/// The user's classified goal for the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ScheduleMeeting,
    SendEmail,
    #[serde(other)]
    Chitchat,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::ScheduleMeeting => "schedule_meeting",
            Intent::SendEmail => "send_email",
            Intent::Chitchat => "chitchat",
        }
    }

    /// Intents that end in an outbox record.
    pub fn is_actionable(self) -> bool {
        !matches!(self, Intent::Chitchat)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── ActionKind ────────────────────────────────────────────────────────────────

/// How the LLM classified the turn relative to the ongoing conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    NewIntent,
    Correction,
    Confirmation,
    Cancellation,
    EmailAddressRequest,
    Chitchat,
    Error,
    #[serde(other)]
    Unknown,
}

// ── Entities ──────────────────────────────────────────────────────────────────

/// Values the model emits when it has nothing to say for a field.
const BLANK_PLACEHOLDERS: &[&str] = &["", "...", "null", "none", "n/a"];

/// Field names the model sometimes uses instead of the canonical one.
const FIELD_ALIASES: &[(&str, &str)] = &[("recipients", "recipient"), ("to", "recipient")];

/// A single extracted field: free text, or a list for multi-valued fields
/// such as recipients and participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityValue {
    Text(String),
    List(Vec<String>),
}

impl EntityValue {
    pub fn is_blank(&self) -> bool {
        match self {
            EntityValue::Text(s) => is_placeholder(s),
            EntityValue::List(items) => items.iter().all(|s| is_placeholder(s)),
        }
    }

    /// Items of a multi-valued field. Text is split on `,` and `;`.
    pub fn as_list(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            EntityValue::Text(s) => s.split([',', ';']).collect(),
            EntityValue::List(items) => items.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !is_placeholder(s))
            .map(String::from)
            .collect()
    }

    fn from_json(value: &Value) -> Option<Self> {
        let v = match value {
            Value::Null => return None,
            Value::String(s) => EntityValue::Text(s.trim().to_string()),
            Value::Bool(b) => EntityValue::Text(b.to_string()),
            Value::Number(n) => EntityValue::Text(n.to_string()),
            Value::Array(items) => EntityValue::List(
                items
                    .iter()
                    .filter_map(|i| match i {
                        Value::String(s) => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect(),
            ),
            Value::Object(_) => EntityValue::Text(value.to_string()),
        };
        (!v.is_blank()).then_some(v)
    }
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityValue::Text(s) => f.write_str(s),
            EntityValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for EntityValue {
    fn from(s: &str) -> Self {
        EntityValue::Text(s.to_string())
    }
}

impl From<String> for EntityValue {
    fn from(s: String) -> Self {
        EntityValue::Text(s)
    }
}

impl From<Vec<String>> for EntityValue {
    fn from(items: Vec<String>) -> Self {
        EntityValue::List(items)
    }
}

fn is_placeholder(s: &str) -> bool {
    let t = s.trim();
    BLANK_PLACEHOLDERS.iter().any(|p| t.eq_ignore_ascii_case(p))
}

/// Field name → extracted value, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Entities(BTreeMap<String, EntityValue>);

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&EntityValue> {
        self.0.get(field).filter(|v| !v.is_blank())
    }

    /// Non-blank text of `field`, lists joined with `", "`.
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).map(ToString::to_string)
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<EntityValue>) {
        let value = value.into();
        if !value.is_blank() {
            self.0.insert(canonical_field(&field.into()), value);
        }
    }

    /// Overwrite fields present in `other`; keep everything else.
    pub fn merge(&mut self, other: &Entities) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntityValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Normalise an arbitrary JSON value into entities. Anything that is not
    /// an object yields an empty set.
    pub fn from_json(value: &Value) -> Self {
        let mut out = Entities::new();
        if let Value::Object(map) = value {
            for (k, v) in map {
                if let Some(ev) = EntityValue::from_json(v) {
                    out.0.insert(canonical_field(k), ev);
                }
            }
        }
        out
    }
}

fn canonical_field(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(lower)
}

impl<'de> Deserialize<'de> for Entities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Entities::from_json(&value))
    }
}

impl<K, V> FromIterator<(K, V)> for Entities
where
    K: Into<String>,
    V: Into<EntityValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = Entities::new();
        for (k, v) in iter {
            out.insert(k, v);
        }
        out
    }
}

// ── LlmTurn ───────────────────────────────────────────────────────────────────

const DEFAULT_RESPONSE: &str = "I'm not sure how to help with that.";

/// The structured reading of one user turn, as returned by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmTurn {
    pub action_type: ActionKind,
    /// `None` when the model did not restate the intent (typical for
    /// confirmations).
    pub intent: Option<Intent>,
    pub entities: Entities,
    pub correction_detected: bool,
    pub missing_entities: Vec<String>,
    pub response: String,
    pub needs_confirmation: bool,
    pub ready_to_execute: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl LlmTurn {
    /// A plain conversational turn with no state effect beyond chitchat.
    pub fn chitchat(response: impl Into<String>) -> Self {
        Self {
            action_type: ActionKind::Chitchat,
            intent: Some(Intent::Chitchat),
            entities: Entities::new(),
            correction_detected: false,
            missing_entities: Vec::new(),
            response: response.into(),
            needs_confirmation: false,
            ready_to_execute: false,
            error: None,
            parse_error: None,
            raw_response: None,
        }
    }

    /// Turn used when the provider call itself failed.
    pub fn provider_failure(error: impl Into<String>) -> Self {
        Self {
            action_type: ActionKind::Error,
            error: Some(error.into()),
            ..Self::chitchat("Sorry, I had trouble processing that. Could you try again?")
        }
    }

    /// Turn used when the reply could not be read as JSON.
    pub fn parse_failure(raw: &str, error: impl Into<String>) -> Self {
        Self {
            action_type: ActionKind::Error,
            parse_error: Some(error.into()),
            raw_response: Some(raw.to_string()),
            ..Self::chitchat("I had trouble understanding that. Could you rephrase?")
        }
    }

    pub fn is_error(&self) -> bool {
        self.action_type == ActionKind::Error
    }
}

/// Wire shape of an LLM turn; every field optional.
#[derive(Deserialize)]
struct RawLlmTurn {
    #[serde(default)]
    action_type: Option<ActionKind>,
    #[serde(default)]
    intent: Option<Intent>,
    #[serde(default)]
    entities: Option<Entities>,
    #[serde(default)]
    correction_detected: Option<Value>,
    #[serde(default)]
    missing_entities: Option<Value>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    needs_confirmation: Option<Value>,
    #[serde(default)]
    ready_to_execute: Option<Value>,
}

fn lenient_bool(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}

fn string_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

impl From<RawLlmTurn> for LlmTurn {
    fn from(raw: RawLlmTurn) -> Self {
        Self {
            action_type: raw.action_type.unwrap_or(ActionKind::Chitchat),
            intent: raw.intent,
            entities: raw.entities.unwrap_or_default(),
            correction_detected: lenient_bool(raw.correction_detected.as_ref()),
            missing_entities: string_list(raw.missing_entities.as_ref()),
            response: raw
                .response
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_RESPONSE.to_string()),
            needs_confirmation: lenient_bool(raw.needs_confirmation.as_ref()),
            ready_to_execute: lenient_bool(raw.ready_to_execute.as_ref()),
            error: None,
            parse_error: None,
            raw_response: None,
        }
    }
}

impl<'de> Deserialize<'de> for LlmTurn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawLlmTurn::deserialize(deserializer).map(LlmTurn::from)
    }
}
