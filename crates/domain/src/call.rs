use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A configured voice agent. Read-only for the lifetime of a call.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Agent {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    /// The E.164 number this agent answers on `/voice/incoming`.
    pub phone_number: String,
    pub system_prompt: String,
    /// Voice-id passed to the TTS client. A `el_` prefix selects the
    /// alternate TTS provider; see [`crate::capability`] for the provider
    /// routing this feeds.
    pub voice_id: String,
    /// Names drawn from the tool registry; empty means no tools enabled.
    pub tool_names: Vec<String>,
    pub kb_id: Option<Uuid>,
    pub is_active: bool,
    /// When true, calls against this agent skip the billing ledger entirely
    /// (explicit unbilled test mode; see DESIGN.md).
    pub billing_disabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ConversationStatus {
    Active,
    Completed,
    Failed,
    Abandoned,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub org_id: Uuid,
    pub provider_call_id: String,
    pub status: ConversationStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub cost_accrued: Decimal,
    pub sentiment_score: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub latency_ms: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// The coarse phase within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Listening,
    Thinking,
    Speaking,
    ToolExecution,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Listening => "listening",
            Stage::Thinking => "thinking",
            Stage::Speaking => "speaking",
            Stage::ToolExecution => "tool_execution",
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "listening" => Ok(Stage::Listening),
            "thinking" => Ok(Stage::Thinking),
            "speaking" => Ok(Stage::Speaking),
            "tool_execution" => Ok(Stage::ToolExecution),
            _ => Err(()),
        }
    }
}

/// Persisted double-booking guard for `book_appointment`. The composite key
/// `(date, time)` is unique; a conflicting insert is how the tool detects an
/// already-booked slot.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CallReservation {
    pub id: Uuid,
    pub customer_name: String,
    pub date: String,
    pub time: String,
    pub service_type: Option<String>,
    pub confirmation_number: String,
    pub created_at: DateTime<Utc>,
}
