//! Session model: one authenticated conversation over a tenant's
//! aggregated research context.

use crate::models::tenant::TenantClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default sampling temperature when the session has not overridden it.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// A conversation session. The aggregated context is built exactly once
/// when the session is created and never refreshed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub session_id: String,

    /// Tenant this session is bound to.
    pub tenant_id: String,

    /// Quota class resolved at authentication time.
    pub tenant_class: TenantClass,

    /// Concatenated text of every eligible document in the tenant's folder.
    pub context: String,

    /// Number of eligible files that went into the context.
    pub file_count: usize,

    /// Conversation turns, append-only for the session's lifetime.
    pub messages: Vec<SessionMessage>,

    /// Tenant-supplied addition to the analyst persona.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_persona: Option<String>,

    /// Sampling temperature passed through to the model.
    pub temperature: f32,

    /// Questions admitted on this session (demo sessions are capped on it).
    pub query_count: u32,

    /// Total input tokens consumed.
    pub total_input_tokens: i32,

    /// Total output tokens generated.
    pub total_output_tokens: i32,

    /// When the session was created.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// When the session was last updated.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single turn in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Session {
    pub fn new(tenant_id: String, tenant_class: TenantClass, context: String, file_count: usize) -> Self {
        let now = Utc::now();
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            tenant_id,
            tenant_class,
            context,
            file_count,
            messages: Vec::new(),
            custom_persona: None,
            temperature: DEFAULT_TEMPERATURE,
            query_count: 0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn to the conversation.
    pub fn add_message(&mut self, role: MessageRole, content: String) {
        self.messages.push(SessionMessage {
            role,
            content,
            timestamp: Utc::now(),
        });
        self.updated_at = Utc::now();
    }

    /// Update token usage.
    pub fn add_usage(&mut self, input_tokens: i32, output_tokens: i32) {
        self.total_input_tokens += input_tokens;
        self.total_output_tokens += output_tokens;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_empty() {
        let session = Session::new("acme".into(), TenantClass::Standard, "ctx".into(), 3);
        assert!(session.messages.is_empty());
        assert_eq!(session.query_count, 0);
        assert_eq!(session.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(session.file_count, 3);
    }

    #[test]
    fn add_message_appends_in_order() {
        let mut session = Session::new("acme".into(), TenantClass::Standard, String::new(), 0);
        session.add_message(MessageRole::User, "how many?".into());
        session.add_message(MessageRole::Assistant, "seven".into());
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, MessageRole::User);
        assert_eq!(session.messages[1].role, MessageRole::Assistant);
    }

    #[test]
    fn add_usage_accumulates() {
        let mut session = Session::new("acme".into(), TenantClass::Standard, String::new(), 0);
        session.add_usage(100, 10);
        session.add_usage(50, 5);
        assert_eq!(session.total_input_tokens, 150);
        assert_eq!(session.total_output_tokens, 15);
    }
}
