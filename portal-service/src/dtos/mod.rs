use crate::models::session::{MessageRole, Session, SessionMessage};
use portal_core::quota::QuotaDecision;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 128))]
    pub access_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: String,
    pub tenant_id: String,
    pub file_count: usize,
    pub context_chars: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub tenant_id: String,
    pub tenant_class: crate::models::tenant::TenantClass,
    pub file_count: usize,
    pub context_chars: usize,
    pub query_count: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_persona: Option<String>,
    pub messages: Vec<MessageResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.session_id,
            tenant_id: session.tenant_id,
            tenant_class: session.tenant_class,
            file_count: session.file_count,
            context_chars: session.context.chars().count(),
            query_count: session.query_count,
            temperature: session.temperature,
            custom_persona: session.custom_persona,
            messages: session.messages.into_iter().map(Into::into).collect(),
            created_at: session.created_at.to_rfc3339(),
            updated_at: session.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: String,
}

impl From<SessionMessage> for MessageResponse {
    fn from(message: SessionMessage) -> Self {
        Self {
            role: message.role,
            content: message.content,
            timestamp: message.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    /// Extra instruction block appended to the analyst persona.
    #[validate(length(max = 4000))]
    pub custom_persona: Option<String>,

    /// 0.0 = precise, 1.0 = creative.
    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 8192))]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub request_id: String,
    pub answer: String,
    /// Present when the model collaborator failed and `answer` carries the
    /// degraded error text instead of a real answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub usage: TokenUsage,
    pub quota: QuotaStatus,
}

#[derive(Debug, Serialize, Default)]
pub struct TokenUsage {
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub total_tokens: i32,
}

#[derive(Debug, Serialize)]
pub struct QuotaStatus {
    pub count: u32,
    pub limit: u32,
    pub period: String,
}

impl From<&QuotaDecision> for QuotaStatus {
    fn from(decision: &QuotaDecision) -> Self {
        Self {
            count: decision.count,
            limit: decision.limit,
            period: decision.period.to_string(),
        }
    }
}
