use crate::dtos::{
    AskRequest, AskResponse, CreateSessionRequest, QuotaStatus, SessionCreatedResponse,
    SessionResponse, TokenUsage, UpdateSettingsRequest,
};
use crate::models::session::{MessageRole, Session, SessionMessage};
use crate::models::tenant::{DEMO_SESSION_CAP, TenantClass};
use crate::services::aggregator::DocumentAggregator;
use crate::services::prompt;
use crate::services::providers::GenerationParams;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use metrics::counter;
use portal_core::error::AppError;
use portal_core::quota::QuotaDecision;
use validator::Validate;

/// Authenticate an access id and build the session context.
///
/// Unknown ids are rejected before any Drive call; a valid id runs the
/// aggregator exactly once and the result is cached for the session's
/// lifetime.
#[tracing::instrument(skip(state, payload))]
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let tenant = state
        .tenants
        .resolve(&payload.access_id)
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!(
                "Invalid Access ID. Please check your credentials."
            ))
        })?
        .clone();

    let aggregator = DocumentAggregator::new(state.drive.clone());
    let bundle = aggregator
        .aggregate(&tenant.folder_id)
        .await
        .map_err(|e| AppError::BadGateway(format!("failed to load research data: {}", e)))?;

    let session = Session::new(
        payload.access_id.clone(),
        tenant.class,
        bundle.context,
        bundle.file_count,
    );

    counter!("portal_sessions_created_total").increment(1);
    tracing::info!(
        session_id = %session.session_id,
        tenant_id = %session.tenant_id,
        file_count = session.file_count,
        context_chars = session.context.chars().count(),
        "session ready"
    );

    let response = SessionCreatedResponse {
        session_id: session.session_id.clone(),
        tenant_id: session.tenant_id.clone(),
        file_count: session.file_count,
        context_chars: session.context.chars().count(),
    };
    state.sessions.insert(session);

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("session not found")))?;
    Ok(Json(SessionResponse::from(session)))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    payload.validate()?;

    let session = state
        .sessions
        .with_session_mut(&session_id, |session| {
            if let Some(persona) = payload.custom_persona.clone() {
                session.custom_persona = if persona.is_empty() {
                    None
                } else {
                    Some(persona)
                };
            }
            if let Some(temperature) = payload.temperature {
                session.temperature = temperature;
            }
            session.clone()
        })
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("session not found")))?;

    Ok(Json(SessionResponse::from(session)))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .remove(&session_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("session not found")))?;
    tracing::info!(session_id = %session_id, "session ended");
    Ok(StatusCode::NO_CONTENT)
}

/// Data snapshotted under the session guard at admission time, so the
/// slow provider call runs without holding any lock.
struct AskAdmission {
    context: String,
    history: Vec<SessionMessage>,
    custom_persona: Option<String>,
    temperature: f32,
    decision: QuotaDecision,
}

/// Answer one question against the session's aggregated context.
///
/// Admission (session demo cap, then the process-wide quota) happens
/// atomically under the session guard before the model is invoked.
#[tracing::instrument(skip(state, payload))]
pub async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    payload.validate()?;
    let request_id = uuid::Uuid::new_v4().to_string();

    let admission = state
        .sessions
        .with_session_mut(&session_id, |session| -> Result<AskAdmission, AppError> {
            if session.tenant_class == TenantClass::Demo
                && session.query_count >= DEMO_SESSION_CAP
            {
                counter!("portal_quota_denials_total").increment(1);
                return Err(AppError::TooManyRequests(
                    format!(
                        "Demo limit reached ({}/{}). Please contact us for full access.",
                        DEMO_SESSION_CAP, DEMO_SESSION_CAP
                    ),
                    None,
                ));
            }

            let decision = state
                .quota
                .check_and_admit(&session.tenant_id, session.tenant_class.quota_policy());
            if !decision.admitted {
                counter!("portal_quota_denials_total").increment(1);
                return Err(AppError::QuotaExhausted {
                    count: decision.count,
                    limit: decision.limit,
                    period: decision.period.to_string(),
                    retry_after_secs: decision.retry_after_secs,
                });
            }

            session.query_count += 1;
            Ok(AskAdmission {
                context: session.context.clone(),
                history: session.messages.clone(),
                custom_persona: session.custom_persona.clone(),
                temperature: session.temperature,
                decision,
            })
        })
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("session not found")))??;

    counter!("portal_questions_total").increment(1);

    let prompt = prompt::build_prompt(
        &admission.context,
        &payload.question,
        &admission.history,
        admission.custom_persona.as_deref(),
    );
    let params = GenerationParams {
        temperature: Some(admission.temperature),
    };

    let (answer, error_kind, usage) = match state.text_provider.generate(&prompt, &params).await {
        Ok(response) => {
            let usage = TokenUsage {
                input_tokens: response.input_tokens,
                output_tokens: response.output_tokens,
                total_tokens: response.input_tokens + response.output_tokens,
            };
            match response.text {
                Some(answer) => (answer, None, usage),
                None => (
                    "[Error generating response: empty candidate]".to_string(),
                    Some("api_error".to_string()),
                    usage,
                ),
            }
        }
        Err(e) => {
            counter!("portal_generation_failures_total").increment(1);
            tracing::warn!(
                request_id = %request_id,
                error = %e,
                "model invocation failed, degrading to error answer"
            );
            (
                format!("[Error generating response: {}]", e),
                Some(e.kind().to_string()),
                TokenUsage::default(),
            )
        }
    };

    // The turn is recorded either way; a degraded answer is still a turn.
    state.sessions.with_session_mut(&session_id, |session| {
        session.add_message(MessageRole::User, payload.question.clone());
        session.add_message(MessageRole::Assistant, answer.clone());
        session.add_usage(usage.input_tokens, usage.output_tokens);
    });

    tracing::info!(
        request_id = %request_id,
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        degraded = error_kind.is_some(),
        "question answered"
    );

    Ok(Json(AskResponse {
        request_id,
        answer,
        error_kind,
        usage,
        quota: QuotaStatus::from(&admission.decision),
    }))
}
