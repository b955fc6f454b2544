//! HTTP Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use agent_core::{provider::ModelInfo, AgentError, SessionId, SessionStore};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model_connected: bool,
    pub tools_ready: bool,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub response: String,
    pub thread_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

impl ErrorResponse {
    fn from_agent(err: &AgentError) -> ApiError {
        let (status, code) = match err {
            AgentError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            AgentError::Provider(_)
            | AgentError::ProviderUnavailable(_)
            | AgentError::InvalidModelResponse(_)
            | AgentError::Auth(_)
            | AgentError::Timeout(_) => (StatusCode::BAD_GATEWAY, "MODEL_ERROR"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR"),
        };
        (
            status,
            Json(ErrorResponse {
                error: err.user_message(),
                code: code.into(),
            }),
        )
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model_connected,
        tools_ready: state.agent.toolbox().is_ready(),
    })
}

/// Models the backend can serve
pub async fn list_models(State(state): State<AppState>) -> Result<Json<Vec<ModelInfo>>, ApiError> {
    state.provider.list_models().await.map(Json).map_err(|e| {
        tracing::error!("Model listing failed: {}", e);
        ErrorResponse::from_agent(&e)
    })
}

/// Run the agent loop for one prompt, continuing `thread_id` when given
pub async fn query_handler(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if payload.prompt.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "prompt must not be empty".into(),
                code: "EMPTY_PROMPT".into(),
            }),
        ));
    }

    let thread_id = payload
        .thread_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| SessionId::new().to_string());

    let _guard = state.lock_thread(&thread_id).await;

    let response = state
        .agent
        .ask_in_session(state.sessions.as_ref(), &SessionId::from_string(thread_id.as_str()), &payload.prompt)
        .await
        .map_err(|e| {
            tracing::error!(thread_id = %thread_id, "Agent error: {}", e);
            ErrorResponse::from_agent(&e)
        })?;

    Ok(Json(QueryResponse { response, thread_id }))
}

/// Forget a conversation thread
pub async fn delete_thread(State(state): State<AppState>, Path(thread_id): Path<String>) -> Result<StatusCode, ApiError> {
    let _guard = state.lock_thread(&thread_id).await;
    let id = SessionId::from_string(thread_id.as_str());

    let existed = state
        .sessions
        .load(&id)
        .and_then(|session| {
            state.sessions.delete(&id)?;
            Ok(session.is_some())
        })
        .map_err(|e| ErrorResponse::from_agent(&e))?;

    if existed {
        tracing::info!(thread_id = %thread_id, "Thread deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no thread '{}'", thread_id),
                code: "THREAD_NOT_FOUND".into(),
            }),
        ))
    }
}
