//! HTTP request handlers

use super::types::{
    CancelResponse, ChangeLogResponse, ChatRequest, ChatResponse, CreateSessionRequest,
    DeleteRequest, DeleteResponse, ErrorResponse, ModelInfo, ModelsResponse, RestoreRequest,
    RestoreResponse, SessionCreatedResponse, SessionListResponse, SnapshotRequest,
    SnapshotResponse, SuccessResponse, TranscriptResponse, UsageResponse, VersionListResponse,
    VersionMessagesResponse,
};
use super::AppState;
use crate::history::HistoryError;
use crate::runtime::SessionHandle;
use crate::session::SessionError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Model info
        .route("/api/models", get(list_models))
        // Session lifecycle
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/:id", delete(remove_session))
        // Read side
        .route("/api/sessions/:id/transcript", get(get_transcript))
        .route("/api/sessions/:id/versions", get(list_versions))
        .route("/api/sessions/:id/versions/:index", get(get_version_messages))
        .route("/api/sessions/:id/usage", get(get_usage))
        .route("/api/sessions/:id/changelog", get(get_change_log))
        // Mutations
        .route("/api/sessions/:id/chat", post(send_chat))
        .route("/api/sessions/:id/cancel", post(cancel_turn))
        .route("/api/sessions/:id/restore", post(restore_version))
        .route("/api/sessions/:id/snapshot", post(save_snapshot))
        .route("/api/sessions/:id/delete", post(delete_messages))
        .with_state(state)
}

async fn session_handle(state: &AppState, id: &str) -> Result<Arc<SessionHandle>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<Json<SessionCreatedResponse>, AppError> {
    let Json(req) = body.unwrap_or_default();
    let (id, model) = state
        .sessions
        .create(req.model.as_deref())
        .await
        .map_err(AppError::BadRequest)?;
    Ok(Json(SessionCreatedResponse { id, model }))
}

async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.sessions.list().await,
    })
}

async fn remove_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.sessions.remove(&id).await {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(AppError::NotFound(format!("Session not found: {id}")))
    }
}

// ============================================================
// Read side
// ============================================================

async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let handle = session_handle(&state, &id).await?;
    let session = handle.session.lock().await;
    Ok(Json(TranscriptResponse {
        messages: session.live_transcript().to_vec(),
        current_version: session.current_version(),
    }))
}

async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VersionListResponse>, AppError> {
    let handle = session_handle(&state, &id).await?;
    let session = handle.session.lock().await;
    Ok(Json(VersionListResponse {
        versions: session.list_versions(),
        current_version: session.current_version(),
    }))
}

async fn get_version_messages(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, i64)>,
) -> Result<Json<VersionMessagesResponse>, AppError> {
    let handle = session_handle(&state, &id).await?;
    let session = handle.session.lock().await;
    let index = session.resolve_version(index)?;
    let messages = session.version_messages(index)?.to_vec();
    Ok(Json(VersionMessagesResponse { index, messages }))
}

async fn get_usage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UsageResponse>, AppError> {
    let handle = session_handle(&state, &id).await?;
    let session = handle.session.lock().await;
    Ok(Json(UsageResponse {
        series: session.token_usage_series(),
        consumed: session.tokens_consumed(),
    }))
}

async fn get_change_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChangeLogResponse>, AppError> {
    let handle = session_handle(&state, &id).await?;
    let entries = handle.session.lock().await.change_log();
    Ok(Json(ChangeLogResponse { entries }))
}

// ============================================================
// Mutations
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text is empty".to_string()));
    }

    let handle = session_handle(&state, &id).await?;
    let mut session = handle.session.lock().await;
    let in_flight = handle.begin_turn();
    let result = session
        .submit_turn_cancellable(&req.text, in_flight.token())
        .await;
    drop(in_flight);

    let outcome = result?;
    Ok(Json(ChatResponse {
        assistant_text: outcome.assistant_text,
        version: outcome.version,
    }))
}

async fn cancel_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    let handle = session_handle(&state, &id).await?;
    Ok(Json(CancelResponse {
        cancelled: handle.cancel(),
    }))
}

async fn restore_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RestoreRequest>,
) -> Result<Json<RestoreResponse>, AppError> {
    let handle = session_handle(&state, &id).await?;
    let mut session = handle.session.lock().await;
    let index = session.resolve_version(req.index)?;
    let current_version = session.restore_version(index)?;
    Ok(Json(RestoreResponse { current_version }))
}

async fn save_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SnapshotRequest>,
) -> Result<Json<SnapshotResponse>, AppError> {
    let handle = session_handle(&state, &id).await?;
    let mut session = handle.session.lock().await;
    let before = session.list_versions().len();
    let version = session.save_version(&req.label);
    Ok(Json(SnapshotResponse {
        version,
        created: session.list_versions().len() > before,
    }))
}

async fn delete_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    let handle = session_handle(&state, &id).await?;
    let indexes = req
        .indexes
        .into_iter()
        .filter_map(|i| usize::try_from(i).ok());
    let result = handle.session.lock().await.delete_messages(indexes);
    match result {
        Ok(version) => Ok(Json(DeleteResponse::Deleted { version })),
        Err(HistoryError::NoOp) => Ok(Json(DeleteResponse::NoOp { noop: true })),
        Err(e) => Err(e.into()),
    }
}

// ============================================================
// Models
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let models = state
        .llm_registry
        .available_defs()
        .into_iter()
        .map(|def| ModelInfo {
            id: def.id.to_string(),
            provider: def.provider.display_name().to_string(),
            description: def.description.to_string(),
            context_window: def.context_window(),
        })
        .collect();

    Json(ModelsResponse {
        models,
        default: state.llm_registry.default_model_id().to_string(),
    })
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
}

impl From<HistoryError> for AppError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::InvalidVersion { .. } => AppError::NotFound(e.to_string()),
            HistoryError::NoOp => AppError::BadRequest(e.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::ModelFailure(_) => AppError::BadGateway(e.to_string()),
            SessionError::Cancelled => AppError::Conflict(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
