//! REST API Server for the bounded chat pipeline
//!
//! Exposes sessions, chunked chat and resume evaluation over HTTP

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::ats::AtsEvaluator;
use crate::conversational::{ChunkFailureReport, ConversationPipeline};
use crate::memory::ConversationTurn;
use crate::session::SessionStore;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AtsRequest {
    pub resume_text: String,
    pub job_description: String,
}

/// =============================
/// Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub answer: String,
    pub chunk_count: usize,
    pub partial: bool,
    pub failed_chunks: Vec<ChunkFailureReport>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: Uuid,
    pub turns: Vec<ConversationTurn>,
    pub summary: String,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<ConversationPipeline>,
    pub sessions: SessionStore,
    pub evaluator: Option<Arc<AtsEvaluator>>,
}

/// =============================
/// Helpers
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Accept real UUIDs as-is; map any other client id onto a stable UUID
fn parse_or_stable_uuid(value: &str) -> Uuid {
    Uuid::parse_str(value.trim()).unwrap_or_else(|_| stable_uuid_from_string(value.trim()))
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "sessions": state.sessions.len().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Session Endpoints
/// =============================

async fn create_session(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    let session_id = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(ApiResponse::success(serde_json::json!({ "session_id": session_id }))),
    )
}

async fn session_history(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let session_id = parse_or_stable_uuid(&session_id);

    let Some(handle) = state.sessions.get(session_id).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Session not found: {}", session_id))),
        );
    };

    let history = handle.lock().await;
    let response = HistoryResponse {
        session_id,
        turns: history.turns(),
        summary: history.summarize().into_string(),
    };

    (StatusCode::OK, Json(ApiResponse::success(response)))
}

async fn discard_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let session_id = parse_or_stable_uuid(&session_id);

    if state.sessions.discard(session_id).await {
        (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({ "session_id": session_id }))),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Session not found: {}", session_id))),
        )
    }
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Query must not be empty".into())),
        );
    }

    let session_id = match req.session_id.as_deref().filter(|v| !v.trim().is_empty()) {
        Some(value) => parse_or_stable_uuid(value),
        None => Uuid::new_v4(),
    };

    info!("chat_handler session_id={} query_len={}", session_id, req.query.len());

    let handle = state.sessions.get_or_create(session_id).await;
    let mut history = handle.lock().await;
    let outcome = state.pipeline.process_query(&req.query, &mut history).await;

    let response = ChatResponse {
        session_id,
        answer: outcome.answer.clone(),
        chunk_count: outcome.chunk_count,
        partial: outcome.is_partial(),
        failed_chunks: outcome.failure_reports(),
    };

    if outcome.chunk_count > 0 && outcome.answered_count() == 0 {
        let mut body = ApiResponse::error(format!(
            "All {} chunk(s) failed to produce an answer",
            outcome.chunk_count
        ));
        body.data = serde_json::to_value(&response).ok();
        return (StatusCode::BAD_GATEWAY, Json(body));
    }

    (StatusCode::OK, Json(ApiResponse::success(response)))
}

/// =============================
/// ATS Endpoint
/// =============================

async fn evaluate_resume(
    State(state): State<ApiState>,
    Json(req): Json<AtsRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let Some(evaluator) = state.evaluator.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error("Resume evaluation is not configured".into())),
        );
    };

    match evaluator.evaluate(&req.resume_text, &req.job_description).await {
        Ok(evaluation) => {
            let recommendation = evaluation.recommendation();
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "evaluation": evaluation,
                    "match_percentage": evaluation.match_percentage(),
                    "has_missing_keywords": evaluation.has_missing_keywords(),
                    "recommendation": recommendation,
                    "recommendation_message": recommendation.map(|r| r.message()),
                }))),
            )
        }
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::error(format!("Resume evaluation failed: {}", e))),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/:session_id",
            axum::routing::delete(discard_session),
        )
        .route("/api/sessions/:session_id/history", get(session_history))
        .route("/api/chat", post(chat_handler))
        .route("/api/ats/evaluate", post(evaluate_resume))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
