//! HTTP handlers for the query and conversation management endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::application::WorkflowOrchestrator;
use crate::domain::foundation::ConversationId;
use crate::domain::workflow::UnifiedRequest;
use crate::ports::AIProvider;

use super::dto::{
    ContextModeRequest, ContextModeResponse, ConversationCommandResponse, ErrorResponse,
    HistoryResponse,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<WorkflowOrchestrator<dyn AIProvider>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<WorkflowOrchestrator<dyn AIProvider>>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &WorkflowOrchestrator<dyn AIProvider> {
        &self.orchestrator
    }
}

fn parse_conversation_id(raw: &str) -> Result<ConversationId, Response> {
    raw.parse::<ConversationId>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(format!(
                "Invalid conversation ID: {}",
                raw
            ))),
        )
            .into_response()
    })
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /query - Route and answer one user turn
pub async fn process_query(
    State(state): State<AppState>,
    Json(request): Json<UnifiedRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::validation(
                "Request validation failed",
                json!({ "reason": e.to_string() }),
            )),
        )
            .into_response();
    }

    let response = state.orchestrator.process_request(request).await;
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /conversations/:id/history
pub async fn get_history(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let conversation_id = match parse_conversation_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let entries = state
        .orchestrator
        .get_conversation_history(conversation_id)
        .await;
    (
        StatusCode::OK,
        Json(HistoryResponse::new(conversation_id, entries)),
    )
        .into_response()
}

/// DELETE /conversations/:id/history
pub async fn clear_history(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let conversation_id = match parse_conversation_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let changed = state
        .orchestrator
        .clear_conversation_history(conversation_id)
        .await;
    let response = ConversationCommandResponse {
        conversation_id,
        changed,
        message: "Conversation history cleared".to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /conversations/:id/insights
pub async fn get_insights(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let conversation_id = match parse_conversation_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let insights = state
        .orchestrator
        .router()
        .get_conversation_insights(conversation_id)
        .await;
    (StatusCode::OK, Json(insights)).into_response()
}

/// POST /conversations/:id/reset - Forget routing context only
pub async fn reset_context(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let conversation_id = match parse_conversation_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let changed = state.orchestrator.router().reset_context(conversation_id).await;
    let response = ConversationCommandResponse {
        conversation_id,
        changed,
        message: "Routing context reset".to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Response {
    let status = state.orchestrator.get_workflow_status().await;
    (StatusCode::OK, Json(status)).into_response()
}

/// GET /health - Always 200; the body says whether agents are degraded
pub async fn health(State(state): State<AppState>) -> Response {
    let report = state.orchestrator.health_check().await;
    (StatusCode::OK, Json(report)).into_response()
}

/// PUT /routing/context-mode
pub async fn set_context_mode(
    State(state): State<AppState>,
    Json(request): Json<ContextModeRequest>,
) -> Response {
    state.orchestrator.enable_context_routing(request.enabled);
    let response = ContextModeResponse {
        context_routing_enabled: state.orchestrator.router().context_routing_enabled(),
    };
    (StatusCode::OK, Json(response)).into_response()
}
