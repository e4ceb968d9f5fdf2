//! HTTP integration tests for the unified agent API.
//!
//! Each test drives the axum router with `oneshot` requests against an
//! orchestrator wired to mock agents and the mock language model.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use unified_agent::adapters::agents::MockAgentClient;
use unified_agent::adapters::ai::MockAIProvider;
use unified_agent::adapters::http::{api_router, AppState};
use unified_agent::adapters::storage::InMemorySessionStore;
use unified_agent::application::{QueryRouter, RouterSettings, WorkflowOrchestrator, WorkflowSettings};
use unified_agent::domain::foundation::ConversationId;
use unified_agent::domain::routing::{AgentType, ConversationFlow};
use unified_agent::domain::workflow::HistoryEntry;
use unified_agent::ports::AIProvider;

// =============================================================================
// Test Infrastructure
// =============================================================================

fn app() -> Router {
    let provider: Arc<dyn AIProvider> = Arc::new(MockAIProvider::new());
    let router = QueryRouter::new(
        provider,
        Arc::new(InMemorySessionStore::<ConversationFlow>::new(
            100,
            Duration::from_secs(3600),
        )),
        RouterSettings::default(),
    );
    let mut orchestrator = WorkflowOrchestrator::new(
        Arc::new(router),
        Arc::new(InMemorySessionStore::<Vec<HistoryEntry>>::new(
            100,
            Duration::from_secs(3600),
        )),
        WorkflowSettings::default(),
    );
    for agent in AgentType::routable() {
        orchestrator = orchestrator.with_agent(Arc::new(MockAgentClient::new(agent)));
    }
    api_router(AppState::new(Arc::new(orchestrator)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn query(conversation_id: ConversationId, message: &str, agent: &str) -> Value {
    json!({
        "user_id": 7,
        "conversation_id": conversation_id.to_string(),
        "message": message,
        "preferred_agent": agent,
    })
}

// =============================================================================
// Query
// =============================================================================

#[tokio::test]
async fn query_is_answered_by_the_preferred_agent() {
    let app = app();
    let id = ConversationId::new();

    let (status, body) = send(
        &app,
        Method::POST,
        "/query",
        Some(query(id, "매일 보고서 메일 보내기 자동화해줘", "task_automation")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent_type"], "task_automation");
    assert_eq!(body["conversation_id"], id.to_string());
    assert_eq!(
        body["response"],
        MockAgentClient::default_answer(AgentType::TaskAutomation)
    );
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/query",
        Some(json!({ "user_id": "u-1", "message": "   " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

// =============================================================================
// Conversation management
// =============================================================================

#[tokio::test]
async fn history_is_recorded_and_cleared() {
    let app = app();
    let id = ConversationId::new();
    send(
        &app,
        Method::POST,
        "/query",
        Some(query(id, "사업계획서 써줘", "business_planning")),
    )
    .await;

    let uri = format!("/conversations/{}/history", id);
    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["entries"][0]["role"], "user");
    assert_eq!(body["entries"][1]["role"], "assistant");

    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);

    let (_, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn insights_follow_the_routed_agent_until_reset() {
    let app = app();
    let id = ConversationId::new();
    send(
        &app,
        Method::POST,
        "/query",
        Some(query(id, "요즘 스트레스가 심해요", "mental_health")),
    )
    .await;

    let insights_uri = format!("/conversations/{}/insights", id);
    let (status, body) = send(&app, Method::GET, &insights_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_agent"], "mental_health");
    assert_eq!(body["interaction_count"], 1);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/conversations/{}/reset", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);

    let (_, body) = send(&app, Method::GET, &insights_uri, None).await;
    assert_eq!(body["interaction_count"], 0);
    assert!(body["current_agent"].is_null());
}

// =============================================================================
// Status and health
// =============================================================================

#[tokio::test]
async fn context_mode_toggle_is_reflected_in_status() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::PUT,
        "/routing/context-mode",
        Some(json!({ "enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["context_routing_enabled"], false);

    let (status, body) = send(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["context_routing_enabled"], false);
    assert_eq!(body["agents"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn health_reports_every_enabled_agent() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["agents"]["marketing"], true);
    assert_eq!(body["system_info"]["registered_agents"], 5);
}
