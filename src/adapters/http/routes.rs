//! HTTP routes for the unified agent API.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    clear_history, get_history, get_insights, get_status, health, process_query, reset_context,
    set_context_mode, AppState,
};

/// Creates the API router with all endpoints.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/query", post(process_query))
        .route(
            "/conversations/:id/history",
            get(get_history).delete(clear_history),
        )
        .route("/conversations/:id/insights", get(get_insights))
        .route("/conversations/:id/reset", post(reset_context))
        .route("/status", get(get_status))
        .route("/health", get(health))
        .route("/routing/context-mode", put(set_context_mode))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::agents::MockAgentClient;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::storage::InMemorySessionStore;
    use crate::application::{QueryRouter, RouterSettings, WorkflowOrchestrator, WorkflowSettings};
    use crate::domain::routing::AgentType;
    use crate::ports::AIProvider;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> Router {
        let provider: Arc<dyn AIProvider> = Arc::new(MockAIProvider::new());
        let router = QueryRouter::new(
            provider,
            Arc::new(InMemorySessionStore::new(100, Duration::from_secs(3600))),
            RouterSettings::default(),
        );
        let orchestrator = WorkflowOrchestrator::new(
            Arc::new(router),
            Arc::new(InMemorySessionStore::new(100, Duration::from_secs(3600))),
            WorkflowSettings::default(),
        )
        .with_agent(Arc::new(MockAgentClient::new(AgentType::BusinessPlanning)));
        api_router(AppState::new(Arc::new(orchestrator)))
    }

    #[tokio::test]
    async fn health_is_served() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_conversation_id_is_rejected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/conversations/not-a-uuid/history")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
