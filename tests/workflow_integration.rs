//! Integration tests for full turns through the workflow orchestrator.
//!
//! The marketing and customer service agents run in-process on the mock
//! provider; the other specialists are mock agent clients.

use std::sync::Arc;
use std::time::Duration;

use unified_agent::adapters::agents::MockAgentClient;
use unified_agent::adapters::ai::{MockAIProvider, MockError};
use unified_agent::adapters::storage::{InMemoryMessageStore, InMemorySessionStore};
use unified_agent::application::purpose;
use unified_agent::application::workflow::APOLOGY;
use unified_agent::application::{
    ConsultationAgent, QueryRouter, RouterSettings, WorkflowOrchestrator, WorkflowSettings,
};
use unified_agent::domain::conversation::{marketing, ConversationState, DomainKind};
use unified_agent::domain::foundation::{Confidence, ConversationId, UserId};
use unified_agent::domain::routing::{AgentType, ConversationFlow};
use unified_agent::domain::workflow::{HistoryEntry, UnifiedRequest};
use unified_agent::ports::SessionStore;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct System {
    orchestrator: WorkflowOrchestrator<MockAIProvider>,
    states: Arc<InMemorySessionStore<ConversationState>>,
    service_states: Arc<InMemorySessionStore<ConversationState>>,
}

fn store<V>() -> Arc<InMemorySessionStore<V>> {
    Arc::new(InMemorySessionStore::new(1_000, Duration::from_secs(3600)))
}

fn system(provider: MockAIProvider) -> System {
    let provider = Arc::new(provider);
    let states = store::<ConversationState>();
    let service_states = store::<ConversationState>();
    let messages = Arc::new(InMemoryMessageStore::new());

    let router = QueryRouter::new(
        Arc::clone(&provider),
        store::<ConversationFlow>(),
        RouterSettings::default(),
    );
    let mut orchestrator = WorkflowOrchestrator::new(
        Arc::new(router),
        store::<Vec<HistoryEntry>>(),
        WorkflowSettings::default(),
    );

    for (domain, domain_states) in [
        (DomainKind::Marketing, states.clone()),
        (DomainKind::CustomerService, service_states.clone()),
    ] {
        orchestrator = orchestrator.with_agent(Arc::new(ConsultationAgent::new(
            domain,
            Arc::clone(&provider),
            domain_states,
            messages.clone(),
        )));
    }
    for agent in [
        AgentType::BusinessPlanning,
        AgentType::TaskAutomation,
        AgentType::MentalHealth,
    ] {
        orchestrator = orchestrator.with_agent(Arc::new(MockAgentClient::new(agent)));
    }

    System {
        orchestrator,
        states,
        service_states,
    }
}

fn request(id: ConversationId, message: &str) -> UnifiedRequest {
    UnifiedRequest::new(UserId::new("42").unwrap(), message).with_conversation(id)
}

// =============================================================================
// Consultation through the orchestrator
// =============================================================================

#[tokio::test]
async fn marketing_consultation_runs_across_turns() {
    let provider = MockAIProvider::new()
        .with_purpose_response(
            purpose::ROUTING,
            "AGENT: marketing\nCONFIDENCE: 0.95\nREASONING: 홍보 상담",
        )
        .with_purpose_response(purpose::EXTRACTION, r#"{"business_type": "카페"}"#)
        .with_purpose_response(
            purpose::CONTEXT_ROUTING,
            "REFERENCE_DETECTED: no\nNEW_TASK: no\nAGENT: marketing\nCONFIDENCE: 0.9\nREASONING: 상담 계속",
        )
        .with_purpose_response(purpose::EXTRACTION, r#"{"target_audience": "20대 여성"}"#);
    let system = system(provider);
    let id = ConversationId::new();

    let first = system
        .orchestrator
        .process_request(request(id, "저는 카페를 운영해요"))
        .await;
    assert_eq!(first.agent_type, AgentType::Marketing);
    assert_eq!(first.metadata["stage"], marketing::GOAL);
    assert!(first.alternatives.is_empty());

    let second = system
        .orchestrator
        .process_request(request(id, "20대 여성이 주 고객이에요"))
        .await;
    assert_eq!(second.agent_type, AgentType::Marketing);
    assert_eq!(second.routing_decision.reasoning, "상담 계속");

    let state = system.states.get(&id).await.expect("consultation state");
    assert_eq!(state.get_info("business_type"), Some("카페"));
    assert_eq!(state.get_info("target_audience"), Some("20대 여성"));

    let history = system.orchestrator.get_conversation_history(id).await;
    assert_eq!(history.len(), 4);

    let insights = system
        .orchestrator
        .router()
        .get_conversation_insights(id)
        .await;
    assert_eq!(insights.interaction_count, 2);
    assert_eq!(insights.agents_used, vec![AgentType::Marketing]);
}

#[tokio::test]
async fn failed_draft_is_answered_with_an_apology() {
    let provider = MockAIProvider::new()
        .with_purpose_response(
            purpose::EXTRACTION,
            r#"{"business_type": "카페", "product": "커피", "main_goal": "매출 증대", "target_audience": "20대", "channels": "인스타그램"}"#,
        )
        .with_purpose_response(
            purpose::INTENT,
            r#"{"intent": {"primary": "콘텐츠_생성", "confidence": 0.9}}"#,
        )
        .with_purpose_response(purpose::NEGATIVE, r#"{"is_negative": false}"#)
        .with_purpose_error(
            purpose::CONTENT,
            MockError::Timeout { timeout_secs: 60 },
        );
    let system = system(provider);
    let id = ConversationId::new();

    let response = system
        .orchestrator
        .process_request(
            request(id, "인스타그램 홍보 글 만들어줘").with_preferred_agent(AgentType::Marketing),
        )
        .await;

    assert_eq!(response.response, APOLOGY);
    assert_eq!(response.confidence, Confidence::ZERO);
    assert!(system.states.get(&id).await.is_none());
    assert!(system
        .orchestrator
        .get_conversation_history(id)
        .await
        .is_empty());
}

#[tokio::test]
async fn back_reference_moves_the_conversation_to_marketing() {
    let system = system(MockAIProvider::new());
    let id = ConversationId::new();

    let plan = system
        .orchestrator
        .process_request(
            request(id, "카페 창업 사업계획서 써줘").with_preferred_agent(AgentType::BusinessPlanning),
        )
        .await;
    assert_eq!(plan.agent_type, AgentType::BusinessPlanning);

    let follow_up = system
        .orchestrator
        .process_request(request(id, "그거 기반으로 마케팅 컨텐츠 만들어줘"))
        .await;

    assert_eq!(follow_up.agent_type, AgentType::Marketing);
    assert!(follow_up
        .routing_decision
        .reasoning
        .starts_with("참조 기반 새로운 작업 요청"));

    let insights = system
        .orchestrator
        .router()
        .get_conversation_insights(id)
        .await;
    assert_eq!(insights.previous_agent, Some(AgentType::BusinessPlanning));
    assert_eq!(insights.current_agent, Some(AgentType::Marketing));
}

#[tokio::test]
async fn routing_failure_still_answers() {
    let provider = MockAIProvider::new().with_purpose_error(
        purpose::ROUTING,
        MockError::Unavailable {
            message: "down".to_string(),
        },
    );
    let system = system(provider);

    let response = system
        .orchestrator
        .process_request(UnifiedRequest::new(UserId::new("42").unwrap(), "안녕하세요"))
        .await;

    assert_eq!(response.agent_type, AgentType::BusinessPlanning);
    assert_eq!(response.routing_decision.confidence, Confidence::FALLBACK);
    assert!(!response.response.is_empty());
    // Uncertain routing pulls in alternatives from other enabled agents.
    assert_eq!(response.alternatives.len(), 2);
}

#[tokio::test]
async fn each_domain_keeps_its_own_consultation() {
    let provider =
        MockAIProvider::new().with_purpose_response(purpose::EXTRACTION, r#"{"business_type": "카페"}"#);
    let system = system(provider);
    let id = ConversationId::new();

    let marketing_turn = system
        .orchestrator
        .process_request(request(id, "저는 카페를 운영해요").with_preferred_agent(AgentType::Marketing))
        .await;
    assert_eq!(marketing_turn.metadata["stage"], marketing::GOAL);

    let service_turn = system
        .orchestrator
        .process_request(
            request(id, "고객 리뷰 불만이 많아요").with_preferred_agent(AgentType::CustomerService),
        )
        .await;
    assert_eq!(service_turn.agent_type, AgentType::CustomerService);
    assert_ne!(service_turn.metadata["stage"], marketing::GOAL);

    let marketing_state = system.states.get(&id).await.expect("marketing state");
    let service_state = system.service_states.get(&id).await.expect("service state");
    assert_eq!(marketing_state.domain(), DomainKind::Marketing);
    assert!(marketing_state.stage().is(marketing::GOAL));
    assert_eq!(service_state.domain(), DomainKind::CustomerService);
}
