//! Workflow orchestrator.
//!
//! Runs one turn end to end: route, call the primary agent, optionally
//! collect alternative answers when routing is unsure, record history and
//! the router flow, and assemble the `UnifiedResponse`. Every failure ends
//! in the fixed apology envelope so the caller always gets an answer.

use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::application::routing::QueryRouter;
use crate::domain::foundation::{Confidence, ConversationId, ValidationError};
use crate::domain::routing::{AgentType, RoutingDecision};
use crate::domain::workflow::{
    append_bounded, AgentRequest, AgentResponse, HealthReport, HistoryEntry, UnifiedRequest,
    UnifiedResponse,
};
use crate::ports::{AIProvider, AgentClient, AgentError, SessionStore};

/// Reply returned whenever a turn cannot be completed.
pub const APOLOGY: &str = "죄송합니다. 일시적인 오류가 발생했습니다. 잠시 후 다시 시도해주세요.";

/// Error code placed in the metadata when details are hidden.
const GENERIC_ERROR_CODE: &str = "processing_failed";

/// Why a turn fell through to the apology.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Below this routing confidence, alternatives are collected.
    pub routing_confidence_threshold: f32,
    pub enable_multi_agent: bool,
    pub max_alternative_responses: usize,
    pub default_agent: AgentType,
    /// Entries (user and assistant) kept per conversation.
    pub history_limit: usize,
    /// Put the failure detail into the apology's metadata.
    pub verbose_errors: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            routing_confidence_threshold: 0.8,
            enable_multi_agent: true,
            max_alternative_responses: 2,
            default_agent: AgentType::BusinessPlanning,
            history_limit: 20,
            verbose_errors: false,
        }
    }
}

struct RegisteredAgent {
    client: Arc<dyn AgentClient>,
    enabled: bool,
    confidence_threshold: f32,
}

/// One agent as reported by `get_workflow_status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStatus {
    pub agent_type: AgentType,
    pub name: &'static str,
    pub enabled: bool,
    pub confidence_threshold: f32,
}

/// Orchestrator configuration and load snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowStatus {
    pub agents: Vec<AgentStatus>,
    pub context_routing_enabled: bool,
    pub multi_agent_enabled: bool,
    pub routing_confidence_threshold: f32,
    pub active_conversations: usize,
}

/// Sequences a routed turn across the registered agents.
pub struct WorkflowOrchestrator<P: ?Sized + AIProvider> {
    router: Arc<QueryRouter<P>>,
    agents: BTreeMap<AgentType, RegisteredAgent>,
    history: Arc<dyn SessionStore<Vec<HistoryEntry>>>,
    settings: WorkflowSettings,
}

impl<P: ?Sized + AIProvider> WorkflowOrchestrator<P> {
    pub fn new(
        router: Arc<QueryRouter<P>>,
        history: Arc<dyn SessionStore<Vec<HistoryEntry>>>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            router,
            agents: BTreeMap::new(),
            history,
            settings,
        }
    }

    /// Registers an enabled agent with the default 0.7 threshold.
    pub fn with_agent(self, client: Arc<dyn AgentClient>) -> Self {
        self.with_agent_settings(client, true, 0.7)
    }

    /// Registers an agent, replacing any earlier client for the same type.
    pub fn with_agent_settings(
        mut self,
        client: Arc<dyn AgentClient>,
        enabled: bool,
        confidence_threshold: f32,
    ) -> Self {
        self.agents.insert(
            client.agent_type(),
            RegisteredAgent {
                client,
                enabled,
                confidence_threshold,
            },
        );
        self
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn router(&self) -> &Arc<QueryRouter<P>> {
        &self.router
    }

    /// Handles one user turn. Never fails.
    pub async fn process_request(&self, request: UnifiedRequest) -> UnifiedResponse {
        let started = Instant::now();
        let conversation_id = request.conversation_id.unwrap_or_default();

        let mut response = match self.run(&request, conversation_id).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    conversation_id = %conversation_id,
                    user_id = %request.user_id,
                    error = %e,
                    "turn failed; returning apology"
                );
                self.error_response(conversation_id, &e)
            }
        };
        response.processing_time = started.elapsed().as_secs_f64();
        response
    }

    async fn run(
        &self,
        request: &UnifiedRequest,
        conversation_id: ConversationId,
    ) -> Result<UnifiedResponse, WorkflowError> {
        request.validate()?;

        let decision = self.router.route(request, conversation_id).await;
        let agent_request = AgentRequest::new(
            request.user_id.clone(),
            conversation_id,
            request.message.clone(),
        )
        .with_persona(request.persona());

        let primary = self.call_agent(decision.agent_type, agent_request.clone()).await?;

        let alternatives = if self.settings.enable_multi_agent
            && decision.is_uncertain(self.settings.routing_confidence_threshold)
        {
            self.collect_alternatives(decision.agent_type, &agent_request).await
        } else {
            Vec::new()
        };

        self.record_history(conversation_id, &request.message, &primary).await;
        self.router
            .update_flow(conversation_id, &request.message, &decision, &primary.response)
            .await;

        tracing::info!(
            conversation_id = %conversation_id,
            agent = %primary.agent_type,
            alternatives = alternatives.len(),
            "turn completed"
        );
        Ok(UnifiedResponse::from_primary(
            conversation_id,
            decision,
            primary,
            alternatives,
        ))
    }

    async fn call_agent(&self, agent: AgentType, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        let registered = self.agents.get(&agent).ok_or(AgentError::Unavailable(agent))?;
        if !registered.enabled {
            return Err(AgentError::Disabled(agent));
        }
        registered.client.process(request).await
    }

    /// Asks other enabled agents concurrently; failures are dropped.
    async fn collect_alternatives(&self, primary: AgentType, request: &AgentRequest) -> Vec<AgentResponse> {
        let calls = self
            .agents
            .iter()
            .filter(|(agent, registered)| **agent != primary && registered.enabled)
            .take(self.settings.max_alternative_responses)
            .map(|(_, registered)| {
                let client = Arc::clone(&registered.client);
                let request = request.clone();
                async move { client.process(request).await }
            });

        join_all(calls)
            .await
            .into_iter()
            .filter_map(|result| match result {
                Ok(response) => Some(response),
                Err(e) => {
                    tracing::warn!(agent = %e.agent(), error = %e, "alternative agent failed");
                    None
                }
            })
            .collect()
    }

    async fn record_history(&self, conversation_id: ConversationId, message: &str, primary: &AgentResponse) {
        let mut history = self.history.get(&conversation_id).await.unwrap_or_default();
        append_bounded(
            &mut history,
            [
                HistoryEntry::user(message),
                HistoryEntry::assistant(primary.agent_type, primary.response.clone()),
            ],
            self.settings.history_limit,
        );
        self.history.put(conversation_id, history).await;
    }

    fn error_response(&self, conversation_id: ConversationId, error: &WorkflowError) -> UnifiedResponse {
        let detail = if self.settings.verbose_errors {
            error.to_string()
        } else {
            GENERIC_ERROR_CODE.to_string()
        };
        let agent = self.settings.default_agent;
        let decision = RoutingDecision::new(agent, Confidence::ZERO, "오류 처리");
        let apology = AgentResponse::new(agent, APOLOGY)
            .with_confidence(Confidence::ZERO)
            .with_metadata("error", Value::String(detail));
        UnifiedResponse::from_primary(conversation_id, decision, apology, Vec::new())
    }

    /// Chronological history kept for the conversation.
    pub async fn get_conversation_history(&self, conversation_id: ConversationId) -> Vec<HistoryEntry> {
        self.history.get(&conversation_id).await.unwrap_or_default()
    }

    /// Drops the history and the routing flow. Returns true if either existed.
    pub async fn clear_conversation_history(&self, conversation_id: ConversationId) -> bool {
        let had_history = self.history.remove(&conversation_id).await.is_some();
        let had_flow = self.router.reset_context(conversation_id).await;
        tracing::info!(conversation_id = %conversation_id, had_history, had_flow, "conversation history cleared");
        had_history || had_flow
    }

    pub async fn get_workflow_status(&self) -> WorkflowStatus {
        WorkflowStatus {
            agents: self
                .agents
                .iter()
                .map(|(agent, registered)| AgentStatus {
                    agent_type: *agent,
                    name: agent.display_name(),
                    enabled: registered.enabled,
                    confidence_threshold: registered.confidence_threshold,
                })
                .collect(),
            context_routing_enabled: self.router.context_routing_enabled(),
            multi_agent_enabled: self.settings.enable_multi_agent,
            routing_confidence_threshold: self.settings.routing_confidence_threshold,
            active_conversations: self.history.len().await,
        }
    }

    pub fn enable_context_routing(&self, enabled: bool) {
        self.router.set_context_routing(enabled);
    }

    /// Probes every enabled agent concurrently.
    pub async fn health_check(&self) -> HealthReport {
        let enabled: Vec<_> = self
            .agents
            .iter()
            .filter(|(_, registered)| registered.enabled)
            .collect();
        let probes = enabled.iter().map(|(_, registered)| registered.client.health_check());
        let results = join_all(probes).await;

        let agents: BTreeMap<AgentType, bool> = enabled
            .iter()
            .map(|(agent, _)| **agent)
            .zip(results)
            .collect();
        for (agent, up) in &agents {
            if !up {
                tracing::warn!(agent = %agent, "agent health check failed");
            }
        }

        let mut system_info = Map::new();
        system_info.insert("registered_agents".into(), json!(self.agents.len()));
        system_info.insert(
            "context_routing_enabled".into(),
            json!(self.router.context_routing_enabled()),
        );
        system_info.insert("multi_agent_enabled".into(), json!(self.settings.enable_multi_agent));
        system_info.insert("active_conversations".into(), json!(self.history.len().await));
        HealthReport::from_agents(agents, system_info)
    }
}
