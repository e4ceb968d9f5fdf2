//! Query router.
//!
//! Chooses the specialist for a turn. A first message goes through the
//! plain classifier; later messages consult the conversation's flow for
//! back-references and follow-ups before asking the context-aware
//! classifier. Routing never fails: every error ends in a low-confidence
//! decision for the default agent.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::application::purpose;
use crate::domain::foundation::{Confidence, ConversationId, UserId};
use crate::domain::routing::{
    parse_context_output, parse_routing_output, AgentType, ConversationFlow, RoutingDecision,
    RoutingParseError, DEFAULT_FLOW_HISTORY,
};
use crate::domain::workflow::UnifiedRequest;
use crate::ports::{AIError, AIProvider, CompletionRequest, MessageRole, RequestMetadata, SessionStore};

use super::prompts;

const ROUTING_MAX_TOKENS: u32 = 200;

/// Shortest previous-output preview kept when shrinking the context prompt.
const MIN_PREVIEW_CHARS: usize = 40;

/// Why a classifier call produced no decision.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("routing model call failed: {0}")]
    Provider(#[from] AIError),

    #[error("unusable routing output: {0}")]
    Parse(#[from] RoutingParseError),
}

/// Tunables for the router.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub default_agent: AgentType,
    pub enable_context_routing: bool,
    pub flow_history_limit: usize,
    pub context_summary_turns: usize,
    pub previous_output_preview_chars: usize,
    /// Minimum action-match confidence for a back-reference to override routing.
    pub reference_override_confidence: f32,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            default_agent: AgentType::BusinessPlanning,
            enable_context_routing: true,
            flow_history_limit: DEFAULT_FLOW_HISTORY,
            context_summary_turns: 3,
            previous_output_preview_chars: 200,
            reference_override_confidence: 0.7,
        }
    }
}

/// Continuity snapshot for one conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationInsights {
    pub conversation_id: ConversationId,
    pub current_agent: Option<AgentType>,
    pub previous_agent: Option<AgentType>,
    pub interaction_count: usize,
    pub context_summary: String,
    pub agents_used: Vec<AgentType>,
}

/// Routes turns to specialist agents.
pub struct QueryRouter<P: ?Sized + AIProvider> {
    ai_provider: Arc<P>,
    flows: Arc<dyn SessionStore<ConversationFlow>>,
    settings: RouterSettings,
    context_routing: AtomicBool,
    keywords: BTreeMap<AgentType, Vec<String>>,
}

impl<P: ?Sized + AIProvider> QueryRouter<P> {
    pub fn new(
        ai_provider: Arc<P>,
        flows: Arc<dyn SessionStore<ConversationFlow>>,
        settings: RouterSettings,
    ) -> Self {
        let keywords = AgentType::routable()
            .into_iter()
            .map(|agent| {
                let words = agent.default_keywords().iter().map(|k| k.to_string()).collect();
                (agent, words)
            })
            .collect();
        Self {
            ai_provider,
            flows,
            context_routing: AtomicBool::new(settings.enable_context_routing),
            settings,
            keywords,
        }
    }

    /// Replaces the keyword list for one agent.
    pub fn with_keywords(mut self, agent: AgentType, keywords: Vec<String>) -> Self {
        self.keywords.insert(agent, keywords);
        self
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn context_routing_enabled(&self) -> bool {
        self.context_routing.load(Ordering::Relaxed)
    }

    pub fn set_context_routing(&self, enabled: bool) {
        self.context_routing.store(enabled, Ordering::Relaxed);
        tracing::info!(enabled, "context routing toggled");
    }

    /// Picks the agent for this turn.
    pub async fn route(&self, request: &UnifiedRequest, conversation_id: ConversationId) -> RoutingDecision {
        let decision = match request.preferred_agent {
            Some(agent) if agent != AgentType::Unknown => RoutingDecision::preferred(agent),
            _ => match self.select(request, conversation_id).await {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        error = %e,
                        default_agent = %self.settings.default_agent,
                        "routing failed; using default agent"
                    );
                    RoutingDecision::fallback(self.settings.default_agent, &e)
                }
            },
        };

        let decision = decision.with_keywords(self.extract_keywords(&request.message));
        tracing::info!(
            conversation_id = %conversation_id,
            agent = %decision.agent_type,
            confidence = decision.confidence.value(),
            reasoning = %decision.reasoning,
            "routing decision"
        );
        decision
    }

    async fn select(
        &self,
        request: &UnifiedRequest,
        conversation_id: ConversationId,
    ) -> Result<RoutingDecision, RouterError> {
        let flow = self.flows.get(&conversation_id).await;
        match flow {
            Some(flow) if self.context_routing_enabled() && !flow.is_empty() => {
                self.route_in_context(&request.user_id, conversation_id, &request.message, &flow)
                    .await
            }
            _ => {
                self.route_initial(&request.user_id, conversation_id, &request.message)
                    .await
            }
        }
    }

    async fn route_initial(
        &self,
        user_id: &UserId,
        conversation_id: ConversationId,
        message: &str,
    ) -> Result<RoutingDecision, RouterError> {
        let raw = self
            .classify(user_id, conversation_id, purpose::ROUTING, prompts::initial(), message)
            .await?;
        let verdict = parse_routing_output(&raw)?;
        Ok(RoutingDecision::new(verdict.agent, verdict.confidence, verdict.reasoning))
    }

    async fn route_in_context(
        &self,
        user_id: &UserId,
        conversation_id: ConversationId,
        message: &str,
        flow: &ConversationFlow,
    ) -> Result<RoutingDecision, RouterError> {
        let reference = flow.analyze_reference_intent(message);
        if let Some(agent) = reference.override_target(self.settings.reference_override_confidence) {
            return Ok(RoutingDecision::new(
                agent,
                reference.confidence,
                format!("참조 기반 새로운 작업 요청: {}", agent),
            ));
        }

        if let Some(current) = flow.current_agent() {
            if flow.should_continue_with_current_agent(message) {
                return Ok(RoutingDecision::new(
                    current,
                    Confidence::new(0.9),
                    "단순 후속 질문으로 현재 에이전트 유지",
                ));
            }
        }

        let system = self.context_prompt(flow, message);
        let outcome = match self
            .classify(user_id, conversation_id, purpose::CONTEXT_ROUTING, system, message)
            .await
        {
            Ok(raw) => parse_context_output(&raw).map_err(RouterError::from),
            Err(e) => Err(RouterError::from(e)),
        };

        match (outcome, flow.current_agent()) {
            (Ok(context), Some(current)) if context.keeps_current_agent() => Ok(RoutingDecision::new(
                current,
                context.verdict.confidence,
                format!("{} (참조 기반 연속 질문)", context.verdict.reasoning),
            )),
            (Ok(context), _) => Ok(RoutingDecision::new(
                context.verdict.agent,
                context.verdict.confidence,
                context.verdict.reasoning,
            )),
            (Err(e), Some(current)) => {
                tracing::warn!(conversation_id = %conversation_id, error = %e, "context routing failed; keeping current agent");
                Ok(RoutingDecision::new(
                    current,
                    Confidence::new(0.6),
                    format!("컨텍스트 라우팅 오류로 현재 에이전트 유지: {}", e),
                ))
            }
            (Err(e), None) => {
                tracing::warn!(conversation_id = %conversation_id, error = %e, "context routing failed; routing afresh");
                self.route_initial(user_id, conversation_id, message).await
            }
        }
    }

    /// Builds the context prompt, dropping older turns and shortening the
    /// previous output until it fits the provider's context window.
    fn context_prompt(&self, flow: &ConversationFlow, message: &str) -> String {
        let budget = self
            .ai_provider
            .provider_info()
            .max_context_tokens
            .saturating_sub(ROUTING_MAX_TOKENS + self.ai_provider.estimate_tokens(message));
        let mut turns = self.settings.context_summary_turns.max(1);
        let mut preview_chars = self.settings.previous_output_preview_chars;

        loop {
            let system = prompts::context(
                &flow.context_summary(turns),
                flow.current_agent(),
                &flow.previous_output_preview(preview_chars),
            );
            let used = self.ai_provider.estimate_tokens(&system);
            if used <= budget {
                return system;
            }
            if turns > 1 {
                turns -= 1;
            } else if preview_chars > MIN_PREVIEW_CHARS {
                preview_chars = (preview_chars / 2).max(MIN_PREVIEW_CHARS);
            } else {
                tracing::warn!(used, budget, "context prompt exceeds the provider window");
                return system;
            }
        }
    }

    async fn classify(
        &self,
        user_id: &UserId,
        conversation_id: ConversationId,
        purpose: &'static str,
        system: String,
        message: &str,
    ) -> Result<String, AIError> {
        let request = CompletionRequest::new(RequestMetadata::new(
            user_id.clone(),
            conversation_id,
            purpose,
        ))
        .with_system_prompt(system)
        .with_message(MessageRole::User, format!("사용자 요청: {}", message))
        .with_max_tokens(ROUTING_MAX_TOKENS)
        .with_temperature(0.1);

        Ok(self.ai_provider.complete(request).await?.content)
    }

    /// Configured agent keywords that appear in the message, deduplicated.
    pub fn extract_keywords(&self, message: &str) -> Vec<String> {
        let lowered = message.to_lowercase();
        let mut found: Vec<String> = Vec::new();
        for words in self.keywords.values() {
            for word in words {
                if lowered.contains(&word.to_lowercase()) && !found.contains(word) {
                    found.push(word.clone());
                }
            }
        }
        found
    }

    /// Records a completed turn in the conversation's flow.
    pub async fn update_flow(
        &self,
        conversation_id: ConversationId,
        message: &str,
        decision: &RoutingDecision,
        response: &str,
    ) {
        let mut flow = self
            .flows
            .get(&conversation_id)
            .await
            .unwrap_or_else(|| ConversationFlow::new(self.settings.flow_history_limit));
        flow.add_interaction(message, decision.agent_type, response, decision.reasoning.as_str());
        self.flows.put(conversation_id, flow).await;
    }

    pub async fn get_conversation_insights(&self, conversation_id: ConversationId) -> ConversationInsights {
        let flow = self
            .flows
            .get(&conversation_id)
            .await
            .unwrap_or_else(|| ConversationFlow::new(self.settings.flow_history_limit));
        ConversationInsights {
            conversation_id,
            current_agent: flow.current_agent(),
            previous_agent: flow.previous_agent(),
            interaction_count: flow.interaction_count(),
            context_summary: flow.context_summary(self.settings.context_summary_turns),
            agents_used: flow.agents_used(),
        }
    }

    /// Forgets the conversation's flow; the next turn routes afresh.
    pub async fn reset_context(&self, conversation_id: ConversationId) -> bool {
        let removed = self.flows.remove(&conversation_id).await.is_some();
        tracing::info!(conversation_id = %conversation_id, removed, "routing context reset");
        removed
    }

    /// Number of conversations with a live flow.
    pub async fn active_conversations(&self) -> usize {
        self.flows.len().await
    }
}
