//! Request and response envelopes exchanged around a routed turn.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::domain::foundation::{Confidence, ConversationId, Timestamp, UserId, ValidationError};
use crate::domain::routing::{AgentType, RoutingDecision};

/// Persona forwarded to specialist agents when the caller names none.
pub const DEFAULT_PERSONA: &str = "common";

fn default_agent_confidence() -> Confidence {
    Confidence::new(0.8)
}

/// A user turn entering the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    pub message: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    /// Skips routing when set.
    #[serde(default)]
    pub preferred_agent: Option<AgentType>,
    #[serde(default)]
    pub history: Vec<Value>,
}

impl UnifiedRequest {
    pub fn new(user_id: UserId, message: impl Into<String>) -> Self {
        Self {
            user_id,
            conversation_id: None,
            message: message.into(),
            context: Map::new(),
            preferred_agent: None,
            history: Vec::new(),
        }
    }

    pub fn with_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    pub fn with_preferred_agent(mut self, agent: AgentType) -> Self {
        self.preferred_agent = Some(agent);
        self
    }

    /// Rejects blank messages.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::empty_field("message"));
        }
        Ok(())
    }

    /// Persona named in `context.persona`, if any.
    pub fn persona(&self) -> Option<String> {
        self.context
            .get("persona")
            .and_then(Value::as_str)
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string)
    }
}

/// Wire body sent to a specialist agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub message: String,
    pub persona: String,
}

impl AgentRequest {
    pub fn new(user_id: UserId, conversation_id: ConversationId, message: impl Into<String>) -> Self {
        Self {
            user_id,
            conversation_id,
            message: message.into(),
            persona: DEFAULT_PERSONA.to_string(),
        }
    }

    pub fn with_persona(mut self, persona: Option<String>) -> Self {
        if let Some(persona) = persona {
            self.persona = persona;
        }
        self
    }
}

/// One specialist agent's answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent_type: AgentType,
    pub response: String,
    #[serde(default = "default_agent_confidence")]
    pub confidence: Confidence,
    #[serde(default)]
    pub sources: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Seconds.
    #[serde(default)]
    pub processing_time: f64,
}

impl AgentResponse {
    pub fn new(agent_type: AgentType, response: impl Into<String>) -> Self {
        Self {
            agent_type,
            response: response.into(),
            confidence: default_agent_confidence(),
            sources: None,
            metadata: Map::new(),
            processing_time: 0.0,
        }
    }

    pub fn with_confidence(mut self, confidence: impl Into<Confidence>) -> Self {
        self.confidence = confidence.into();
        self
    }

    pub fn with_sources(mut self, sources: Option<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// The normalized answer returned to the caller for every turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedResponse {
    pub conversation_id: ConversationId,
    pub agent_type: AgentType,
    pub response: String,
    pub confidence: Confidence,
    pub routing_decision: RoutingDecision,
    #[serde(default)]
    pub sources: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub processing_time: f64,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub alternatives: Vec<AgentResponse>,
}

impl UnifiedResponse {
    /// Builds the envelope around the primary agent's answer.
    pub fn from_primary(
        conversation_id: ConversationId,
        decision: RoutingDecision,
        primary: AgentResponse,
        alternatives: Vec<AgentResponse>,
    ) -> Self {
        Self {
            conversation_id,
            agent_type: primary.agent_type,
            response: primary.response,
            confidence: primary.confidence,
            routing_decision: decision,
            sources: primary.sources,
            metadata: primary.metadata,
            processing_time: primary.processing_time,
            timestamp: Timestamp::now(),
            alternatives,
        }
    }
}

/// Who said a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

/// One turn half kept in the orchestrator's per-conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
    #[serde(default)]
    pub agent_type: Option<AgentType>,
    pub timestamp: Timestamp,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::User,
            content: content.into(),
            agent_type: None,
            timestamp: Timestamp::now(),
        }
    }

    pub fn assistant(agent_type: AgentType, content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::Assistant,
            content: content.into(),
            agent_type: Some(agent_type),
            timestamp: Timestamp::now(),
        }
    }
}

/// Appends `entries` and evicts the oldest beyond `limit`.
pub fn append_bounded(history: &mut Vec<HistoryEntry>, entries: impl IntoIterator<Item = HistoryEntry>, limit: usize) {
    history.extend(entries);
    if history.len() > limit {
        let excess = history.len() - limit;
        history.drain(..excess);
    }
}

/// System health as reported by `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// `healthy` when every enabled agent answers, else `degraded`.
    pub status: &'static str,
    pub timestamp: Timestamp,
    pub agents: BTreeMap<AgentType, bool>,
    pub system_info: Map<String, Value>,
}

impl HealthReport {
    pub fn from_agents(agents: BTreeMap<AgentType, bool>, system_info: Map<String, Value>) -> Self {
        let status = if agents.values().all(|up| *up) {
            "healthy"
        } else {
            "degraded"
        };
        Self {
            status,
            timestamp: Timestamp::now(),
            agents,
            system_info,
        }
    }
}
