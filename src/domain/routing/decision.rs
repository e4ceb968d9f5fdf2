//! The per-turn agent selection result.

use serde::{Deserialize, Serialize};

use super::agent::{AgentType, Priority};
use crate::domain::foundation::Confidence;

/// Which agent handles a turn, how sure the router is, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub agent_type: AgentType,
    pub confidence: Confidence,
    pub reasoning: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl RoutingDecision {
    pub fn new(agent_type: AgentType, confidence: impl Into<Confidence>, reasoning: impl Into<String>) -> Self {
        Self {
            agent_type,
            confidence: confidence.into(),
            reasoning: reasoning.into(),
            keywords: Vec::new(),
            priority: Priority::Medium,
        }
    }

    /// The caller named the agent explicitly.
    pub fn preferred(agent_type: AgentType) -> Self {
        Self::new(agent_type, Confidence::CERTAIN, "사용자가 직접 지정한 에이전트")
    }

    /// Classifier unusable; `cause` is kept for observability.
    pub fn fallback(agent_type: AgentType, cause: impl std::fmt::Display) -> Self {
        Self::new(
            agent_type,
            Confidence::FALLBACK,
            format!("라우팅 오류로 기본 에이전트 사용: {}", cause),
        )
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Returns true if confidence is below `threshold`.
    pub fn is_uncertain(&self, threshold: f32) -> bool {
        self.confidence.is_below(threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_is_certain() {
        let decision = RoutingDecision::preferred(AgentType::Marketing);
        assert_eq!(decision.confidence, Confidence::CERTAIN);
        assert!(!decision.is_uncertain(0.8));
    }

    #[test]
    fn fallback_records_cause() {
        let decision = RoutingDecision::fallback(AgentType::BusinessPlanning, "timeout");
        assert_eq!(decision.confidence.value(), 0.5);
        assert!(decision.reasoning.contains("timeout"));
        assert!(decision.is_uncertain(0.8));
    }

    #[test]
    fn confidence_is_clamped_on_construction() {
        let decision = RoutingDecision::new(AgentType::Marketing, 1.4_f32, "x");
        assert_eq!(decision.confidence, Confidence::CERTAIN);
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{"agent_type": "marketing", "confidence": 0.7, "reasoning": "r"}"#;
        let decision: RoutingDecision = serde_json::from_str(json).unwrap();
        assert!(decision.keywords.is_empty());
        assert_eq!(decision.priority, Priority::Medium);
    }
}
