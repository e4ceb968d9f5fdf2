//! Routing and workflow configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::routing::AgentType;

/// How turns are routed and how much of each conversation is remembered
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Routing confidence below which alternative agents are consulted
    #[serde(default = "default_confidence_threshold")]
    pub routing_confidence_threshold: f32,

    /// Collect alternative answers on uncertain routing
    #[serde(default = "default_true")]
    pub enable_multi_agent: bool,

    #[serde(default = "default_max_alternatives")]
    pub max_alternative_responses: usize,

    /// Agent used when routing fails
    #[serde(default = "default_agent")]
    pub default_agent: AgentType,

    /// Use conversation flow for follow-ups and back-references
    #[serde(default = "default_true")]
    pub enable_context_routing: bool,

    /// Interactions kept per conversation flow
    #[serde(default = "default_flow_history_limit")]
    pub flow_history_limit: usize,

    /// History entries kept per conversation
    #[serde(default = "default_conversation_history_limit")]
    pub conversation_history_limit: usize,

    /// Recent turns shown to the context classifier
    #[serde(default = "default_context_summary_turns")]
    pub context_summary_turns: usize,

    #[serde(default = "default_previous_output_preview_chars")]
    pub previous_output_preview_chars: usize,
}

impl RoutingConfig {
    /// Validate routing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.routing_confidence_threshold) {
            return Err(ValidationError::OutOfUnitRange {
                field: "routing.routing_confidence_threshold",
            });
        }
        if self.default_agent == AgentType::Unknown {
            return Err(ValidationError::InvalidDefaultAgent);
        }
        if self.flow_history_limit == 0 {
            return Err(ValidationError::MustBePositive("routing.flow_history_limit"));
        }
        if self.conversation_history_limit == 0 {
            return Err(ValidationError::MustBePositive(
                "routing.conversation_history_limit",
            ));
        }
        Ok(())
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            routing_confidence_threshold: default_confidence_threshold(),
            enable_multi_agent: true,
            max_alternative_responses: default_max_alternatives(),
            default_agent: default_agent(),
            enable_context_routing: true,
            flow_history_limit: default_flow_history_limit(),
            conversation_history_limit: default_conversation_history_limit(),
            context_summary_turns: default_context_summary_turns(),
            previous_output_preview_chars: default_previous_output_preview_chars(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_confidence_threshold() -> f32 {
    0.8
}

fn default_max_alternatives() -> usize {
    2
}

fn default_agent() -> AgentType {
    AgentType::BusinessPlanning
}

fn default_flow_history_limit() -> usize {
    10
}

fn default_conversation_history_limit() -> usize {
    20
}

fn default_context_summary_turns() -> usize {
    3
}

fn default_previous_output_preview_chars() -> usize {
    200
}
