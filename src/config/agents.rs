//! Specialist agent endpoints

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::routing::AgentType;

/// Connection settings for one specialist agent
#[derive(Debug, Clone, Deserialize)]
pub struct AgentEndpointConfig {
    /// Query URL; defaults to the agent's local port
    pub endpoint: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

impl Default for AgentEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_timeout(),
            enabled: true,
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

impl AgentEndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for every routable agent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentsConfig {
    #[serde(default)]
    pub business_planning: AgentEndpointConfig,

    #[serde(default)]
    pub customer_service: AgentEndpointConfig,

    #[serde(default)]
    pub marketing: AgentEndpointConfig,

    #[serde(default)]
    pub mental_health: AgentEndpointConfig,

    #[serde(default)]
    pub task_automation: AgentEndpointConfig,
}

impl AgentsConfig {
    /// Settings for `agent`; `None` for `Unknown`.
    pub fn get(&self, agent: AgentType) -> Option<&AgentEndpointConfig> {
        match agent {
            AgentType::BusinessPlanning => Some(&self.business_planning),
            AgentType::CustomerService => Some(&self.customer_service),
            AgentType::Marketing => Some(&self.marketing),
            AgentType::MentalHealth => Some(&self.mental_health),
            AgentType::TaskAutomation => Some(&self.task_automation),
            AgentType::Unknown => None,
        }
    }

    /// Configured endpoint, or `http://localhost:800N/agent/query`.
    pub fn endpoint(&self, agent: AgentType) -> String {
        self.get(agent)
            .and_then(|c| c.endpoint.clone())
            .unwrap_or_else(|| format!("http://localhost:{}/agent/query", default_port(agent)))
    }

    /// Validate agent configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        for agent in AgentType::routable() {
            let Some(config) = self.get(agent) else {
                continue;
            };
            if config.timeout_secs == 0 {
                return Err(ValidationError::MustBePositive("agents.*.timeout_secs"));
            }
            if !(0.0..=1.0).contains(&config.confidence_threshold) {
                return Err(ValidationError::OutOfUnitRange {
                    field: "agents.*.confidence_threshold",
                });
            }
            let endpoint = self.endpoint(agent);
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ValidationError::InvalidEndpoint {
                    agent: agent.as_str(),
                    endpoint,
                });
            }
        }
        Ok(())
    }
}

fn default_port(agent: AgentType) -> u16 {
    match agent {
        AgentType::BusinessPlanning => 8001,
        AgentType::CustomerService => 8002,
        AgentType::Marketing => 8003,
        AgentType::MentalHealth => 8004,
        AgentType::TaskAutomation | AgentType::Unknown => 8005,
    }
}

fn default_timeout() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_confidence_threshold() -> f32 {
    0.7
}
