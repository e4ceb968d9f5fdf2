//! Agent Client Port - Interface for invoking one specialist agent.
//!
//! Remote specialists are reached over HTTP; the marketing and customer
//! service consultations may also run in-process. The orchestrator only sees
//! this trait and treats every error the same way.

use async_trait::async_trait;

use crate::domain::routing::AgentType;
use crate::domain::workflow::{AgentRequest, AgentResponse};

/// Errors from a specialist agent call.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("agent {agent} timed out after {timeout_secs}s")]
    Timeout { agent: AgentType, timeout_secs: u64 },

    #[error("agent {agent} returned HTTP {status}")]
    Http { agent: AgentType, status: u16 },

    /// The agent answered with a `success: false` envelope.
    #[error("agent {agent} rejected the request: {message}")]
    Rejected { agent: AgentType, message: String },

    #[error("transport error calling {agent}: {message}")]
    Transport { agent: AgentType, message: String },

    #[error("invalid response from {agent}: {message}")]
    InvalidResponse { agent: AgentType, message: String },

    /// An in-process agent could not produce its draft or report.
    #[error("agent {agent} could not generate a reply: {message}")]
    Generation { agent: AgentType, message: String },

    #[error("agent {0} is disabled")]
    Disabled(AgentType),

    /// No client is registered for the agent.
    #[error("agent {0} is not available")]
    Unavailable(AgentType),
}

impl AgentError {
    pub fn rejected(agent: AgentType, message: impl Into<String>) -> Self {
        Self::Rejected {
            agent,
            message: message.into(),
        }
    }

    pub fn transport(agent: AgentType, message: impl Into<String>) -> Self {
        Self::Transport {
            agent,
            message: message.into(),
        }
    }

    pub fn invalid_response(agent: AgentType, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            agent,
            message: message.into(),
        }
    }

    pub fn generation(agent: AgentType, message: impl Into<String>) -> Self {
        Self::Generation {
            agent,
            message: message.into(),
        }
    }

    /// The agent the failed call was addressed to.
    pub fn agent(&self) -> AgentType {
        match self {
            AgentError::Timeout { agent, .. }
            | AgentError::Http { agent, .. }
            | AgentError::Rejected { agent, .. }
            | AgentError::Transport { agent, .. }
            | AgentError::InvalidResponse { agent, .. }
            | AgentError::Generation { agent, .. } => *agent,
            AgentError::Disabled(agent) | AgentError::Unavailable(agent) => *agent,
        }
    }
}

/// Port for one specialist agent.
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Which agent this client reaches.
    fn agent_type(&self) -> AgentType;

    /// Sends one user turn and returns the agent's answer.
    async fn process(&self, request: AgentRequest) -> Result<AgentResponse, AgentError>;

    /// Returns true when the agent is reachable and healthy.
    async fn health_check(&self) -> bool;
}
