//! HTTP Agent Client - Implementation of AgentClient for remote specialists.
//!
//! Specialist services answer either with an envelope
//! `{"success": true, "data": {...}}` / `{"success": false, "error": "..."}`
//! or with the data object directly. The data carries the text under
//! `answer` or `response`; every other key is forwarded as metadata.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

use crate::domain::foundation::Confidence;
use crate::domain::routing::AgentType;
use crate::domain::workflow::{AgentRequest, AgentResponse};
use crate::ports::{AgentClient, AgentError};

/// Text used when the agent's data carries neither `answer` nor `response`.
const MISSING_ANSWER: &str = "응답을 받지 못했습니다.";

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for one remote agent.
#[derive(Debug, Clone)]
pub struct HttpAgentConfig {
    pub agent_type: AgentType,
    /// Query endpoint, e.g. `http://localhost:8003/agent/query`.
    pub endpoint: String,
    pub timeout: Duration,
    pub enabled: bool,
}

impl HttpAgentConfig {
    pub fn new(agent_type: AgentType, endpoint: impl Into<String>) -> Self {
        Self {
            agent_type,
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(120),
            enabled: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Health URL derived from the query endpoint.
    pub fn health_url(&self) -> String {
        if self.endpoint.contains("/agent/query") {
            self.endpoint.replace("/agent/query", "/health")
        } else if self.endpoint.contains("/query") {
            self.endpoint.replace("/query", "/health")
        } else {
            format!("{}/health", self.endpoint.trim_end_matches('/'))
        }
    }
}

/// Reaches one specialist agent over HTTP.
pub struct HttpAgentClient {
    config: HttpAgentConfig,
    client: Client,
}

impl HttpAgentClient {
    pub fn new(config: HttpAgentConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client for agent");
                Client::new()
            });
        Self { config, client }
    }

    pub fn config(&self) -> &HttpAgentConfig {
        &self.config
    }

    /// Default confidence attached to a successful answer.
    fn answer_confidence(&self) -> Confidence {
        match self.config.agent_type {
            AgentType::MentalHealth => Confidence::new(0.9),
            _ => Confidence::new(0.85),
        }
    }

    /// Unwraps the success envelope, or returns the body as-is.
    fn unwrap_envelope(agent: AgentType, body: Value) -> Result<Map<String, Value>, AgentError> {
        let Value::Object(mut body) = body else {
            return Err(AgentError::invalid_response(agent, "body is not a JSON object"));
        };

        match body.get("success").and_then(Value::as_bool) {
            Some(false) => {
                let message = body
                    .get("error")
                    .map(|e| match e {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_else(|| "알 수 없는 오류".to_string());
                Err(AgentError::rejected(agent, message))
            }
            Some(true) => match body.remove("data") {
                Some(Value::Object(data)) => Ok(data),
                Some(other) => Err(AgentError::invalid_response(
                    agent,
                    format!("data is not an object: {}", other),
                )),
                None => Ok(body),
            },
            None => Ok(body),
        }
    }

    /// Builds the response from the agent's data object.
    fn to_agent_response(&self, mut data: Map<String, Value>, elapsed: Duration) -> AgentResponse {
        let text_of = |value: Option<Value>| match value {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        };
        let answer = text_of(data.remove("answer"));
        let response = text_of(data.remove("response"));
        let text = answer
            .or(response)
            .unwrap_or_else(|| MISSING_ANSWER.to_string());

        let sources = match data.remove("sources") {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            Some(Value::Array(items)) if !items.is_empty() => Some(
                items
                    .iter()
                    .map(|i| i.as_str().map(str::to_string).unwrap_or_else(|| i.to_string()))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            _ => None,
        };

        // Nested metadata is flattened one level so callers see one map.
        if let Some(Value::Object(nested)) = data.remove("metadata") {
            for (key, value) in nested {
                data.entry(key).or_insert(value);
            }
        }

        let mut agent_response = AgentResponse::new(self.config.agent_type, text)
            .with_confidence(self.answer_confidence())
            .with_sources(sources);
        agent_response.metadata = data;
        agent_response.processing_time = elapsed.as_secs_f64();
        agent_response
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    fn agent_type(&self) -> AgentType {
        self.config.agent_type
    }

    async fn process(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        let agent = self.config.agent_type;
        if !self.config.enabled {
            return Err(AgentError::Disabled(agent));
        }

        let started = Instant::now();
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout {
                        agent,
                        timeout_secs: self.config.timeout.as_secs(),
                    }
                } else {
                    AgentError::transport(agent, e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(agent = %agent, status = status.as_u16(), "agent returned error status");
            return Err(AgentError::Http {
                agent,
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::invalid_response(agent, e.to_string()))?;
        let data = Self::unwrap_envelope(agent, body)?;

        let agent_response = self.to_agent_response(data, started.elapsed());
        tracing::debug!(
            agent = %agent,
            conversation_id = %request.conversation_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "agent answered"
        );
        Ok(agent_response)
    }

    async fn health_check(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        match self
            .client
            .get(self.config.health_url())
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(agent = %self.config.agent_type, error = %e, "health check failed");
                false
            }
        }
    }
}
