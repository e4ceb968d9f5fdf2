//! Mock Agent Client for testing.
//!
//! Returns queued answers or errors and records every request.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::foundation::Confidence;
use crate::domain::routing::AgentType;
use crate::domain::workflow::{AgentRequest, AgentResponse};
use crate::ports::{AgentClient, AgentError};

#[derive(Debug, Clone)]
enum Reply {
    Answer(String, Confidence),
    Fail(AgentError),
}

/// Mock specialist agent.
#[derive(Debug, Clone)]
pub struct MockAgentClient {
    agent_type: AgentType,
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<AgentRequest>>>,
    healthy: bool,
    delay: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockAgentClient {
    pub fn new(agent_type: AgentType) -> Self {
        Self {
            agent_type,
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            healthy: true,
            delay: Duration::ZERO,
        }
    }

    /// Queues an answer with the default 0.8 confidence.
    pub fn with_answer(self, text: impl Into<String>) -> Self {
        self.with_scored_answer(text, 0.8)
    }

    pub fn with_scored_answer(self, text: impl Into<String>, confidence: f32) -> Self {
        lock(&self.replies).push_back(Reply::Answer(text.into(), Confidence::new(confidence)));
        self
    }

    pub fn with_error(self, error: AgentError) -> Self {
        lock(&self.replies).push_back(Reply::Fail(error));
        self
    }

    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn requests(&self) -> Vec<AgentRequest> {
        lock(&self.requests).clone()
    }

    /// Answer served when the queue is empty.
    pub fn default_answer(agent_type: AgentType) -> String {
        format!("{} 응답입니다", agent_type.display_name())
    }
}

#[async_trait]
impl AgentClient for MockAgentClient {
    fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    async fn process(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        lock(&self.requests).push(request);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let reply = lock(&self.replies).pop_front();
        match reply {
            Some(Reply::Answer(text, confidence)) => {
                Ok(AgentResponse::new(self.agent_type, text).with_confidence(confidence))
            }
            Some(Reply::Fail(error)) => Err(error),
            None => Ok(AgentResponse::new(
                self.agent_type,
                Self::default_answer(self.agent_type),
            )),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}
