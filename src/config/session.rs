//! Conversation state retention

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Bounds on in-process conversation state
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Idle minutes after which a conversation is forgotten
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_minutes: u64,

    /// LRU capacity of each conversation store
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// How often expired entries are purged
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_minutes * 60)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.idle_timeout_minutes == 0 {
            return Err(ValidationError::MustBePositive("session.idle_timeout_minutes"));
        }
        if self.max_sessions == 0 {
            return Err(ValidationError::MustBePositive("session.max_sessions"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::MustBePositive("session.sweep_interval_secs"));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_minutes: default_idle_timeout(),
            max_sessions: default_max_sessions(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_max_sessions() -> usize {
    10_000
}

fn default_sweep_interval() -> u64 {
    300
}
