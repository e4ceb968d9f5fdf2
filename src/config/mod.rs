//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `UNIFIED_AGENT` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use unified_agent::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod agents;
mod ai;
mod error;
mod features;
mod routing;
mod server;
mod session;

pub use agents::{AgentEndpointConfig, AgentsConfig};
pub use ai::{AiConfig, AiProvider};
pub use error::{ConfigError, ValidationError};
pub use features::FeatureFlags;
pub use routing::RoutingConfig;
pub use server::{Environment, ServerConfig};
pub use session::SessionConfig;

use serde::Deserialize;

use crate::application::{RouterSettings, WorkflowSettings};

/// Root application configuration
///
/// Every section has defaults, so an empty environment loads; only the
/// OpenAI key is required when the OpenAI provider is selected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Language model provider
    #[serde(default)]
    pub ai: AiConfig,

    /// Routing and workflow tuning
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Specialist agent endpoints
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Conversation state retention
    #[serde(default)]
    pub session: SessionConfig,

    /// Feature flags
    #[serde(default)]
    pub features: FeatureFlags,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `UNIFIED_AGENT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `UNIFIED_AGENT__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `UNIFIED_AGENT__AGENTS__MARKETING__ENABLED=false` -> `agents.marketing.enabled = false`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("UNIFIED_AGENT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.ai.validate()?;
        self.routing.validate()?;
        self.agents.validate()?;
        self.session.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    pub fn router_settings(&self) -> RouterSettings {
        RouterSettings {
            default_agent: self.routing.default_agent,
            enable_context_routing: self.routing.enable_context_routing,
            flow_history_limit: self.routing.flow_history_limit,
            context_summary_turns: self.routing.context_summary_turns,
            previous_output_preview_chars: self.routing.previous_output_preview_chars,
            ..RouterSettings::default()
        }
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            routing_confidence_threshold: self.routing.routing_confidence_threshold,
            enable_multi_agent: self.routing.enable_multi_agent,
            max_alternative_responses: self.routing.max_alternative_responses,
            default_agent: self.routing.default_agent,
            history_limit: self.routing.conversation_history_limit,
            // Failure details never leave a production deployment.
            verbose_errors: self.features.verbose_errors && !self.is_production(),
        }
    }
}
