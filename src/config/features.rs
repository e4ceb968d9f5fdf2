//! Feature flags configuration

use serde::Deserialize;

/// Feature flags for enabling/disabling functionality
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    /// Show detailed error messages (disable in production!)
    #[serde(default)]
    pub verbose_errors: bool,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    /// Serve marketing and customer service in-process instead of over HTTP
    #[serde(default = "default_local_consultation")]
    pub local_consultation: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            verbose_errors: false,
            json_logs: false,
            local_consultation: default_local_consultation(),
        }
    }
}

fn default_local_consultation() -> bool {
    true
}
