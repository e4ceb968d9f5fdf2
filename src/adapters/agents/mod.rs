//! Agent Client Adapters.
//!
//! - `HttpAgentClient` - Remote specialist service over HTTP
//! - `MockAgentClient` - Queued answers for testing

mod http_agent_client;
mod mock_agent_client;

pub use http_agent_client::{HttpAgentClient, HttpAgentConfig};
pub use mock_agent_client::MockAgentClient;
