//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `AIProvider` - Language model used for routing, extraction and drafting
//! - `AgentClient` - One specialist agent (remote or in-process)
//! - `SessionStore` - Evictable per-conversation state
//! - `MessageStore` - Conversation message persistence

mod agent_client;
mod ai_provider;
mod message_store;
mod session_store;

pub use agent_client::{AgentClient, AgentError};
pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, Message,
    MessageRole, ProviderInfo, RequestMetadata, TokenUsage,
};
pub use message_store::{MessageStore, SenderType, StoreError, StoredMessage};
pub use session_store::SessionStore;
