//! Message Store Port - Interface for conversation persistence.
//!
//! Saving is fire-and-forget from the consultation's point of view: a
//! failure is logged and never blocks the state machine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, Timestamp};
use crate::domain::routing::AgentType;

/// Errors that can occur during message persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Who sent a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    User,
    Agent,
}

/// One persisted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub conversation_id: ConversationId,
    pub content: String,
    pub sender_type: SenderType,
    pub agent_type: Option<AgentType>,
    pub created_at: Timestamp,
}

/// Port for saving and reading conversation messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_message(
        &self,
        conversation_id: ConversationId,
        content: &str,
        sender_type: SenderType,
        agent_type: Option<AgentType>,
    ) -> Result<(), StoreError>;

    /// The most recent `limit` messages in chronological order.
    async fn get_history(
        &self,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError>;
}
