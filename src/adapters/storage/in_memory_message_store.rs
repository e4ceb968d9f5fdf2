//! In-Memory Message Store Adapter
//!
//! Keeps conversation messages in memory. Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{ConversationId, Timestamp};
use crate::domain::routing::AgentType;
use crate::ports::{MessageStore, SenderType, StoreError, StoredMessage};

/// In-memory storage for conversation messages.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<HashMap<ConversationId, Vec<StoredMessage>>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent save fail (for testing fire-and-forget paths).
    pub fn fail_saves(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Total messages across all conversations.
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.values().map(Vec::len).sum()
    }

    /// Clear all stored data (useful for tests)
    pub async fn clear(&self) {
        self.messages.write().await.clear();
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save_message(
        &self,
        conversation_id: ConversationId,
        content: &str,
        sender_type: SenderType,
        agent_type: Option<AgentType>,
    ) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("saves disabled".to_string()));
        }
        let message = StoredMessage {
            conversation_id,
            content: content.to_string(),
            sender_type,
            agent_type,
            created_at: Timestamp::now(),
        };
        self.messages
            .write()
            .await
            .entry(conversation_id)
            .or_default()
            .push(message);
        Ok(())
    }

    async fn get_history(
        &self,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let messages = self.messages.read().await;
        let history = messages
            .get(&conversation_id)
            .ok_or(StoreError::NotFound(conversation_id))?;
        let skip = history.len().saturating_sub(limit);
        Ok(history[skip..].to_vec())
    }
}
