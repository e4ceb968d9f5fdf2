//! Session Store Port - Interface for per-conversation in-process state.
//!
//! Consultation states, router flows and orchestrator history are all kept
//! through this port so eviction policy lives in one adapter instead of in
//! process-global maps.

use async_trait::async_trait;

use crate::domain::foundation::ConversationId;

/// Port for keyed, evictable conversation state.
///
/// Reads return clones; a writer stores the whole value back with `put`.
/// Concurrent writers to one key are last-write-wins.
#[async_trait]
pub trait SessionStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Returns the value if present and not idle-expired.
    async fn get(&self, id: &ConversationId) -> Option<V>;

    /// Inserts or replaces the value and refreshes its idle timer.
    async fn put(&self, id: ConversationId, value: V);

    /// Removes the value, returning it if it was present.
    async fn remove(&self, id: &ConversationId) -> Option<V>;

    /// Drops idle-expired entries and returns how many were removed.
    async fn purge_expired(&self) -> usize;

    /// Number of live entries.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
