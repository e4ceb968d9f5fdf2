//! In-Memory Session Store Adapter
//!
//! Bounded per-conversation store: least-recently-used entries are evicted
//! once `capacity` is reached, and entries idle longer than `idle_timeout`
//! are treated as absent and dropped by `purge_expired`.

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::domain::foundation::ConversationId;
use crate::ports::SessionStore;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    touched_at: Instant,
}

/// LRU + idle-TTL implementation of `SessionStore`.
#[derive(Clone)]
pub struct InMemorySessionStore<V> {
    entries: Arc<Mutex<LruCache<ConversationId, Entry<V>>>>,
    idle_timeout: Duration,
}

impl<V> InMemorySessionStore<V> {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize, idle_timeout: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Clear all stored data (useful for tests)
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    fn is_expired(&self, entry: &Entry<V>) -> bool {
        entry.touched_at.elapsed() > self.idle_timeout
    }
}

#[async_trait]
impl<V> SessionStore<V> for InMemorySessionStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, id: &ConversationId) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(id) {
            Some(entry) if !self.is_expired(entry) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(id);
            tracing::debug!(conversation_id = %id, "dropped idle session");
        }
        None
    }

    async fn put(&self, id: ConversationId, value: V) {
        let entry = Entry {
            value,
            touched_at: Instant::now(),
        };
        if let Some((evicted, _)) = self.entries.lock().await.push(id, entry) {
            if evicted != id {
                tracing::debug!(conversation_id = %evicted, "evicted least recently used session");
            }
        }
    }

    async fn remove(&self, id: &ConversationId) -> Option<V> {
        self.entries.lock().await.pop(id).map(|entry| entry.value)
    }

    async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let expired: Vec<ConversationId> = entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            entries.pop(id);
        }
        expired.len()
    }

    async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.iter().filter(|(_, entry)| !self.is_expired(entry)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(capacity: usize, idle: Duration) -> InMemorySessionStore<String> {
        InMemorySessionStore::new(capacity, idle)
    }

    #[tokio::test]
    async fn put_then_get_returns_value() {
        let store = store(10, Duration::from_secs(60));
        let id = ConversationId::new();

        assert!(store.get(&id).await.is_none());
        store.put(id, "state".to_string()).await;

        assert_eq!(store.get(&id).await.as_deref(), Some("state"));
        assert_eq!(store.len().await, 1);
        assert!(!store.is_empty().await);
    }

    #[tokio::test]
    async fn put_replaces_value() {
        let store = store(10, Duration::from_secs(60));
        let id = ConversationId::new();
        store.put(id, "a".to_string()).await;
        store.put(id, "b".to_string()).await;
        assert_eq!(store.get(&id).await.as_deref(), Some("b"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn evicts_least_recently_used_at_capacity() {
        let store = store(2, Duration::from_secs(60));
        let (a, b, c) = (ConversationId::new(), ConversationId::new(), ConversationId::new());
        store.put(a, "a".to_string()).await;
        store.put(b, "b".to_string()).await;
        // Touch `a` so `b` becomes the eviction candidate.
        store.get(&a).await;
        store.put(c, "c".to_string()).await;

        assert!(store.get(&a).await.is_some());
        assert!(store.get(&b).await.is_none());
        assert!(store.get(&c).await.is_some());
    }

    #[tokio::test]
    async fn idle_entries_expire() {
        let store = store(10, Duration::from_millis(20));
        let id = ConversationId::new();
        store.put(id, "old".to_string()).await;

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.len().await, 0);
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_expired() {
        let store = store(10, Duration::from_millis(30));
        let stale = ConversationId::new();
        store.put(stale, "stale".to_string()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        let fresh = ConversationId::new();
        store.put(fresh, "fresh".to_string()).await;

        assert_eq!(store.purge_expired().await, 1);
        assert!(store.get(&fresh).await.is_some());
    }

    #[tokio::test]
    async fn remove_returns_value() {
        let store = store(10, Duration::from_secs(60));
        let id = ConversationId::new();
        store.put(id, "x".to_string()).await;
        assert_eq!(store.remove(&id).await.as_deref(), Some("x"));
        assert!(store.remove(&id).await.is_none());
    }

    #[test]
    fn zero_capacity_is_raised() {
        let _store: InMemorySessionStore<String> = InMemorySessionStore::new(0, Duration::from_secs(1));
    }
}
