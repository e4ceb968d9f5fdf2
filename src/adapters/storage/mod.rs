//! Storage Adapters
//!
//! In-process implementations of the storage ports.
//!
//! ## Available Adapters
//!
//! - **InMemorySessionStore** - LRU + idle-TTL store for per-conversation state
//! - **InMemoryMessageStore** - Conversation messages in memory
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::InMemorySessionStore;
//!
//! let flows: InMemorySessionStore<ConversationFlow> =
//!     InMemorySessionStore::new(10_000, Duration::from_secs(3600));
//! ```

mod in_memory_message_store;
mod in_memory_session_store;

pub use in_memory_message_store::InMemoryMessageStore;
pub use in_memory_session_store::InMemorySessionStore;
