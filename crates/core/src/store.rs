//! Chat store trait: durable storage of committed conversations.
//!
//! The engine only ever writes through `save`, invoked from a commit.
//! Readers (history listing, replay on reconnect) use the rest.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::turn::{Chat, ConversationId};

/// The core ChatStore trait.
///
/// Implementations: SQLite, JSON-lines file, in-memory (for testing), none (no-op).
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "file", "none").
    fn name(&self) -> &str;

    /// Insert or replace a chat.
    async fn save(&self, chat: &Chat) -> std::result::Result<(), StoreError>;

    /// Get a chat by ID.
    async fn get(&self, id: &ConversationId) -> std::result::Result<Option<Chat>, StoreError>;

    /// List chats, most recently created first.
    async fn list(&self, limit: usize) -> std::result::Result<Vec<Chat>, StoreError>;

    /// Delete a chat by ID.
    async fn delete(&self, id: &ConversationId) -> std::result::Result<bool, StoreError>;

    /// Get total chat count.
    async fn count(&self) -> std::result::Result<usize, StoreError>;
}
