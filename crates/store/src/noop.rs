//! No-op chat store: disables persistence entirely.

use async_trait::async_trait;
use parley_core::error::StoreError;
use parley_core::store::ChatStore;
use parley_core::turn::{Chat, ConversationId};

/// A chat store that stores nothing.
pub struct NoopChatStore;

#[async_trait]
impl ChatStore for NoopChatStore {
    fn name(&self) -> &str {
        "none"
    }

    async fn save(&self, _chat: &Chat) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, _id: &ConversationId) -> Result<Option<Chat>, StoreError> {
        Ok(None)
    }

    async fn list(&self, _limit: usize) -> Result<Vec<Chat>, StoreError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _id: &ConversationId) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}
