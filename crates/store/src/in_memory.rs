//! In-memory chat store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use parley_core::error::StoreError;
use parley_core::store::ChatStore;
use parley_core::turn::{Chat, ConversationId};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// A chat store that keeps chats in a Vec, in insertion order.
#[derive(Clone)]
pub struct InMemoryChatStore {
    chats: Arc<RwLock<Vec<Chat>>>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self {
            chats: Arc::new(RwLock::new(Vec::new())),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `save` calls received so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryChatStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save(&self, chat: &Chat) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let mut chats = self.chats.write().await;
        match chats.iter_mut().find(|c| c.id == chat.id) {
            Some(existing) => *existing = chat.clone(),
            None => chats.push(chat.clone()),
        }
        Ok(())
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Chat>, StoreError> {
        let chats = self.chats.read().await;
        Ok(chats.iter().find(|c| &c.id == id).cloned())
    }

    async fn list(&self, limit: usize) -> Result<Vec<Chat>, StoreError> {
        let chats = self.chats.read().await;
        let mut listed: Vec<Chat> = chats.clone();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        listed.truncate(limit);
        Ok(listed)
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, StoreError> {
        let mut chats = self.chats.write().await;
        let len_before = chats.len();
        chats.retain(|c| &c.id != id);
        Ok(chats.len() < len_before)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.chats.read().await.len())
    }
}
