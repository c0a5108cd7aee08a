//! File-based chat store: persistent JSON-lines storage.
//!
//! Each line is one JSON-encoded `Chat`. The file is small enough to hold in
//! memory; it is loaded once and rewritten on every mutation.
//!
//! Storage location: `~/.parley/chats.jsonl`

use async_trait::async_trait;
use parley_core::error::StoreError;
use parley_core::store::ChatStore;
use parley_core::turn::{Chat, ConversationId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A file-backed chat store using JSONL (one chat per line).
///
/// Chats are loaded into memory on creation and flushed to disk on every
/// mutation (save, delete). This gives fast reads with durable writes.
pub struct FileChatStore {
    path: PathBuf,
    chats: Arc<RwLock<Vec<Chat>>>,
}

impl FileChatStore {
    /// Create a new file-based store at the given path.
    ///
    /// If the file exists, chats are loaded from it.
    /// If the file does not exist, starts empty (file created on first write).
    pub fn new(path: PathBuf) -> Self {
        let chats = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = chats.len(), "File chat store loaded");
        Self {
            path,
            chats: Arc::new(RwLock::new(chats)),
        }
    }

    /// Load chats from a JSONL file.
    fn load_from_disk(path: &Path) -> Vec<Chat> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Vec::new();
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Chat>(line) {
                Ok(chat) => Some(chat),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted chat line");
                    None
                }
            })
            .collect()
    }

    /// Flush all chats to disk as JSONL.
    ///
    /// Writes a sibling temp file, then renames it over the original.
    async fn flush(&self, chats: &[Chat]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Storage(format!("Failed to create chat directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for chat in chats {
            let line = serde_json::to_string(chat).map_err(|e| StoreError::Serialization {
                chat_id: chat.id.to_string(),
                reason: e.to_string(),
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, &content)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write chat file: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to replace chat file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl ChatStore for FileChatStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn save(&self, chat: &Chat) -> Result<(), StoreError> {
        let mut chats = self.chats.write().await;
        match chats.iter_mut().find(|c| c.id == chat.id) {
            Some(existing) => *existing = chat.clone(),
            None => chats.push(chat.clone()),
        }
        self.flush(&chats).await
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Chat>, StoreError> {
        let chats = self.chats.read().await;
        Ok(chats.iter().find(|c| &c.id == id).cloned())
    }

    async fn list(&self, limit: usize) -> Result<Vec<Chat>, StoreError> {
        let mut listed = self.chats.read().await.clone();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        listed.truncate(limit);
        Ok(listed)
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, StoreError> {
        let mut chats = self.chats.write().await;
        let len_before = chats.len();
        chats.retain(|c| &c.id != id);
        let deleted = chats.len() < len_before;
        if deleted {
            self.flush(&chats).await?;
        }
        Ok(deleted)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.chats.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_chat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chats.jsonl");
        (dir, path)
    }

    #[tokio::test]
    async fn save_persists_across_reload() {
        let (_dir, path) = temp_path();

        let store = FileChatStore::new(path.clone());
        store.save(&test_chat("c1", "Rust is great")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Rust is great"));

        let reloaded = FileChatStore::new(path);
        let chat = reloaded.get(&ConversationId::from("c1")).await.unwrap().unwrap();
        assert_eq!(chat.turns.len(), 3);
        assert_eq!(chat.title, "Rust is great");
    }

    #[tokio::test]
    async fn resave_keeps_one_line_per_chat() {
        let (_dir, path) = temp_path();
        let store = FileChatStore::new(path.clone());
        let chat = test_chat("c1", "again");
        store.save(&chat).await.unwrap();
        store.save(&chat).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn delete_persists() {
        let (_dir, path) = temp_path();
        let store = FileChatStore::new(path.clone());
        store.save(&test_chat("c1", "to be deleted")).await.unwrap();
        assert!(store.delete(&ConversationId::from("c1")).await.unwrap());

        let reloaded = FileChatStore::new(path);
        assert_eq!(reloaded.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn handles_missing_file_gracefully() {
        let (_dir, path) = temp_path();
        let store = FileChatStore::new(path);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn handles_corrupted_lines() {
        let mut tmp = NamedTempFile::new().unwrap();
        let valid = serde_json::to_string(&test_chat("c1", "valid")).unwrap();
        writeln!(tmp, "{valid}").unwrap();
        writeln!(tmp, "this is not json").unwrap();

        let store = FileChatStore::new(tmp.path().to_path_buf());
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
