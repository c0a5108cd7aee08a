//! Chat store implementations for parley.

pub mod file_backend;
pub mod in_memory;
pub mod noop;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file_backend::FileChatStore;
pub use in_memory::InMemoryChatStore;
pub use noop::NoopChatStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteChatStore;

use parley_config::StoreConfig;
use parley_core::error::StoreError;
use parley_core::store::ChatStore;
use std::sync::Arc;
use tracing::info;

/// Open the chat store selected by `[store].backend`.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn ChatStore>, StoreError> {
    let store: Arc<dyn ChatStore> = match config.backend.as_str() {
        "memory" => Arc::new(InMemoryChatStore::new()),
        "none" => Arc::new(NoopChatStore),
        "file" => Arc::new(FileChatStore::new(config.resolved_path())),
        #[cfg(feature = "sqlite")]
        "sqlite" => Arc::new(SqliteChatStore::open(&config.resolved_path()).await?),
        other => {
            return Err(StoreError::Storage(format!(
                "Unsupported chat store backend '{other}'"
            )));
        }
    };
    info!(backend = store.name(), "Chat store ready");
    Ok(store)
}

#[cfg(test)]
pub(crate) fn test_chat(id: &str, input: &str) -> parley_core::turn::Chat {
    use parley_core::turn::{Chat, ConversationId, Turn, TurnKind};

    let conversation_id = ConversationId::from(id);
    Chat {
        id: conversation_id.clone(),
        title: input.into(),
        path: format!("/chat/{id}"),
        user_id: String::new(),
        created_at: chrono::Utc::now(),
        turns: vec![
            Turn::user(
                serde_json::json!({ "input": input }).to_string(),
                Some(TurnKind::Input),
            ),
            Turn::answer("an answer", "g1"),
            Turn::end_sentinel(&conversation_id),
        ],
        is_shared: false,
    }
}
