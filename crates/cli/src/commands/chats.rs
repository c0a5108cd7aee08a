//! `parley chats`: Inspect stored conversations.

use parley_config::AppConfig;
use parley_core::error::StoreError;
use parley_core::store::ChatStore;
use parley_core::turn::{Chat, ConversationId};
use parley_engine::projection::{ProjectionOptions, project_chat};
use parley_store::open_store;

pub async fn list(limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config.store).await?;

    let chats = store.list(limit).await?;
    if chats.is_empty() {
        println!("No chats stored ({} backend).", store.name());
        return Ok(());
    }

    println!("💬 {} of {} chats", chats.len(), store.count().await?);
    for chat in &chats {
        println!("{}", summary_line(chat));
    }
    Ok(())
}

pub async fn show(id: &str, shared: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config.store).await?;

    let mut options = ProjectionOptions::from_config(&config.projection);
    if shared {
        options = options.shared();
    }

    let replay = replay(store.as_ref(), id, &options).await?;
    println!("{replay}");
    Ok(())
}

pub async fn delete(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config.store).await?;

    if store.delete(&ConversationId::from(id)).await? {
        println!("🗑️  Deleted chat {id}");
    } else {
        return Err(StoreError::NotFound(id.to_string()).into());
    }
    Ok(())
}

/// Project a stored chat and render it as pretty JSON.
pub async fn replay(
    store: &dyn ChatStore,
    id: &str,
    options: &ProjectionOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let chat = store
        .get(&ConversationId::from(id))
        .await?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

    let entries = project_chat(&chat, options);
    tracing::debug!(chat_id = id, entries = entries.len(), "Replayed chat");
    Ok(serde_json::to_string_pretty(&entries)?)
}

fn summary_line(chat: &Chat) -> String {
    format!(
        "  {}  {:<40}  {:>3} turns  {}",
        chat.id,
        chat.title,
        chat.turns.len(),
        chat.created_at.format("%Y-%m-%d %H:%M")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::turn::{Turn, TurnKind};
    use parley_store::InMemoryChatStore;

    fn stored_chat(id: &str) -> Chat {
        let conversation_id = ConversationId::from(id);
        Chat {
            id: conversation_id.clone(),
            title: "hello".into(),
            path: format!("/chat/{id}"),
            user_id: String::new(),
            created_at: chrono::Utc::now(),
            turns: vec![
                Turn::user(r#"{"input":"hello"}"#, Some(TurnKind::Input)),
                Turn::user(r#"{"items":[]}"#, Some(TurnKind::Related)),
                Turn::answer("hi there", "g1"),
                Turn::end_sentinel(&conversation_id),
            ],
            is_shared: false,
        }
    }

    #[tokio::test]
    async fn replay_renders_view_entries() {
        let store = InMemoryChatStore::new();
        store.save(&stored_chat("c1")).await.unwrap();

        let json = replay(&store, "c1", &ProjectionOptions::default())
            .await
            .unwrap();
        let entries: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(entries.as_array().unwrap().len(), 3);
        assert_eq!(entries[0]["display"]["text"], "hello");
        assert_eq!(entries[2]["display"]["content"]["value"], "hi there");
    }

    #[tokio::test]
    async fn shared_replay_redacts_related() {
        let store = InMemoryChatStore::new();
        store.save(&stored_chat("c1")).await.unwrap();

        let json = replay(&store, "c1", &ProjectionOptions::default().shared())
            .await
            .unwrap();
        let entries: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(entries.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn replay_unknown_chat_fails() {
        let store = InMemoryChatStore::new();
        let err = replay(&store, "missing", &ProjectionOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn summary_line_shows_title_and_turns() {
        let line = summary_line(&stored_chat("c1"));
        assert!(line.contains("c1"));
        assert!(line.contains("hello"));
        assert!(line.contains("4 turns"));
    }
}
