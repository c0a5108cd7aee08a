//! Message log: loading and committing conversation state.
//!
//! The in-memory [`ConversationState`] is the working copy, grown with
//! [`ConversationState::append`]; a commit writes
//! the whole sequence at once, and only once an answer exists.

use chrono::Utc;
use parley_core::error::StoreError;
use parley_core::store::ChatStore;
use parley_core::turn::{Chat, ConversationId, ConversationState, Turn};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

const UNTITLED: &str = "Untitled";

/// What a commit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "commit", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// No answer yet, nothing written
    Skipped,
    /// Identical to what is stored, nothing written
    Unchanged,
    /// The chat was written
    Saved { turns: usize },
}

/// Load/append/commit over a [`ChatStore`].
#[derive(Clone)]
pub struct MessageLog {
    store: Arc<dyn ChatStore>,
    title_max_chars: usize,
}

impl MessageLog {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self {
            store,
            title_max_chars: 100,
        }
    }

    pub fn with_title_max_chars(mut self, max: usize) -> Self {
        self.title_max_chars = max;
        self
    }

    /// Load the stored conversation, sentinel stripped. Unknown ids start empty.
    pub async fn load_for(&self, id: &ConversationId) -> Result<ConversationState, StoreError> {
        match self.store.get(id).await? {
            Some(chat) => {
                debug!(conversation_id = %id, turns = chat.turns.len(), "Loaded conversation");
                Ok(chat.into_state())
            }
            None => Ok(ConversationState::new(id.clone())),
        }
    }

    /// Persist `state` if it holds an answer.
    pub async fn commit(&self, state: &ConversationState) -> Result<CommitOutcome, StoreError> {
        if !state.has_answer() {
            debug!(conversation_id = %state.conversation_id, "No answer yet, commit skipped");
            return Ok(CommitOutcome::Skipped);
        }

        let existing = self.store.get(&state.conversation_id).await?;
        let title = title_for(&state.turns, self.title_max_chars);

        if let Some(stored) = &existing
            && stored.title == title
            && stored.clone().into_state().turns == state.turns
        {
            debug!(conversation_id = %state.conversation_id, "Commit unchanged");
            return Ok(CommitOutcome::Unchanged);
        }

        let mut turns = state.turns.clone();
        turns.push(Turn::end_sentinel(&state.conversation_id));

        let chat = Chat {
            id: state.conversation_id.clone(),
            title,
            path: format!("/chat/{}", state.conversation_id),
            user_id: existing
                .as_ref()
                .map(|c| c.user_id.clone())
                .unwrap_or_default(),
            created_at: existing.as_ref().map_or_else(Utc::now, |c| c.created_at),
            turns,
            is_shared: existing.as_ref().is_some_and(|c| c.is_shared),
        };

        self.store.save(&chat).await?;
        info!(
            conversation_id = %chat.id,
            turns = chat.turns.len(),
            store = self.store.name(),
            "Conversation committed"
        );
        Ok(CommitOutcome::Saved {
            turns: chat.turns.len(),
        })
    }
}

/// Title of a chat: the first turn's `input` field, truncated.
pub fn title_for(turns: &[Turn], max_chars: usize) -> String {
    turns
        .first()
        .and_then(|t| serde_json::from_str::<serde_json::Value>(&t.content).ok())
        .and_then(|json| json.get("input").and_then(|v| v.as_str()).map(str::to_owned))
        .filter(|input| !input.is_empty())
        .map(|input| input.chars().take(max_chars).collect())
        .unwrap_or_else(|| UNTITLED.to_string())
}
