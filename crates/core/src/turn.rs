//! Turn and conversation domain types.
//!
//! A conversation is an append-only log of turns:
//! User submits input → Engine decides → Tools run → Answer is appended → Log is committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StateError;

/// Unique identifier for a conversation (chat).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The assistant (inquiries and answers)
    Assistant,
    /// Tool / retrieval output
    Tool,
}

/// What a turn means to the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    /// Free-form user input (`{"input": ...}`)
    Input,
    /// User picked a suggested related query (`{"related_query": ...}`)
    InputRelated,
    /// A clarifying question, or the user's reply to one
    Inquiry,
    /// A completed assistant answer
    Answer,
    /// Tool output
    Tool,
    /// Follow-up panel
    Followup,
    /// Related-queries panel
    Related,
    /// End-of-history sentinel, always last
    End,
}

impl TurnKind {
    /// Kinds that never reach a reasoning collaborator.
    pub fn is_presentation_only(self) -> bool {
        matches!(self, Self::Followup | Self::Related | Self::End)
    }
}

/// One immutable entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    pub role: Role,

    /// Raw payload, often JSON-encoded
    pub content: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TurnKind>,

    /// Only set for tool turns
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// Correlates the tool turns of one executor invocation with its answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Turn {
    fn with(role: Role, content: String, kind: Option<TurnKind>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            kind,
            tool_name: None,
            group_id: None,
            created_at: Utc::now(),
        }
    }

    /// Create a user turn.
    pub fn user(content: impl Into<String>, kind: Option<TurnKind>) -> Self {
        Self::with(Role::User, content.into(), kind)
    }

    /// Create an assistant inquiry turn (`"inquiry: " + question`).
    pub fn inquiry(question: &str) -> Self {
        Self::with(
            Role::Assistant,
            format!("inquiry: {question}"),
            Some(TurnKind::Inquiry),
        )
    }

    /// Create an assistant answer turn.
    pub fn answer(content: impl Into<String>, group_id: impl Into<String>) -> Self {
        let mut turn = Self::with(Role::Assistant, content.into(), Some(TurnKind::Answer));
        turn.group_id = Some(group_id.into());
        turn
    }

    /// Create a tool result turn.
    pub fn tool(
        tool_name: impl Into<String>,
        content: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        let mut turn = Self::with(Role::Tool, content.into(), Some(TurnKind::Tool));
        turn.tool_name = Some(tool_name.into());
        turn.group_id = Some(group_id.into());
        turn
    }

    /// Create the end-of-history sentinel for a conversation.
    ///
    /// The id is derived from the conversation so re-commits stay identical.
    pub fn end_sentinel(conversation_id: &ConversationId) -> Self {
        let mut turn = Self::with(Role::Assistant, "end".into(), Some(TurnKind::End));
        turn.id = format!("end-{conversation_id}");
        turn
    }

    pub fn is_kind(&self, kind: TurnKind) -> bool {
        self.kind == Some(kind)
    }

    /// Whether this turn belongs in the context sent to reasoning collaborators.
    pub fn is_context_eligible(&self) -> bool {
        self.role != Role::Tool && !self.kind.is_some_and(TurnKind::is_presentation_only)
    }
}

/// The full ordered turn log of one conversation.
///
/// Values are never mutated in place: `append` hands back a new state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation_id: ConversationId,
    pub turns: Vec<Turn>,
}

impl ConversationState {
    /// Create an empty conversation.
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            turns: Vec::new(),
        }
    }

    /// Return a copy of this conversation with `turn` appended.
    pub fn append(&self, turn: Turn) -> Result<Self, StateError> {
        if self.turns.last().is_some_and(|t| t.is_kind(TurnKind::End)) {
            return Err(StateError::AppendAfterEnd(self.conversation_id.to_string()));
        }
        if self.turns.iter().any(|t| t.id == turn.id) {
            return Err(StateError::DuplicateTurnId(turn.id));
        }
        let mut turns = self.turns.clone();
        turns.push(turn);
        Ok(Self {
            conversation_id: self.conversation_id.clone(),
            turns,
        })
    }

    /// Whether a completed answer exists (the commit precondition).
    pub fn has_answer(&self) -> bool {
        self.turns.iter().any(|t| t.is_kind(TurnKind::Answer))
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// The persisted form of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ConversationId,

    pub title: String,

    /// Route the chat is reachable under (`/chat/{id}`)
    pub path: String,

    #[serde(default)]
    pub user_id: String,

    pub created_at: DateTime<Utc>,

    /// Ordered turns, terminated by the end sentinel
    pub turns: Vec<Turn>,

    /// Set when the chat is rendered for a shared (read-only) view
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_shared: bool,
}

impl Chat {
    /// The conversation state this chat was committed from, sentinel removed.
    pub fn into_state(self) -> ConversationState {
        let mut turns = self.turns;
        if turns.last().is_some_and(|t| t.is_kind(TurnKind::End)) {
            turns.pop();
        }
        ConversationState {
            conversation_id: self.id,
            turns,
        }
    }
}
