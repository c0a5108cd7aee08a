//! Projection: replay a conversation log into presentation-ready view entries.
//!
//! Projection is a pure function of the turn sequence. It never fails:
//! malformed stored content degrades to an [`Display::Empty`] entry and is
//! logged, so one bad turn cannot take down a whole replay.

use parley_config::ProjectionConfig;
use parley_core::stream::ValueSnapshot;
use parley_core::turn::{Chat, ConversationState, Role, Turn, TurnKind};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Options that shape a projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionOptions {
    /// Hide related-query panels (read-only shared view)
    pub redact_related_for_shared_view: bool,

    /// Tool names that have a result renderer
    pub presentable_tools: Vec<String>,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            redact_related_for_shared_view: false,
            presentable_tools: vec!["retrieve".into()],
        }
    }
}

impl ProjectionOptions {
    pub fn from_config(config: &ProjectionConfig) -> Self {
        Self {
            redact_related_for_shared_view: false,
            presentable_tools: config.presentable_tools.clone(),
        }
    }

    /// Same options, rendered for a shared view.
    pub fn shared(mut self) -> Self {
        self.redact_related_for_shared_view = true;
        self
    }

    fn is_presentable(&self, tool_name: &str) -> bool {
        self.presentable_tools.iter().any(|t| t == tool_name)
    }
}

/// What a view entry renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Display {
    /// The user's own text
    UserMessage { text: String },
    /// A reply to a clarifying question, shown raw
    Inquiry { content: String },
    /// A settled assistant answer
    Answer { content: ValueSnapshot<String> },
    /// Structured output of a presentable tool
    ToolResult { tool_name: String, data: Value },
    /// Nothing to render
    Empty,
}

/// One presentation record derived from a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewEntry {
    /// The originating turn's id
    pub id: String,
    pub display: Display,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_flag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse_flag: Option<bool>,
}

impl ViewEntry {
    fn new(id: &str, display: Display) -> Self {
        Self {
            id: id.to_string(),
            display,
            generation_flag: None,
            collapse_flag: None,
        }
    }

    fn empty(id: &str) -> Self {
        Self::new(id, Display::Empty)
    }
}

/// Project a conversation state into view entries.
pub fn project(state: &ConversationState, options: &ProjectionOptions) -> Vec<ViewEntry> {
    project_turns(&state.turns, options)
}

/// Project a stored chat. A chat flagged as shared is always redacted.
pub fn project_chat(chat: &Chat, options: &ProjectionOptions) -> Vec<ViewEntry> {
    if chat.is_shared && !options.redact_related_for_shared_view {
        let shared = options.clone().shared();
        return project_turns(&chat.turns, &shared);
    }
    project_turns(&chat.turns, options)
}

/// Project a raw turn sequence (the end sentinel, if any, folds into nothing).
pub fn project_turns(turns: &[Turn], options: &ProjectionOptions) -> Vec<ViewEntry> {
    turns
        .iter()
        .filter_map(|turn| project_turn(turn, options))
        .collect()
}

fn project_turn(turn: &Turn, options: &ProjectionOptions) -> Option<ViewEntry> {
    let kind = turn.kind?;
    match kind {
        TurnKind::End => return None,
        TurnKind::Related if options.redact_related_for_shared_view => return None,
        _ => {}
    }

    let entry = match (turn.role, kind) {
        (Role::User, TurnKind::Input) => user_entry(turn, "input"),
        (Role::User, TurnKind::InputRelated) => user_entry(turn, "related_query"),
        (Role::User, TurnKind::Inquiry) => ViewEntry::new(
            &turn.id,
            Display::Inquiry {
                content: turn.content.clone(),
            },
        ),
        (Role::Assistant, TurnKind::Answer) => ViewEntry::new(
            &turn.id,
            Display::Answer {
                content: ValueSnapshot::completed(turn.content.clone()),
            },
        ),
        (Role::Tool, _) => tool_entry(turn, options),
        _ => ViewEntry::empty(&turn.id),
    };
    Some(entry)
}

fn user_entry(turn: &Turn, field: &str) -> ViewEntry {
    let text = decode(turn).and_then(|json| match json.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => {
            warn!(turn_id = %turn.id, field, "User turn is missing its display field");
            None
        }
        Some(other) => Some(other.to_string()),
    });

    match text {
        Some(text) => ViewEntry::new(&turn.id, Display::UserMessage { text }),
        None => ViewEntry::empty(&turn.id),
    }
}

fn tool_entry(turn: &Turn, options: &ProjectionOptions) -> ViewEntry {
    let Some(data) = decode(turn) else {
        return ViewEntry::empty(&turn.id);
    };
    match turn.tool_name.as_deref() {
        Some(name) if options.is_presentable(name) => ViewEntry {
            id: turn.id.clone(),
            display: Display::ToolResult {
                tool_name: name.to_string(),
                data,
            },
            generation_flag: None,
            collapse_flag: Some(true),
        },
        _ => ViewEntry::empty(&turn.id),
    }
}

fn decode(turn: &Turn) -> Option<Value> {
    match serde_json::from_str(&turn.content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(turn_id = %turn.id, error = %e, "Undecodable turn content");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::stream::StreamStatus;
    use parley_core::turn::ConversationId;
    use serde_json::json;

    fn state_of(turns: Vec<Turn>) -> ConversationState {
        turns
            .into_iter()
            .fold(ConversationState::new(ConversationId::from("c1")), |s, t| {
                s.append(t).unwrap()
            })
    }

    #[test]
    fn user_input_round_trip() {
        let state = state_of(vec![Turn::user(r#"{"input":"hello"}"#, Some(TurnKind::Input))]);
        let entries = project(&state, &ProjectionOptions::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].display,
            Display::UserMessage {
                text: "hello".into()
            }
        );
        assert_eq!(entries[0].id, state.turns[0].id);
    }

    #[test]
    fn related_query_selects_its_field() {
        let state = state_of(vec![Turn::user(
            r#"{"related_query":"why?"}"#,
            Some(TurnKind::InputRelated),
        )]);
        let entries = project(&state, &ProjectionOptions::default());
        assert_eq!(entries[0].display, Display::UserMessage { text: "why?".into() });
    }

    #[test]
    fn answer_is_a_completed_value() {
        let state = state_of(vec![Turn::answer("42", "g1")]);
        let entries = project(&state, &ProjectionOptions::default());
        let Display::Answer { content } = &entries[0].display else {
            panic!("expected answer");
        };
        assert_eq!(content.value.as_deref(), Some("42"));
        assert_eq!(content.status, StreamStatus::Done);
    }

    #[test]
    fn skips_untyped_and_sentinel() {
        let id = ConversationId::from("c1");
        let state = state_of(vec![
            Turn::user(r#"{"action":"skip"}"#, None),
            Turn::answer("a", "g"),
            Turn::end_sentinel(&id),
        ]);
        let entries = project(&state, &ProjectionOptions::default());
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn related_is_redacted_only_for_shared_view() {
        let state = state_of(vec![Turn::user("{}", Some(TurnKind::Related))]);
        let private = project(&state, &ProjectionOptions::default());
        assert_eq!(private.len(), 1);
        assert_eq!(private[0].display, Display::Empty);

        let shared = project(&state, &ProjectionOptions::default().shared());
        assert!(shared.is_empty());
    }

    #[test]
    fn presentable_tool_is_collapsed() {
        let state = state_of(vec![Turn::tool(
            "retrieve",
            json!({"results": [1, 2]}).to_string(),
            "g1",
        )]);
        let entries = project(&state, &ProjectionOptions::default());
        assert_eq!(entries[0].collapse_flag, Some(true));
        assert_eq!(
            entries[0].display,
            Display::ToolResult {
                tool_name: "retrieve".into(),
                data: json!({"results": [1, 2]}),
            }
        );
    }

    #[test]
    fn malformed_content_degrades_to_empty() {
        let state = state_of(vec![
            Turn::user("not json", Some(TurnKind::Input)),
            Turn::user(r#"{"other":"x"}"#, Some(TurnKind::Input)),
            Turn::tool("retrieve", "{broken", "g1"),
            Turn::tool("calculator", "{}", "g1"),
            Turn::inquiry("which year?"),
        ]);
        let entries = project(&state, &ProjectionOptions::default());
        assert_eq!(entries.len(), 5);
        assert!(entries.iter().all(|e| e.display == Display::Empty));
    }

    #[test]
    fn projection_is_idempotent() {
        let state = state_of(vec![
            Turn::user(r#"{"input":"q"}"#, Some(TurnKind::Input)),
            Turn::tool("retrieve", "[]", "g1"),
            Turn::answer("a", "g1"),
        ]);
        let options = ProjectionOptions::default();
        assert_eq!(project(&state, &options), project(&state, &options));
    }

    #[test]
    fn shared_chat_forces_redaction() {
        let id = ConversationId::from("c1");
        let chat = Chat {
            id: id.clone(),
            title: "t".into(),
            path: "/chat/c1".into(),
            user_id: String::new(),
            created_at: chrono::Utc::now(),
            turns: vec![
                Turn::user("{}", Some(TurnKind::Related)),
                Turn::answer("a", "g"),
                Turn::end_sentinel(&id),
            ],
            is_shared: true,
        };
        let entries = project_chat(&chat, &ProjectionOptions::default());
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn view_entry_serializes_without_unset_flags() {
        let entry = ViewEntry::new("t1", Display::UserMessage { text: "hi".into() });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["display"]["kind"], "user_message");
        assert!(json.get("collapse_flag").is_none());
    }
}
