//! Context window construction.

use parley_core::collaborator::ContextMessage;
use parley_core::turn::ConversationState;

/// Hard cap on context entries. Smaller windows are allowed, larger ones are clamped.
pub const MAX_CONTEXT: usize = parley_config::MAX_CONTEXT;

/// Build the bounded context for `state`, keeping the most recent
/// `max_context` eligible turns (never more than [`MAX_CONTEXT`]) in their
/// original order.
pub fn build_context(state: &ConversationState, max_context: usize) -> Vec<ContextMessage> {
    let max_context = max_context.min(MAX_CONTEXT);
    let eligible: Vec<ContextMessage> = state
        .turns
        .iter()
        .filter(|t| t.is_context_eligible())
        .map(|t| ContextMessage {
            role: t.role,
            content: t.content.clone(),
        })
        .collect();

    let skip = eligible.len().saturating_sub(max_context);
    eligible.into_iter().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::turn::{ConversationId, Role, Turn, TurnKind};

    fn state_of(turns: Vec<Turn>) -> ConversationState {
        turns
            .into_iter()
            .fold(ConversationState::new(ConversationId::from("c1")), |s, t| {
                s.append(t).unwrap()
            })
    }

    #[test]
    fn excludes_tool_and_presentation_turns() {
        let id = ConversationId::from("c1");
        let state = state_of(vec![
            Turn::user(r#"{"input":"q"}"#, Some(TurnKind::Input)),
            Turn::tool("retrieve", "{}", "g1"),
            Turn::user("f", Some(TurnKind::Followup)),
            Turn::user("r", Some(TurnKind::Related)),
            Turn::answer("a", "g1"),
            Turn::end_sentinel(&id),
        ]);

        let context = build_context(&state, MAX_CONTEXT);
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].role, Role::User);
        assert_eq!(context[1].content, "a");
        assert!(context.iter().all(|m| m.role != Role::Tool));
    }

    #[test]
    fn keeps_most_recent_ten_in_order() {
        let turns = (0..15)
            .map(|i| Turn::user(format!("m{i}"), Some(TurnKind::Input)))
            .collect();
        let state = state_of(turns);

        let context = build_context(&state, MAX_CONTEXT);
        let contents: Vec<&str> = context.iter().map(|m| m.content.as_str()).collect();
        let expected: Vec<String> = (5..15).map(|i| format!("m{i}")).collect();
        assert_eq!(contents, expected);
    }

    #[test]
    fn untyped_turns_are_eligible() {
        let state = state_of(vec![Turn::user(r#"{"action":"skip"}"#, None)]);
        assert_eq!(build_context(&state, 3).len(), 1);
    }

    #[test]
    fn never_exceeds_cap_for_any_length() {
        for n in 0..25 {
            let turns = (0..n)
                .map(|i| {
                    if i % 3 == 0 {
                        Turn::tool("retrieve", "{}", "g")
                    } else {
                        Turn::user(format!("m{i}"), Some(TurnKind::Input))
                    }
                })
                .collect();
            let context = build_context(&state_of(turns), MAX_CONTEXT);
            assert!(context.len() <= MAX_CONTEXT);
            assert!(context.iter().all(|m| m.role != Role::Tool));
        }
    }

    #[test]
    fn oversized_window_is_clamped_to_cap() {
        let turns = (0..15)
            .map(|i| Turn::user(format!("m{i}"), Some(TurnKind::Input)))
            .collect();
        let context = build_context(&state_of(turns), 50);
        assert_eq!(context.len(), MAX_CONTEXT);
        assert_eq!(context[0].content, "m5");
    }
}
