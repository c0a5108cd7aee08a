//! Collaborator traits: the reasoning and retrieval services the engine drives.
//!
//! Each backend (a hosted model, a retrieval chain, a scripted stub) implements
//! these traits. The engine only ever sees the bounded context and the
//! publisher sinks; prompt formats and transports stay behind the trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::stream::{TextSink, UiSink};
use crate::turn::Role;

/// One `{role, content}` pair of the bounded context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: Role,
    pub content: String,
}

/// What the engine should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    /// Ask the user a clarifying question.
    Inquire,
    /// Go ahead and answer.
    #[default]
    Proceed,
}

/// Output of the task router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionDecision {
    pub next: NextAction,
}

impl ActionDecision {
    pub fn proceed() -> Self {
        Self {
            next: NextAction::Proceed,
        }
    }

    pub fn inquire() -> Self {
        Self {
            next: NextAction::Inquire,
        }
    }
}

/// A clarifying question produced by the inquiry generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inquiry {
    pub question: String,
}

/// The result of one tool call made during an executor invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub tool_name: String,
    pub result: serde_json::Value,
}

/// The result of one executor invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorOutput {
    /// Final answer text; empty means "no answer yet"
    pub full_response: String,

    /// The executor hit an unrecoverable error
    #[serde(default)]
    pub has_error: bool,

    #[serde(default)]
    pub tool_responses: Vec<ToolResponse>,
}

/// Decides between asking a clarifying question and answering.
#[async_trait]
pub trait TaskRouterBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn decide(&self, context: &[ContextMessage]) -> Result<ActionDecision, CollaboratorError>;
}

/// Produces a clarifying question, streaming fragments into `ui` as it goes.
#[async_trait]
pub trait InquiryGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        ui: UiSink<'_>,
        context: &[ContextMessage],
    ) -> Result<Inquiry, CollaboratorError>;
}

/// Performs retrieval/tool calls and/or produces the final answer.
///
/// Streams presentable fragments into `ui` and raw answer text into `text`.
/// Neither sink can end the stream; the engine does that once per submission.
/// With `use_tools_only` the executor should only call tools and leave the
/// answer to a later invocation.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        ui: UiSink<'_>,
        text: TextSink<'_>,
        context: &[ContextMessage],
        use_tools_only: bool,
    ) -> Result<ExecutorOutput, CollaboratorError>;
}
