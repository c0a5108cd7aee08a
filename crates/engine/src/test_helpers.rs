//! Scripted collaborators for engine tests.

use async_trait::async_trait;
use parley_core::collaborator::{
    ActionDecision, ActionExecutor, ContextMessage, ExecutorOutput, Inquiry, InquiryGenerator,
    TaskRouterBackend, ToolResponse,
};
use parley_core::error::CollaboratorError;
use parley_core::stream::{TextSink, UiFragment, UiSink};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A router that replays a fixed result.
pub struct ScriptedRouter {
    result: Result<ActionDecision, CollaboratorError>,
    calls: AtomicUsize,
    contexts: Mutex<Vec<Vec<ContextMessage>>>,
}

impl ScriptedRouter {
    pub fn always(decision: ActionDecision) -> Self {
        Self {
            result: Ok(decision),
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: CollaboratorError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Contexts seen so far, one per call.
    pub fn contexts(&self) -> Vec<Vec<ContextMessage>> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskRouterBackend for ScriptedRouter {
    fn name(&self) -> &str {
        "scripted_router"
    }

    async fn decide(&self, context: &[ContextMessage]) -> Result<ActionDecision, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(context.to_vec());
        self.result.clone()
    }
}

/// An inquiry generator that streams its question, then returns it.
pub struct ScriptedInquiry {
    result: Result<Inquiry, CollaboratorError>,
    calls: AtomicUsize,
}

impl ScriptedInquiry {
    pub fn asking(question: &str) -> Self {
        Self {
            result: Ok(Inquiry {
                question: question.into(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: CollaboratorError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InquiryGenerator for ScriptedInquiry {
    fn name(&self) -> &str {
        "scripted_inquiry"
    }

    async fn generate(
        &self,
        ui: UiSink<'_>,
        _context: &[ContextMessage],
    ) -> Result<Inquiry, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(inquiry) = &self.result {
            ui.update(UiFragment::Inquiry {
                question: inquiry.question.clone(),
            });
        }
        self.result.clone()
    }
}

/// An executor that replays a script of results, one per call.
///
/// Once the script runs out, the last entry repeats.
pub struct ScriptedExecutor {
    script: Vec<Result<ExecutorOutput, CollaboratorError>>,
    calls: AtomicUsize,
    saw_tools_only: AtomicBool,
}

impl ScriptedExecutor {
    pub fn new(script: Vec<Result<ExecutorOutput, CollaboratorError>>) -> Self {
        assert!(!script.is_empty(), "ScriptedExecutor needs at least one result");
        Self {
            script,
            calls: AtomicUsize::new(0),
            saw_tools_only: AtomicBool::new(false),
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::new(vec![Ok(answer(text))])
    }

    /// Always returns an empty answer without an error flag.
    pub fn silent() -> Self {
        Self::new(vec![Ok(ExecutorOutput::default())])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether any call was made with `use_tools_only` set.
    pub fn saw_tools_only(&self) -> bool {
        self.saw_tools_only.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionExecutor for ScriptedExecutor {
    fn name(&self) -> &str {
        "scripted_executor"
    }

    async fn run(
        &self,
        ui: UiSink<'_>,
        text: TextSink<'_>,
        _context: &[ContextMessage],
        use_tools_only: bool,
    ) -> Result<ExecutorOutput, CollaboratorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if use_tools_only {
            self.saw_tools_only.store(true, Ordering::SeqCst);
        }
        let result = self.script[call.min(self.script.len() - 1)].clone();

        if let Ok(output) = &result {
            for tool in &output.tool_responses {
                ui.append(UiFragment::ToolResult {
                    tool_name: tool.tool_name.clone(),
                    data: tool.result.clone(),
                });
            }
            if !output.full_response.is_empty() {
                text.update(output.full_response.clone());
                ui.append(UiFragment::Message {
                    content: output.full_response.clone(),
                });
            }
        }
        result
    }
}

/// An executor that never returns.
pub struct HangingExecutor;

#[async_trait]
impl ActionExecutor for HangingExecutor {
    fn name(&self) -> &str {
        "hanging_executor"
    }

    async fn run(
        &self,
        _ui: UiSink<'_>,
        _text: TextSink<'_>,
        _context: &[ContextMessage],
        _use_tools_only: bool,
    ) -> Result<ExecutorOutput, CollaboratorError> {
        std::future::pending().await
    }
}

/// A plain answer.
pub fn answer(text: &str) -> ExecutorOutput {
    ExecutorOutput {
        full_response: text.into(),
        has_error: false,
        tool_responses: vec![],
    }
}

/// Partial output with the error flag set.
pub fn errored(text: &str) -> ExecutorOutput {
    ExecutorOutput {
        full_response: text.into(),
        has_error: true,
        tool_responses: vec![],
    }
}

/// An answer backed by tool output.
pub fn answer_with_tools(text: &str, tools: Vec<(&str, serde_json::Value)>) -> ExecutorOutput {
    ExecutorOutput {
        full_response: text.into(),
        has_error: false,
        tool_responses: tools
            .into_iter()
            .map(|(name, result)| ToolResponse {
                tool_name: name.into(),
                result,
            })
            .collect(),
    }
}
