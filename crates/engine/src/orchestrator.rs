//! The orchestration engine: one submission from routing to terminal state.
//!
//! ```text
//! Routing ──inquire──▶ Inquiring ──▶ Terminal
//!    └─────proceed──▶ Executing ──▶ Terminal
//! ```
//!
//! State is passed in and handed back (`ConversationState` in,
//! [`SubmissionOutcome`] out). The [`Publisher`] is finalized exactly once
//! per submission, whichever branch ran and whether or not it failed.

use chrono::Utc;
use parley_config::AppConfig;
use parley_core::collaborator::{
    ActionExecutor, ContextMessage, InquiryGenerator, NextAction, TaskRouterBackend,
};
use parley_core::error::Result;
use parley_core::event::{DomainEvent, EventBus};
use parley_core::store::ChatStore;
use parley_core::stream::{Publisher, Subscription, UiFragment};
use parley_core::turn::{ConversationId, ConversationState, Turn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::context::{MAX_CONTEXT, build_context};
use crate::log::{CommitOutcome, MessageLog};
use crate::retry::{AttemptOutcome, RetryPolicy};
use crate::router::TaskRouter;
use crate::submission::Submission;

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum Resolution {
    /// A clarifying question was asked
    Inquired { question: String },
    /// An answer turn was appended
    Answered { answer: String, attempts: u32 },
    /// The retry cap was reached without an answer
    Exhausted { attempts: u32 },
    /// The executor failed in a way retrying will not fix
    Unrecoverable { reason: String },
    /// The inquiry generator failed
    InquiryFailed { reason: String },
}

impl Resolution {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Inquired { .. } => "inquired",
            Self::Answered { .. } => "answered",
            Self::Exhausted { .. } => "exhausted",
            Self::Unrecoverable { .. } => "unrecoverable",
            Self::InquiryFailed { .. } => "inquiry_failed",
        }
    }

    /// The message the publisher ends with, for unsuccessful outcomes.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Inquired { .. } | Self::Answered { .. } => None,
            Self::Exhausted { attempts } => Some(format!("no answer after {attempts} attempts")),
            Self::Unrecoverable { reason } | Self::InquiryFailed { reason } => Some(reason.clone()),
        }
    }
}

/// Result of processing one submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    /// The conversation after this submission
    pub state: ConversationState,
    pub resolution: Resolution,
    pub commit: CommitOutcome,
}

/// Result of the executing branch.
enum Executed {
    Answered {
        answer: String,
        group_id: String,
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
    },
    Unrecoverable {
        reason: String,
    },
}

/// Drives submissions through the router, inquiry generator and executor.
#[derive(Clone)]
pub struct Orchestrator {
    router: TaskRouter,
    inquiry: Arc<dyn InquiryGenerator>,
    executor: Arc<dyn ActionExecutor>,
    log: MessageLog,
    event_bus: Arc<EventBus>,
    retry: RetryPolicy,
    max_context: usize,
    answer_delay: Duration,
    use_tools_only: bool,
}

impl Orchestrator {
    /// Create an orchestrator with default settings.
    pub fn new(
        router: Arc<dyn TaskRouterBackend>,
        inquiry: Arc<dyn InquiryGenerator>,
        executor: Arc<dyn ActionExecutor>,
        store: Arc<dyn ChatStore>,
    ) -> Self {
        Self {
            router: TaskRouter::new(router),
            inquiry,
            executor,
            log: MessageLog::new(store),
            event_bus: Arc::new(EventBus::default()),
            retry: RetryPolicy::default(),
            max_context: MAX_CONTEXT,
            answer_delay: Duration::from_millis(500),
            use_tools_only: false,
        }
    }

    /// Apply `[engine]` and `[chat]` settings.
    pub fn with_config(self, config: &AppConfig) -> Self {
        self.with_max_context(config.engine.max_context)
            .with_answer_delay(config.engine.answer_delay())
            .with_retry_policy(RetryPolicy::from_config(&config.engine.retry))
            .with_title_max_chars(config.chat.title_max_chars)
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Context window size, clamped to `1..=MAX_CONTEXT`.
    pub fn with_max_context(mut self, max_context: usize) -> Self {
        let clamped = max_context.clamp(1, MAX_CONTEXT);
        if clamped != max_context {
            warn!(requested = max_context, used = clamped, "Context window clamped");
        }
        self.max_context = clamped;
        self
    }

    /// Pause between a successful answer and appending it.
    pub fn with_answer_delay(mut self, delay: Duration) -> Self {
        self.answer_delay = delay;
        self
    }

    pub fn with_title_max_chars(mut self, max: usize) -> Self {
        self.log = self.log.with_title_max_chars(max);
        self
    }

    /// Ask the executor for tool calls only.
    pub fn with_use_tools_only(mut self, enabled: bool) -> Self {
        self.use_tools_only = enabled;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Start processing in the background and return the output streams at once.
    pub fn submit(
        &self,
        state: ConversationState,
        submission: Submission,
    ) -> (Subscription, JoinHandle<Result<SubmissionOutcome>>) {
        let (publisher, subscription) = Publisher::new();
        let engine = self.clone();
        let handle =
            tokio::spawn(async move { engine.process(state, submission, publisher).await });
        (subscription, handle)
    }

    /// Like [`submit`](Self::submit), loading the conversation from the store first.
    pub fn submit_for(
        &self,
        conversation_id: ConversationId,
        submission: Submission,
    ) -> (Subscription, JoinHandle<Result<SubmissionOutcome>>) {
        let (publisher, subscription) = Publisher::new();
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            let state = match engine.log.load_for(&conversation_id).await {
                Ok(state) => state,
                Err(e) => {
                    error!(conversation_id = %conversation_id, error = %e, "Failed to load conversation");
                    publisher.finish(Some(&e.to_string()));
                    return Err(e.into());
                }
            };
            engine.process(state, submission, publisher).await
        });
        (subscription, handle)
    }

    /// Process one submission to its terminal state.
    ///
    /// The publisher is always finalized before this returns, including on
    /// error. A persistence failure is returned as `Err`.
    pub async fn process(
        &self,
        state: ConversationState,
        submission: Submission,
        publisher: Publisher,
    ) -> Result<SubmissionOutcome> {
        let conversation_id = state.conversation_id.to_string();
        info!(
            conversation_id = %conversation_id,
            skip = submission.skip,
            "Processing submission"
        );
        self.event_bus.publish(DomainEvent::SubmissionReceived {
            conversation_id: conversation_id.clone(),
            skip: submission.skip,
            timestamp: Utc::now(),
        });

        let result = self.run(state, &submission, &publisher).await;

        let outcome_label = match &result {
            Ok(outcome) => {
                publisher.finish(outcome.resolution.error_message().as_deref());
                info!(
                    conversation_id = %conversation_id,
                    resolution = outcome.resolution.label(),
                    turns = outcome.state.len(),
                    "Submission finished"
                );
                outcome.resolution.label().to_string()
            }
            Err(e) => {
                error!(conversation_id = %conversation_id, error = %e, "Submission failed");
                publisher.finish(Some(&e.to_string()));
                "error".to_string()
            }
        };

        self.event_bus.publish(DomainEvent::SubmissionFinished {
            conversation_id,
            outcome: outcome_label,
            timestamp: Utc::now(),
        });
        result
    }

    async fn run(
        &self,
        state: ConversationState,
        submission: &Submission,
        publisher: &Publisher,
    ) -> Result<SubmissionOutcome> {
        let mut state = state;
        if let Some(turn) = submission.user_turn()? {
            state = state.append(turn)?;
        }

        // Routing
        let context = build_context(&state, self.max_context);
        let decision = self.router.decide(&context, submission.skip).await;
        self.event_bus.publish(DomainEvent::DecisionMade {
            conversation_id: state.conversation_id.to_string(),
            next: decision.next,
            skipped_router: submission.skip,
            timestamp: Utc::now(),
        });

        let (state, resolution) = match decision.next {
            NextAction::Inquire => self.inquire(state, &context, publisher).await?,
            NextAction::Proceed => self.execute(state, &context, publisher).await?,
        };

        let commit = self.log.commit(&state).await?;
        if let CommitOutcome::Saved { turns } = commit {
            self.event_bus.publish(DomainEvent::ConversationCommitted {
                conversation_id: state.conversation_id.to_string(),
                turns,
                timestamp: Utc::now(),
            });
        }

        Ok(SubmissionOutcome {
            state,
            resolution,
            commit,
        })
    }

    async fn inquire(
        &self,
        state: ConversationState,
        context: &[ContextMessage],
        publisher: &Publisher,
    ) -> Result<(ConversationState, Resolution)> {
        let inquiry = match self.inquiry.generate(publisher.ui_sink(), context).await {
            Ok(inquiry) => inquiry,
            Err(e) => {
                warn!(
                    conversation_id = %state.conversation_id,
                    generator = self.inquiry.name(),
                    error = %e,
                    "Inquiry generation failed"
                );
                return Ok((state, Resolution::InquiryFailed {
                    reason: e.to_string(),
                }));
            }
        };

        let state = state.append(Turn::inquiry(&inquiry.question))?;
        publisher.is_collapsed.done(Some(false));
        debug!(conversation_id = %state.conversation_id, "Inquiry appended");
        self.event_bus.publish(DomainEvent::InquiryIssued {
            conversation_id: state.conversation_id.to_string(),
            timestamp: Utc::now(),
        });

        Ok((state, Resolution::Inquired {
            question: inquiry.question,
        }))
    }

    async fn execute(
        &self,
        state: ConversationState,
        context: &[ContextMessage],
        publisher: &Publisher,
    ) -> Result<(ConversationState, Resolution)> {
        publisher.is_collapsed.done(Some(true));
        publisher.ui_sink().update(UiFragment::Spinner);

        let (mut state, executed) = self.retry_loop(state, context, publisher).await?;

        let resolution = match executed {
            Executed::Answered {
                answer,
                group_id,
                attempts,
            } => {
                publisher.text.done(Some(answer.clone()));
                if !self.answer_delay.is_zero() {
                    tokio::time::sleep(self.answer_delay).await;
                }
                state = state.append(Turn::answer(answer.clone(), group_id))?;
                self.event_bus.publish(DomainEvent::AnswerAppended {
                    conversation_id: state.conversation_id.to_string(),
                    attempts,
                    timestamp: Utc::now(),
                });
                Resolution::Answered { answer, attempts }
            }
            Executed::Exhausted { attempts } => {
                warn!(
                    conversation_id = %state.conversation_id,
                    attempts,
                    "Retry cap reached without an answer"
                );
                Resolution::Exhausted { attempts }
            }
            Executed::Unrecoverable { reason } => Resolution::Unrecoverable { reason },
        };

        Ok((state, resolution))
    }

    /// Invoke the executor until it answers, fails hard, or the policy says stop.
    ///
    /// Tool turns are appended as each invocation returns, under a group id
    /// minted for that invocation.
    async fn retry_loop(
        &self,
        mut state: ConversationState,
        context: &[ContextMessage],
        publisher: &Publisher,
    ) -> Result<(ConversationState, Executed)> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if !self.retry.allows(attempt) {
                return Ok((state, Executed::Exhausted {
                    attempts: attempt - 1,
                }));
            }
            if attempt > 1 && !self.retry.backoff.is_zero() {
                tokio::time::sleep(self.retry.backoff).await;
            }

            let group_id = Uuid::new_v4().to_string();
            debug!(
                conversation_id = %state.conversation_id,
                attempt,
                executor = self.executor.name(),
                "Invoking executor"
            );
            let result = self
                .retry
                .run_attempt(self.executor.run(
                    publisher.ui_sink(),
                    publisher.text_sink(),
                    context,
                    self.use_tools_only,
                ))
                .await;

            if let Ok(output) = &result {
                for response in &output.tool_responses {
                    let content = serde_json::to_string(&response.result)?;
                    state = state.append(Turn::tool(&response.tool_name, content, &group_id))?;
                    debug!(tool = %response.tool_name, group_id = %group_id, "Tool turn appended");
                    self.event_bus.publish(DomainEvent::ToolTurnAppended {
                        conversation_id: state.conversation_id.to_string(),
                        tool_name: response.tool_name.clone(),
                        group_id: group_id.clone(),
                        timestamp: Utc::now(),
                    });
                }
            }

            match RetryPolicy::classify(&result) {
                AttemptOutcome::Answered(answer) => {
                    return Ok((state, Executed::Answered {
                        answer,
                        group_id,
                        attempts: attempt,
                    }));
                }
                AttemptOutcome::Retry(reason) => {
                    warn!(
                        conversation_id = %state.conversation_id,
                        attempt,
                        reason = %reason,
                        "Executor attempt produced no answer, retrying"
                    );
                    self.attempt_failed(&state, attempt, reason);
                }
                AttemptOutcome::Unrecoverable(reason) => {
                    warn!(
                        conversation_id = %state.conversation_id,
                        attempt,
                        reason = %reason,
                        "Executor failed, giving up"
                    );
                    self.attempt_failed(&state, attempt, reason.clone());
                    return Ok((state, Executed::Unrecoverable { reason }));
                }
            }
        }
    }

    fn attempt_failed(&self, state: &ConversationState, attempt: u32, reason: String) {
        self.event_bus.publish(DomainEvent::AttemptFailed {
            conversation_id: state.conversation_id.to_string(),
            attempt,
            reason,
            timestamp: Utc::now(),
        });
    }
}
