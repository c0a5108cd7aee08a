//! The conversation orchestration engine.
//!
//! One user submission moves through a small state machine:
//!
//! 1. **Append** the user turn to the conversation
//! 2. **Build context**: the bounded, filtered window of recent turns
//! 3. **Route**: ask a clarifying question, or proceed
//! 4. **Inquire** (one generator call) or **Execute** (executor retry loop,
//!    tool turns appended as they arrive, answer appended last)
//! 5. **Commit** the conversation once it holds an answer
//! 6. **Finalize** every publisher key exactly once
//!
//! [`projection`] replays a stored conversation into view entries.

pub mod context;
pub mod log;
pub mod orchestrator;
pub mod projection;
pub mod retry;
pub mod router;
pub mod submission;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{MAX_CONTEXT, build_context};
pub use log::{CommitOutcome, MessageLog, title_for};
pub use orchestrator::{Orchestrator, Resolution, SubmissionOutcome};
pub use projection::{Display, ProjectionOptions, ViewEntry, project, project_chat, project_turns};
pub use retry::{AttemptOutcome, RetryPolicy};
pub use router::TaskRouter;
pub use submission::{FormData, Submission};
