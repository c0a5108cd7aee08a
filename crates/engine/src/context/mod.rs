//! Bounded context: the slice of a conversation reasoning collaborators see.
//!
//! Tool output and presentation-only turns (followup, related, end) are
//! filtered out, then the oldest entries are dropped until at most
//! `max_context` remain. Nothing here is persisted.

pub mod window;

pub use window::{MAX_CONTEXT, build_context};
