//! # Parley Core
//!
//! Domain types, traits, and error definitions for the parley conversation
//! engine. This crate has **no framework dependencies** beyond the async
//! primitives. It defines the model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live
//! elsewhere. This enables:
//! - Swapping storage backends via configuration
//! - Testing the engine with scripted collaborators
//! - Clean dependency graph (all crates depend inward on core)

pub mod collaborator;
pub mod error;
pub mod event;
pub mod store;
pub mod stream;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use collaborator::{
    ActionDecision, ActionExecutor, ContextMessage, ExecutorOutput, Inquiry, InquiryGenerator,
    NextAction, TaskRouterBackend, ToolResponse,
};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use store::ChatStore;
pub use stream::{
    Publisher, StreamStatus, StreamableValue, Subscription, TextSink, UiEvent, UiFragment,
    UiReceiver, UiSink, UiStream, ValueReader, ValueSnapshot,
};
pub use turn::{Chat, ConversationId, ConversationState, Role, Turn, TurnKind};
