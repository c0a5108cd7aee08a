//! Domain event system: observe the engine without coupling to it.
//!
//! Events are published as a submission moves through routing, execution
//! and commit. Subscribers (metrics, audit, debugging) filter what they need.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::collaborator::NextAction;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A user submission entered the engine
    SubmissionReceived {
        conversation_id: String,
        skip: bool,
        timestamp: DateTime<Utc>,
    },

    /// The task router (or a skip) settled on the next action
    DecisionMade {
        conversation_id: String,
        next: NextAction,
        skipped_router: bool,
        timestamp: DateTime<Utc>,
    },

    /// A clarifying question was asked
    InquiryIssued {
        conversation_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool result was appended to the log
    ToolTurnAppended {
        conversation_id: String,
        tool_name: String,
        group_id: String,
        timestamp: DateTime<Utc>,
    },

    /// An executor attempt produced no answer
    AttemptFailed {
        conversation_id: String,
        attempt: u32,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// An answer turn was appended
    AnswerAppended {
        conversation_id: String,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// The conversation was persisted
    ConversationCommitted {
        conversation_id: String,
        turns: usize,
        timestamp: DateTime<Utc>,
    },

    /// The submission reached its terminal state
    SubmissionFinished {
        conversation_id: String,
        outcome: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
