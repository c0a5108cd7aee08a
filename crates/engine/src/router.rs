//! Task router: picks between asking a clarifying question and answering.

use parley_core::collaborator::{ActionDecision, ContextMessage, TaskRouterBackend};
use std::sync::Arc;
use tracing::{debug, warn};

/// Wraps a [`TaskRouterBackend`] with skip handling and fail-open recovery.
#[derive(Clone)]
pub struct TaskRouter {
    backend: Arc<dyn TaskRouterBackend>,
}

impl TaskRouter {
    pub fn new(backend: Arc<dyn TaskRouterBackend>) -> Self {
        Self { backend }
    }

    /// Decide the next action.
    ///
    /// With `skip` the backend is never consulted and the answer is
    /// `proceed`. A backend failure also yields `proceed`.
    pub async fn decide(&self, context: &[ContextMessage], skip: bool) -> ActionDecision {
        if skip {
            debug!("Router bypassed by skip");
            return ActionDecision::proceed();
        }

        match self.backend.decide(context).await {
            Ok(decision) => {
                debug!(backend = self.backend.name(), decision = ?decision.next, "Router decided");
                decision
            }
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Router failed, proceeding");
                ActionDecision::proceed()
            }
        }
    }
}
