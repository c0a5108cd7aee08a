//! Retry policy for the action executor.
//!
//! Every executor invocation is classified into one [`AttemptOutcome`]; the
//! policy decides whether another attempt is allowed. The executing loop
//! ends in exactly one of three ways: answered, exhausted, unrecoverable.

use parley_config::RetryConfig;
use parley_core::collaborator::ExecutorOutput;
use parley_core::error::CollaboratorError;
use std::future::Future;
use std::time::Duration;

/// How one executor invocation went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A non-empty answer with no error flag
    Answered(String),
    /// Nothing usable yet; worth another try
    Retry(String),
    /// Stop immediately
    Unrecoverable(String),
}

/// Bounded-or-unbounded retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` retries until answered or unrecoverable
    pub max_attempts: Option<u32>,
    pub attempt_timeout: Option<Duration>,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::bounded(5)
    }
}

impl RetryPolicy {
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            attempt_timeout: None,
            backoff: Duration::ZERO,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            attempt_timeout: None,
            backoff: Duration::ZERO,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: (!config.unbounded).then_some(config.max_attempts),
            attempt_timeout: config.attempt_timeout_secs.map(Duration::from_secs),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Whether attempt number `attempt` (1-based) may start.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }

    /// Run one attempt under the per-attempt timeout, if any.
    pub async fn run_attempt<F>(&self, attempt: F) -> Result<ExecutorOutput, CollaboratorError>
    where
        F: Future<Output = Result<ExecutorOutput, CollaboratorError>>,
    {
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, attempt).await.unwrap_or_else(|_| {
                Err(CollaboratorError::Timeout {
                    timeout_secs: limit.as_secs(),
                })
            }),
            None => attempt.await,
        }
    }

    /// Classify the result of one executor invocation.
    pub fn classify(result: &Result<ExecutorOutput, CollaboratorError>) -> AttemptOutcome {
        match result {
            Ok(output) if output.has_error => {
                AttemptOutcome::Unrecoverable("executor reported an error".into())
            }
            Ok(output) if output.full_response.trim().is_empty() => {
                AttemptOutcome::Retry("empty answer".into())
            }
            Ok(output) => AttemptOutcome::Answered(output.full_response.clone()),
            Err(e) if e.is_retryable() => AttemptOutcome::Retry(e.to_string()),
            Err(e) => AttemptOutcome::Unrecoverable(e.to_string()),
        }
    }
}
