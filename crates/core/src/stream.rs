//! Streaming publisher: incremental output of one submission.
//!
//! Two primitives, both single-producer:
//! - [`StreamableValue`]: a value cell (`watch`-backed) whose latest snapshot
//!   is observable, with an explicit terminal transition.
//! - [`UiStream`]: an ordered fragment channel (`mpsc`-backed) that ends with
//!   exactly one `Done` or `Error` event.
//!
//! A producer that is dropped before being finalized finalizes itself as
//! errored, so an aborted submission never leaves an observer waiting.
//!
//! Collaborators only ever get a [`UiSink`] and a [`TextSink`]. They can
//! publish fragments and text but cannot finalize; the terminal transition
//! belongs to [`Publisher::finish`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::{UnboundedReceiverStream, WatchStream};
use tracing::warn;
use uuid::Uuid;

use crate::error::StreamError;

const DROPPED: &str = "stream dropped before completion";

/// Lifecycle of a streamed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StreamStatus {
    Pending,
    Done,
    Errored { message: String },
}

/// What an observer sees of a [`StreamableValue`] at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSnapshot<T> {
    pub value: Option<T>,
    pub status: StreamStatus,
}

impl<T> ValueSnapshot<T> {
    /// An already-settled value (used when replaying stored content).
    pub fn completed(value: T) -> Self {
        Self {
            value: Some(value),
            status: StreamStatus::Done,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != StreamStatus::Pending
    }
}

/// Producer side of a streamed value.
pub struct StreamableValue<T> {
    key: &'static str,
    tx: watch::Sender<ValueSnapshot<T>>,
    finalize_calls: Arc<AtomicUsize>,
}

/// Consumer side of a streamed value.
#[derive(Clone)]
pub struct ValueReader<T> {
    rx: watch::Receiver<ValueSnapshot<T>>,
    finalize_calls: Arc<AtomicUsize>,
}

/// Create a value cell named `key` with an optional initial value.
pub fn streamable_value<T>(key: &'static str, initial: Option<T>) -> (StreamableValue<T>, ValueReader<T>) {
    let (tx, rx) = watch::channel(ValueSnapshot {
        value: initial,
        status: StreamStatus::Pending,
    });
    let finalize_calls = Arc::new(AtomicUsize::new(0));
    (
        StreamableValue {
            key,
            tx,
            finalize_calls: finalize_calls.clone(),
        },
        ValueReader { rx, finalize_calls },
    )
}

impl<T> StreamableValue<T> {
    /// Publish a new value. Fails once the value is finalized.
    pub fn update(&self, value: T) -> Result<(), StreamError> {
        let mut value = Some(value);
        let accepted = self.tx.send_if_modified(|snap| {
            if snap.is_terminal() {
                return false;
            }
            snap.value = value.take();
            true
        });
        if accepted {
            Ok(())
        } else {
            Err(StreamError::AlreadyFinalized(self.key))
        }
    }

    /// Mark the value complete, optionally replacing it.
    ///
    /// Returns `false` (and logs) if the value was already finalized.
    pub fn done(&self, value: Option<T>) -> bool {
        self.finalize(|snap| {
            if value.is_some() {
                snap.value = value;
            }
            snap.status = StreamStatus::Done;
        })
    }

    /// Mark the value as failed.
    pub fn error(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        self.finalize(|snap| snap.status = StreamStatus::Errored { message })
    }

    pub fn is_finalized(&self) -> bool {
        self.tx.borrow().is_terminal()
    }

    fn finalize(&self, apply: impl FnOnce(&mut ValueSnapshot<T>)) -> bool {
        self.finalize_calls.fetch_add(1, Ordering::SeqCst);
        let mut apply = Some(apply);
        let finalized = self.tx.send_if_modified(|snap| {
            if snap.is_terminal() {
                return false;
            }
            if let Some(apply) = apply.take() {
                apply(snap);
            }
            true
        });
        if !finalized {
            warn!(key = self.key, "Streamable value finalized more than once");
        }
        finalized
    }
}

impl<T> Drop for StreamableValue<T> {
    fn drop(&mut self) {
        self.tx.send_if_modified(|snap| {
            if snap.is_terminal() {
                return false;
            }
            snap.status = StreamStatus::Errored {
                message: DROPPED.into(),
            };
            true
        });
    }
}

impl<T: Clone> ValueReader<T> {
    /// The latest published snapshot.
    pub fn snapshot(&self) -> ValueSnapshot<T> {
        self.rx.borrow().clone()
    }

    /// Wait until the value reaches a terminal state.
    pub async fn wait_done(&mut self) -> ValueSnapshot<T> {
        loop {
            {
                let snap = self.rx.borrow_and_update();
                if snap.is_terminal() {
                    return snap.clone();
                }
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }

    /// How many times the producer attempted to finalize.
    pub fn finalize_calls(&self) -> usize {
        self.finalize_calls.load(Ordering::SeqCst)
    }
}

impl<T: Clone + Send + Sync + 'static> ValueReader<T> {
    pub fn into_stream(self) -> WatchStream<ValueSnapshot<T>> {
        WatchStream::new(self.rx)
    }
}

/// A presentable piece of partial output. Rendering is up to the observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiFragment {
    /// Work in progress placeholder.
    Spinner,
    /// Assistant text, possibly partial.
    Message { content: String },
    /// A clarifying question.
    Inquiry { question: String },
    /// Structured tool output.
    ToolResult {
        tool_name: String,
        data: serde_json::Value,
    },
}

/// One event on a [`UiStream`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    /// Replace everything shown so far.
    Update { fragment: UiFragment },
    /// Add below what is shown so far.
    Append { fragment: UiFragment },
    Done,
    Error { message: String },
}

impl UiEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }

    /// Fold this event into the currently displayed fragments.
    pub fn apply(&self, shown: &mut Vec<UiFragment>) {
        match self {
            Self::Update { fragment } => {
                shown.clear();
                shown.push(fragment.clone());
            }
            Self::Append { fragment } => shown.push(fragment.clone()),
            Self::Done | Self::Error { .. } => {}
        }
    }
}

/// Producer side of the UI fragment channel.
pub struct UiStream {
    tx: mpsc::UnboundedSender<UiEvent>,
    finalized: AtomicBool,
    finalize_calls: Arc<AtomicUsize>,
}

/// Consumer side of the UI fragment channel.
pub struct UiReceiver {
    rx: mpsc::UnboundedReceiver<UiEvent>,
    finalize_calls: Arc<AtomicUsize>,
}

/// Create a UI fragment channel.
pub fn ui_stream() -> (UiStream, UiReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let finalize_calls = Arc::new(AtomicUsize::new(0));
    (
        UiStream {
            tx,
            finalized: AtomicBool::new(false),
            finalize_calls: finalize_calls.clone(),
        },
        UiReceiver { rx, finalize_calls },
    )
}

impl UiStream {
    /// Replace the displayed output with `fragment`.
    pub fn update(&self, fragment: UiFragment) -> Result<(), StreamError> {
        self.emit(UiEvent::Update { fragment })
    }

    /// Append `fragment` to the displayed output.
    pub fn append(&self, fragment: UiFragment) -> Result<(), StreamError> {
        self.emit(UiEvent::Append { fragment })
    }

    /// Close the stream successfully.
    pub fn done(&self) -> bool {
        self.finalize(UiEvent::Done)
    }

    /// Close the stream in an error-visible state.
    pub fn error(&self, message: impl Into<String>) -> bool {
        self.finalize(UiEvent::Error {
            message: message.into(),
        })
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::SeqCst)
    }

    fn emit(&self, event: UiEvent) -> Result<(), StreamError> {
        if self.is_finalized() {
            return Err(StreamError::AlreadyFinalized("ui"));
        }
        // A departed consumer is not the producer's problem.
        let _ = self.tx.send(event);
        Ok(())
    }

    fn finalize(&self, event: UiEvent) -> bool {
        self.finalize_calls.fetch_add(1, Ordering::SeqCst);
        if self.finalized.swap(true, Ordering::SeqCst) {
            warn!("UI stream finalized more than once");
            return false;
        }
        let _ = self.tx.send(event);
        true
    }
}

impl Drop for UiStream {
    fn drop(&mut self) {
        if !self.finalized.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(UiEvent::Error {
                message: DROPPED.into(),
            });
        }
    }
}

impl UiReceiver {
    /// Next event, or `None` once the producer is gone and the queue drained.
    pub async fn recv(&mut self) -> Option<UiEvent> {
        self.rx.recv().await
    }

    /// Receive events up to and including the terminal one.
    pub async fn collect(&mut self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    pub fn finalize_calls(&self) -> usize {
        self.finalize_calls.load(Ordering::SeqCst)
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<UiEvent> {
        UnboundedReceiverStream::new(self.rx)
    }
}

/// Write-only handle on a [`UiStream`].
#[derive(Clone, Copy)]
pub struct UiSink<'a> {
    ui: &'a UiStream,
}

impl UiSink<'_> {
    /// Replace the displayed output with `fragment`.
    pub fn update(&self, fragment: UiFragment) {
        self.emit(UiEvent::Update { fragment });
    }

    /// Append `fragment` to the displayed output.
    pub fn append(&self, fragment: UiFragment) {
        self.emit(UiEvent::Append { fragment });
    }

    fn emit(&self, event: UiEvent) {
        if let Err(e) = self.ui.emit(event) {
            warn!(error = %e, "UI fragment dropped");
        }
    }
}

/// Write-only handle on the raw answer text.
#[derive(Clone, Copy)]
pub struct TextSink<'a> {
    text: &'a StreamableValue<String>,
}

impl TextSink<'_> {
    /// Publish the text generated so far.
    pub fn update(&self, text: impl Into<String>) {
        if let Err(e) = self.text.update(text.into()) {
            warn!(error = %e, "Answer text dropped");
        }
    }
}

/// All output keys of one submission, producer side.
pub struct Publisher {
    pub ui: UiStream,
    /// Raw answer text as it is generated
    pub text: StreamableValue<String>,
    pub is_generating: StreamableValue<bool>,
    pub is_collapsed: StreamableValue<bool>,
}

/// All output keys of one submission, consumer side.
pub struct Subscription {
    /// Stable id of the response entry
    pub id: String,
    pub ui: UiReceiver,
    pub text: ValueReader<String>,
    pub is_generating: ValueReader<bool>,
    pub is_collapsed: ValueReader<bool>,
}

impl Publisher {
    /// Create a publisher and the matching subscription.
    pub fn new() -> (Self, Subscription) {
        let (ui, ui_rx) = ui_stream();
        let (text, text_rx) = streamable_value("text", None);
        let (is_generating, generating_rx) = streamable_value("is_generating", Some(true));
        let (is_collapsed, collapsed_rx) = streamable_value("is_collapsed", Some(false));
        (
            Self {
                ui,
                text,
                is_generating,
                is_collapsed,
            },
            Subscription {
                id: Uuid::new_v4().to_string(),
                ui: ui_rx,
                text: text_rx,
                is_generating: generating_rx,
                is_collapsed: collapsed_rx,
            },
        )
    }

    /// Handle for collaborators to stream UI fragments through.
    pub fn ui_sink(&self) -> UiSink<'_> {
        UiSink { ui: &self.ui }
    }

    /// Handle for collaborators to stream answer text through.
    pub fn text_sink(&self) -> TextSink<'_> {
        TextSink { text: &self.text }
    }

    /// Terminal transition: generation complete, every key finalized.
    ///
    /// Keys finalized earlier by the caller are left alone; `error` makes the
    /// UI and text keys end in an error-visible state.
    pub fn finish(&self, error: Option<&str>) {
        self.is_generating.done(Some(false));
        if !self.is_collapsed.is_finalized() {
            self.is_collapsed.done(None);
        }
        match error {
            None => {
                if !self.text.is_finalized() {
                    self.text.done(None);
                }
                self.ui.done();
            }
            Some(message) => {
                if !self.text.is_finalized() {
                    self.text.error(message);
                }
                self.ui.error(message);
            }
        }
    }
}
