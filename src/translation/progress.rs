/*!
 * Progress events from workers to the host.
 *
 * Every worker writes to its own `ProgressSender`; all senders feed one
 * unbounded channel drained by a single aggregator task, which forwards each
 * event to the host's `ProgressSink`. Events are fire-and-forget.
 */

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Terminal message of a worker that processed its whole partition
pub const FINISHED: &str = "Finished.";

/// Terminal message of a worker that observed cancellation
pub const STOPPED: &str = "Stopped.";

/// Marker sent after a streamed response completed
pub const STREAM_FINISHED: &str = "[Stream finished]";

/// Prefix of progress messages reporting an HTTP-level failure
pub const API_ERROR_PREFIX: &str = "API Error:";

/// Prefix of progress messages reporting any other failure
pub const EXCEPTION_PREFIX: &str = "Exception:";

/// Snapshot of one worker's progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Worker that emitted the event (0-based)
    pub thread_id: usize,

    /// Units of the partition processed so far
    pub current: usize,

    /// Units in the partition
    pub total: usize,

    /// Status text; empty for routine progress
    pub message: String,

    /// `true` when `message` continues the previous message (streamed text)
    pub append: bool,
}

impl ProgressEvent {
    /// Whether the host should surface this message prominently
    pub fn is_noteworthy(&self) -> bool {
        !self.append
            && (self.message.starts_with(API_ERROR_PREFIX)
                || self.message.starts_with(EXCEPTION_PREFIX))
    }

    pub fn is_terminal(&self) -> bool {
        !self.append && (self.message == FINISHED || self.message == STOPPED)
    }
}

/// Per-worker handle on the progress channel
#[derive(Debug, Clone)]
pub struct ProgressSender {
    thread_id: usize,
    total: usize,
    tx: UnboundedSender<ProgressEvent>,
}

impl ProgressSender {
    pub fn new(thread_id: usize, total: usize, tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { thread_id, total, tx }
    }

    /// Emit a discrete message
    pub fn status(&self, current: usize, message: impl Into<String>) {
        self.send(current, message.into(), false);
    }

    /// Emit a fragment that extends the previous message
    pub fn append(&self, current: usize, fragment: impl Into<String>) {
        self.send(current, fragment.into(), true);
    }

    fn send(&self, current: usize, message: String, append: bool) {
        let event = ProgressEvent {
            thread_id: self.thread_id,
            current,
            total: self.total,
            message,
            append,
        };
        // The host may have stopped listening; progress is best-effort
        let _ = self.tx.send(event);
    }
}

/// Host boundary for progress events
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);

    /// Called once after the last worker dropped its sender
    fn on_complete(&self) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Sink that forwards discrete messages to the `log` facade
#[derive(Debug, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_event(&self, event: &ProgressEvent) {
        if event.append || event.message.is_empty() {
            return;
        }
        if event.is_noteworthy() {
            warn!("[Worker {}] {}", event.thread_id, event.message);
        } else if event.is_terminal() {
            info!("[Worker {}] {} ({}/{})", event.thread_id, event.message, event.current, event.total);
        } else {
            debug!("[Worker {}] {}", event.thread_id, event.message);
        }
    }
}

/// Sink that keeps every event, for hosts that inspect the run afterwards
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    /// Events of one worker in emission order
    pub fn events_for(&self, thread_id: usize) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.thread_id == thread_id)
            .cloned()
            .collect()
    }
}

impl ProgressSink for CollectingSink {
    fn on_event(&self, event: &ProgressEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Drain `rx` into `sink` until every sender is gone; resolves to the event count
pub fn spawn_aggregator(
    mut rx: UnboundedReceiver<ProgressEvent>,
    sink: Arc<dyn ProgressSink>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut count = 0;
        while let Some(event) = rx.recv().await {
            sink.on_event(&event);
            count += 1;
        }
        sink.on_complete();
        count
    })
}
