//! Fire-and-forget destinations for answer events.
//!
//! The engine hands every answer to an `AnswerSink` and never waits on it or
//! looks at whether it succeeded. Sinks that can fail log the failure and
//! drop the event.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use drill_core::model::AnswerEvent;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::repository::StorageError;

/// Receives one event per answered question.
pub trait AnswerSink: Send + Sync {
    fn record(&self, event: AnswerEvent);
}

//
// ─── IN MEMORY ─────────────────────────────────────────────────────────────────
//

/// Keeps every event in memory, for tests and end-of-session inspection.
#[derive(Clone, Default)]
pub struct InMemoryAnswerLog {
    events: Arc<Mutex<Vec<AnswerEvent>>>,
}

impl InMemoryAnswerLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<AnswerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnswerSink for InMemoryAnswerLog {
    fn record(&self, event: AnswerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

//
// ─── JSON LINES ────────────────────────────────────────────────────────────────
//

/// Writes each event as one line of JSON.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer, for example to inspect a buffer in tests.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_event(&self, event: &AnswerEvent) -> Result<(), StorageError> {
        let line =
            serde_json::to_string(event).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| StorageError::Connection(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

impl<W: Write + Send> AnswerSink for JsonLinesSink<W> {
    fn record(&self, event: AnswerEvent) {
        if let Err(err) = self.write_event(&event) {
            tracing::warn!(
                session_id = %event.session_id,
                signature = %event.signature,
                error = %err,
                "dropping answer event"
            );
        }
    }
}

//
// ─── CHANNEL ───────────────────────────────────────────────────────────────────
//

/// Hands events to an async consumer over an unbounded channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<AnswerEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving half its consumer should drain.
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<AnswerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AnswerSink for ChannelSink {
    fn record(&self, event: AnswerEvent) {
        if let Err(err) = self.tx.send(event) {
            tracing::debug!(
                session_id = %err.0.session_id,
                "answer event receiver closed; dropping event"
            );
        }
    }
}
