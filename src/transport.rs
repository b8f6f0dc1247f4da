//! The chat-transport seam.
//!
//! The poller and the command surface never talk to a chat protocol
//! directly; they hand formatted strings to a [`ChatTransport`]. The binary
//! wires in [`StdoutTransport`]; tests use [`RecordingTransport`] to assert
//! on delivery order and addressing.

use async_trait::async_trait;
use std::sync::Mutex;

/// Distinguishes group-room delivery from direct delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Group,
    Direct,
}

/// An opaque addressable sink: a chat room or user.
///
/// `id` is the stable subscriber identity — subscription membership and
/// removal key on it, never on a display string. `kind` travels with the
/// destination so the transport knows how to address it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub id: String,
    pub kind: MessageKind,
}

impl Destination {
    pub fn group(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: MessageKind::Group,
        }
    }

    pub fn direct(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: MessageKind::Direct,
        }
    }
}

/// Fire-and-forget delivery of a formatted string to a destination.
///
/// Implementations must not fail the caller: delivery problems are theirs to
/// log and swallow. The poll cycle treats `send` as infallible.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, destination: &Destination, text: &str);
}

/// Transport used by the binary: prints deliveries to stdout.
pub struct StdoutTransport;

#[async_trait]
impl ChatTransport for StdoutTransport {
    async fn send(&self, destination: &Destination, text: &str) {
        println!("[{}] {}", destination.id, text);
    }
}

/// A delivered message captured by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub destination: String,
    pub kind: MessageKind,
    pub text: String,
}

/// Test transport that records every delivery in order.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages delivered so far, in delivery order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Drain the recorded messages.
    pub fn take(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send(&self, destination: &Destination, text: &str) {
        self.sent.lock().unwrap().push(SentMessage {
            destination: destination.id.clone(),
            kind: destination.kind,
            text: text.to_string(),
        });
    }
}
