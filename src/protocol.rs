//! Message types exchanged with the world and the transport abstraction.
//!
//! Wire encoding and connection setup live outside this crate; a [`Transport`]
//! only has to move whole [`Message`] values in arrival order.

use crate::error::TransportError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// One line of command output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputLine {
    /// Message text or translation key.
    pub text: String,
    /// Positional parameters attached to the text.
    pub parameters: Vec<String>,
}

impl OutputLine {
    pub fn new(text: impl Into<String>, parameters: &[&str]) -> Self {
        Self {
            text: text.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// A command issued on behalf of `origin`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub correlation_id: Uuid,
    pub origin: String,
    pub text: String,
}

/// The world's answer to a [`CommandRequest`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub correlation_id: Uuid,
    pub success: bool,
    pub output: Vec<OutputLine>,
}

/// Kinds of chat traffic. Only [`ChatKind::Chat`] is treated as operator input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatKind {
    Chat,
    Whisper,
    System,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub body: String,
    pub kind: ChatKind,
}

/// Messages relevant to the construction engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Message {
    CommandRequest(CommandRequest),
    CommandResult(CommandResult),
    Chat(ChatMessage),
}

/// A duplex, ordered message stream.
pub trait Transport: Send + Sync {
    /// Queues `message` for delivery.
    fn send(&self, message: Message) -> Result<(), TransportError>;

    /// Blocks until the next inbound message arrives.
    ///
    /// Returns [`TransportError::Closed`] once the stream has ended.
    fn receive(&self) -> Result<Message, TransportError>;

    /// Waits at most `timeout` for the next inbound message; `Ok(None)` when none came.
    ///
    /// The default blocks like [`receive`](Self::receive), so a transport that cannot
    /// time out only gets swept between messages.
    fn receive_timeout(&self, _timeout: Duration) -> Result<Option<Message>, TransportError> {
        self.receive().map(Some)
    }

    /// Closes the stream. Further sends fail and the peer sees the end of the stream.
    fn close(&self);
}

/// In-process transport backed by a pair of crossbeam channels.
///
/// [`ChannelTransport::pair`] returns two connected ends; whatever one end sends,
/// the other receives.
pub struct ChannelTransport {
    outbound: Mutex<Option<Sender<Message>>>,
    inbound: Receiver<Message>,
}

impl ChannelTransport {
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = unbounded();
        let (b_tx, b_rx) = unbounded();
        (
            Self {
                outbound: Mutex::new(Some(a_tx)),
                inbound: b_rx,
            },
            Self {
                outbound: Mutex::new(Some(b_tx)),
                inbound: a_rx,
            },
        )
    }

    /// Returns the next inbound message without blocking, if one is queued.
    pub fn try_receive(&self) -> Option<Message> {
        self.inbound.try_recv().ok()
    }

    /// Drains every inbound message queued so far.
    pub fn drain(&self) -> Vec<Message> {
        self.inbound.try_iter().collect()
    }
}

impl Transport for ChannelTransport {
    fn send(&self, message: Message) -> Result<(), TransportError> {
        let guard = self.outbound.lock();
        let sender = guard.as_ref().ok_or(TransportError::Closed)?;
        sender
            .send(message)
            .map_err(|_| TransportError::Disconnected("peer dropped".to_string()))
    }

    fn receive(&self) -> Result<Message, TransportError> {
        self.inbound.recv().map_err(|_| TransportError::Closed)
    }

    fn receive_timeout(&self, timeout: Duration) -> Result<Option<Message>, TransportError> {
        match self.inbound.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn close(&self) {
        self.outbound.lock().take();
    }
}
