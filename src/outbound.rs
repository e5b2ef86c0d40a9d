use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use crate::protocol::ClientMessage;

/// A send was attempted with no open channel. The message is dropped;
/// this is never fatal.
#[derive(Debug, Error)]
#[error("outbound channel closed")]
pub struct ChannelClosed;

/// Outbound side of the duplex channel, shared by every sender (capture,
/// control intents, chunked transfers).
///
/// Each control intent becomes exactly one wire message, sent once, in the
/// order issued by the caller. No acknowledgement is awaited.
#[derive(Clone)]
pub struct ControlChannel {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl ControlChannel {
    pub fn new(tx: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self { tx }
    }

    /// Channel pair for local wiring and tests.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue one message onto the channel, in call order.
    pub fn send(&self, message: ClientMessage) -> Result<(), ChannelClosed> {
        self.tx.send(message).map_err(|_| ChannelClosed)
    }

    /// Preempt the agent's in-progress turn.
    pub fn interrupt(&self) {
        if self.send(ClientMessage::Interrupt).is_err() {
            warn!("dropping interrupt: outbound channel closed");
        }
    }

    /// Ask the server to commit the input audio buffer to expedite the
    /// model response.
    pub fn commit_audio(&self) {
        if self.send(ClientMessage::CommitAudio).is_err() {
            warn!("dropping commit_audio: outbound channel closed");
        }
    }
}
