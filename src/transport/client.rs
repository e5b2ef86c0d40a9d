use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::protocol::ClientMessage;

/// WebSocket client for the agent's duplex channel.
///
/// A writer task drains the outbound queue onto the socket and a reader
/// task forwards every inbound JSON value, in receipt order, to the
/// session's dispatcher. Each send is a single atomic frame, so no partial
/// message interleaving is possible at this layer.
pub struct AgentClient {
    outbound_tx: mpsc::UnboundedSender<ClientMessage>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl AgentClient {
    /// Connect to `{server_url}/ws/{session_id}` and start pumping
    /// messages both ways.
    pub async fn connect(
        server_url: &str,
        session_id: &str,
        inbound_tx: mpsc::UnboundedSender<Value>,
    ) -> Result<Self> {
        let url = format!("{}/ws/{}", server_url.trim_end_matches('/'), session_id);
        info!("connecting to agent at {}", url);

        let (stream, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("failed to connect to {url}"))?;

        info!("connected to agent");

        let (mut ws_tx, mut ws_rx) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();

        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("failed to serialize outbound message: {e}");
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(Message::Text(text)).await {
                    warn!("outbound send failed, closing writer: {e}");
                    break;
                }
            }
            let _ = ws_tx.close().await;
            debug!("agent writer task finished");
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = ws_rx.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Value>(&text) {
                        Ok(value) => {
                            if inbound_tx.send(value).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("ignoring unparseable inbound frame: {e}"),
                    },
                    Ok(Message::Close(_)) => {
                        info!("agent closed the connection");
                        break;
                    }
                    // Pings and pongs are handled by the library; binary
                    // frames are not part of the protocol.
                    Ok(_) => {}
                    Err(e) => {
                        warn!("inbound stream error: {e}");
                        break;
                    }
                }
            }
            debug!("agent reader task finished");
        });

        Ok(Self {
            outbound_tx,
            writer,
            reader,
        })
    }

    /// Sender half shared by every outbound producer.
    pub fn outbound(&self) -> mpsc::UnboundedSender<ClientMessage> {
        self.outbound_tx.clone()
    }

    /// Tear down both pump tasks and the socket.
    pub async fn close(self) {
        self.writer.abort();
        self.reader.abort();
        let _ = self.writer.await;
        let _ = self.reader.await;
        info!("agent connection closed");
    }
}
