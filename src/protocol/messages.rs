use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Inbound message carries no string `type` tag.
    #[error("inbound message has no `type` tag")]
    MissingTag,
    /// A recognized tag whose payload does not match its schema.
    #[error("malformed `{tag}` message: {source}")]
    BadPayload {
        tag: String,
        source: serde_json::Error,
    },
    /// A history item that cannot be rendered (missing id, content not a
    /// sequence, unknown part shapes).
    #[error("malformed history item: {source}")]
    MalformedItem { source: serde_json::Error },
}

/// Messages sent to the agent server, one wire message per intent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// One capture frame of 16-bit PCM samples
    Audio { data: Vec<i16> },
    /// Preempt the agent's in-progress turn
    Interrupt,
    /// Ask the server to commit the input audio buffer
    CommitAudio,
    /// Open a chunked image transfer
    ImageStart { id: String, text: String },
    /// One ordered slice of the transfer payload
    ImageChunk { id: String, chunk: String },
    /// Close a chunked image transfer
    ImageEnd { id: String },
}

/// Messages received from the agent server, routed by tag.
///
/// History payloads stay as raw JSON values so one malformed item can be
/// skipped without discarding its siblings. Tool and handoff events keep
/// their raw shape for the passive log.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    /// Synthesized speech, base64-encoded 24kHz mono PCM
    Audio { audio: String },
    /// The agent was interrupted; pending speech is stale
    AudioInterrupted,
    /// The server noticed a lull in input audio
    InputAudioTimeoutTriggered,
    /// Snapshot-style replay of the known history
    HistoryUpdated { history: Vec<Value> },
    /// A single newly created history item
    HistoryAdded { item: Value },
    ToolStart(Value),
    ToolEnd(Value),
    Handoff(Value),
    /// Unrecognized tag, inert (logged only)
    Unknown { tag: String, raw: Value },
}

impl ServerMessage {
    /// Parse one inbound JSON message by its `type` tag.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingTag)?;

        let message = match tag {
            "audio" => {
                #[derive(Deserialize)]
                struct Payload {
                    audio: String,
                }
                let payload: Payload = payload_of(tag, value)?;
                ServerMessage::Audio {
                    audio: payload.audio,
                }
            }
            "audio_interrupted" => ServerMessage::AudioInterrupted,
            "input_audio_timeout_triggered" => ServerMessage::InputAudioTimeoutTriggered,
            "history_updated" => {
                #[derive(Deserialize)]
                struct Payload {
                    history: Vec<Value>,
                }
                let payload: Payload = payload_of(tag, value)?;
                ServerMessage::HistoryUpdated {
                    history: payload.history,
                }
            }
            "history_added" => {
                #[derive(Deserialize)]
                struct Payload {
                    item: Value,
                }
                let payload: Payload = payload_of(tag, value)?;
                ServerMessage::HistoryAdded { item: payload.item }
            }
            "tool_start" => ServerMessage::ToolStart(value.clone()),
            "tool_end" => ServerMessage::ToolEnd(value.clone()),
            "handoff" => ServerMessage::Handoff(value.clone()),
            _ => ServerMessage::Unknown {
                tag: tag.to_string(),
                raw: value.clone(),
            },
        };

        Ok(message)
    }
}

fn payload_of<T: serde::de::DeserializeOwned>(tag: &str, value: &Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value.clone()).map_err(|source| ProtocolError::BadPayload {
        tag: tag.to_string(),
        source,
    })
}
