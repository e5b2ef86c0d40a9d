//! Wire protocol for the duplex channel to the agent server
//!
//! One JSON-serializable object per message, tagged by `type`:
//! - Outbound: `audio`, `interrupt`, `commit_audio`, `image_start`,
//!   `image_chunk`, `image_end`
//! - Inbound: `audio`, `audio_interrupted`, `input_audio_timeout_triggered`,
//!   `history_updated`, `history_added`, plus passthrough tags consumed only
//!   by passive logging

pub mod history;
pub mod messages;

pub use history::{ContentPart, HistoryItem};
pub use messages::{ClientMessage, ProtocolError, ServerMessage};
