//! Live agent session management
//!
//! This module provides the `VoiceSession` abstraction that manages:
//! - Microphone capture and the mute gate
//! - Inbound event dispatch (playback, history reconciliation, logs)
//! - Control intents and chunked image transfers
//! - Session statistics and teardown

mod config;
mod events;
mod session;
mod stats;

pub use config::SessionConfig;
pub use events::{RawEvent, ToolEvent, ToolEventKind};
pub use session::VoiceSession;
pub use stats::SessionStats;
