use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a live agent session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Session identifier
    pub session_id: String,

    /// Whether the duplex channel is open
    pub connected: bool,

    /// Whether microphone capture is running
    pub capturing: bool,

    /// Whether the microphone gate is closed
    pub muted: bool,

    /// When the session connected
    pub started_at: DateTime<Utc>,

    /// Total session duration in seconds
    pub duration_secs: f64,

    /// Number of inbound events dispatched
    pub events_received: usize,

    /// Number of transcript entries rendered
    pub transcript_entries: usize,
}
