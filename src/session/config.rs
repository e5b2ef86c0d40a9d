use serde::{Deserialize, Serialize};

/// Configuration for one live agent session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g. "session_9f2c81d4...")
    pub session_id: String,

    /// Agent server base URL (e.g. "ws://localhost:8000")
    pub server_url: String,

    /// Sample rate for capture and playback; the wire format is 24kHz
    pub sample_rate: u32,

    /// Number of audio channels (the wire format is mono)
    pub channels: u16,

    /// Samples per capture frame
    pub frame_size: usize,

    /// Base declick fade window in seconds
    pub playback_fade_secs: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session_{}", uuid::Uuid::new_v4().simple()),
            server_url: "ws://localhost:8000".to_string(),
            sample_rate: 24_000,
            channels: 1,
            frame_size: 4096,
            playback_fade_secs: 0.02,
        }
    }
}
