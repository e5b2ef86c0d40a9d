use anyhow::Result;
use serde::Deserialize;

use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub agent: AgentConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    pub server_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_size: usize,
    pub playback_fade_ms: u64,
    /// Directory for per-session playback renderings
    pub playback_dir: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Session configuration derived from this service configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            server_url: self.agent.server_url.clone(),
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            frame_size: self.audio.frame_size,
            playback_fade_secs: self.audio.playback_fade_ms as f32 / 1000.0,
            ..SessionConfig::default()
        }
    }
}
