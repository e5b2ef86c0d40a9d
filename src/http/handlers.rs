use super::state::AppState;
use crate::audio::capture::{CaptureConfig, WavFileSource};
use crate::audio::playback::WavFileSink;
use crate::session::{RawEvent, SessionStats, ToolEvent, VoiceSession};
use crate::transfer;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    /// Optional agent server URL (defaults to the configured one)
    pub server_url: Option<String>,

    /// Optional WAV file to capture from instead of a live microphone
    pub capture_file: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct MuteRequest {
    pub muted: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    /// Ready-made data URL to send
    pub data_url: Option<String>,

    /// Local image file to encode and send
    pub path: Option<String>,

    /// Prompt text accompanying the image
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub session_id: String,
    pub transfer_id: String,
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub session_id: String,
    pub status: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub raw: Vec<RawEvent>,
    pub tools: Vec<ToolEvent>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions/connect
/// Connect a new agent session and start capturing
pub async fn connect_session(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> impl IntoResponse {
    let mut config = state.config.session_config();
    if let Some(url) = req.server_url {
        config.server_url = url;
    }
    let session_id = config.session_id.clone();

    info!("connecting session: {}", session_id);

    // Per-session playback rendering under the configured directory
    let playback_dir = std::path::Path::new(&state.config.audio.playback_dir);
    if let Err(e) = std::fs::create_dir_all(playback_dir) {
        error!("failed to create playback directory: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to create playback directory: {e}"),
            }),
        )
            .into_response();
    }
    let sink_path = playback_dir.join(format!("{session_id}.wav"));
    let sink = match WavFileSink::create(&sink_path, config.sample_rate) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            error!("failed to create playback sink: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to create playback sink: {e}"),
                }),
            )
                .into_response();
        }
    };

    let capture_config = CaptureConfig {
        sample_rate: config.sample_rate,
        channels: config.channels,
        frame_size: config.frame_size,
    };

    let session = match VoiceSession::connect(config, sink).await {
        Ok(session) => session,
        Err(e) => {
            error!("failed to connect session: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to connect session: {e:#}"),
                }),
            )
                .into_response();
        }
    };

    if let Some(file) = req.capture_file {
        let source = Box::new(WavFileSource::new(&file, capture_config));
        if let Err(e) = session.start_capture(source).await {
            error!("failed to start capture: {}", e);
            session.close().await;
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to start capture: {e}"),
                }),
            )
                .into_response();
        }
    }

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(session_id.clone(), session);
    }

    info!("session connected: {}", session_id);

    (
        StatusCode::OK,
        Json(ConnectResponse {
            session_id: session_id.clone(),
            status: "connected".to_string(),
            message: format!("Session {session_id} connected"),
        }),
    )
        .into_response()
}

/// POST /sessions/:session_id/disconnect
/// Tear down a session
pub async fn disconnect_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    info!("disconnecting session: {}", session_id);

    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&session_id)
    };

    match session {
        Some(session) => {
            let stats = session.stats().await;
            session.close().await;
            (
                StatusCode::OK,
                Json(DisconnectResponse {
                    session_id,
                    status: "disconnected".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => session_not_found(&session_id),
    }
}

/// POST /sessions/:session_id/mute
/// Open or close the microphone gate
pub async fn set_muted(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<MuteRequest>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&session_id) {
        Some(session) => {
            session.set_muted(req.muted);
            (StatusCode::OK, Json(session.stats().await)).into_response()
        }
        None => session_not_found(&session_id),
    }
}

/// POST /sessions/:session_id/image
/// Send an image to the agent, preempting pending speech
pub async fn send_image(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<ImageRequest>,
) -> impl IntoResponse {
    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&session_id).cloned()
    };

    let Some(session) = session else {
        return session_not_found(&session_id);
    };

    let data_url = match (req.data_url, req.path) {
        (Some(data_url), _) => data_url,
        (None, Some(path)) => match transfer::data_url_from_file(&path) {
            Ok(data_url) => data_url,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!("Failed to read image: {e:#}"),
                    }),
                )
                    .into_response();
            }
        },
        (None, None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Provide either data_url or path".to_string(),
                }),
            )
                .into_response();
        }
    };

    let prompt = req.prompt.unwrap_or_default();
    match session.send_image(&data_url, &prompt).await {
        Ok(transfer_id) => (
            StatusCode::OK,
            Json(ImageResponse {
                session_id,
                transfer_id,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("image send failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Image send failed: {e:#}"),
                }),
            )
                .into_response()
        }
    }
}

/// GET /sessions/:session_id/status
/// Get status of a session
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&session_id) {
        Some(session) => (StatusCode::OK, Json(session.stats().await)).into_response(),
        None => session_not_found(&session_id),
    }
}

/// GET /sessions/:session_id/transcript
/// Get the rendered transcript (accumulated so far)
pub async fn get_session_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&session_id) {
        Some(session) => (StatusCode::OK, Json(session.transcript().await)).into_response(),
        None => session_not_found(&session_id),
    }
}

/// GET /sessions/:session_id/events
/// Get the passive event logs
pub async fn get_session_events(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&session_id) {
        Some(session) => (
            StatusCode::OK,
            Json(EventsResponse {
                raw: session.raw_events().await,
                tools: session.tool_events().await,
            }),
        )
            .into_response(),
        None => session_not_found(&session_id),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn session_not_found(session_id: &str) -> axum::response::Response {
    error!("session {} not found", session_id);
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session {session_id} not found"),
        }),
    )
        .into_response()
}
