//! HTTP API server for external control
//!
//! This module provides a REST API for driving agent sessions:
//! - POST /sessions/connect - Connect a new session
//! - POST /sessions/:id/disconnect - Tear down a session
//! - POST /sessions/:id/mute - Open/close the microphone gate
//! - POST /sessions/:id/image - Send an image to the agent
//! - GET /sessions/:id/status - Query session status
//! - GET /sessions/:id/transcript - Get the rendered transcript
//! - GET /sessions/:id/events - Get the passive event logs
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
