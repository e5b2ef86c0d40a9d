//! Chunked transfer encoding for large payloads
//!
//! Encoded images exceed single-frame limits on the duplex channel, so a
//! payload is streamed as ordered `image_start` / `image_chunk` /
//! `image_end` messages under a per-chunk size ceiling. Concatenating the
//! chunk slices in emission order reconstructs the payload exactly.

use anyhow::{Context, Result};
use base64::Engine;
use std::path::Path;
use tracing::info;

use crate::outbound::{ChannelClosed, ControlChannel};
use crate::protocol::ClientMessage;

/// Maximum characters per `image_chunk` payload
pub const CHUNK_CEILING: usize = 60_000;

/// Generate a transfer id. Ids must be unique per in-flight transfer; the
/// encoder itself does not track in-flight transfers.
pub fn transfer_id() -> String {
    format!("img_{}", uuid::Uuid::new_v4().simple())
}

/// Stream `payload` to the agent as one `image_start`, zero or more
/// ordered `image_chunk` slices of at most [`CHUNK_CEILING`] characters,
/// and one `image_end`.
///
/// Callers preempting an in-progress agent turn emit an `interrupt`
/// before the transfer; that ordering is a protocol contract, not
/// enforced here.
pub fn send_image(
    channel: &ControlChannel,
    id: &str,
    text: &str,
    payload: &str,
) -> Result<(), ChannelClosed> {
    channel.send(ClientMessage::ImageStart {
        id: id.to_string(),
        text: text.to_string(),
    })?;

    let mut chunks = 0usize;
    for chunk in split_chunks(payload, CHUNK_CEILING) {
        channel.send(ClientMessage::ImageChunk {
            id: id.to_string(),
            chunk: chunk.to_string(),
        })?;
        chunks += 1;
    }

    channel.send(ClientMessage::ImageEnd { id: id.to_string() })?;

    info!(
        "image transfer {} sent ({} bytes in {} chunks)",
        id,
        payload.len(),
        chunks
    );

    Ok(())
}

/// Split `payload` into consecutive slices of at most `ceiling` characters
/// each, preserving order. A pure substring partition: no re-encoding, no
/// padding, and multi-byte scalars are never torn.
pub fn split_chunks(payload: &str, ceiling: usize) -> Vec<&str> {
    assert!(ceiling > 0, "chunk ceiling must be positive");

    let mut chunks = Vec::new();
    let mut rest = payload;
    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(ceiling)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

/// Read a local image file into a `data:` URL, ready for transfer.
///
/// Downscaling is the caller's concern; the file is encoded as-is.
pub fn data_url_from_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read image file {}", path.display()))?;

    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:{mime};base64,{encoded}"))
}
