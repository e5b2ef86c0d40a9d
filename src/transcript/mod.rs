//! Live transcript model
//!
//! This module keeps a local transcript consistent with the server-pushed,
//! possibly-replayed history stream:
//! - Entries live in an append-only arena and are mutated in place by
//!   handle, never relocated or deleted within a session
//! - A snapshot-style full sync renders only unseen items, then re-derives
//!   the last message's text so an in-progress assistant transcript grows
//!   in place across repeated syncs
//! - An incremental add renders a single new item unconditionally

mod entry;
mod reconciler;

pub use entry::{EntryHandle, TranscriptEntry};
pub use reconciler::Transcript;
