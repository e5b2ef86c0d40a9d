use chrono::{DateTime, Utc};
use serde::Serialize;

/// Index into the transcript arena. Entries are never relocated, so a
/// handle stays valid for the life of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EntryHandle(pub(crate) usize);

/// The rendered counterpart of one message-type history item.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    /// Speaker role as pushed by the server (user, assistant, ...)
    pub role: String,
    /// Rendered image URL, if the item carried one. Once attached it is
    /// never removed by a later text-only update.
    pub image: Option<String>,
    /// Trailing caption/text region
    pub text: String,
    /// When this entry was first rendered
    pub created_at: DateTime<Utc>,
}

impl TranscriptEntry {
    /// Text-only update. With an image attached this fills the caption
    /// region; without one it replaces the text wholesale. The image is
    /// untouched either way.
    pub(crate) fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }
}
