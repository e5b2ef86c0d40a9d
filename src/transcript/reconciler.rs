use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::entry::{EntryHandle, TranscriptEntry};
use crate::protocol::history::{is_message_value, HistoryItem};

/// Append-only transcript reconciled from server history pushes.
///
/// `item_id` is globally unique within a session; each id maps to at most
/// one live entry handle, and an entry is created the first time an id is
/// seen through either reconciliation path.
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    /// item_id -> last-created entry for that id
    by_item: HashMap<String, EntryHandle>,
    /// item_id set for append-only syncing
    seen: HashSet<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_item: HashMap::new(),
            seen: HashSet::new(),
        }
    }

    /// Full-sync pass one: render every message item not yet seen, in
    /// order. A malformed item is logged and skipped; its siblings are
    /// unaffected.
    pub fn sync_missing(&mut self, history: &[Value]) {
        for raw in history {
            if !is_message_value(raw) {
                continue;
            }
            let item = match HistoryItem::from_value(raw) {
                Ok(item) => item,
                Err(e) => {
                    warn!("skipping malformed history item: {e}");
                    continue;
                }
            };
            if self.seen.contains(&item.item_id) {
                continue;
            }
            self.render(&item);
        }
    }

    /// Full-sync pass two: re-derive the text of the *last* message item
    /// and write it into that item's entry, preserving any attached image.
    /// Runs even when pass one just rendered the item, so repeated full
    /// syncs grow an in-progress assistant transcript in place. Renders
    /// the item instead if it has no entry yet; empty derived text is a
    /// no-op and never blanks an existing entry.
    pub fn update_last(&mut self, history: &[Value]) {
        let Some(raw) = history.iter().rev().find(|v| is_message_value(v)) else {
            return;
        };
        let item = match HistoryItem::from_value(raw) {
            Ok(item) => item,
            Err(e) => {
                warn!("cannot update last message: {e}");
                return;
            }
        };

        match self.by_item.get(&item.item_id).copied() {
            Some(handle) => {
                let text = item.display_text();
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return;
                }
                self.entries[handle.0].set_text(trimmed);
            }
            None => self.render(&item),
        }
    }

    /// Incremental add: render a message item unconditionally.
    ///
    /// This path does not consult the seen set; the server guarantees the
    /// item is genuinely new. A replayed id therefore renders a second
    /// entry and repoints the id at it, which must never crash.
    pub fn add_item(&mut self, raw: &Value) {
        if !is_message_value(raw) {
            return;
        }
        match HistoryItem::from_value(raw) {
            Ok(item) => self.render(&item),
            Err(e) => warn!("failed to add history item: {e}"),
        }
    }

    /// Render one message item into the arena.
    ///
    /// Image-bearing items produce one entry per image URL, each carrying
    /// the full derived text as caption; only the last entry stays
    /// addressable by the item's id. Text-only items produce a single
    /// entry when the derived text is non-blank. Items with neither render
    /// nothing and are not recorded, so a later sync can retry them.
    fn render(&mut self, item: &HistoryItem) {
        let text = item.display_text();
        let trimmed = text.trim();
        let images = item.image_urls();

        let mut handle = None;
        if !images.is_empty() {
            for url in images {
                handle = Some(self.push_entry(TranscriptEntry {
                    role: item.role.clone(),
                    image: Some(url),
                    text: trimmed.to_string(),
                    created_at: Utc::now(),
                }));
            }
        } else if !trimmed.is_empty() {
            handle = Some(self.push_entry(TranscriptEntry {
                role: item.role.clone(),
                image: None,
                text: trimmed.to_string(),
                created_at: Utc::now(),
            }));
        } else {
            debug!("history item {} rendered nothing", item.item_id);
        }

        if let Some(handle) = handle {
            self.by_item.insert(item.item_id.clone(), handle);
            self.seen.insert(item.item_id.clone());
        }
    }

    fn push_entry(&mut self, entry: TranscriptEntry) -> EntryHandle {
        self.entries.push(entry);
        EntryHandle(self.entries.len() - 1)
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, handle: EntryHandle) -> Option<&TranscriptEntry> {
        self.entries.get(handle.0)
    }

    /// The live entry for an item id, if one was rendered.
    pub fn handle_for(&self, item_id: &str) -> Option<EntryHandle> {
        self.by_item.get(item_id).copied()
    }

    pub fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.entries.clone()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
