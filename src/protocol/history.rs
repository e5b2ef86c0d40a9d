use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::messages::ProtocolError;

/// One server-defined unit of conversation history (message, tool call,
/// etc.), identified by a stable id. Only `message`-typed items are
/// semantically processed; everything else passes through inert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryItem {
    pub item_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

/// One ordered part of a history item's content. Text-bearing parts
/// concatenate in order to form the item's display text; image-bearing
/// parts contribute display images.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        #[serde(default)]
        text: Option<String>,
    },
    InputText {
        #[serde(default)]
        text: Option<String>,
    },
    InputAudio {
        #[serde(default)]
        transcript: Option<String>,
    },
    Audio {
        #[serde(default)]
        transcript: Option<String>,
    },
    InputImage {
        #[serde(default)]
        image_url: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
}

impl HistoryItem {
    /// Interpret one raw history entry. Fails on items that cannot be
    /// rendered: missing id, content that is not a sequence, unknown part
    /// shapes. Callers treat the failure as local to this item.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        serde_json::from_value(value.clone()).map_err(|source| ProtocolError::MalformedItem { source })
    }

    /// Concatenation of all text-bearing content parts, in order.
    pub fn display_text(&self) -> String {
        let mut text = String::new();
        for part in &self.content {
            match part {
                ContentPart::Text { text: Some(t) } | ContentPart::InputText { text: Some(t) } => {
                    text.push_str(t);
                }
                ContentPart::InputAudio {
                    transcript: Some(t),
                }
                | ContentPart::Audio {
                    transcript: Some(t),
                } => {
                    text.push_str(t);
                }
                _ => {}
            }
        }
        text
    }

    /// URLs of all image-bearing content parts, in order.
    pub fn image_urls(&self) -> Vec<String> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::InputImage { image_url, url } => image_url
                    .as_deref()
                    .or(url.as_deref())
                    .filter(|u| !u.is_empty())
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }

}

/// Tag check on a raw history entry, used to filter before full parsing so
/// non-message items (tool calls etc.) never produce malformed-item noise.
pub fn is_message_value(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("message")
}
