use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// One inbound event kept verbatim for passive inspection.
#[derive(Debug, Clone, Serialize)]
pub struct RawEvent {
    pub received_at: DateTime<Utc>,
    pub event: Value,
}

impl RawEvent {
    pub fn new(event: Value) -> Self {
        Self {
            received_at: Utc::now(),
            event,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.event.get("type").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolEventKind {
    ToolStart,
    ToolEnd,
    Handoff,
}

/// Tool and handoff activity distilled from the inbound stream.
#[derive(Debug, Clone, Serialize)]
pub struct ToolEvent {
    pub received_at: DateTime<Utc>,
    pub kind: ToolEventKind,
    pub description: String,
}

impl ToolEvent {
    /// Build a log entry from a raw event, or `None` for tags that do not
    /// belong in the tool log.
    pub fn from_raw(tag: &str, event: &Value) -> Option<Self> {
        let field = |name: &str| {
            event
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string()
        };

        let (kind, description) = match tag {
            "handoff" => (
                ToolEventKind::Handoff,
                format!("from {} to {}", field("from"), field("to")),
            ),
            "tool_start" => (ToolEventKind::ToolStart, format!("running {}", field("tool"))),
            "tool_end" => {
                let output = event
                    .get("output")
                    .and_then(Value::as_str)
                    .unwrap_or("no output");
                (
                    ToolEventKind::ToolEnd,
                    format!("{}: {}", field("tool"), output),
                )
            }
            _ => return None,
        };

        Some(Self {
            received_at: Utc::now(),
            kind,
            description,
        })
    }
}
