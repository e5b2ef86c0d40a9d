// Wire-format tests for the duplex channel protocol
//
// One JSON object per message, tagged by `type`, exactly as the agent
// server speaks it.

use serde_json::json;
use voicebridge::{ClientMessage, HistoryItem, ServerMessage};

#[test]
fn test_outbound_audio_frame_wire_format() {
    let msg = ClientMessage::Audio {
        data: vec![0, -32768, 32767],
    };

    let wire = serde_json::to_string(&msg).unwrap();
    assert!(wire.contains("\"type\":\"audio\""));
    assert!(wire.contains("\"data\":[0,-32768,32767]"));

    let parsed: ClientMessage = serde_json::from_str(&wire).unwrap();
    assert_eq!(parsed, msg);
}

#[test]
fn test_outbound_control_wire_format() {
    assert_eq!(
        serde_json::to_string(&ClientMessage::Interrupt).unwrap(),
        r#"{"type":"interrupt"}"#
    );
    assert_eq!(
        serde_json::to_string(&ClientMessage::CommitAudio).unwrap(),
        r#"{"type":"commit_audio"}"#
    );
}

#[test]
fn test_outbound_image_transfer_wire_format() {
    let start = ClientMessage::ImageStart {
        id: "img_a1".to_string(),
        text: "what is this?".to_string(),
    };
    let wire = serde_json::to_string(&start).unwrap();
    assert!(wire.contains("\"type\":\"image_start\""));
    assert!(wire.contains("\"id\":\"img_a1\""));
    assert!(wire.contains("\"text\":\"what is this?\""));

    let end: ClientMessage = serde_json::from_str(r#"{"type":"image_end","id":"img_a1"}"#).unwrap();
    assert_eq!(
        end,
        ClientMessage::ImageEnd {
            id: "img_a1".to_string()
        }
    );
}

#[test]
fn test_inbound_audio_event() {
    let raw: serde_json::Value =
        serde_json::from_str(r#"{"type":"audio","audio":"AAABAAIA"}"#).unwrap();
    let msg = ServerMessage::from_value(&raw).unwrap();

    match msg {
        ServerMessage::Audio { audio } => assert_eq!(audio, "AAABAAIA"),
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_inbound_unit_events() {
    let interrupted =
        ServerMessage::from_value(&json!({"type": "audio_interrupted"})).unwrap();
    assert!(matches!(interrupted, ServerMessage::AudioInterrupted));

    let timeout =
        ServerMessage::from_value(&json!({"type": "input_audio_timeout_triggered"})).unwrap();
    assert!(matches!(timeout, ServerMessage::InputAudioTimeoutTriggered));
}

#[test]
fn test_inbound_history_added_event() {
    let raw = json!({
        "type": "history_added",
        "item": {
            "item_id": "item_7",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "audio", "transcript": "hello there"}]
        }
    });

    let msg = ServerMessage::from_value(&raw).unwrap();
    let ServerMessage::HistoryAdded { item } = msg else {
        panic!("expected history_added");
    };

    let item = HistoryItem::from_value(&item).unwrap();
    assert_eq!(item.item_id, "item_7");
    assert_eq!(item.role, "assistant");
    assert_eq!(item.display_text(), "hello there");
}

#[test]
fn test_inbound_passthrough_events_keep_their_shape() {
    let raw = json!({"type": "tool_start", "tool": "get_weather", "agent": "assistant"});
    let msg = ServerMessage::from_value(&raw).unwrap();

    match msg {
        ServerMessage::ToolStart(value) => {
            assert_eq!(value["tool"], "get_weather");
            assert_eq!(value["agent"], "assistant");
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_inbound_unknown_tag_is_preserved_not_rejected() {
    let raw = json!({"type": "rate_limits_updated", "limit": 10});
    let msg = ServerMessage::from_value(&raw).unwrap();

    match msg {
        ServerMessage::Unknown { tag, raw } => {
            assert_eq!(tag, "rate_limits_updated");
            assert_eq!(raw["limit"], 10);
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_history_item_with_mixed_content() {
    let item = HistoryItem::from_value(&json!({
        "item_id": "m1",
        "type": "message",
        "role": "user",
        "content": [
            {"type": "input_text", "text": "look: "},
            {"type": "input_image", "image_url": "data:image/png;base64,AA=="},
            {"type": "input_audio", "transcript": "a red panda"}
        ]
    }))
    .unwrap();

    assert_eq!(item.display_text(), "look: a red panda");
    assert_eq!(item.image_urls(), vec!["data:image/png;base64,AA=="]);
}
