// End-to-end dispatcher tests
//
// A session is wired to an in-process outbound channel and a test sink, so
// every scenario exercises the real dispatch path without a server.

use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use voicebridge::audio::codec::encode_pcm_base64;
use voicebridge::{
    CaptureError, CaptureSource, ClientMessage, ControlChannel, FadeEnvelope, PlaybackError,
    PlaybackSink, SessionConfig, VoiceSession,
};

/// Sink that renders units instantly.
struct NullSink;

#[async_trait::async_trait]
impl PlaybackSink for NullSink {
    async fn play(
        &self,
        _samples: Vec<f32>,
        _sample_rate: u32,
        _envelope: FadeEnvelope,
    ) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn stop(&self, _fade: Duration) {}
}

/// Sink that holds each unit open until `stop` releases it.
#[derive(Default)]
struct GatedSink {
    active: AtomicUsize,
    stops: AtomicUsize,
    release: tokio::sync::Notify,
}

#[async_trait::async_trait]
impl PlaybackSink for GatedSink {
    async fn play(
        &self,
        _samples: Vec<f32>,
        _sample_rate: u32,
        _envelope: FadeEnvelope,
    ) -> Result<(), PlaybackError> {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self, _fade: Duration) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.release.notify_one();
    }
}

/// Capture source that replays a fixed set of frames, then ends.
struct ScriptedSource {
    frames: Vec<Vec<f32>>,
    capturing: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

impl ScriptedSource {
    fn new(frames: Vec<Vec<f32>>) -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        (
            Self {
                frames,
                capturing: Arc::new(AtomicBool::new(false)),
                released: Arc::clone(&released),
            },
            released,
        )
    }
}

#[async_trait::async_trait]
impl CaptureSource for ScriptedSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<f32>>, CaptureError> {
        let (tx, rx) = mpsc::channel(16);
        self.capturing.store(true, Ordering::SeqCst);
        let frames = self.frames.clone();
        let capturing = Arc::clone(&self.capturing);
        tokio::spawn(async move {
            for frame in frames {
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
            capturing.store(false, Ordering::SeqCst);
        });
        Ok(rx)
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Capture source with no usable device.
struct UnavailableSource {
    released: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl CaptureSource for UnavailableSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<f32>>, CaptureError> {
        Err(CaptureError::DeviceUnavailable {
            reason: "no microphone permission".to_string(),
        })
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

fn test_session(
    sink: Arc<dyn PlaybackSink>,
) -> (
    Arc<VoiceSession>,
    mpsc::UnboundedReceiver<ClientMessage>,
) {
    let (control, rx) = ControlChannel::pair();
    let session = VoiceSession::new(SessionConfig::default(), control, sink);
    (session, rx)
}

// ============================================================================
// Capture path
// ============================================================================

#[tokio::test]
async fn test_capture_frame_becomes_audio_message() {
    let (session, mut rx) = test_session(Arc::new(NullSink));
    let (source, _released) = ScriptedSource::new(vec![vec![0.5f32; 4096]]);

    session.start_capture(Box::new(source)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.stop_capture().await;

    match rx.try_recv().unwrap() {
        ClientMessage::Audio { data } => {
            assert_eq!(data.len(), 4096);
            assert_eq!(data[0], 16384); // 0.5 scaled by 32768
        }
        other => panic!("expected audio message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_muted_capture_sends_nothing() {
    let (session, mut rx) = test_session(Arc::new(NullSink));
    session.set_muted(true);

    let (source, _released) = ScriptedSource::new(vec![vec![0.0f32; 4096]]);
    session.start_capture(Box::new(source)).await.unwrap();

    // Let the frame drain through the gate, then stop deterministically.
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.stop_capture().await;

    assert!(rx.try_recv().is_err(), "muted frame must be dropped");
}

#[tokio::test]
async fn test_failed_capture_start_is_reported_and_released() {
    let (session, _rx) = test_session(Arc::new(NullSink));
    let released = Arc::new(AtomicBool::new(false));
    let source = UnavailableSource {
        released: Arc::clone(&released),
    };

    let result = session.start_capture(Box::new(source)).await;

    assert!(matches!(
        result,
        Err(CaptureError::DeviceUnavailable { .. })
    ));
    // The failed start still released the device.
    assert!(released.load(Ordering::SeqCst));
    assert!(!session.stats().await.capturing);
}

#[tokio::test]
async fn test_stop_capture_releases_source() {
    let (session, _rx) = test_session(Arc::new(NullSink));
    let (source, released) = ScriptedSource::new(vec![vec![0.0f32; 4096]; 4]);

    session.start_capture(Box::new(source)).await.unwrap();
    session.stop_capture().await;

    assert!(released.load(Ordering::SeqCst));
    assert!(!session.stats().await.capturing);
}

// ============================================================================
// Receive path
// ============================================================================

#[tokio::test]
async fn test_audio_then_interrupt_stops_engine_and_empties_queue() {
    let sink = Arc::new(GatedSink::default());
    let (session, _rx) = test_session(sink.clone());

    let payload = encode_pcm_base64(&[100i16; 10]);
    session.dispatch(json!({"type": "audio", "audio": payload})).await;
    wait_for(|| sink.active.load(Ordering::SeqCst) == 1).await;

    session.dispatch(json!({"type": "audio_interrupted"})).await;

    wait_for(|| session.playback().is_idle()).await;
    assert_eq!(session.playback().queued_len(), 0);
    assert_eq!(sink.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_input_timeout_emits_commit() {
    let (session, mut rx) = test_session(Arc::new(NullSink));

    session
        .dispatch(json!({"type": "input_audio_timeout_triggered"}))
        .await;

    assert!(matches!(rx.try_recv().unwrap(), ClientMessage::CommitAudio));
}

#[tokio::test]
async fn test_history_updated_renders_and_tracks_last_message() {
    let (session, _rx) = test_session(Arc::new(NullSink));

    session
        .dispatch(json!({
            "type": "history_updated",
            "history": [
                {"item_id": "a", "type": "message", "role": "user",
                 "content": [{"type": "input_text", "text": "hi"}]},
                {"item_id": "b", "type": "message", "role": "assistant",
                 "content": [{"type": "audio", "transcript": "yo"}]},
            ]
        }))
        .await;

    let entries = session.transcript().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "hi");
    assert_eq!(entries[1].text, "yo");

    // A replayed sync with a longer transcript grows the last entry in
    // place instead of duplicating it.
    session
        .dispatch(json!({
            "type": "history_updated",
            "history": [
                {"item_id": "a", "type": "message", "role": "user",
                 "content": [{"type": "input_text", "text": "hi"}]},
                {"item_id": "b", "type": "message", "role": "assistant",
                 "content": [{"type": "audio", "transcript": "yo, what's up"}]},
            ]
        }))
        .await;

    let entries = session.transcript().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].text, "yo, what's up");
}

#[tokio::test]
async fn test_history_added_renders_image_entry() {
    let (session, _rx) = test_session(Arc::new(NullSink));

    session
        .dispatch(json!({
            "type": "history_added",
            "item": {
                "item_id": "img1",
                "type": "message",
                "role": "user",
                "content": [
                    {"type": "input_image", "image_url": "data:image/jpeg;base64,AAAA"},
                    {"type": "input_text", "text": "cat pic"}
                ]
            }
        }))
        .await;

    let entries = session.transcript().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].image.as_deref(), Some("data:image/jpeg;base64,AAAA"));
    assert_eq!(entries[0].text, "cat pic");
}

// ============================================================================
// Passive logs and unknown events
// ============================================================================

#[tokio::test]
async fn test_every_event_lands_in_raw_log() {
    let (session, _rx) = test_session(Arc::new(NullSink));

    session.dispatch(json!({"type": "audio_interrupted"})).await;
    session.dispatch(json!({"type": "tool_start", "tool": "get_weather"})).await;
    session.dispatch(json!({"type": "something_new", "x": 1})).await;

    let raw = session.raw_events().await;
    assert_eq!(raw.len(), 3);
    assert_eq!(raw[1].tag(), Some("tool_start"));

    let stats = session.stats().await;
    assert_eq!(stats.events_received, 3);
}

#[tokio::test]
async fn test_tool_and_handoff_events_mirror_to_tool_log() {
    let (session, _rx) = test_session(Arc::new(NullSink));

    session.dispatch(json!({"type": "tool_start", "tool": "lookup"})).await;
    session
        .dispatch(json!({"type": "tool_end", "tool": "lookup", "output": "42"}))
        .await;
    session
        .dispatch(json!({"type": "handoff", "from": "triage", "to": "billing"}))
        .await;
    session.dispatch(json!({"type": "audio_interrupted"})).await;

    let tools = session.tool_events().await;
    assert_eq!(tools.len(), 3);
    assert_eq!(tools[1].description, "lookup: 42");
    assert_eq!(tools[2].description, "from triage to billing");
}

#[tokio::test]
async fn test_unknown_event_is_inert() {
    let (session, mut rx) = test_session(Arc::new(NullSink));

    session
        .dispatch(json!({"type": "rate_limits_updated", "limit": 10}))
        .await;

    assert!(session.transcript().await.is_empty());
    assert!(rx.try_recv().is_err());
    assert_eq!(session.raw_events().await.len(), 1);
}

#[tokio::test]
async fn test_event_with_no_tag_is_dropped_not_fatal() {
    let (session, _rx) = test_session(Arc::new(NullSink));

    session.dispatch(json!({"audio": "AAAA"})).await;
    session.dispatch(json!({"type": "audio_interrupted"})).await;

    // Both events were logged; only the tagged one dispatched.
    assert_eq!(session.raw_events().await.len(), 2);
}

// ============================================================================
// Image transfer preemption
// ============================================================================

#[tokio::test]
async fn test_send_image_interrupts_before_transfer() {
    let sink = Arc::new(GatedSink::default());
    let (session, mut rx) = test_session(sink.clone());

    // Pending speech is playing when the user sends an image.
    session
        .dispatch(json!({"type": "audio", "audio": encode_pcm_base64(&[5i16; 100])}))
        .await;
    wait_for(|| sink.active.load(Ordering::SeqCst) == 1).await;

    session
        .send_image("data:image/png;base64,AAAA", "look at this")
        .await
        .unwrap();

    wait_for(|| session.playback().is_idle()).await;
    assert_eq!(sink.stops.load(Ordering::SeqCst), 1);

    let mut messages = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        messages.push(msg);
    }

    assert!(matches!(messages[0], ClientMessage::Interrupt));
    assert!(
        matches!(&messages[1], ClientMessage::ImageStart { text, .. } if text == "look at this")
    );
    assert!(matches!(&messages[2], ClientMessage::ImageChunk { .. }));
    assert!(matches!(&messages[3], ClientMessage::ImageEnd { .. }));
    assert_eq!(messages.len(), 4);
}
