use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::events::{RawEvent, ToolEvent};
use super::stats::SessionStats;
use crate::audio::capture::{CaptureError, CapturePipeline, CaptureSource};
use crate::audio::playback::{PlaybackConfig, PlaybackQueue, PlaybackSink};
use crate::outbound::ControlChannel;
use crate::protocol::{ProtocolError, ServerMessage};
use crate::transcript::{Transcript, TranscriptEntry};
use crate::transfer;
use crate::transport::AgentClient;

/// A live agent session: capture, playback, transcript, and passive event
/// logs around one duplex channel.
///
/// All inbound messages flow through [`VoiceSession::dispatch`], strictly
/// in receipt order; nothing here reorders or parallelizes across
/// messages.
pub struct VoiceSession {
    config: SessionConfig,
    control: ControlChannel,
    capture: CapturePipeline,
    playback: PlaybackQueue,
    transcript: Mutex<Transcript>,
    raw_events: Mutex<Vec<RawEvent>>,
    tool_events: Mutex<Vec<ToolEvent>>,
    events_received: AtomicUsize,
    connected: AtomicBool,
    started_at: chrono::DateTime<Utc>,
    client: Mutex<Option<AgentClient>>,
    pump_task: Mutex<Option<JoinHandle<()>>>,
}

impl VoiceSession {
    /// Assemble a session around an existing outbound channel.
    ///
    /// Used directly by tests; [`VoiceSession::connect`] wires it to a
    /// live socket.
    pub fn new(
        config: SessionConfig,
        control: ControlChannel,
        sink: Arc<dyn PlaybackSink>,
    ) -> Arc<Self> {
        let playback = PlaybackQueue::new(
            PlaybackConfig {
                sample_rate: config.sample_rate,
                fade_secs: config.playback_fade_secs,
            },
            sink,
        );
        let capture = CapturePipeline::new(control.clone());
        let connected = control.is_open();

        Arc::new(Self {
            config,
            control,
            capture,
            playback,
            transcript: Mutex::new(Transcript::new()),
            raw_events: Mutex::new(Vec::new()),
            tool_events: Mutex::new(Vec::new()),
            events_received: AtomicUsize::new(0),
            connected: AtomicBool::new(connected),
            started_at: Utc::now(),
            client: Mutex::new(None),
            pump_task: Mutex::new(None),
        })
    }

    /// Connect to the agent server and start dispatching inbound events.
    pub async fn connect(
        config: SessionConfig,
        sink: Arc<dyn PlaybackSink>,
    ) -> Result<Arc<Self>> {
        info!("creating agent session: {}", config.session_id);

        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<Value>();
        let client = AgentClient::connect(&config.server_url, &config.session_id, inbound_tx)
            .await
            .context("failed to connect to agent server")?;

        let control = ControlChannel::new(client.outbound());
        let session = Self::new(config, control, sink);

        {
            let mut slot = session.client.lock().await;
            *slot = Some(client);
        }

        let pump = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                info!("event dispatch task started");
                while let Some(event) = inbound_rx.recv().await {
                    session.dispatch(event).await;
                }
                session.connected.store(false, Ordering::SeqCst);
                info!("event dispatch task stopped");
            })
        };
        {
            let mut slot = session.pump_task.lock().await;
            *slot = Some(pump);
        }

        info!("agent session started: {}", session.config.session_id);
        Ok(session)
    }

    /// Route one inbound event. Always records it in the raw log, mirrors
    /// tool and handoff activity into the tool log, then dispatches by
    /// tag. A failure in any one handler is isolated to that event.
    pub async fn dispatch(&self, event: Value) {
        self.events_received.fetch_add(1, Ordering::SeqCst);

        {
            let mut raw = self.raw_events.lock().await;
            raw.push(RawEvent::new(event.clone()));
        }

        if let Some(tag) = event.get("type").and_then(Value::as_str) {
            if let Some(tool_event) = ToolEvent::from_raw(tag, &event) {
                let mut tools = self.tool_events.lock().await;
                tools.push(tool_event);
            }
        }

        let message = match ServerMessage::from_value(&event) {
            Ok(message) => message,
            Err(ProtocolError::MissingTag) => {
                warn!("dropping inbound event with no type tag");
                return;
            }
            Err(e) => {
                warn!("dropping malformed inbound event: {e}");
                return;
            }
        };

        match message {
            ServerMessage::Audio { audio } => self.playback.enqueue(audio),
            ServerMessage::AudioInterrupted => self.playback.cancel().await,
            ServerMessage::InputAudioTimeoutTriggered => {
                // Commit the input buffer to expedite the model response.
                self.control.commit_audio();
            }
            ServerMessage::HistoryUpdated { history } => {
                let mut transcript = self.transcript.lock().await;
                transcript.sync_missing(&history);
                // Second pass runs even when the first just rendered the
                // last item: repeated full syncs grow an in-progress
                // assistant transcript in place.
                transcript.update_last(&history);
            }
            ServerMessage::HistoryAdded { item } => {
                let mut transcript = self.transcript.lock().await;
                transcript.add_item(&item);
            }
            // Already mirrored into the tool log above.
            ServerMessage::ToolStart(_) | ServerMessage::ToolEnd(_) | ServerMessage::Handoff(_) => {}
            ServerMessage::Unknown { tag, .. } => {
                debug!("ignoring unknown event type: {tag}");
            }
        }
    }

    /// Start streaming microphone frames from `source`.
    pub async fn start_capture(&self, source: Box<dyn CaptureSource>) -> Result<(), CaptureError> {
        self.capture.start(source).await
    }

    /// Stop capturing and release the source.
    pub async fn stop_capture(&self) {
        self.capture.stop().await;
    }

    pub fn set_muted(&self, muted: bool) {
        self.capture.set_muted(muted);
        info!(muted, "microphone gate updated");
    }

    pub fn is_muted(&self) -> bool {
        self.capture.is_muted()
    }

    /// Preempt pending speech and stream an encoded image to the agent.
    ///
    /// Local playback is stale the moment the user pushes new input, so it
    /// is cancelled and the agent interrupted before the transfer begins.
    pub async fn send_image(&self, data_url: &str, prompt: &str) -> Result<String> {
        self.playback.cancel().await;
        self.control.interrupt();

        let id = transfer::transfer_id();
        transfer::send_image(&self.control, &id, prompt, data_url)
            .context("image transfer failed")?;
        Ok(id)
    }

    pub async fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);
        let transcript_entries = self.transcript.lock().await.len();

        SessionStats {
            session_id: self.config.session_id.clone(),
            connected: self.connected.load(Ordering::SeqCst) && self.control.is_open(),
            capturing: self.capture.is_capturing(),
            muted: self.capture.is_muted(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            events_received: self.events_received.load(Ordering::SeqCst),
            transcript_entries,
        }
    }

    /// Snapshot of the rendered transcript.
    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().await.snapshot()
    }

    /// Snapshot of the raw inbound event log.
    pub async fn raw_events(&self) -> Vec<RawEvent> {
        self.raw_events.lock().await.clone()
    }

    /// Snapshot of the tool/handoff log.
    pub async fn tool_events(&self) -> Vec<ToolEvent> {
        self.tool_events.lock().await.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn playback(&self) -> &PlaybackQueue {
        &self.playback
    }

    /// Tear down capture, playback, and the duplex channel.
    pub async fn close(&self) {
        info!("closing session {}", self.config.session_id);

        self.capture.stop().await;
        self.playback.cancel().await;
        self.connected.store(false, Ordering::SeqCst);

        if let Some(client) = self.client.lock().await.take() {
            client.close().await;
        }
        if let Some(task) = self.pump_task.lock().await.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!("event dispatch task panicked: {e}");
                }
            }
        }

        info!("session closed: {}", self.config.session_id);
    }
}
