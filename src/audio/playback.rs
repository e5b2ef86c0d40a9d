use std::collections::VecDeque;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use super::codec;
use super::envelope::FadeEnvelope;

#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The audio engine rejected a buffer.
    #[error("audio engine rejected buffer: {0}")]
    Engine(String),
}

/// Output end of the playback path.
///
/// Implementations render exactly one unit at a time. `play` resolves at
/// the unit's natural end, or early when `stop` preempts it. `stop` fades
/// the active unit to silence from its *current* gain over the given
/// window, then hard-stops; stopping when nothing is active is a benign
/// no-op.
#[async_trait::async_trait]
pub trait PlaybackSink: Send + Sync {
    async fn play(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
        envelope: FadeEnvelope,
    ) -> Result<(), PlaybackError>;

    async fn stop(&self, fade: Duration);
}

/// Playback configuration, fixed to the wire format
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Base declick fade window in seconds
    pub fade_secs: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            fade_secs: FadeEnvelope::DEFAULT_FADE_SECS,
        }
    }
}

/// One inbound unit of synthesized speech, queued in arrival order.
#[derive(Debug, Clone)]
pub struct PlaybackChunk {
    /// Base64-encoded 16-bit PCM payload
    pub payload: String,
}

/// Strictly-FIFO, single-consumer queue of received audio chunks.
///
/// A single-flight guard keeps at most one consumer loop alive; the loop
/// dequeues, decodes, wraps each unit in a declick envelope, and awaits its
/// natural completion before the next. Decode and render failures are
/// isolated per chunk and never halt the queue.
pub struct PlaybackQueue {
    shared: Arc<Shared>,
}

struct Shared {
    config: PlaybackConfig,
    sink: Arc<dyn PlaybackSink>,
    queue: Mutex<VecDeque<PlaybackChunk>>,
    draining: AtomicBool,
}

impl PlaybackQueue {
    pub fn new(config: PlaybackConfig, sink: Arc<dyn PlaybackSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                sink,
                queue: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
            }),
        }
    }

    /// Append a chunk to the tail; wakes the consumer if it is idle.
    pub fn enqueue(&self, payload: impl Into<String>) {
        let payload = payload.into();
        if payload.is_empty() {
            debug!("received empty audio data, skipping playback");
            return;
        }

        self.shared
            .queue
            .lock()
            .unwrap()
            .push_back(PlaybackChunk { payload });

        if !self.shared.draining.swap(true, Ordering::SeqCst) {
            tokio::spawn(drain(Arc::clone(&self.shared)));
        }
    }

    /// Drop every queued chunk and fade out whatever is rendering.
    ///
    /// The active unit ramps to silence from its current gain over one
    /// fade window, then hard-stops; the consumer returns to idle so a
    /// later `enqueue` restarts the loop cleanly. Never fails, including
    /// when nothing is playing.
    pub async fn cancel(&self) {
        info!("stopping audio playback");
        self.shared.queue.lock().unwrap().clear();

        let fade = Duration::from_secs_f32(self.shared.config.fade_secs.max(0.01));
        self.shared.sink.stop(fade).await;
    }

    pub fn queued_len(&self) -> usize {
        self.shared.queue.lock().unwrap().len()
    }

    /// Whether the consumer loop is idle (nothing rendering or queued).
    pub fn is_idle(&self) -> bool {
        !self.shared.draining.load(Ordering::SeqCst)
    }
}

/// Consumer loop. Runs until the queue drains, then flips the single-flight
/// guard back; a re-check closes the race with a concurrent enqueue.
async fn drain(shared: Arc<Shared>) {
    debug!("playback consumer started");
    loop {
        let chunk = shared.queue.lock().unwrap().pop_front();
        match chunk {
            Some(chunk) => play_chunk(&shared, chunk).await,
            None => {
                shared.draining.store(false, Ordering::SeqCst);
                let requeued = !shared.queue.lock().unwrap().is_empty();
                if requeued && !shared.draining.swap(true, Ordering::SeqCst) {
                    continue;
                }
                break;
            }
        }
    }
    debug!("playback consumer idle");
}

async fn play_chunk(shared: &Shared, chunk: PlaybackChunk) {
    let samples = match codec::decode_base64_pcm(&chunk.payload) {
        Ok(samples) => samples,
        Err(e) => {
            warn!("skipping undecodable audio chunk: {e}");
            return;
        }
    };
    if samples.is_empty() {
        debug!("audio chunk has no samples, skipping");
        return;
    }

    let floats = codec::int16_to_float(&samples);
    let envelope = FadeEnvelope::for_samples(
        floats.len(),
        shared.config.sample_rate,
        shared.config.fade_secs,
    );

    if let Err(e) = shared
        .sink
        .play(floats, shared.config.sample_rate, envelope)
        .await
    {
        error!("playback failed, continuing with next chunk: {e}");
    }
}

/// Software audio engine that renders played units into a WAV file.
///
/// Streams each unit in 10ms blocks paced at the real-time rate, applying
/// the declick envelope per sample and tracking the current gain so a stop
/// request can fade out from wherever the envelope actually is.
pub struct WavFileSink {
    writer: Mutex<Option<hound::WavWriter<BufWriter<File>>>>,
    state: Mutex<UnitState>,
    stop_signal: Notify,
}

#[derive(Debug, Clone, Copy)]
struct UnitState {
    active: bool,
    gain: f32,
    /// Fade window in seconds once a stop has been requested
    stopping: Option<f32>,
}

impl WavFileSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, PlaybackError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path.as_ref(), spec)
            .map_err(|e| PlaybackError::Engine(format!("cannot create output file: {e}")))?;

        Ok(Self {
            writer: Mutex::new(Some(writer)),
            state: Mutex::new(UnitState {
                active: false,
                gain: 0.0,
                stopping: None,
            }),
            stop_signal: Notify::new(),
        })
    }

    /// Finish the WAV header. Further playback fails.
    pub fn finalize(&self) -> Result<(), PlaybackError> {
        if let Some(writer) = self.writer.lock().unwrap().take() {
            writer
                .finalize()
                .map_err(|e| PlaybackError::Engine(e.to_string()))?;
        }
        Ok(())
    }

    fn write_block(&self, block: &[f32]) -> Result<(), PlaybackError> {
        let mut writer = self.writer.lock().unwrap();
        let Some(writer) = writer.as_mut() else {
            return Err(PlaybackError::Engine("output already finalized".into()));
        };
        for sample in codec::float_to_int16(block) {
            writer
                .write_sample(sample)
                .map_err(|e| PlaybackError::Engine(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PlaybackSink for WavFileSink {
    async fn play(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
        envelope: FadeEnvelope,
    ) -> Result<(), PlaybackError> {
        {
            let mut state = self.state.lock().unwrap();
            *state = UnitState {
                active: true,
                gain: 0.0,
                stopping: None,
            };
        }

        let block_len = (sample_rate as usize / 100).max(1);
        let block_duration = Duration::from_secs_f64(block_len as f64 / sample_rate as f64);
        let mut pos = 0usize;
        let mut result = Ok(());

        while pos < samples.len() {
            let (gain_now, stopping) = {
                let state = self.state.lock().unwrap();
                (state.gain, state.stopping)
            };

            // A stop request rides out one fade window from the current
            // gain, then hard-stops the unit.
            if let Some(fade_secs) = stopping {
                let fade_len = ((fade_secs * sample_rate as f32) as usize)
                    .min(samples.len() - pos)
                    .max(1);
                let tail: Vec<f32> = (0..fade_len)
                    .map(|i| samples[pos + i] * gain_now * (1.0 - i as f32 / fade_len as f32))
                    .collect();
                if let Err(e) = self.write_block(&tail) {
                    result = Err(e);
                }
                break;
            }

            let end = (pos + block_len).min(samples.len());
            let mut gain = gain_now;
            let block: Vec<f32> = (pos..end)
                .map(|i| {
                    gain = envelope.gain_at(i as f32 / sample_rate as f32);
                    samples[i] * gain
                })
                .collect();
            self.state.lock().unwrap().gain = gain;

            if let Err(e) = self.write_block(&block) {
                result = Err(e);
                break;
            }
            pos = end;

            if pos < samples.len() {
                tokio::select! {
                    _ = tokio::time::sleep(block_duration) => {}
                    _ = self.stop_signal.notified() => {}
                }
            }
        }

        let mut state = self.state.lock().unwrap();
        *state = UnitState {
            active: false,
            gain: 0.0,
            stopping: None,
        };
        result
    }

    async fn stop(&self, fade: Duration) {
        {
            let mut state = self.state.lock().unwrap();
            if !state.active {
                // Stopping an already-finished unit is a benign no-op.
                return;
            }
            state.stopping = Some(fade.as_secs_f32());
        }
        self.stop_signal.notify_waiters();
    }
}

impl Drop for WavFileSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.lock().unwrap().take() {
            if let Err(e) = writer.finalize() {
                warn!("failed to finalize playback WAV on drop: {}", e);
            }
        }
    }
}
