use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::codec;
use crate::outbound::ControlChannel;
use crate::protocol::ClientMessage;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// No compatible capture device or permission. Surfaced to the caller,
    /// never retried automatically.
    #[error("capture device unavailable: {reason}")]
    DeviceUnavailable { reason: String },
}

/// Capture configuration, fixed to the wire format
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (the wire format is mono)
    pub channels: u16,
    /// Samples per capture frame
    pub frame_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
            frame_size: 4096,
        }
    }
}

/// A black-box producer of fixed-size float frames at a fixed rate.
///
/// Implementations own their device exclusively between `start` and `stop`.
/// `stop` must release the device on every path, including after a failed
/// start, and must be safe to call on a source that never started.
#[async_trait::async_trait]
pub trait CaptureSource: Send + Sync {
    /// Acquire the device and start producing frames.
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<f32>>, CaptureError>;

    /// Release the device.
    async fn stop(&mut self) -> Result<()>;

    /// Whether the source is currently producing frames.
    fn is_capturing(&self) -> bool;

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// Capture source backed by a WAV file, for batch processing and tests.
///
/// Emits `frame_size` float frames paced at the real-time rate of the
/// recording, then stops.
pub struct WavFileSource {
    path: PathBuf,
    config: CaptureConfig,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl WavFileSource {
    pub fn new(path: impl AsRef<Path>, config: CaptureConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for WavFileSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<f32>>, CaptureError> {
        let reader = hound::WavReader::open(&self.path).map_err(|e| {
            CaptureError::DeviceUnavailable {
                reason: format!("cannot open {}: {e}", self.path.display()),
            }
        })?;

        let spec = reader.spec();
        if spec.sample_rate != self.config.sample_rate || spec.channels != self.config.channels {
            return Err(CaptureError::DeviceUnavailable {
                reason: format!(
                    "{} is {}Hz {}ch, need {}Hz {}ch",
                    self.path.display(),
                    spec.sample_rate,
                    spec.channels,
                    self.config.sample_rate,
                    self.config.channels
                ),
            });
        }

        let samples: Vec<f32> = reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CaptureError::DeviceUnavailable {
                reason: format!("cannot read {}: {e}", self.path.display()),
            })?;

        info!(
            "file capture source started: {} ({} samples)",
            self.path.display(),
            samples.len()
        );

        let (tx, rx) = mpsc::channel(16);
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::SeqCst);

        let frame_size = self.config.frame_size;
        let frame_duration =
            std::time::Duration::from_secs_f64(frame_size as f64 / self.config.sample_rate as f64);

        let task = tokio::spawn(async move {
            for frame in samples.chunks(frame_size) {
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(frame.to_vec()).await.is_err() {
                    break;
                }
                tokio::time::sleep(frame_duration).await;
            }
            capturing.store(false, Ordering::SeqCst);
            debug!("file capture source drained");
        });
        self.task = Some(task);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

/// The capture -> encode -> send path.
///
/// Pulls float frames from a capture source, encodes them as 16-bit PCM,
/// and emits one `audio` wire message per frame. Muting is a lossy gate:
/// gated frames are dropped, never buffered.
pub struct CapturePipeline {
    channel: ControlChannel,
    muted: Arc<AtomicBool>,
    capturing: Arc<AtomicBool>,
    /// Pump task plus its stop signal, scoped per capture run
    task: Mutex<Option<(JoinHandle<()>, Arc<Notify>)>>,
}

impl CapturePipeline {
    pub fn new(channel: ControlChannel) -> Self {
        Self {
            channel,
            muted: Arc::new(AtomicBool::new(false)),
            capturing: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Acquire `source` and start streaming frames to the channel.
    ///
    /// A failed start releases everything the source acquired before
    /// returning. The failure is reported, not retried.
    pub async fn start(&self, mut source: Box<dyn CaptureSource>) -> Result<(), CaptureError> {
        if self.capturing.swap(true, Ordering::SeqCst) {
            warn!("capture already started");
            return Ok(());
        }

        let mut frames = match source.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.capturing.store(false, Ordering::SeqCst);
                if let Err(stop_err) = source.stop().await {
                    warn!("failed to release capture source after failed start: {stop_err:#}");
                }
                error!("failed to start audio capture: {e}");
                return Err(e);
            }
        };

        info!("capture started via {} source", source.name());

        let capturing = Arc::clone(&self.capturing);
        let muted = Arc::clone(&self.muted);
        let stop_signal = Arc::new(Notify::new());
        let stop_waiter = Arc::clone(&stop_signal);
        let channel = self.channel.clone();

        let task = tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    frame = frames.recv() => frame,
                    _ = stop_waiter.notified() => None,
                };
                let Some(frame) = frame else { break };
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }
                // Muted or closed channel: drop the frame silently.
                if muted.load(Ordering::SeqCst) || !channel.is_open() {
                    continue;
                }
                let data = codec::float_to_int16(&frame);
                if channel.send(ClientMessage::Audio { data }).is_err() {
                    debug!("outbound channel closed mid-frame, dropping");
                }
            }

            if let Err(e) = source.stop().await {
                error!("failed to stop capture source: {e:#}");
            }
            capturing.store(false, Ordering::SeqCst);
            info!("capture stopped");
        });

        {
            let mut handle = self.task.lock().await;
            *handle = Some((task, stop_signal));
        }

        Ok(())
    }

    /// Stop capturing and release the source. Waits for the pump task so
    /// the device is released before this returns.
    pub async fn stop(&self) {
        self.capturing.store(false, Ordering::SeqCst);

        let mut handle = self.task.lock().await;
        if let Some((task, stop_signal)) = handle.take() {
            // notify_one stores a permit in case the pump is mid-frame
            // rather than parked at its await
            stop_signal.notify_one();
            if let Err(e) = task.await {
                error!("capture task panicked: {e}");
            }
        }
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }
}
