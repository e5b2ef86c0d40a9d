pub mod capture;
pub mod codec;
pub mod envelope;
pub mod playback;

pub use capture::{CaptureConfig, CaptureError, CapturePipeline, CaptureSource, WavFileSource};
pub use codec::CodecError;
pub use envelope::FadeEnvelope;
pub use playback::{PlaybackConfig, PlaybackError, PlaybackQueue, PlaybackSink, WavFileSink};
