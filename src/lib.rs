pub mod audio;
pub mod config;
pub mod http;
pub mod outbound;
pub mod protocol;
pub mod session;
pub mod transcript;
pub mod transfer;
pub mod transport;

pub use audio::{
    CaptureConfig, CaptureError, CapturePipeline, CaptureSource, FadeEnvelope, PlaybackConfig,
    PlaybackError, PlaybackQueue, PlaybackSink, WavFileSink, WavFileSource,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use outbound::{ChannelClosed, ControlChannel};
pub use protocol::{ClientMessage, ContentPart, HistoryItem, ProtocolError, ServerMessage};
pub use session::{RawEvent, SessionConfig, SessionStats, ToolEvent, ToolEventKind, VoiceSession};
pub use transcript::{EntryHandle, Transcript, TranscriptEntry};
pub use transport::AgentClient;
