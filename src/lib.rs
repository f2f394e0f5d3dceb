pub mod audio;
pub mod config;
pub mod protocol;
pub mod session;
pub mod transport;

pub use audio::{AudioFrame, MicrophoneCapture, FRAME_SAMPLES};
pub use config::{Config, Region, MODEL};
pub use protocol::{ControlMessage, RecognitionEvent, RecognitionResult, ServerMessage};
pub use session::{
    DispatchAction, EventDispatcher, LiveUpdate, SessionConfig, SessionOutcome, SessionState,
    StreamingSession, TranscriptAggregator,
};
pub use transport::{Transport, TransportEvent, WsTransport};
