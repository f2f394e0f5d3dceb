pub mod config;
pub mod dispatcher;
pub mod session;
pub mod transcript;

pub use config::SessionConfig;
pub use dispatcher::{DispatchAction, EventDispatcher, SessionState};
pub use session::{capture_and_send, frame_budget, SessionOutcome, StreamingSession};
pub use transcript::{LiveUpdate, TranscriptAggregator};
