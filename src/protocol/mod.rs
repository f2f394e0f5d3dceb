pub mod messages;

pub use messages::{Alternative, ControlMessage, RecognitionEvent, RecognitionResult, ServerMessage};
