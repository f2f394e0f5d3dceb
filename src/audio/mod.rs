pub mod capture;

pub use capture::{AudioFrame, MicrophoneCapture, FRAME_SAMPLES};
