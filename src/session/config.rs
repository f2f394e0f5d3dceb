use serde::{Deserialize, Serialize};

/// Configuration for one recognition session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Keep recognizing across pauses instead of stopping at the first one
    pub continuous: bool,

    /// Deliver tentative results while an utterance is still in progress
    pub interim_results: bool,

    /// Request per-word confidence scores
    pub word_confidence: bool,

    /// Request per-word timing
    pub timestamps: bool,

    /// How many candidate transcriptions the service returns per result
    pub max_alternatives: u32,

    /// Capture duration budget in seconds
    pub record_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            word_confidence: true,
            timestamps: true,
            max_alternatives: 3,
            record_seconds: 5,
        }
    }
}
