use serde::{Deserialize, Serialize};

use crate::session::SessionConfig;

/// Control message sent to the service as a text frame
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Opens the recognition session. Must be the first frame on the wire,
    /// before any audio, and must carry the true device sample rate.
    Start {
        #[serde(rename = "content-type")]
        content_type: String,
        continuous: bool,
        interim_results: bool,
        word_confidence: bool,
        timestamps: bool,
        max_alternatives: u32,
    },
    /// Marks the end of the audio stream.
    Stop,
}

impl ControlMessage {
    /// Build the `start` message for a session at `sample_rate` Hz.
    pub fn start(sample_rate: u32, config: &SessionConfig) -> Self {
        ControlMessage::Start {
            content_type: format!("audio/l16;rate={sample_rate}"),
            continuous: config.continuous,
            interim_results: config.interim_results,
            word_confidence: config.word_confidence,
            timestamps: config.timestamps,
            max_alternatives: config.max_alternatives,
        }
    }
}

/// Any text frame received from the service.
///
/// Recognition events carry `results`; frames without `results` are control
/// acknowledgements (`state`) or service-reported errors (`error`) and do not
/// contribute to the transcript.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub results: Option<Vec<RecognitionResult>>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ServerMessage {
    /// Extract the recognition event, if this frame is one.
    pub fn into_event(self) -> Option<RecognitionEvent> {
        self.results.map(|results| RecognitionEvent { results })
    }
}

/// One decoded inbound recognition event, immutable once received.
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionEvent {
    pub results: Vec<RecognitionResult>,
}

impl RecognitionEvent {
    /// Primary result of the event.
    pub fn primary(&self) -> Option<&RecognitionResult> {
        self.results.first()
    }

    /// Transcript text of the primary result's primary alternative.
    pub fn primary_transcript(&self) -> Option<&str> {
        self.primary()?
            .alternatives
            .first()
            .map(|alt| alt.transcript.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionResult {
    /// Confirmed segments are never revised; interim ones supersede each other.
    #[serde(rename = "final")]
    pub is_final: bool,
    /// Candidate transcriptions in confidence order. Only the first one is
    /// used for transcript assembly.
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Per-word `[word, start_secs, end_secs]` entries, present when
    /// timestamps were requested.
    #[serde(default)]
    pub timestamps: Option<Vec<(String, f64, f64)>>,
    /// Per-word `[word, confidence]` entries, present when word confidence
    /// was requested.
    #[serde(default)]
    pub word_confidence: Option<Vec<(String, f64)>>,
}
