use crate::protocol::RecognitionEvent;

/// Text to show the user as soon as an event arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveUpdate {
    pub text: String,
    pub is_final: bool,
}

/// Assembles one authoritative transcript from the event stream.
///
/// `finals` holds confirmed events in confirmation order and is append-only.
/// `pending` holds at most one unconfirmed interim event; each newer interim
/// replaces it, and a final clears it. Whatever is pending when the session
/// closes is the best available text for the trailing utterance, so it gets
/// promoted rather than dropped.
#[derive(Debug, Default)]
pub struct TranscriptAggregator {
    finals: Vec<RecognitionEvent>,
    pending: Option<RecognitionEvent>,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one recognition event.
    ///
    /// Returns the primary transcript for live display. Events with no
    /// results or no alternatives contribute nothing.
    pub fn on_event(&mut self, event: RecognitionEvent) -> Option<LiveUpdate> {
        let primary = event.primary()?;
        let is_final = primary.is_final;
        let text = event.primary_transcript()?.to_string();

        if is_final {
            self.finals.push(event);
            self.pending = None;
        } else {
            self.pending = Some(event);
        }

        Some(LiveUpdate { text, is_final })
    }

    /// Finish the transcript at session close.
    ///
    /// A still-pending interim is promoted into `finals` first. Idempotent:
    /// a second call returns the same string.
    pub fn on_close(&mut self) -> String {
        if let Some(pending) = self.pending.take() {
            self.finals.push(pending);
        }

        self.finals
            .iter()
            .filter_map(|event| event.primary_transcript())
            .collect()
    }

    /// Number of confirmed segments so far.
    pub fn finals_count(&self) -> usize {
        self.finals.len()
    }
}
