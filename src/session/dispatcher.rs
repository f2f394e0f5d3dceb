use tracing::{debug, warn};

use super::transcript::{LiveUpdate, TranscriptAggregator};
use crate::protocol::ServerMessage;
use crate::transport::TransportEvent;

/// Session lifecycle:
/// `NotStarted → (Opened) → Active → (Message)* → (Closed) → Closed`.
///
/// Errors may occur any number of times while active without changing
/// state, and nothing leaves the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Active,
    Closed,
}

/// What the session loop should do in response to a transport event.
#[derive(Debug, PartialEq)]
pub enum DispatchAction {
    /// The connection is open: send `start` and launch the capture loop.
    StartSession,
    /// A recognition event arrived; show its text.
    Display(LiveUpdate),
    /// The connection is gone; the session is over.
    Finish {
        transcript: String,
        code: Option<u16>,
        reason: String,
    },
    /// Nothing to do (acknowledgements, reported errors, stray events).
    Ignore,
}

/// Routes transport notifications to the aggregator with enumerated state
/// transitions. Performs no I/O itself; the session loop acts on the
/// returned [`DispatchAction`].
#[derive(Debug, Default)]
pub struct EventDispatcher {
    state: SessionState,
    aggregator: TranscriptAggregator,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::NotStarted
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn dispatch(&mut self, event: TransportEvent) -> DispatchAction {
        match (self.state, event) {
            (SessionState::NotStarted, TransportEvent::Opened) => {
                self.state = SessionState::Active;
                DispatchAction::StartSession
            }
            (SessionState::Active, TransportEvent::Message(raw)) => self.on_message(&raw),
            (SessionState::NotStarted | SessionState::Active, TransportEvent::Error(err)) => {
                // Non-terminal: the transport decides whether this leads to
                // close.
                warn!("Transport error: {}", err);
                DispatchAction::Ignore
            }
            (
                SessionState::NotStarted | SessionState::Active,
                TransportEvent::Closed { code, reason },
            ) => {
                self.state = SessionState::Closed;
                DispatchAction::Finish {
                    transcript: self.aggregator.on_close(),
                    code,
                    reason,
                }
            }
            (SessionState::Closed, event) => {
                warn!("Ignoring event after close: {:?}", event);
                DispatchAction::Ignore
            }
            (state, event) => {
                warn!("Ignoring {:?} in state {:?}", event, state);
                DispatchAction::Ignore
            }
        }
    }

    fn on_message(&mut self, raw: &str) -> DispatchAction {
        let message: ServerMessage = match serde_json::from_str(raw) {
            Ok(message) => message,
            Err(err) => {
                warn!("Ignoring undecodable message: {}", err);
                return DispatchAction::Ignore;
            }
        };

        if let Some(err) = &message.error {
            warn!("Service reported an error: {}", err);
            return DispatchAction::Ignore;
        }
        if let Some(state) = &message.state {
            debug!("Service acknowledgement: state={}", state);
        }

        match message.into_event() {
            Some(event) => match self.aggregator.on_event(event) {
                Some(update) => DispatchAction::Display(update),
                None => DispatchAction::Ignore,
            },
            // No `results` key: a control acknowledgement, not an event.
            None => DispatchAction::Ignore,
        }
    }
}
