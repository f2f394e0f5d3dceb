use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use super::config::SessionConfig;
use super::dispatcher::{DispatchAction, EventDispatcher};
use crate::audio::{AudioFrame, MicrophoneCapture, FRAME_SAMPLES};
use crate::protocol::ControlMessage;
use crate::transport::{Transport, TransportEvent};

/// Wait after `stop` for in-flight recognition results before closing.
const GRACE_INTERVAL: Duration = Duration::from_secs(1);

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    /// The full assembled transcript.
    pub transcript: String,
    /// Close status code reported by the transport, if any.
    pub close_code: Option<u16>,
    /// Close reason reported by the transport.
    pub close_reason: String,
}

/// Drives one recognition session from open to close.
///
/// The transport's event stream is consumed serially on this task, the only
/// writer of transcript state, so the aggregator needs no locking. Audio
/// capture runs on its own spawned task and shares nothing but the transport
/// handle.
pub struct StreamingSession<T: Transport + 'static> {
    transport: Arc<T>,
    config: SessionConfig,
}

impl<T: Transport + 'static> StreamingSession<T> {
    pub fn new(transport: Arc<T>, config: SessionConfig) -> Self {
        Self { transport, config }
    }

    /// Run the session to completion and return the assembled transcript
    /// with the close status.
    pub async fn run(self, mut events: mpsc::Receiver<TransportEvent>) -> Result<SessionOutcome> {
        let mut dispatcher = EventDispatcher::new();
        let mut interim_shown = false;

        while let Some(event) = events.recv().await {
            match dispatcher.dispatch(event) {
                DispatchAction::StartSession => self.start_capture().await?,
                DispatchAction::Display(update) => {
                    // Interim text is redrawn in place; a final result gets
                    // its own line.
                    if update.is_final {
                        if interim_shown {
                            println!();
                            interim_shown = false;
                        }
                        println!("{}", update.text);
                    } else {
                        print!("\r{}", update.text);
                        std::io::stdout().flush().ok();
                        interim_shown = true;
                    }
                }
                DispatchAction::Finish {
                    transcript,
                    code,
                    reason,
                } => {
                    if interim_shown {
                        println!();
                    }
                    return Ok(SessionOutcome {
                        transcript,
                        close_code: code,
                        close_reason: reason,
                    });
                }
                DispatchAction::Ignore => {}
            }
        }

        anyhow::bail!("Transport event stream ended without a close notification");
    }

    /// Open the microphone, send `start`, and launch the capture-and-send
    /// task.
    ///
    /// The device is acquired first: if it is unavailable the session aborts
    /// with nothing written to the wire.
    async fn start_capture(&self) -> Result<()> {
        let (capture, frames) = MicrophoneCapture::open()?;
        let sample_rate = capture.sample_rate();

        let start = ControlMessage::start(sample_rate, &self.config);
        self.transport
            .send_text(serde_json::to_string(&start)?)
            .await
            .context("Failed to send the start message")?;

        let budget = frame_budget(sample_rate, self.config.record_seconds);
        info!(
            "Recording {} s at {} Hz ({} frames)",
            self.config.record_seconds, sample_rate, budget
        );

        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            let release = || capture.stop();
            if let Err(err) = capture_and_send(transport.as_ref(), frames, budget, release).await
            {
                // A dead transport aborts the capture loop, nothing else;
                // the receive side still reports the close.
                error!("Capture loop aborted: {err:#}");
            }
        });

        Ok(())
    }
}

/// Number of frames needed to cover `seconds` of audio at `sample_rate`.
pub fn frame_budget(sample_rate: u32, seconds: u64) -> usize {
    (sample_rate as f64 / FRAME_SAMPLES as f64 * seconds as f64).ceil() as usize
}

/// Forward up to `budget` captured frames in order, then wind the session
/// down: release the device, send `stop`, wait a grace interval for trailing
/// results, close.
pub async fn capture_and_send<T: Transport + ?Sized>(
    transport: &T,
    mut frames: mpsc::Receiver<AudioFrame>,
    budget: usize,
    release: impl FnOnce() + Send,
) -> Result<()> {
    info!("* recording");

    for _ in 0..budget {
        let Some(frame) = frames.recv().await else {
            break;
        };
        transport
            .send_binary(frame.to_le_bytes())
            .await
            .context("Audio send failed")?;
    }

    release();
    info!("* done recording");

    transport
        .send_text(serde_json::to_string(&ControlMessage::Stop)?)
        .await
        .context("Failed to send the stop message")?;

    tokio::time::sleep(GRACE_INTERVAL).await;
    transport.close().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_budget_rounds_up() {
        // 44100 / 1024 * 5 = 215.33... -> 216
        assert_eq!(frame_budget(44_100, 5), 216);
        // 16384 / 1024 * 2 divides evenly.
        assert_eq!(frame_budget(16_384, 2), 32);
        assert_eq!(frame_budget(16_000, 0), 0);
    }
}
