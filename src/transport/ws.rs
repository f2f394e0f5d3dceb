use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info};

/// Events buffered between the socket reader and the dispatch loop.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Outbound frames buffered ahead of the socket writer.
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

/// Duplex connection to the recognition service.
///
/// Sends fail softly once the connection is gone: the caller gets an error
/// to act on, never a panic.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send one audio frame as a binary message. Frames arrive at the
    /// service in send order.
    async fn send_binary(&self, data: Vec<u8>) -> Result<()>;

    /// Send a control message as a text frame.
    async fn send_text(&self, text: String) -> Result<()>;

    /// Request a graceful close of the connection.
    async fn close(&self) -> Result<()>;
}

/// Transport-level notification, delivered serially in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection is established. Fires exactly once, first.
    Opened,
    /// A text frame arrived from the service.
    Message(String),
    /// A receive-side failure. Non-terminal by itself; the transport decides
    /// whether it leads to close.
    Error(String),
    /// The connection is gone. Fires exactly once, terminal. Synthesized
    /// with an empty code when the peer drops without a close frame.
    Closed { code: Option<u16>, reason: String },
}

enum OutboundFrame {
    Binary(Vec<u8>),
    Text(String),
    Close,
}

/// WebSocket-backed [`Transport`].
///
/// The socket is split after the handshake: a writer task owns the sink and
/// drains an outbound channel, a reader task pumps [`TransportEvent`]s to
/// the receiver handed back by [`connect`](WsTransport::connect). Both tasks
/// end on their own when the connection does.
pub struct WsTransport {
    outbound: mpsc::Sender<OutboundFrame>,
}

impl WsTransport {
    /// Open the connection with HTTP Basic credentials.
    pub async fn connect(
        url: &str,
        auth_header: &str,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let mut request = url
            .into_client_request()
            .with_context(|| format!("Invalid endpoint URL {url}"))?;
        request.headers_mut().insert(
            AUTHORIZATION,
            HeaderValue::from_str(auth_header).context("Invalid authorization header")?,
        );

        let (socket, _response) = connect_async(request)
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;

        info!("Connected to {}", url);

        let (mut sink, mut stream) = socket.split();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (out_tx, mut out_rx) = mpsc::channel::<OutboundFrame>(OUTBOUND_CHANNEL_CAPACITY);

        // The connection is open the moment the handshake returns; queue the
        // notification before any inbound frame can be read.
        event_tx
            .send(TransportEvent::Opened)
            .await
            .map_err(|_| anyhow!("Event receiver dropped before the session started"))?;

        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let result = match frame {
                    OutboundFrame::Binary(data) => sink.send(Message::Binary(data.into())).await,
                    OutboundFrame::Text(text) => sink.send(Message::Text(text.into())).await,
                    OutboundFrame::Close => {
                        if let Err(err) = sink.send(Message::Close(None)).await {
                            debug!("Close frame not delivered: {err}");
                        }
                        break;
                    }
                };
                if let Err(err) = result {
                    // A dead sink fails every later send; the capture loop
                    // sees those errors and aborts on its own.
                    error!("WebSocket send failed: {err}");
                    break;
                }
            }
        });

        tokio::spawn(async move {
            let mut closed = false;
            while let Some(next) = stream.next().await {
                let event = match next {
                    Ok(Message::Text(text)) => TransportEvent::Message(text.to_string()),
                    Ok(Message::Close(frame)) => {
                        closed = true;
                        let (code, reason) = match frame {
                            Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                            None => (None, String::new()),
                        };
                        let _ = event_tx.send(TransportEvent::Closed { code, reason }).await;
                        break;
                    }
                    // Pings are answered by tungstenite itself; the service
                    // never sends binary frames.
                    Ok(_) => continue,
                    Err(err) => TransportEvent::Error(err.to_string()),
                };
                if event_tx.send(event).await.is_err() {
                    return;
                }
            }
            if !closed {
                let _ = event_tx
                    .send(TransportEvent::Closed {
                        code: None,
                        reason: "connection dropped".to_string(),
                    })
                    .await;
            }
        });

        Ok((Self { outbound: out_tx }, event_rx))
    }
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn send_binary(&self, data: Vec<u8>) -> Result<()> {
        self.outbound
            .send(OutboundFrame::Binary(data))
            .await
            .map_err(|_| anyhow!("Transport is closed"))
    }

    async fn send_text(&self, text: String) -> Result<()> {
        self.outbound
            .send(OutboundFrame::Text(text))
            .await
            .map_err(|_| anyhow!("Transport is closed"))
    }

    async fn close(&self) -> Result<()> {
        self.outbound
            .send(OutboundFrame::Close)
            .await
            .map_err(|_| anyhow!("Transport is already closed"))
    }
}
