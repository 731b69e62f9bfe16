//! WebSocket transport for the chat endpoint.
//!
//! [`connect`] performs the handshake, then hands the socket to a pump task
//! that forwards inbound text frames as [`TransportEvent`]s and writes
//! queued outbound payloads. The returned [`WsTransport`] is the sync send
//! half used by the relay controller.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{debug, info, warn};

use agenstock_core::{Error, Result, Transport, TransportEvent};

/// Handshake parameters.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Full `ws://` or `wss://` endpoint URL.
    pub url: String,
    /// Bearer token sent with the upgrade request.
    pub access_token: Option<String>,
    pub connect_timeout: Duration,
}

/// Send half of an open chat socket.
#[derive(Debug)]
pub struct WsTransport {
    outbound: Option<mpsc::UnboundedSender<Message>>,
}

impl Transport for WsTransport {
    fn send(&mut self, text: String) -> Result<()> {
        let tx = self.outbound.as_ref().ok_or(Error::NotConnected)?;
        tx.send(Message::text(text)).map_err(|_| Error::NotConnected)
    }

    fn close(&mut self) {
        // Dropping the sender makes the pump send a close frame and exit.
        if self.outbound.take().is_some() {
            debug!("Closing chat transport");
        }
    }

    fn is_open(&self) -> bool {
        self.outbound.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

/// Open the chat socket.
///
/// On success the event channel already holds `Open`; it then yields
/// `Message`s and exactly one `Closed` or `Failed`.
pub async fn connect(
    config: &TransportConfig,
) -> Result<(WsTransport, mpsc::Receiver<TransportEvent>)> {
    let mut request = config
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| Error::Connection(format!("invalid endpoint {}: {e}", config.url)))?;
    if let Some(token) = &config.access_token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::Connection("invalid access token".into()))?;
        request.headers_mut().insert("authorization", value);
    }

    // wss handshakes need a process-level rustls provider; Err means already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let (socket, _response) =
        tokio::time::timeout(config.connect_timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| Error::Connection(format!("timed out connecting to {}", config.url)))?
            .map_err(|e| Error::Connection(e.to_string()))?;

    info!(url = %config.url, "Chat socket connected");

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(256);
    event_tx
        .send(TransportEvent::Open)
        .await
        .map_err(|_| Error::Connection("event receiver dropped".into()))?;

    tokio::spawn(pump(socket, out_rx, event_tx));

    Ok((
        WsTransport {
            outbound: Some(out_tx),
        },
        event_rx,
    ))
}

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn pump(
    socket: Socket,
    mut out_rx: mpsc::UnboundedReceiver<Message>,
    event_tx: mpsc::Sender<TransportEvent>,
) {
    let (mut sink, mut stream) = socket.split();

    let terminal = loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Some(msg) => {
                    if let Err(e) = sink.send(msg).await {
                        warn!(error = %e, "Chat socket write failed");
                        break TransportEvent::Failed(e.to_string());
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break TransportEvent::Closed;
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let event = TransportEvent::Message(text.as_str().to_owned());
                    if event_tx.send(event).await.is_err() {
                        debug!("Event receiver dropped");
                        let _ = sink.send(Message::Close(None)).await;
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Chat socket closed by server");
                    break TransportEvent::Closed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "Chat socket read failed");
                    break TransportEvent::Failed(e.to_string());
                }
                None => break TransportEvent::Closed,
            },
        }
    };

    let _ = event_tx.send(terminal).await;
}
