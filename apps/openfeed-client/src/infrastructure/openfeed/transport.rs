//! WebSocket Transport
//!
//! Plain `ws://` transport over a tokio `TcpStream`. The TCP connect and the
//! WebSocket upgrade are separate steps so that the connection state machine
//! can tell `Connecting` from `Handshaking`.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::application::ports::{Connector, Endpoint, Frame, Transport, TransportError};

/// Default limit for the TCP connect and the upgrade, each.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens WebSocket connections to an Openfeed gateway.
#[derive(Debug, Clone, Copy)]
pub struct WebSocketConnector {
    timeout: Duration,
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl WebSocketConnector {
    /// Create a connector with a per-step timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Link = TcpStream;
    type Transport = WebSocketTransport;

    async fn connect(&self, endpoint: &Endpoint) -> Result<TcpStream, TransportError> {
        let authority = endpoint.authority();
        let connect = TcpStream::connect(authority.as_str());

        let stream = match tokio::time::timeout(self.timeout, connect).await {
            Ok(result) => result.map_err(|source| TransportError::Connect {
                endpoint: authority.clone(),
                source,
            })?,
            Err(_) => {
                return Err(TransportError::Connect {
                    endpoint: authority,
                    source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
                });
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
        }
        Ok(stream)
    }

    async fn handshake(
        &self,
        link: TcpStream,
        endpoint: &Endpoint,
    ) -> Result<WebSocketTransport, TransportError> {
        let upgrade = tokio_tungstenite::client_async(endpoint.url(), link);

        let (stream, response) = tokio::time::timeout(self.timeout, upgrade)
            .await
            .map_err(|_| TransportError::Handshake("handshake timed out".to_string()))?
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        tracing::debug!(
            endpoint = %endpoint,
            status = response.status().as_u16(),
            "WebSocket handshake complete"
        );
        Ok(WebSocketTransport { stream })
    }
}

/// An upgraded WebSocket connection.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WebSocketStream<TcpStream>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            Frame::Binary(bytes) => Message::Binary(bytes.into()),
            Frame::Text(text) => Message::Text(text.into()),
        };
        self.stream
            .send(message)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Binary(bytes)) => return Some(Ok(Frame::Binary(bytes.to_vec()))),
                Ok(Message::Text(text)) => return Some(Ok(Frame::Text(text.as_str().to_owned()))),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(frame = ?frame, "Gateway closed the WebSocket");
                    return None;
                }
                // Pong replies are queued by tungstenite
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => return Some(Err(TransportError::Io(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::trace!(error = %e, "WebSocket close failed");
        }
    }
}
