//! Port Interfaces
//!
//! Contracts between the client core and the outside world. Infrastructure
//! adapters implement the driven ports; applications implement the callback
//! ports.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Connector` / `Transport`: opens and speaks a gateway connection
//! - `WireCodec`: turns frames into envelopes and back
//!
//! ## Callback Ports (Inbound)
//!
//! - `FeedHandler`: one callback per message kind plus lifecycle events
//! - `RawMessageObserver`: sees every decoded frame's original bytes

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::connection::{ConnectionId, ConnectionState, SessionFailure};
use crate::domain::envelope::{
    ExchangeResponse, GatewayMessage, GatewayRequest, HeartBeat, InstrumentAction,
    InstrumentDefinition, InstrumentReferenceResponse, InstrumentResponse, LoginResponse,
    LogoutResponse, MarketSnapshot, MarketStatus, MarketUpdate, Ohlc, SubscriptionResponse,
    VolumeAtPrice,
};

// =============================================================================
// Frames
// =============================================================================

/// One WebSocket data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Binary frame (protobuf).
    Binary(Vec<u8>),
    /// Text frame (JSON).
    Text(String),
}

impl Frame {
    /// Raw payload bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Binary(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Whether this is a binary frame.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

// =============================================================================
// Codec Port
// =============================================================================

/// Frame decoding or encoding failure.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Binary frame is not a valid protobuf envelope.
    #[error("protobuf decode failed: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// Text frame is not a valid JSON envelope.
    #[error("json decode failed: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON envelope is not an object with exactly one key.
    #[error("malformed json envelope: {0}")]
    Envelope(String),

    /// Outbound request has no payload.
    #[error("request has no payload")]
    EmptyRequest,
}

/// Converts between frames and envelopes.
pub trait WireCodec: Send + Sync {
    /// Decode an inbound frame.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if the frame is not a valid envelope.
    fn decode(&self, frame: &Frame) -> Result<GatewayMessage, CodecError>;

    /// Encode an outbound request.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if the request cannot be serialized.
    fn encode(&self, request: &GatewayRequest) -> Result<Frame, CodecError>;
}

// =============================================================================
// Transport Port
// =============================================================================

/// Gateway address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// WebSocket path, e.g. `/ws`.
    pub path: String,
}

impl Endpoint {
    /// Create an endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    /// `host:port` for the TCP connect.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// WebSocket URL.
    #[must_use]
    pub fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("ws://{}{path}", self.authority())
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url())
    }
}

/// Transport-level failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// TCP connect failed.
    #[error("connect to {endpoint} failed: {source}")]
    Connect {
        /// Target endpoint.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// WebSocket upgrade failed.
    #[error("websocket handshake failed: {0}")]
    Handshake(String),

    /// Read or write failed on an open connection.
    #[error("websocket i/o failed: {0}")]
    Io(String),

    /// The connection is already closed.
    #[error("connection closed")]
    Closed,
}

/// Opens gateway connections in two steps: TCP connect, then handshake.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// A connected but not yet upgraded link.
    type Link: Send;
    /// An upgraded, message-oriented connection.
    type Transport: Transport;

    /// Open the underlying connection.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Link, TransportError>;

    /// Perform the protocol handshake on an open link.
    async fn handshake(
        &self,
        link: Self::Link,
        endpoint: &Endpoint,
    ) -> Result<Self::Transport, TransportError>;
}

/// A message-oriented gateway connection.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one frame.
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Next data frame. `None` once the peer closed the connection.
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>>;

    /// Close the connection. Errors are ignored.
    async fn close(&mut self);
}

// =============================================================================
// Callback Ports
// =============================================================================

/// Application callbacks, one per message kind.
///
/// Every method defaults to a no-op. Callbacks run on the connection task of
/// `connection`, at most once per message; a panic inside a callback is
/// caught and logged.
#[cfg_attr(test, mockall::automock)]
#[allow(unused_variables)]
pub trait FeedHandler: Send + Sync {
    /// Login result.
    fn on_login_response(&self, connection: ConnectionId, message: &LoginResponse) {}
    /// Logout result or gateway-initiated session end.
    fn on_logout_response(&self, connection: ConnectionId, message: &LogoutResponse) {}
    /// Instrument request result.
    fn on_instrument_response(&self, connection: ConnectionId, message: &InstrumentResponse) {}
    /// Instrument cross-reference result.
    fn on_instrument_reference_response(
        &self,
        connection: ConnectionId,
        message: &InstrumentReferenceResponse,
    ) {
    }
    /// Exchange request result.
    fn on_exchange_response(&self, connection: ConnectionId, message: &ExchangeResponse) {}
    /// Subscription request result.
    fn on_subscription_response(&self, connection: ConnectionId, message: &SubscriptionResponse) {}
    /// Market-wide status.
    fn on_market_status(&self, connection: ConnectionId, message: &MarketStatus) {}
    /// Gateway heartbeat.
    fn on_heartbeat(&self, connection: ConnectionId, message: &HeartBeat) {}
    /// Instrument definition.
    fn on_instrument_definition(&self, connection: ConnectionId, message: &InstrumentDefinition) {}
    /// Market snapshot.
    fn on_market_snapshot(&self, connection: ConnectionId, message: &MarketSnapshot) {}
    /// Market update.
    fn on_market_update(&self, connection: ConnectionId, message: &MarketUpdate) {}
    /// Volume at price.
    fn on_volume_at_price(&self, connection: ConnectionId, message: &VolumeAtPrice) {}
    /// Bar.
    fn on_ohlc(&self, connection: ConnectionId, message: &Ohlc) {}
    /// Instrument action.
    fn on_instrument_action(&self, connection: ConnectionId, message: &InstrumentAction) {}

    /// Connection changed state.
    fn on_connection_state(&self, connection: ConnectionId, state: ConnectionState) {}
    /// Connection failed; `failure.is_fatal()` means no reconnect follows.
    fn on_failure(&self, connection: ConnectionId, failure: &SessionFailure) {}
}

/// Handler that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl FeedHandler for NoopHandler {}

/// Observer of raw inbound bytes.
///
/// Called once per successfully decoded frame, after routing.
#[cfg_attr(test, mockall::automock)]
pub trait RawMessageObserver: Send + Sync {
    /// Original frame bytes. Text frames arrive as their UTF-8 bytes.
    fn on_message(&self, connection: ConnectionId, bytes: &[u8]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_bytes() {
        let text = Frame::Text("{}".to_string());
        assert_eq!(text.as_bytes(), b"{}");
        assert_eq!(text.len(), 2);
        assert!(!text.is_binary());

        let binary = Frame::Binary(Vec::new());
        assert!(binary.is_empty());
        assert!(binary.is_binary());
    }

    #[test]
    fn endpoint_url() {
        let endpoint = Endpoint::new("openfeed.aws.barchart.com", 80, "/ws");
        assert_eq!(endpoint.authority(), "openfeed.aws.barchart.com:80");
        assert_eq!(endpoint.url(), "ws://openfeed.aws.barchart.com:80/ws");

        let bare = Endpoint::new("127.0.0.1", 9000, "ws");
        assert_eq!(bare.to_string(), "ws://127.0.0.1:9000/ws");
    }

    #[test]
    fn noop_handler_accepts_everything() {
        let handler = NoopHandler;
        handler.on_heartbeat(0, &HeartBeat::default());
        handler.on_connection_state(0, ConnectionState::Ready);
        handler.on_failure(0, &SessionFailure::Transport("x".to_string()));
    }
}
