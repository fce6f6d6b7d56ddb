//! Openfeed Gateway Adapters
//!
//! Concrete implementations of the transport and codec ports, plus the
//! per-connection task and the client facade that runs it.
//!
//! - `codec`: PB and JSON envelope encoding
//! - `transport`: plain WebSocket over tokio `TcpStream`
//! - `liveness`: heartbeat timeout monitor
//! - `connection`: per-connection driver task
//! - `client`: multi-connection facade

pub mod client;
pub mod codec;
pub mod connection;
pub mod liveness;
pub mod transport;

pub use client::{ClientConfig, OpenfeedClient};
pub use codec::{OpenfeedCodec, WireProtocol};
pub use connection::{
    ConnectionCommand, ConnectionDriver, ConnectionHandle, ConnectionSettings, ReferenceRequests,
};
pub use liveness::{LivenessConfig, LivenessEvent, LivenessMonitor, LivenessState};
pub use transport::{DEFAULT_CONNECT_TIMEOUT, WebSocketConnector, WebSocketTransport};
