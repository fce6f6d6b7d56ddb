#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::panic
    )
)]

//! Openfeed Client - Market Data Feed Client
//!
//! Connects to an Openfeed gateway over WebSocket, logs in, keeps a set of
//! subscriptions alive across reconnects and dispatches decoded market data
//! to application callbacks.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Protocol types and client state, no I/O
//!   - `envelope`: Gateway messages and requests (protobuf + JSON)
//!   - `session`: Login/logout and the session token
//!   - `subscription`: Subscription registry and replay
//!   - `instrument`: Market id to instrument lookup
//!   - `connection`: Connection state machine and reconnect backoff
//!
//! - **Application**: Port definitions and the message pipeline
//!   - `ports`: Transport, wire codec, application callbacks
//!   - `services`: Message dispatcher, wire statistics
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `openfeed`: Codec, WebSocket transport, connection tasks, client
//!   - `config`: Environment configuration
//!   - `metrics`: Prometheus instrumentation
//!   - `telemetry`: Logging and OpenTelemetry
//!
//! # Data Flow
//!
//! ```text
//!                 ┌──────────────┐     ┌────────────┐     ┌─────────────┐
//! Gateway WS ────►│  Connection  │────►│ Dispatcher │────►│ FeedHandler │
//!            ◄────│    task      │     └─────┬──────┘     └─────────────┘
//!                 └──────▲───────┘           │
//!                        │            subscriptions, session,
//!             OpenfeedClient commands    instruments
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Protocol types and client state with no I/O.
pub mod domain;

/// Application layer - Port definitions and the message pipeline.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::{
    ConnectionId, ConnectionPolicy, ConnectionState, ConnectionStateMachine, ReconnectConfig,
    ReconnectPolicy, SessionFailure,
};
pub use domain::envelope::{GatewayMessage, GatewayRequest, MessageKind, Service, SubscriptionType};
pub use domain::instrument::InstrumentMapping;
pub use domain::session::{AuthError, AuthSession, Credentials};
pub use domain::subscription::{
    SubscriptionError, SubscriptionId, SubscriptionManager, SubscriptionRequest,
    SubscriptionState, SubscriptionStats,
};

// Ports and services
pub use application::ports::{
    Connector, Endpoint, FeedHandler, Frame, NoopHandler, RawMessageObserver, Transport,
    TransportError, WireCodec,
};
pub use application::services::{LogPolicy, MessageDispatcher, WireSnapshot, WireStats};

// Client
pub use infrastructure::openfeed::{
    ClientConfig, ConnectionSettings, LivenessConfig, OpenfeedClient, OpenfeedCodec,
    ReferenceRequests, WebSocketConnector, WireProtocol,
};

// Infrastructure config
pub use infrastructure::config::{ClientSettings, ConfigError};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
