//! Application Layer - Ports and the message pipeline.
//!
//! Defines the contracts the client needs from the outside world (transport,
//! wire codec, application callbacks) and the services that turn inbound
//! frames into routed messages.

/// Port interfaces for the transport, codec and application callbacks.
pub mod ports;

/// Message dispatch and wire statistics.
pub mod services;
