//! Domain Layer - Openfeed protocol types and client state.
//!
//! Pure, synchronous logic with no I/O: the message model, authentication
//! and subscription bookkeeping, instrument lookup and the connection
//! lifecycle. Everything here is driven by the connection task.

/// Connection lifecycle state machine and reconnect backoff.
pub mod connection;

/// Inbound and outbound envelopes and their payloads.
pub mod envelope;

/// Market id to instrument definition lookup.
pub mod instrument;

/// Login, logout and session token handling.
pub mod session;

/// Subscription registry and replay.
pub mod subscription;
