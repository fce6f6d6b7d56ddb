//! Prometheus Metrics Module
//!
//! Client metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Wire**: frames and bytes received, periodic wire snapshots
//! - **Messages**: decoded messages by kind, decode errors, callback panics
//! - **Connections**: state per connection, reconnects
//! - **Subscriptions**: entries per state
//!
//! Recording is a no-op until `init_metrics` installs the recorder.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::application::services::WireSnapshot;
use crate::domain::connection::{ConnectionId, ConnectionState};
use crate::domain::envelope::MessageKind;
use crate::domain::subscription::SubscriptionStats;

// =============================================================================
// Installation
// =============================================================================

static METRICS_ADDR: OnceLock<SocketAddr> = OnceLock::new();

/// Install the Prometheus recorder with an HTTP listener on `port`.
///
/// Must be called from within a tokio runtime. Calling it again is a no-op
/// that returns the address of the first listener.
///
/// # Errors
///
/// Returns a `BuildError` if the listener cannot be bound or a global
/// recorder is already installed.
pub fn init_metrics(port: u16) -> Result<SocketAddr, BuildError> {
    if let Some(addr) = METRICS_ADDR.get() {
        return Ok(*addr);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();

    Ok(*METRICS_ADDR.get_or_init(|| addr))
}

/// Address of the metrics listener, if installed.
#[must_use]
pub fn metrics_addr() -> Option<SocketAddr> {
    METRICS_ADDR.get().copied()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Wire
    describe_counter!(
        "openfeed_frames_received_total",
        "Total WebSocket frames received"
    );
    describe_counter!(
        "openfeed_bytes_received_total",
        "Total WebSocket payload bytes received"
    );
    describe_gauge!(
        "openfeed_wire_frames",
        "Binary frames received during the last stats interval"
    );
    describe_gauge!(
        "openfeed_wire_bytes",
        "Binary bytes received during the last stats interval"
    );
    describe_gauge!(
        "openfeed_wire_max_frame_bytes",
        "Largest binary frame during the last stats interval"
    );

    // Messages
    describe_counter!(
        "openfeed_messages_received_total",
        "Total decoded gateway messages by kind"
    );
    describe_counter!(
        "openfeed_decode_errors_total",
        "Total frames dropped because they could not be decoded"
    );
    describe_counter!(
        "openfeed_callback_failures_total",
        "Total application callbacks that panicked"
    );
    describe_histogram!(
        "openfeed_dispatch_seconds",
        "Time to decode, log and route one frame"
    );

    // Connections
    describe_gauge!(
        "openfeed_connection_state",
        "Connection state ordinal (4 = ready, 6 = closed)"
    );
    describe_counter!(
        "openfeed_reconnects_total",
        "Total reconnection attempts"
    );

    // Subscriptions
    describe_gauge!(
        "openfeed_subscriptions",
        "Subscriptions by gateway state"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record one inbound frame.
pub fn record_frame_received(bytes: usize) {
    counter!("openfeed_frames_received_total").increment(1);
    counter!("openfeed_bytes_received_total").increment(u64::try_from(bytes).unwrap_or(u64::MAX));
}

/// Record a decoded message.
pub fn record_message_received(kind: MessageKind) {
    counter!(
        "openfeed_messages_received_total",
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record a frame that failed to decode.
pub fn record_decode_error(binary: bool) {
    counter!(
        "openfeed_decode_errors_total",
        "format" => if binary { "pb" } else { "json" }
    )
    .increment(1);
}

/// Record a panicking application callback.
pub fn record_callback_failure(callback: &'static str) {
    counter!(
        "openfeed_callback_failures_total",
        "callback" => callback
    )
    .increment(1);
}

/// Record the time spent dispatching one frame.
pub fn record_dispatch_duration(duration: Duration) {
    histogram!("openfeed_dispatch_seconds").record(duration.as_secs_f64());
}

/// Publish a connection's state.
pub fn set_connection_state(connection: ConnectionId, state: ConnectionState) {
    gauge!(
        "openfeed_connection_state",
        "connection" => connection.to_string()
    )
    .set(f64::from(state.ordinal()));
}

/// Record a reconnection attempt.
pub fn record_reconnect(connection: ConnectionId) {
    counter!(
        "openfeed_reconnects_total",
        "connection" => connection.to_string()
    )
    .increment(1);
}

/// Publish subscription counts.
#[allow(clippy::cast_precision_loss)]
pub fn set_subscriptions(stats: SubscriptionStats) {
    gauge!("openfeed_subscriptions", "state" => "pending").set(stats.pending as f64);
    gauge!("openfeed_subscriptions", "state" => "acked").set(stats.acked as f64);
    gauge!("openfeed_subscriptions", "state" => "rejected").set(stats.rejected as f64);
}

/// Publish a wire stats snapshot.
#[allow(clippy::cast_precision_loss)]
pub fn record_wire_snapshot(connection: ConnectionId, snapshot: &WireSnapshot) {
    let connection = connection.to_string();
    gauge!("openfeed_wire_frames", "connection" => connection.clone()).set(snapshot.frames as f64);
    gauge!("openfeed_wire_bytes", "connection" => connection.clone()).set(snapshot.bytes as f64);
    gauge!("openfeed_wire_max_frame_bytes", "connection" => connection)
        .set(snapshot.max_frame as f64);
}

// =============================================================================
// Tests
// =============================================================================
