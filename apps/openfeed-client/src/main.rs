//! Openfeed Client Binary
//!
//! Connects to an Openfeed gateway, subscribes to the configured targets and
//! logs what arrives.
//!
//! # Usage
//!
//! ```bash
//! OPENFEED_USERNAME=... OPENFEED_PASSWORD=... OPENFEED_SYMBOLS=AAPL \
//!     cargo run --bin openfeed-client
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `OPENFEED_USERNAME`: Account username
//! - `OPENFEED_PASSWORD`: Account password
//!
//! ## Optional
//! - `OPENFEED_HOST` / `OPENFEED_PORT` / `OPENFEED_PATH`: Gateway endpoint
//!   (default: openfeed.aws.barchart.com:80/ws)
//! - `OPENFEED_WIRE_PROTOCOL`: PB | JSON (default: PB)
//! - `OPENFEED_SYMBOLS`, `OPENFEED_MARKET_IDS`, `OPENFEED_EXCHANGES`,
//!   `OPENFEED_CHANNEL_IDS`: Comma-separated subscription targets
//! - `OPENFEED_SUBSCRIPTION_TYPES`: Comma-separated types (default: QUOTE)
//! - `OPENFEED_NUMBER_OF_CONNECTIONS`: Parallel connections (default: 1)
//! - `OPENFEED_STATS_INTERVAL_SECS`: Wire stats interval (default: 0 = off)
//! - `OPENFEED_METRICS_PORT`: Prometheus metrics port (default: 0 = off)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log level (default: info)
//!
//! See `ClientSettings` for the complete list.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use openfeed_client::domain::envelope::{
    HeartBeat, InstrumentDefinition, MarketSnapshot, MarketUpdate, Ohlc, SubscriptionResponse,
};
use openfeed_client::infrastructure::telemetry;
use openfeed_client::{
    ClientSettings, ConnectionId, ConnectionState, FeedHandler, OpenfeedClient, SessionFailure,
    init_metrics,
};
use tokio::signal;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // Initialize telemetry (tracing + optional OpenTelemetry)
    let _telemetry_guard = telemetry::init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Openfeed client");

    let settings = ClientSettings::from_env().context("invalid Openfeed configuration")?;
    log_settings(&settings);

    if settings.metrics_port > 0 {
        let addr = init_metrics(settings.metrics_port).context("failed to start metrics listener")?;
        tracing::info!(addr = %addr, "Metrics listener started");
    }

    let handler = Arc::new(LoggingHandler::default());
    let mut client = OpenfeedClient::new(
        settings.client_config(),
        Arc::clone(&handler) as Arc<dyn FeedHandler>,
        None,
    );
    client.start();

    await_shutdown().await;

    client.shutdown();
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, client.join()).await.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Connections did not stop in time"
        );
    }

    handler.log_totals();
    tracing::info!("Openfeed client stopped");
    Ok(())
}

// =============================================================================
// Handler
// =============================================================================

/// Counts inbound messages and logs the interesting ones.
#[derive(Debug, Default)]
struct LoggingHandler {
    updates: AtomicU64,
    snapshots: AtomicU64,
    bars: AtomicU64,
    heartbeats: AtomicU64,
    instruments: AtomicU64,
}

impl LoggingHandler {
    fn log_totals(&self) {
        tracing::info!(
            updates = self.updates.load(Ordering::Relaxed),
            snapshots = self.snapshots.load(Ordering::Relaxed),
            bars = self.bars.load(Ordering::Relaxed),
            heartbeats = self.heartbeats.load(Ordering::Relaxed),
            instruments = self.instruments.load(Ordering::Relaxed),
            "Message totals"
        );
    }
}

impl FeedHandler for LoggingHandler {
    fn on_subscription_response(&self, connection: ConnectionId, message: &SubscriptionResponse) {
        let status = message.status.as_ref();
        tracing::info!(
            connection,
            correlation_id = message.correlation_id,
            target = ?message.target,
            result = status.map_or("UNKNOWN_RESULT", |s| s.result().as_str_name()),
            unsubscribe = message.unsubscribe,
            "Subscription response"
        );
    }

    fn on_heartbeat(&self, connection: ConnectionId, message: &HeartBeat) {
        self.heartbeats.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            connection,
            gateway_time = %format_time(message.transaction_time),
            "Heartbeat"
        );
    }

    fn on_instrument_definition(&self, connection: ConnectionId, message: &InstrumentDefinition) {
        self.instruments.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            connection,
            market_id = message.market_id,
            symbol = %message.symbol,
            exchange = %message.exchange_code,
            "Instrument definition"
        );
    }

    fn on_market_snapshot(&self, _connection: ConnectionId, _message: &MarketSnapshot) {
        self.snapshots.fetch_add(1, Ordering::Relaxed);
    }

    fn on_market_update(&self, connection: ConnectionId, message: &MarketUpdate) {
        let count = self.updates.fetch_add(1, Ordering::Relaxed) + 1;
        if count % 10_000 == 0 {
            tracing::info!(
                connection,
                updates = count,
                last_symbol = %message.symbol,
                last_time = %format_time(message.transaction_time),
                "Market updates received"
            );
        }
    }

    fn on_ohlc(&self, _connection: ConnectionId, _message: &Ohlc) {
        self.bars.fetch_add(1, Ordering::Relaxed);
    }

    fn on_connection_state(&self, connection: ConnectionId, state: ConnectionState) {
        tracing::info!(connection, state = state.as_str(), "Connection state");
    }

    fn on_failure(&self, connection: ConnectionId, failure: &SessionFailure) {
        tracing::warn!(connection, error = %failure, fatal = failure.is_fatal(), "Session failure");
    }
}

/// Render a gateway timestamp (nanoseconds since the epoch).
fn format_time(nanos: i64) -> String {
    let time: DateTime<Utc> = DateTime::from_timestamp_nanos(nanos);
    time.to_rfc3339()
}

// =============================================================================
// Startup & Shutdown
// =============================================================================

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_settings(settings: &ClientSettings) {
    tracing::info!(
        client_id = %settings.client_id,
        endpoint = %settings.endpoint,
        protocol = settings.protocol.as_str(),
        service = settings.service.as_str_name(),
        username = settings.credentials.username(),
        connections = settings.number_of_connections,
        share_subscriptions = settings.share_subscriptions,
        subscriptions = settings.subscriptions.requests().len(),
        "Configuration loaded"
    );
    tracing::debug!(
        reconnect = settings.reconnect.enabled,
        delay_initial_secs = settings.reconnect.delay_initial.as_secs(),
        heartbeat_secs = settings.heartbeat.interval.as_secs(),
        stats_interval_secs = settings.stats_interval.map_or(0, |d| d.as_secs()),
        "Connection settings"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
