//! Heartbeat Liveness Monitor
//!
//! The gateway sends a `HeartBeat` at a fixed interval on every ready
//! session. The connection task records each one; the monitor checks once per
//! interval and reports a timeout once no heartbeat arrived for
//! `interval × timeout_multiple`. The driver then treats the connection as
//! disconnected.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Configuration for heartbeat liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    /// Expected heartbeat interval. Zero disables monitoring.
    pub heartbeat_interval: Duration,
    /// Missed intervals tolerated before timing out.
    pub timeout_multiple: u32,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(10),
            timeout_multiple: 3,
        }
    }
}

impl LivenessConfig {
    /// Create a configuration.
    #[must_use]
    pub const fn new(heartbeat_interval: Duration, timeout_multiple: u32) -> Self {
        Self {
            heartbeat_interval,
            timeout_multiple,
        }
    }

    /// Configuration with monitoring turned off.
    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    /// Whether the monitor should run.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !self.heartbeat_interval.is_zero() && self.timeout_multiple > 0
    }

    /// Silence after which the connection is considered dead.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.heartbeat_interval
            .saturating_mul(self.timeout_multiple)
    }
}

/// Events emitted by the liveness monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessEvent {
    /// No heartbeat for longer than the timeout.
    Timeout {
        /// Time since the last heartbeat.
        elapsed: Duration,
    },
}

/// Last heartbeat time, shared between the connection task and the monitor.
#[derive(Debug)]
pub struct LivenessState {
    last_heartbeat: RwLock<Instant>,
}

impl Default for LivenessState {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessState {
    /// Start the clock now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_heartbeat: RwLock::new(Instant::now()),
        }
    }

    /// Record that a heartbeat was received.
    pub fn record_heartbeat(&self) {
        *self.last_heartbeat.write() = Instant::now();
    }

    /// Time since the last heartbeat.
    #[must_use]
    pub fn time_since_heartbeat(&self) -> Duration {
        self.last_heartbeat.read().elapsed()
    }

    /// Restart the clock for a new session.
    pub fn reset(&self) {
        self.record_heartbeat();
    }
}

/// Watches heartbeats for one session.
pub struct LivenessMonitor {
    config: LivenessConfig,
    state: Arc<LivenessState>,
    event_tx: mpsc::Sender<LivenessEvent>,
    cancel: CancellationToken,
}

impl LivenessMonitor {
    /// Create a monitor.
    #[must_use]
    pub const fn new(
        config: LivenessConfig,
        state: Arc<LivenessState>,
        event_tx: mpsc::Sender<LivenessEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            state,
            event_tx,
            cancel,
        }
    }

    /// Run until cancelled or a timeout is reported.
    pub async fn run(self) {
        if !self.config.is_enabled() {
            return;
        }

        let timeout = self.config.timeout();
        let mut interval = tokio::time::interval(self.config.heartbeat_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("Liveness monitor cancelled");
                    break;
                }
                _ = interval.tick() => {
                    let elapsed = self.state.time_since_heartbeat();
                    if elapsed > timeout {
                        tracing::warn!(
                            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                            "Heartbeat timeout detected"
                        );
                        let _ = self.event_tx.send(LivenessEvent::Timeout { elapsed }).await;
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = LivenessConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.is_enabled());
        assert!(!LivenessConfig::disabled().is_enabled());
    }

    #[test]
    fn state_records_heartbeats() {
        let state = LivenessState::new();
        *state.last_heartbeat.write() = Instant::now()
            .checked_sub(Duration::from_secs(5))
            .unwrap();
        assert!(state.time_since_heartbeat() >= Duration::from_secs(5));

        state.record_heartbeat();
        assert!(state.time_since_heartbeat() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn monitor_reports_timeout() {
        let config = LivenessConfig::new(Duration::from_millis(20), 2);
        let state = Arc::new(LivenessState::new());
        let (event_tx, mut event_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(LivenessMonitor::new(config, state, event_tx, cancel).run());

        let event = tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let LivenessEvent::Timeout { elapsed } = event;
        assert!(elapsed > Duration::from_millis(40));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn heartbeats_keep_connection_alive() {
        let config = LivenessConfig::new(Duration::from_millis(20), 3);
        let state = Arc::new(LivenessState::new());
        let (event_tx, mut event_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(
            LivenessMonitor::new(config, Arc::clone(&state), event_tx, cancel.clone()).run(),
        );

        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(15)).await;
            state.record_heartbeat();
        }
        assert!(event_rx.try_recv().is_err());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn disabled_monitor_exits_immediately() {
        let (event_tx, _event_rx) = mpsc::channel(1);
        let monitor = LivenessMonitor::new(
            LivenessConfig::disabled(),
            Arc::new(LivenessState::new()),
            event_tx,
            CancellationToken::new(),
        );
        tokio::time::timeout(Duration::from_millis(100), monitor.run())
            .await
            .unwrap();
    }
}
