//! Message Dispatcher
//!
//! Turns one inbound frame into routed callbacks:
//!
//! 1. decode with the wire codec (malformed frames are dropped here)
//! 2. log the message if the `LogPolicy` selects it
//! 3. route by kind: session, subscription and instrument bookkeeping first,
//!    then the application callback
//! 4. hand the original bytes to the raw observer
//!
//! Session-relevant outcomes are returned as a `SessionSignal` for the
//! connection driver to act on. Every application callback is isolated: a
//! panic is logged and counted, and dispatch continues.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use crate::application::ports::{FeedHandler, Frame, RawMessageObserver, WireCodec};
use crate::application::services::wire_stats::{WireSnapshot, WireStats};
use crate::domain::connection::ConnectionId;
use crate::domain::envelope::gateway_message::Data;
use crate::domain::envelope::{GatewayMessage, MarketUpdate, market_update, trade_entry};
use crate::domain::instrument::InstrumentMapping;
use crate::domain::session::{AuthSession, LoginOutcome, LogoutOutcome, redact_token};
use crate::domain::subscription::SubscriptionManager;
use crate::infrastructure::metrics;

// =============================================================================
// Log Policy
// =============================================================================

/// Which inbound messages are logged.
///
/// Flags are independent; `log_all` overrides every other flag. Kinds that
/// carry a symbol are additionally filtered by `symbols` (empty = all).
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct LogPolicy {
    /// Log every message.
    pub log_all: bool,
    /// Responses to client requests and market status.
    pub request_response: bool,
    /// Heartbeats.
    pub heartbeat: bool,
    /// Instrument definitions.
    pub instrument: bool,
    /// Market snapshots.
    pub snapshot: bool,
    /// Every market update.
    pub update: bool,
    /// Market updates carrying a BBO.
    pub bbo: bool,
    /// Market updates carrying trades.
    pub trade: bool,
    /// Market updates carrying depth.
    pub depth: bool,
    /// Market updates carrying trade cancels.
    pub trade_cancel: bool,
    /// Market updates carrying trade corrections.
    pub trade_correction: bool,
    /// Bars.
    pub ohlc: bool,
    /// Pretty-print logged JSON.
    pub pretty_print: bool,
    /// Log session tokens unredacted.
    pub log_tokens: bool,
    /// Symbol allow-list.
    pub symbols: HashSet<String>,
}

impl Default for LogPolicy {
    fn default() -> Self {
        Self {
            log_all: false,
            request_response: true,
            heartbeat: false,
            instrument: false,
            snapshot: false,
            update: false,
            bbo: false,
            trade: false,
            depth: false,
            trade_cancel: false,
            trade_correction: false,
            ohlc: false,
            pretty_print: false,
            log_tokens: false,
            symbols: HashSet::new(),
        }
    }
}

impl LogPolicy {
    /// Whether a message should be logged.
    ///
    /// A symbol missing from the message is resolved from its market id
    /// through `instruments`; an unresolved symbol fails a non-empty
    /// allow-list.
    #[must_use]
    pub fn should_log(&self, data: &Data, instruments: &InstrumentMapping) -> bool {
        if self.log_all {
            return true;
        }

        match data {
            Data::LoginResponse(_)
            | Data::LogoutResponse(_)
            | Data::InstrumentResponse(_)
            | Data::InstrumentReferenceResponse(_)
            | Data::ExchangeResponse(_)
            | Data::SubscriptionResponse(_)
            | Data::MarketStatus(_) => self.request_response,
            Data::HeartBeat(_) => self.heartbeat,
            Data::InstrumentDefinition(definition) => {
                self.instrument
                    && self.symbol_allowed(&definition.symbol, definition.market_id, instruments)
            }
            Data::MarketSnapshot(snapshot) => {
                self.snapshot
                    && self.symbol_allowed(&snapshot.symbol, snapshot.market_id, instruments)
            }
            Data::MarketUpdate(update) => {
                self.update_selected(update)
                    && self.symbol_allowed(&update.symbol, update.market_id, instruments)
            }
            Data::Ohlc(ohlc) => {
                self.ohlc && self.symbol_allowed(&ohlc.symbol, ohlc.market_id, instruments)
            }
            Data::VolumeAtPrice(_) | Data::InstrumentAction(_) => false,
        }
    }

    fn update_selected(&self, update: &MarketUpdate) -> bool {
        if self.update {
            return true;
        }
        match &update.data {
            Some(market_update::Data::Bbo(_)) => self.bbo,
            Some(market_update::Data::DepthPriceLevel(_) | market_update::Data::DepthOrder(_)) => {
                self.depth
            }
            Some(market_update::Data::Trades(trades)) => {
                trades.entries.iter().any(|entry| match &entry.data {
                    Some(trade_entry::Data::Trade(_)) => self.trade,
                    Some(trade_entry::Data::TradeCorrection(_)) => self.trade_correction,
                    Some(trade_entry::Data::TradeCancel(_)) => self.trade_cancel,
                    None => false,
                })
            }
            None => false,
        }
    }

    fn symbol_allowed(
        &self,
        symbol: &str,
        market_id: i64,
        instruments: &InstrumentMapping,
    ) -> bool {
        if self.symbols.is_empty() {
            return true;
        }
        if !symbol.is_empty() {
            return self.symbols.contains(symbol);
        }
        instruments
            .symbol_for(market_id)
            .is_some_and(|resolved| self.symbols.contains(&resolved))
    }
}

// =============================================================================
// Session Signals
// =============================================================================

/// Dispatch outcome the connection driver must act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// A login response was processed.
    Login(LoginOutcome),
    /// A logout response was processed; the gateway ends the session.
    Logout(LogoutOutcome),
    /// A heartbeat arrived.
    HeartBeat,
}

// =============================================================================
// Callback Isolation
// =============================================================================

/// Run an application callback, containing any panic.
///
/// Returns `false` if the callback panicked.
pub fn invoke_isolated(connection: ConnectionId, callback: &'static str, f: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(panic) => {
            tracing::error!(
                connection,
                callback,
                error = %panic_message(panic.as_ref()),
                "Application callback panicked"
            );
            metrics::record_callback_failure(callback);
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Per-connection decode, log and route pipeline.
pub struct MessageDispatcher {
    connection: ConnectionId,
    codec: Arc<dyn WireCodec>,
    handler: Arc<dyn FeedHandler>,
    observer: Option<Arc<dyn RawMessageObserver>>,
    subscriptions: Arc<SubscriptionManager>,
    instruments: Arc<InstrumentMapping>,
    policy: Arc<LogPolicy>,
    stats: Option<WireStats>,
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("connection", &self.connection)
            .field("observer", &self.observer.is_some())
            .field("policy", &self.policy)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl MessageDispatcher {
    /// Create a dispatcher for one connection.
    #[must_use]
    pub fn new(
        connection: ConnectionId,
        codec: Arc<dyn WireCodec>,
        handler: Arc<dyn FeedHandler>,
        subscriptions: Arc<SubscriptionManager>,
        instruments: Arc<InstrumentMapping>,
        policy: Arc<LogPolicy>,
    ) -> Self {
        Self {
            connection,
            codec,
            handler,
            observer: None,
            subscriptions,
            instruments,
            policy,
            stats: None,
        }
    }

    /// Attach a raw message observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Option<Arc<dyn RawMessageObserver>>) -> Self {
        self.observer = observer;
        self
    }

    /// Enable wire statistics.
    #[must_use]
    pub fn with_wire_stats(mut self, enabled: bool) -> Self {
        self.stats = enabled.then(WireStats::new);
        self
    }

    /// Connection this dispatcher serves.
    #[must_use]
    pub const fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// The application handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn FeedHandler> {
        &self.handler
    }

    /// Subscription manager this connection reports acknowledgements to.
    #[must_use]
    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        &self.subscriptions
    }

    /// Whether wire statistics are collected.
    #[must_use]
    pub const fn has_wire_stats(&self) -> bool {
        self.stats.is_some()
    }

    /// Read and reset the wire counters.
    pub fn take_stats_snapshot(&mut self) -> Option<WireSnapshot> {
        self.stats.as_mut().map(WireStats::take_snapshot)
    }

    /// Process one inbound frame.
    ///
    /// Never fails: undecodable frames are logged, counted and dropped
    /// without touching `session`.
    pub fn on_frame(&mut self, frame: &Frame, session: &mut AuthSession) -> Option<SessionSignal> {
        let started = Instant::now();
        metrics::record_frame_received(frame.len());
        if frame.is_binary()
            && let Some(stats) = self.stats.as_mut()
        {
            stats.record(frame.len());
        }

        let message = match self.codec.decode(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(
                    connection = self.connection,
                    bytes = frame.len(),
                    error = %e,
                    "Dropping undecodable frame"
                );
                metrics::record_decode_error(frame.is_binary());
                return None;
            }
        };

        let kind = message.kind();
        metrics::record_message_received(kind);

        let signal = match &message.data {
            Some(data) => {
                if self.policy.should_log(data, &self.instruments) {
                    self.log_message(&message);
                }
                self.route(data, session)
            }
            None => {
                tracing::trace!(connection = self.connection, "Dropping message without payload");
                None
            }
        };

        if let Some(observer) = &self.observer {
            let bytes = frame.as_bytes();
            invoke_isolated(self.connection, "on_message", || {
                observer.on_message(self.connection, bytes);
            });
        }

        metrics::record_dispatch_duration(started.elapsed());
        signal
    }

    fn route(&self, data: &Data, session: &mut AuthSession) -> Option<SessionSignal> {
        let connection = self.connection;
        let handler = self.handler.as_ref();

        match data {
            Data::LoginResponse(response) => {
                let outcome = session.on_login_response(response);
                invoke_isolated(connection, "on_login_response", || {
                    handler.on_login_response(connection, response);
                });
                Some(SessionSignal::Login(outcome))
            }
            Data::LogoutResponse(response) => {
                let outcome = session.on_logout_response(response);
                invoke_isolated(connection, "on_logout_response", || {
                    handler.on_logout_response(connection, response);
                });
                Some(SessionSignal::Logout(outcome))
            }
            Data::SubscriptionResponse(response) => {
                if let Some((id, state)) = self.subscriptions.on_subscription_response(response) {
                    tracing::debug!(
                        connection,
                        subscription_id = id,
                        state = state.as_str(),
                        "Subscription state changed"
                    );
                    metrics::set_subscriptions(self.subscriptions.stats());
                }
                invoke_isolated(connection, "on_subscription_response", || {
                    handler.on_subscription_response(connection, response);
                });
                None
            }
            Data::InstrumentDefinition(definition) => {
                self.instruments.upsert(definition.clone());
                invoke_isolated(connection, "on_instrument_definition", || {
                    handler.on_instrument_definition(connection, definition);
                });
                None
            }
            Data::HeartBeat(heartbeat) => {
                invoke_isolated(connection, "on_heartbeat", || {
                    handler.on_heartbeat(connection, heartbeat);
                });
                Some(SessionSignal::HeartBeat)
            }
            Data::InstrumentResponse(response) => {
                invoke_isolated(connection, "on_instrument_response", || {
                    handler.on_instrument_response(connection, response);
                });
                None
            }
            Data::InstrumentReferenceResponse(response) => {
                invoke_isolated(connection, "on_instrument_reference_response", || {
                    handler.on_instrument_reference_response(connection, response);
                });
                None
            }
            Data::ExchangeResponse(response) => {
                invoke_isolated(connection, "on_exchange_response", || {
                    handler.on_exchange_response(connection, response);
                });
                None
            }
            Data::MarketStatus(status) => {
                invoke_isolated(connection, "on_market_status", || {
                    handler.on_market_status(connection, status);
                });
                None
            }
            Data::MarketSnapshot(snapshot) => {
                invoke_isolated(connection, "on_market_snapshot", || {
                    handler.on_market_snapshot(connection, snapshot);
                });
                None
            }
            Data::MarketUpdate(update) => {
                invoke_isolated(connection, "on_market_update", || {
                    handler.on_market_update(connection, update);
                });
                None
            }
            Data::VolumeAtPrice(volume) => {
                invoke_isolated(connection, "on_volume_at_price", || {
                    handler.on_volume_at_price(connection, volume);
                });
                None
            }
            Data::Ohlc(ohlc) => {
                invoke_isolated(connection, "on_ohlc", || handler.on_ohlc(connection, ohlc));
                None
            }
            Data::InstrumentAction(action) => {
                invoke_isolated(connection, "on_instrument_action", || {
                    handler.on_instrument_action(connection, action);
                });
                None
            }
        }
    }

    fn log_message(&self, message: &GatewayMessage) {
        let redacted;
        let message = match &message.data {
            Some(Data::LoginResponse(response)) if !self.policy.log_tokens => {
                let mut response = response.clone();
                response.token = redact_token(&response.token, false);
                redacted = GatewayMessage::new(Data::LoginResponse(response));
                &redacted
            }
            _ => message,
        };

        let rendered = match &message.data {
            Some(data) if self.policy.pretty_print => serde_json::to_string_pretty(data),
            Some(data) => serde_json::to_string(data),
            None => return,
        };

        match rendered {
            Ok(json) => tracing::info!(
                connection = self.connection,
                kind = message.kind().as_str(),
                "{json}"
            ),
            Err(e) => tracing::warn!(
                connection = self.connection,
                kind = message.kind().as_str(),
                error = %e,
                "Failed to render message for logging"
            ),
        }
    }
}
