//! Connection Driver
//!
//! One tokio task per gateway connection. The task owns the connection state
//! machine, its auth session and its dispatcher, and multiplexes with
//! `tokio::select!`:
//!
//! - inbound frames from the transport
//! - commands from the client facade (flush, unsubscribe, logout, shutdown)
//! - liveness timeouts from the heartbeat monitor
//! - the wire stats tick
//! - cancellation
//!
//! Between sessions the task waits out the reconnect delay, which shutdown
//! interrupts.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Interval;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::application::ports::{Connector, Endpoint, Transport, WireCodec};
use crate::application::services::{MessageDispatcher, SessionSignal, invoke_isolated};
use crate::domain::connection::{
    ConnectionId, ConnectionPolicy, ConnectionState, ConnectionStateMachine, LoginStep, NextStep,
    SessionFailure,
};
use crate::domain::envelope::{
    ExchangeRequest, GatewayRequest, InstrumentReferenceRequest, InstrumentRequest, Service,
    SubscriptionTarget,
};
use crate::domain::session::Credentials;
use crate::domain::subscription::{OutboundSubscription, SubscriptionId, SubscriptionRequest};
use crate::infrastructure::metrics;
use crate::infrastructure::openfeed::liveness::{
    LivenessConfig, LivenessEvent, LivenessMonitor, LivenessState,
};

// =============================================================================
// Settings
// =============================================================================

/// Reference data requested after every successful login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ReferenceRequests {
    /// Instrument definitions per symbol and market id.
    pub instrument: bool,
    /// Instrument cross-references per symbol and market id.
    pub instrument_reference: bool,
    /// Exchange list.
    pub exchange: bool,
    /// Symbols to look up.
    pub symbols: Vec<String>,
    /// Market ids to look up.
    pub market_ids: Vec<i64>,
}

impl ReferenceRequests {
    fn targets(&self) -> impl Iterator<Item = SubscriptionTarget> + '_ {
        self.symbols
            .iter()
            .cloned()
            .map(SubscriptionTarget::Symbol)
            .chain(self.market_ids.iter().copied().map(SubscriptionTarget::MarketId))
    }
}

/// Settings shared by every connection of a client.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Gateway address.
    pub endpoint: Endpoint,
    /// Login credentials.
    pub credentials: Credentials,
    /// Requested service level.
    pub service: Service,
    /// Reconnect and duplicate-login policy.
    pub policy: ConnectionPolicy,
    /// Heartbeat liveness.
    pub liveness: LivenessConfig,
    /// Wire stats interval, `None` when disabled.
    pub stats_interval: Option<Duration>,
    /// Reference data requested at login.
    pub references: ReferenceRequests,
    /// Log session tokens unredacted.
    pub log_tokens: bool,
}

// =============================================================================
// Commands & Handle
// =============================================================================

/// Instruction from the client facade to a connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionCommand {
    /// Send subscriptions registered since the last flush.
    Flush,
    /// Tell the gateway to drop a subscription.
    Unsubscribe(SubscriptionId, SubscriptionRequest),
    /// End the session cleanly; the connection closes for good.
    Logout,
    /// Stop the connection task.
    Shutdown,
}

/// Facade-side handle to a connection task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    commands: mpsc::UnboundedSender<ConnectionCommand>,
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionHandle {
    /// Connection index.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Queue a command. Returns `false` once the task has exited.
    pub fn send(&self, command: ConnectionCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}

// =============================================================================
// Driver
// =============================================================================

enum SessionEnd {
    Disconnected,
    Shutdown,
}

enum Flow {
    Continue,
    Disconnect,
}

/// Per-connection task body.
pub struct ConnectionDriver<C: Connector> {
    id: ConnectionId,
    connector: Arc<C>,
    codec: Arc<dyn WireCodec>,
    settings: Arc<ConnectionSettings>,
    fsm: ConnectionStateMachine,
    dispatcher: MessageDispatcher,
    commands: mpsc::UnboundedReceiver<ConnectionCommand>,
    state_tx: watch::Sender<ConnectionState>,
    liveness: Arc<LivenessState>,
    cancel: CancellationToken,
}

impl<C: Connector> ConnectionDriver<C> {
    /// Create a driver and the handle that controls it.
    #[must_use]
    pub fn new(
        connector: Arc<C>,
        codec: Arc<dyn WireCodec>,
        settings: Arc<ConnectionSettings>,
        dispatcher: MessageDispatcher,
        cancel: CancellationToken,
    ) -> (Self, ConnectionHandle) {
        let id = dispatcher.connection();
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let fsm = ConnectionStateMachine::new(settings.policy.clone());
        let dispatcher = dispatcher.with_wire_stats(settings.stats_interval.is_some());

        let driver = Self {
            id,
            connector,
            codec,
            settings,
            fsm,
            dispatcher,
            commands,
            state_tx,
            liveness: Arc::new(LivenessState::new()),
            cancel,
        };
        let handle = ConnectionHandle {
            id,
            commands: command_tx,
            state: state_rx,
        };
        (driver, handle)
    }

    /// Run until shutdown or a terminal failure.
    pub async fn run(mut self) {
        tracing::info!(
            connection = self.id,
            endpoint = %self.settings.endpoint,
            "Connection task started"
        );

        loop {
            if let Err(e) = self.fsm.begin_connect() {
                tracing::error!(connection = self.id, error = %e, "Cannot start connecting");
                break;
            }
            self.publish_state();

            let next = match self.establish().await {
                Ok(Some(mut transport)) => {
                    let end = self.drive_session(&mut transport).await;
                    transport.close().await;
                    self.dispatcher.subscriptions().rearm(self.id);
                    match end {
                        SessionEnd::Shutdown => NextStep::Terminate,
                        SessionEnd::Disconnected => self.fsm.on_disconnected(),
                    }
                }
                Ok(None) => NextStep::Terminate,
                Err(failure) => {
                    self.notify_failure(&failure);
                    self.fsm.on_transport_failed(failure)
                }
            };

            match next {
                NextStep::Terminate => break,
                NextStep::Reconnect(delay) => {
                    self.publish_state();
                    metrics::record_reconnect(self.id);
                    tracing::info!(
                        connection = self.id,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Reconnecting to gateway"
                    );
                    if !self.wait_reconnect(delay).await {
                        break;
                    }
                }
            }
        }

        if !self.fsm.state().is_terminal() {
            self.fsm.shutdown();
        }
        self.publish_state();
        tracing::info!(
            connection = self.id,
            last_failure = ?self.fsm.last_failure(),
            "Connection task stopped"
        );
    }

    /// Connect, handshake and send the login.
    ///
    /// Returns `Ok(None)` if cancelled.
    async fn establish(&mut self) -> Result<Option<C::Transport>, SessionFailure> {
        let connector = Arc::clone(&self.connector);
        let settings = Arc::clone(&self.settings);
        let endpoint = &settings.endpoint;

        tracing::debug!(connection = self.id, endpoint = %endpoint, "Connecting");
        let link = tokio::select! {
            () = self.cancel.cancelled() => return Ok(None),
            result = connector.connect(endpoint) => result.map_err(transport_failure)?,
        };
        self.fsm.on_transport_connected().map_err(transport_failure)?;
        self.publish_state();

        let mut transport = tokio::select! {
            () = self.cancel.cancelled() => return Ok(None),
            result = connector.handshake(link, endpoint) => result.map_err(transport_failure)?,
        };

        let login = self
            .fsm
            .on_handshake_complete(&settings.credentials, settings.service)
            .map_err(transport_failure)?;
        self.publish_state();

        tracing::info!(
            connection = self.id,
            username = settings.credentials.username(),
            service = settings.service.as_str_name(),
            "Logging in"
        );
        self.send(&mut transport, GatewayRequest::login(login)).await?;
        Ok(Some(transport))
    }

    async fn drive_session(&mut self, transport: &mut C::Transport) -> SessionEnd {
        let (liveness_tx, mut liveness_rx) = mpsc::channel(1);
        let mut liveness_guard: Option<DropGuard> = None;
        let mut stats_tick = self.settings.stats_interval.map(|period| {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval
        });

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return SessionEnd::Shutdown,
                command = self.commands.recv() => match command {
                    Some(ConnectionCommand::Shutdown) | None => return SessionEnd::Shutdown,
                    Some(command) => {
                        if let Err(failure) = self.on_command(command, transport).await {
                            self.fail(failure);
                            return SessionEnd::Disconnected;
                        }
                    }
                },
                Some(LivenessEvent::Timeout { elapsed }) = liveness_rx.recv() => {
                    self.fail(SessionFailure::Transport(format!(
                        "no heartbeat for {}ms",
                        elapsed.as_millis()
                    )));
                    return SessionEnd::Disconnected;
                }
                () = tick(&mut stats_tick) => self.report_wire_stats(),
                frame = transport.recv() => match frame {
                    Some(Ok(frame)) => {
                        let signal = self.dispatcher.on_frame(&frame, self.fsm.session_mut());
                        if let Some(signal) = signal
                            && let Flow::Disconnect = self
                                .on_signal(signal, transport, &liveness_tx, &mut liveness_guard)
                                .await
                        {
                            return SessionEnd::Disconnected;
                        }
                    }
                    Some(Err(e)) => {
                        self.fail(transport_failure(e));
                        return SessionEnd::Disconnected;
                    }
                    None => {
                        tracing::info!(connection = self.id, "Gateway closed the connection");
                        return SessionEnd::Disconnected;
                    }
                },
            }
        }
    }

    async fn on_signal(
        &mut self,
        signal: SessionSignal,
        transport: &mut C::Transport,
        liveness_tx: &mpsc::Sender<LivenessEvent>,
        liveness_guard: &mut Option<DropGuard>,
    ) -> Flow {
        match signal {
            SessionSignal::HeartBeat => {
                self.liveness.record_heartbeat();
                Flow::Continue
            }
            SessionSignal::Login(outcome) => match self.fsm.on_login(&outcome) {
                LoginStep::Ready => {
                    tracing::info!(
                        connection = self.id,
                        token = %self.fsm.session().loggable_token(self.settings.log_tokens),
                        "Logged in"
                    );
                    self.publish_state();
                    *liveness_guard = self.start_liveness(liveness_tx.clone());

                    match self.on_ready(transport).await {
                        Ok(()) => Flow::Continue,
                        Err(failure) => {
                            self.fail(failure);
                            Flow::Disconnect
                        }
                    }
                }
                LoginStep::Rejected(failure) => {
                    self.notify_failure(&failure);
                    Flow::Disconnect
                }
                LoginStep::Ignored => Flow::Continue,
            },
            SessionSignal::Logout(outcome) => {
                match self.fsm.on_logout(&outcome) {
                    Some(failure) => self.notify_failure(&failure),
                    None => tracing::info!(connection = self.id, "Logged out"),
                }
                Flow::Disconnect
            }
        }
    }

    async fn on_ready(&mut self, transport: &mut C::Transport) -> Result<(), SessionFailure> {
        let replay = self.dispatcher.subscriptions().resubscribe_all(self.id);
        if !replay.is_empty() {
            tracing::info!(
                connection = self.id,
                count = replay.len(),
                "Replaying subscriptions"
            );
        }
        self.send_subscriptions(transport, replay).await?;
        self.send_reference_requests(transport).await?;
        metrics::set_subscriptions(self.dispatcher.subscriptions().stats());
        Ok(())
    }

    async fn on_command(
        &mut self,
        command: ConnectionCommand,
        transport: &mut C::Transport,
    ) -> Result<(), SessionFailure> {
        if !self.fsm.is_ready() {
            tracing::trace!(connection = self.id, ?command, "Command deferred until ready");
            return Ok(());
        }

        match command {
            ConnectionCommand::Flush => {
                let pending = self.dispatcher.subscriptions().take_undispatched(self.id);
                self.send_subscriptions(transport, pending).await
            }
            ConnectionCommand::Unsubscribe(id, request) => {
                tracing::info!(
                    connection = self.id,
                    subscription_id = id,
                    target = %request.target,
                    "Unsubscribing"
                );
                let mut wire = request.to_wire(id, self.fsm.session().service(), true);
                wire.token = self.token();
                self.send(transport, GatewayRequest::subscription(wire)).await
            }
            ConnectionCommand::Logout => match self.fsm.session_mut().begin_logout() {
                Ok(request) => {
                    tracing::info!(connection = self.id, "Logging out");
                    self.send(transport, GatewayRequest::logout(request)).await
                }
                Err(e) => {
                    tracing::warn!(connection = self.id, error = %e, "Cannot log out");
                    Ok(())
                }
            },
            ConnectionCommand::Shutdown => Ok(()),
        }
    }

    async fn send_subscriptions(
        &mut self,
        transport: &mut C::Transport,
        subscriptions: Vec<OutboundSubscription>,
    ) -> Result<(), SessionFailure> {
        let service = self.fsm.session().service();
        let token = self.token();

        for OutboundSubscription { id, request } in subscriptions {
            tracing::info!(
                connection = self.id,
                subscription_id = id,
                target = %request.target,
                types = ?request.types,
                "Subscribing"
            );
            let mut wire = request.to_wire(id, service, false);
            wire.token.clone_from(&token);
            self.send(transport, GatewayRequest::subscription(wire)).await?;
        }
        Ok(())
    }

    async fn send_reference_requests(
        &mut self,
        transport: &mut C::Transport,
    ) -> Result<(), SessionFailure> {
        let settings = Arc::clone(&self.settings);
        let references = &settings.references;
        let token = self.token();

        if references.instrument {
            for target in references.targets() {
                let request = InstrumentRequest {
                    correlation_id: self.fsm.session_mut().next_correlation(),
                    token: token.clone(),
                    target: Some(target),
                };
                self.send(transport, GatewayRequest::instrument(request)).await?;
            }
        }

        if references.instrument_reference {
            for target in references.targets() {
                let request = InstrumentReferenceRequest {
                    correlation_id: self.fsm.session_mut().next_correlation(),
                    token: token.clone(),
                    target: Some(target),
                };
                self.send(transport, GatewayRequest::instrument_reference(request))
                    .await?;
            }
        }

        if references.exchange {
            let request = ExchangeRequest {
                correlation_id: self.fsm.session_mut().next_correlation(),
                token,
            };
            self.send(transport, GatewayRequest::exchange(request)).await?;
        }

        Ok(())
    }

    async fn send(
        &self,
        transport: &mut C::Transport,
        request: GatewayRequest,
    ) -> Result<(), SessionFailure> {
        let frame = match self.codec.encode(&request) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(
                    connection = self.id,
                    request = request.name(),
                    error = %e,
                    "Failed to encode request"
                );
                return Ok(());
            }
        };

        tracing::trace!(
            connection = self.id,
            request = request.name(),
            bytes = frame.len(),
            "Sending"
        );
        transport.send(frame).await.map_err(transport_failure)
    }

    async fn wait_reconnect(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return false,
                () = &mut sleep => return true,
                command = self.commands.recv() => match command {
                    Some(ConnectionCommand::Shutdown) | None => return false,
                    Some(command) => {
                        tracing::trace!(
                            connection = self.id,
                            ?command,
                            "Command ignored while reconnecting"
                        );
                    }
                },
            }
        }
    }

    fn start_liveness(&self, event_tx: mpsc::Sender<LivenessEvent>) -> Option<DropGuard> {
        let config = self.settings.liveness;
        if !config.is_enabled() {
            return None;
        }

        self.liveness.reset();
        let token = self.cancel.child_token();
        let monitor =
            LivenessMonitor::new(config, Arc::clone(&self.liveness), event_tx, token.clone());
        tokio::spawn(monitor.run());
        Some(token.drop_guard())
    }

    fn report_wire_stats(&mut self) {
        let Some(snapshot) = self.dispatcher.take_stats_snapshot() else {
            return;
        };
        tracing::info!(
            connection = self.id,
            frames = snapshot.frames,
            bytes = snapshot.bytes,
            max_frame = snapshot.max_frame,
            avg_frame = snapshot.avg_frame(),
            frames_per_sec = snapshot.frames_per_sec(),
            "Wire stats"
        );
        metrics::record_wire_snapshot(self.id, &snapshot);
    }

    fn token(&self) -> String {
        self.fsm.session().token().unwrap_or_default().to_owned()
    }

    fn fail(&mut self, failure: SessionFailure) {
        self.notify_failure(&failure);
        self.fsm.record_failure(failure);
    }

    fn notify_failure(&self, failure: &SessionFailure) {
        if failure.is_fatal() {
            tracing::error!(
                connection = self.id,
                error = %failure,
                "Connection failed permanently"
            );
        } else {
            tracing::warn!(connection = self.id, error = %failure, "Connection failed");
        }

        let handler = self.dispatcher.handler();
        let id = self.id;
        invoke_isolated(id, "on_failure", || handler.on_failure(id, failure));
    }

    fn publish_state(&self) {
        let state = self.fsm.state();
        let previous = self.state_tx.send_replace(state);
        if previous == state {
            return;
        }

        tracing::debug!(
            connection = self.id,
            from = previous.as_str(),
            to = state.as_str(),
            "Connection state changed"
        );
        metrics::set_connection_state(self.id, state);

        let handler = self.dispatcher.handler();
        let id = self.id;
        invoke_isolated(id, "on_connection_state", || {
            handler.on_connection_state(id, state);
        });
    }
}

fn transport_failure(error: impl std::fmt::Display) -> SessionFailure {
    SessionFailure::Transport(error.to_string())
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
