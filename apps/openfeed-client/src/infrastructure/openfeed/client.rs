//! Openfeed Client
//!
//! Facade over one or more gateway connections. Each connection runs as its
//! own task (see `connection`); the client registers subscriptions, forwards
//! commands and exposes connection state.
//!
//! Subscriptions are tracked either in one manager shared by every connection
//! (each entry is then sent by whichever connection claims it first) or in
//! one manager per connection (every connection subscribes to everything).
//! Registrations go to every manager in the same order, so ids agree.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{Connector, FeedHandler, RawMessageObserver, WireCodec};
use crate::application::services::{LogPolicy, MessageDispatcher};
use crate::domain::connection::{ConnectionId, ConnectionState};
use crate::domain::instrument::InstrumentMapping;
use crate::domain::subscription::{
    SubscriptionError, SubscriptionId, SubscriptionManager, SubscriptionRequest,
};
use crate::infrastructure::metrics;
use crate::infrastructure::openfeed::codec::{OpenfeedCodec, WireProtocol};
use crate::infrastructure::openfeed::connection::{
    ConnectionCommand, ConnectionDriver, ConnectionHandle, ConnectionSettings,
};
use crate::infrastructure::openfeed::transport::WebSocketConnector;

/// Everything needed to build a client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Identifier used in logs.
    pub client_id: String,
    /// Per-connection settings.
    pub connection: ConnectionSettings,
    /// Outbound wire encoding.
    pub protocol: WireProtocol,
    /// Message logging.
    pub log_policy: LogPolicy,
    /// Parallel connections (at least one).
    pub number_of_connections: usize,
    /// One subscription manager for all connections.
    pub share_subscriptions: bool,
    /// Registered before the first connect.
    pub subscriptions: Vec<SubscriptionRequest>,
}

/// Openfeed market data client.
pub struct OpenfeedClient<C: Connector = WebSocketConnector> {
    client_id: String,
    managers: Vec<Arc<SubscriptionManager>>,
    instruments: Arc<InstrumentMapping>,
    handles: Vec<ConnectionHandle>,
    pending: Vec<ConnectionDriver<C>>,
    tasks: JoinSet<()>,
    cancel: CancellationToken,
}

impl OpenfeedClient<WebSocketConnector> {
    /// Create a client that connects over WebSocket.
    #[must_use]
    pub fn new(
        config: ClientConfig,
        handler: Arc<dyn FeedHandler>,
        observer: Option<Arc<dyn RawMessageObserver>>,
    ) -> Self {
        Self::with_connector(config, WebSocketConnector::default(), handler, observer)
    }
}

impl<C: Connector> OpenfeedClient<C> {
    /// Create a client with a custom connector.
    ///
    /// Connections are built here and spawned by [`start`](Self::start).
    #[must_use]
    pub fn with_connector(
        config: ClientConfig,
        connector: C,
        handler: Arc<dyn FeedHandler>,
        observer: Option<Arc<dyn RawMessageObserver>>,
    ) -> Self {
        let ClientConfig {
            client_id,
            connection,
            protocol,
            log_policy,
            number_of_connections,
            share_subscriptions,
            subscriptions,
        } = config;

        let connections = number_of_connections.max(1);
        let manager_count = if share_subscriptions { 1 } else { connections };
        let managers: Vec<_> = (0..manager_count)
            .map(|_| Arc::new(SubscriptionManager::new()))
            .collect();

        let connector = Arc::new(connector);
        let codec: Arc<dyn WireCodec> = Arc::new(OpenfeedCodec::new(protocol));
        let settings = Arc::new(connection);
        let policy = Arc::new(log_policy);
        let instruments = Arc::new(InstrumentMapping::new());
        let cancel = CancellationToken::new();

        let mut handles = Vec::with_capacity(connections);
        let mut pending = Vec::with_capacity(connections);
        for id in 0..connections {
            let manager = &managers[id % manager_count];
            let dispatcher = MessageDispatcher::new(
                id,
                Arc::clone(&codec),
                Arc::clone(&handler),
                Arc::clone(manager),
                Arc::clone(&instruments),
                Arc::clone(&policy),
            )
            .with_observer(observer.clone());

            let (driver, handle) = ConnectionDriver::new(
                Arc::clone(&connector),
                Arc::clone(&codec),
                Arc::clone(&settings),
                dispatcher,
                cancel.child_token(),
            );
            handles.push(handle);
            pending.push(driver);
        }

        let client = Self {
            client_id,
            managers,
            instruments,
            handles,
            pending,
            tasks: JoinSet::new(),
            cancel,
        };
        for request in subscriptions {
            if let Err(e) = client.register(request) {
                tracing::warn!(
                    client_id = %client.client_id,
                    error = %e,
                    "Skipping configured subscription"
                );
            }
        }
        client
    }

    /// Spawn the connection tasks. Later calls do nothing.
    pub fn start(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        tracing::info!(
            client_id = %self.client_id,
            connections = self.pending.len(),
            subscriptions = self.subscriptions().len(),
            shared = self.managers.len() == 1 && self.handles.len() > 1,
            "Starting Openfeed client"
        );
        for driver in self.pending.drain(..) {
            self.tasks.spawn(driver.run());
        }
    }

    /// Register a subscription and send it on every ready connection.
    ///
    /// Subscribing to an identical target and type set again returns the
    /// existing id without sending anything.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTarget` for a blank symbol or exchange code.
    pub fn subscribe(
        &self,
        request: SubscriptionRequest,
    ) -> Result<SubscriptionId, SubscriptionError> {
        let target = request.target.to_string();
        let (id, queued) = self.register(request)?;

        tracing::debug!(
            client_id = %self.client_id,
            subscription_id = id,
            target = %target,
            queued,
            "Subscription registered"
        );
        if queued {
            self.broadcast(&ConnectionCommand::Flush);
        }
        Ok(id)
    }

    /// Remove a subscription and tell the gateway on the connections that
    /// sent it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSubscription` if `id` is not registered.
    pub fn unsubscribe(
        &self,
        id: SubscriptionId,
    ) -> Result<SubscriptionRequest, SubscriptionError> {
        let owners: Vec<ConnectionId> = self
            .handles
            .iter()
            .map(ConnectionHandle::id)
            .filter(|&connection| self.manager(connection).owner(id) == Some(connection))
            .collect();

        let mut removed = None;
        for manager in &self.managers {
            if let Some(request) = manager.unsubscribe(id) {
                removed = Some(request);
            }
        }
        let request = removed.ok_or(SubscriptionError::UnknownSubscription(id))?;

        for handle in self.handles.iter().filter(|h| owners.contains(&h.id())) {
            handle.send(ConnectionCommand::Unsubscribe(id, request.clone()));
        }
        tracing::debug!(
            client_id = %self.client_id,
            subscription_id = id,
            connections = owners.len(),
            "Subscription removed"
        );
        metrics::set_subscriptions(self.subscriptions().stats());
        Ok(request)
    }

    /// Log out every ready connection. Each closes once the gateway confirms.
    pub fn logout(&self) {
        tracing::info!(client_id = %self.client_id, "Logging out");
        self.broadcast(&ConnectionCommand::Logout);
    }

    /// Stop every connection.
    pub fn shutdown(&self) {
        tracing::info!(client_id = %self.client_id, "Shutting down Openfeed client");
        self.broadcast(&ConnectionCommand::Shutdown);
        self.cancel.cancel();
    }

    /// Wait for every connection task to finish.
    pub async fn join(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(client_id = %self.client_id, error = %e, "Connection task failed");
            }
        }
    }

    /// Current state of every connection, by index.
    #[must_use]
    pub fn states(&self) -> Vec<ConnectionState> {
        self.handles.iter().map(ConnectionHandle::state).collect()
    }

    /// Watch the state of one connection.
    #[must_use]
    pub fn state_receiver(
        &self,
        connection: ConnectionId,
    ) -> Option<watch::Receiver<ConnectionState>> {
        self.handles
            .get(connection)
            .map(ConnectionHandle::state_receiver)
    }

    /// Number of connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.handles.len()
    }

    /// Instrument definitions received on any connection.
    #[must_use]
    pub const fn instruments(&self) -> &Arc<InstrumentMapping> {
        &self.instruments
    }

    /// Subscriptions of the first connection (of all, when shared).
    #[must_use]
    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        &self.managers[0]
    }

    /// Subscriptions tracked for one connection.
    #[must_use]
    pub fn subscriptions_for(
        &self,
        connection: ConnectionId,
    ) -> Option<&Arc<SubscriptionManager>> {
        (connection < self.handles.len()).then(|| self.manager(connection))
    }

    /// Client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn manager(&self, connection: ConnectionId) -> &Arc<SubscriptionManager> {
        &self.managers[connection % self.managers.len()]
    }

    fn register(
        &self,
        request: SubscriptionRequest,
    ) -> Result<(SubscriptionId, bool), SubscriptionError> {
        request.validate()?;

        let mut id = None;
        let mut queued = false;
        for manager in &self.managers {
            let registration = manager.subscribe(request.clone());
            id.get_or_insert(registration.id);
            queued |= registration.queued;
        }
        metrics::set_subscriptions(self.subscriptions().stats());

        id.map(|id| (id, queued))
            .ok_or_else(|| SubscriptionError::InvalidTarget(request.target.to_string()))
    }

    fn broadcast(&self, command: &ConnectionCommand) {
        for handle in &self.handles {
            if !handle.send(command.clone()) {
                tracing::debug!(
                    client_id = %self.client_id,
                    connection = handle.id(),
                    "Connection task has exited"
                );
            }
        }
    }
}

impl<C: Connector> std::fmt::Debug for OpenfeedClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenfeedClient")
            .field("client_id", &self.client_id)
            .field("connections", &self.handles.len())
            .field("shared_subscriptions", &(self.managers.len() == 1))
            .field("started", &self.pending.is_empty())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Drop for OpenfeedClient<C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
