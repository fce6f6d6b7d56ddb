//! Subscription Management
//!
//! Tracks the subscriptions a client wants and what the gateway confirmed.
//!
//! # Design
//!
//! Every subscription is identified by its (target, type-set) pair and gets a
//! sequential id at registration. The manager keeps entries in registration
//! order and tracks per entry:
//! - the gateway state (`Pending`, `Acked`, `Rejected`)
//! - which connection sent the request in its current session, if any
//!
//! When a connection drops, the entries it owned are re-armed to `Pending`.
//! After the next login `resubscribe_all` yields every non-acknowledged entry
//! exactly once, in the order originally registered. Subscriptions registered
//! while the session is ready are flushed through `take_undispatched`, so no
//! request is sent twice in one session.
//!
//! A manager may be shared by several connections. Each entry is then sent
//! by exactly one of them, whichever claims it first.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::RwLock;
use thiserror::Error;

use crate::domain::connection::ConnectionId;
use crate::domain::envelope::{
    self, Service, SubscriptionResponse, SubscriptionTarget, SubscriptionType,
};

// =============================================================================
// Types
// =============================================================================

/// Identifier assigned to a subscription at registration.
pub type SubscriptionId = u64;

/// Errors raised by subscription operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// No subscription with this id is registered.
    #[error("unknown subscription id {0}")]
    UnknownSubscription(SubscriptionId),

    /// The target cannot be subscribed to.
    #[error("invalid subscription target: {0}")]
    InvalidTarget(String),
}

/// A standing request for market data on one target.
///
/// Identity is the (target, type-set) pair; the snapshot interval is carried
/// along but does not distinguish subscriptions.
#[derive(Debug, Clone)]
pub struct SubscriptionRequest {
    /// What to subscribe to.
    pub target: SubscriptionTarget,
    /// Requested stream kinds.
    pub types: BTreeSet<SubscriptionType>,
    /// Snapshot interval in seconds, 0 for none.
    pub snapshot_interval_seconds: i32,
}

impl SubscriptionRequest {
    /// Create a request for a target and set of types.
    #[must_use]
    pub fn new(
        target: SubscriptionTarget,
        types: impl IntoIterator<Item = SubscriptionType>,
    ) -> Self {
        Self {
            target,
            types: types.into_iter().collect(),
            snapshot_interval_seconds: 0,
        }
    }

    /// Request for a symbol.
    #[must_use]
    pub fn symbol(
        symbol: impl Into<String>,
        types: impl IntoIterator<Item = SubscriptionType>,
    ) -> Self {
        Self::new(SubscriptionTarget::Symbol(symbol.into()), types)
    }

    /// Request for a market id.
    #[must_use]
    pub fn market_id(market_id: i64, types: impl IntoIterator<Item = SubscriptionType>) -> Self {
        Self::new(SubscriptionTarget::MarketId(market_id), types)
    }

    /// Set the snapshot interval.
    #[must_use]
    pub const fn with_snapshot_interval(mut self, seconds: i32) -> Self {
        self.snapshot_interval_seconds = seconds;
        self
    }

    /// Build the wire request.
    ///
    /// The session token is stamped by the caller.
    #[must_use]
    pub fn to_wire(
        &self,
        correlation_id: SubscriptionId,
        service: Service,
        unsubscribe: bool,
    ) -> envelope::SubscriptionRequest {
        envelope::SubscriptionRequest {
            correlation_id: i64::try_from(correlation_id).unwrap_or(i64::MAX),
            token: String::new(),
            service: service.into(),
            unsubscribe,
            target: Some(self.target.clone()),
            subscription_type: self.types.iter().map(|t| i32::from(*t)).collect(),
            snapshot_interval_seconds: self.snapshot_interval_seconds,
        }
    }

    /// Check that the target names something.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTarget` for a blank symbol or exchange code.
    pub fn validate(&self) -> Result<(), SubscriptionError> {
        match &self.target {
            SubscriptionTarget::Symbol(value) | SubscriptionTarget::Exchange(value)
                if value.trim().is_empty() =>
            {
                Err(SubscriptionError::InvalidTarget(self.target.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn key(&self) -> (SubscriptionTarget, BTreeSet<SubscriptionType>) {
        (self.target.clone(), self.types.clone())
    }
}

impl PartialEq for SubscriptionRequest {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.types == other.types
    }
}

impl Eq for SubscriptionRequest {}

/// Gateway state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    /// Registered or re-armed, not yet confirmed.
    Pending,
    /// Confirmed by the gateway.
    Acked,
    /// Refused by the gateway.
    Rejected,
}

impl SubscriptionState {
    /// Lower-case name for logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Acked => "acked",
            Self::Rejected => "rejected",
        }
    }
}

/// Result of `SubscriptionManager::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Id of the (possibly pre-existing) subscription.
    pub id: SubscriptionId,
    /// Whether a request now waits to be sent.
    pub queued: bool,
}

/// A subscription selected for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSubscription {
    /// Subscription id, used as correlation id on the wire.
    pub id: SubscriptionId,
    /// The request to send.
    pub request: SubscriptionRequest,
}

/// Point-in-time view of one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEntryView {
    /// Subscription id.
    pub id: SubscriptionId,
    /// The request.
    pub request: SubscriptionRequest,
    /// Gateway state.
    pub state: SubscriptionState,
}

/// Counts of subscriptions per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    /// Entries awaiting confirmation.
    pub pending: usize,
    /// Confirmed entries.
    pub acked: usize,
    /// Refused entries.
    pub rejected: usize,
}

impl SubscriptionStats {
    /// Total tracked entries.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pending + self.acked + self.rejected
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug)]
struct Entry {
    request: SubscriptionRequest,
    state: SubscriptionState,
    /// Connection that sent the request in its current session.
    owner: Option<ConnectionId>,
}

impl Entry {
    fn claimable_by(&self, connection: ConnectionId) -> bool {
        self.owner.is_none_or(|owner| owner == connection)
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_id: SubscriptionId,
    /// Ids grow monotonically, so key order is registration order.
    entries: BTreeMap<SubscriptionId, Entry>,
    index: HashMap<(SubscriptionTarget, BTreeSet<SubscriptionType>), SubscriptionId>,
}

impl Registry {
    fn find_pending(&self, response: &SubscriptionResponse) -> Option<SubscriptionId> {
        let by_correlation = u64::try_from(response.correlation_id)
            .ok()
            .filter(|id| {
                self.entries
                    .get(id)
                    .is_some_and(|entry| entry.state == SubscriptionState::Pending)
            });

        by_correlation.or_else(|| {
            let target = response.target.as_ref()?;
            self.entries
                .iter()
                .find(|(_, entry)| {
                    entry.state == SubscriptionState::Pending && &entry.request.target == target
                })
                .map(|(id, _)| *id)
        })
    }

    fn claim(
        &mut self,
        connection: ConnectionId,
        select: impl Fn(&Entry) -> bool,
    ) -> Vec<OutboundSubscription> {
        self.entries
            .iter_mut()
            .filter(|(_, entry)| entry.claimable_by(connection) && select(entry))
            .map(|(id, entry)| {
                entry.state = SubscriptionState::Pending;
                entry.owner = Some(connection);
                OutboundSubscription {
                    id: *id,
                    request: entry.request.clone(),
                }
            })
            .collect()
    }
}

// =============================================================================
// Subscription Manager
// =============================================================================

/// Thread-safe subscription registry.
///
/// Shared between the client facade (which registers subscriptions) and one
/// or more connection tasks (which send them and process responses).
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    registry: RwLock<Registry>,
}

impl SubscriptionManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription.
    ///
    /// An identical (target, type-set) that is pending or acknowledged is
    /// left untouched and its id returned. A rejected one is re-armed.
    pub fn subscribe(&self, request: SubscriptionRequest) -> Registration {
        let mut registry = self.registry.write();
        let key = request.key();

        let existing = registry.index.get(&key).copied();
        if let Some(id) = existing
            && let Some(entry) = registry.entries.get_mut(&id)
        {
            if entry.state == SubscriptionState::Rejected {
                entry.state = SubscriptionState::Pending;
                entry.owner = None;
                return Registration { id, queued: true };
            }
            return Registration { id, queued: false };
        }

        registry.next_id += 1;
        let id = registry.next_id;
        registry.index.insert(key, id);
        registry.entries.insert(
            id,
            Entry {
                request,
                state: SubscriptionState::Pending,
                owner: None,
            },
        );

        Registration { id, queued: true }
    }

    /// Remove a subscription, returning its request.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Option<SubscriptionRequest> {
        let mut registry = self.registry.write();
        let entry = registry.entries.remove(&id)?;
        registry.index.remove(&entry.request.key());
        Some(entry.request)
    }

    /// Apply a subscription response to the matching pending entry.
    ///
    /// Matches by correlation id first, then by target against the earliest
    /// pending entry. Unmatched responses are logged and ignored. Returns the
    /// updated entry id and its new state.
    pub fn on_subscription_response(
        &self,
        response: &SubscriptionResponse,
    ) -> Option<(SubscriptionId, SubscriptionState)> {
        if response.unsubscribe {
            tracing::debug!(
                correlation_id = response.correlation_id,
                "Unsubscribe acknowledged"
            );
            return None;
        }

        let mut registry = self.registry.write();
        let Some(id) = registry.find_pending(response) else {
            tracing::warn!(
                correlation_id = response.correlation_id,
                target = ?response.target,
                "Subscription response matches no pending subscription"
            );
            return None;
        };

        let success = response.status.as_ref().is_some_and(|s| s.is_success());
        let state = if success {
            SubscriptionState::Acked
        } else {
            SubscriptionState::Rejected
        };

        if let Some(entry) = registry.entries.get_mut(&id) {
            entry.state = state;
            if !success {
                tracing::warn!(
                    subscription_id = id,
                    target = %entry.request.target,
                    reason = response.status.as_ref().map_or("", |s| s.message.as_str()),
                    "Subscription rejected"
                );
            }
        }

        Some((id, state))
    }

    /// Select every non-acknowledged entry for replay after a login.
    ///
    /// Entries are returned in registration order and claimed by
    /// `connection`. Entries claimed by another connection are skipped.
    pub fn resubscribe_all(&self, connection: ConnectionId) -> Vec<OutboundSubscription> {
        self.registry
            .write()
            .claim(connection, |entry| entry.state != SubscriptionState::Acked)
    }

    /// Select pending entries no connection has sent yet.
    pub fn take_undispatched(&self, connection: ConnectionId) -> Vec<OutboundSubscription> {
        self.registry.write().claim(connection, |entry| {
            entry.state == SubscriptionState::Pending && entry.owner.is_none()
        })
    }

    /// Re-arm the entries owned by `connection` after it disconnected.
    ///
    /// They return to `Pending` and become claimable by any connection.
    pub fn rearm(&self, connection: ConnectionId) {
        for entry in self.registry.write().entries.values_mut() {
            if entry.owner == Some(connection) {
                entry.state = SubscriptionState::Pending;
                entry.owner = None;
            }
        }
    }

    /// Connection that sent a subscription in its current session.
    #[must_use]
    pub fn owner(&self, id: SubscriptionId) -> Option<ConnectionId> {
        self.registry.read().entries.get(&id).and_then(|entry| entry.owner)
    }

    /// State of a subscription.
    #[must_use]
    pub fn state(&self, id: SubscriptionId) -> Option<SubscriptionState> {
        self.registry.read().entries.get(&id).map(|entry| entry.state)
    }

    /// All subscriptions in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SubscriptionEntryView> {
        self.registry
            .read()
            .entries
            .iter()
            .map(|(id, entry)| SubscriptionEntryView {
                id: *id,
                request: entry.request.clone(),
                state: entry.state,
            })
            .collect()
    }

    /// Counts per state.
    #[must_use]
    pub fn stats(&self) -> SubscriptionStats {
        let registry = self.registry.read();
        let mut stats = SubscriptionStats::default();
        for entry in registry.entries.values() {
            match entry.state {
                SubscriptionState::Pending => stats.pending += 1,
                SubscriptionState::Acked => stats.acked += 1,
                SubscriptionState::Rejected => stats.rejected += 1,
            }
        }
        stats
    }

    /// Number of tracked subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.read().entries.len()
    }

    /// Whether no subscriptions are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.read().entries.is_empty()
    }
}
