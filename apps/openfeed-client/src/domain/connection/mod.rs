//! Connection State Machine
//!
//! Pure, synchronous lifecycle of one gateway connection. The connection
//! driver feeds it transport and session events and acts on what it returns;
//! no I/O happens here.
//!
//! ```text
//! Disconnected ─► Connecting ─► Handshaking ─► Authenticating ─► Ready
//!       ▲              │              │               │            │
//!       │              └──────────────┴───────┬───────┴────────────┘
//!       │                                     ▼
//!       └──────────── Reconnecting ◄── disconnect ──► Closed (terminal)
//! ```

mod reconnect;

use std::time::Duration;

use thiserror::Error;

pub use reconnect::{ReconnectConfig, ReconnectPolicy};

use crate::domain::envelope::{LoginRequest, ResultCode, Service};
use crate::domain::session::{AuthError, AuthSession, Credentials, LoginOutcome, LogoutOutcome};

/// Index of a connection within a client.
pub type ConnectionId = usize;

// =============================================================================
// States
// =============================================================================

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not started.
    #[default]
    Disconnected,
    /// Opening the transport.
    Connecting,
    /// Transport open, WebSocket upgrade in progress.
    Handshaking,
    /// Login sent, awaiting the response.
    Authenticating,
    /// Logged in; subscriptions may be sent.
    Ready,
    /// Waiting for the reconnect delay to elapse.
    Reconnecting,
    /// Terminal.
    Closed,
}

impl ConnectionState {
    /// Lower-case name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }

    /// Numeric value for the state gauge.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Handshaking => 2,
            Self::Authenticating => 3,
            Self::Ready => 4,
            Self::Reconnecting => 5,
            Self::Closed => 6,
        }
    }

    /// Whether no further transitions will happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Failures
// =============================================================================

/// Failure that changes connection state, surfaced to the application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionFailure {
    /// Connect, handshake, I/O or liveness failure. Retried.
    #[error("transport error: {0}")]
    Transport(String),

    /// Login rejected or session ended by the gateway. Retried.
    #[error("authentication failed ({}): {reason}", .result.as_str_name())]
    Auth {
        /// Result code from the gateway.
        result: ResultCode,
        /// Reason text from the gateway.
        reason: String,
    },

    /// Duplicate login with the shutdown policy enabled. Not retried.
    #[error("fatal authentication failure ({}): {reason}", .result.as_str_name())]
    FatalAuth {
        /// Result code from the gateway.
        result: ResultCode,
        /// Reason text from the gateway.
        reason: String,
    },
}

impl SessionFailure {
    /// Whether the failure ends the connection for good.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalAuth { .. })
    }
}

/// Event applied in a state that does not accept it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The event is not valid in the current state.
    #[error("cannot {event} while {from}")]
    InvalidTransition {
        /// State at the time of the event.
        from: ConnectionState,
        /// The rejected event.
        event: &'static str,
    },

    /// The session refused to start a login.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

// =============================================================================
// Decisions
// =============================================================================

/// What the driver does after a disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Wait, then connect again.
    Reconnect(Duration),
    /// Stop; the machine is `Closed`.
    Terminate,
}

/// What the driver does after a login response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    /// Now `Ready`: replay subscriptions.
    Ready,
    /// Login refused: surface the failure and close the transport.
    Rejected(SessionFailure),
    /// Response arrived outside `Authenticating`; nothing to do.
    Ignored,
}

/// Connection-level policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionPolicy {
    /// Reconnect after a disconnect.
    pub reconnect: bool,
    /// Backoff schedule.
    pub backoff: ReconnectConfig,
    /// Treat duplicate login as fatal.
    pub disable_on_duplicate_login: bool,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self {
            reconnect: true,
            backoff: ReconnectConfig::default(),
            disable_on_duplicate_login: true,
        }
    }
}

// =============================================================================
// State Machine
// =============================================================================

/// Lifecycle of a single connection.
///
/// Owns the connection's `AuthSession` and backoff state.
#[derive(Debug)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    session: AuthSession,
    backoff: ReconnectPolicy,
    reconnect_enabled: bool,
    disable_on_duplicate_login: bool,
    last_failure: Option<SessionFailure>,
}

impl ConnectionStateMachine {
    /// Create a machine in `Disconnected`.
    #[must_use]
    pub fn new(policy: ConnectionPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            session: AuthSession::new(),
            backoff: ReconnectPolicy::new(policy.backoff),
            reconnect_enabled: policy.reconnect,
            disable_on_duplicate_login: policy.disable_on_duplicate_login,
            last_failure: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether subscriptions may be sent.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, ConnectionState::Ready)
    }

    /// The authentication session.
    #[must_use]
    pub const fn session(&self) -> &AuthSession {
        &self.session
    }

    /// The authentication session, mutably.
    pub const fn session_mut(&mut self) -> &mut AuthSession {
        &mut self.session
    }

    /// Last failure since the last successful login.
    #[must_use]
    pub const fn last_failure(&self) -> Option<&SessionFailure> {
        self.last_failure.as_ref()
    }

    /// Whether a disconnect will be followed by a reconnect.
    #[must_use]
    pub const fn reconnect_enabled(&self) -> bool {
        self.reconnect_enabled
    }

    /// Start opening the transport.
    ///
    /// # Errors
    ///
    /// Fails unless `Disconnected` or `Reconnecting`.
    pub fn begin_connect(&mut self) -> Result<(), TransitionError> {
        self.expect(
            &[ConnectionState::Disconnected, ConnectionState::Reconnecting],
            "connect",
        )?;
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Transport open; the handshake starts.
    ///
    /// # Errors
    ///
    /// Fails unless `Connecting`.
    pub fn on_transport_connected(&mut self) -> Result<(), TransitionError> {
        self.expect(&[ConnectionState::Connecting], "finish connecting")?;
        self.state = ConnectionState::Handshaking;
        Ok(())
    }

    /// Handshake done; returns the login request to send.
    ///
    /// # Errors
    ///
    /// Fails unless `Handshaking`, or if a login is already in flight.
    pub fn on_handshake_complete(
        &mut self,
        credentials: &Credentials,
        service: Service,
    ) -> Result<LoginRequest, TransitionError> {
        self.expect(&[ConnectionState::Handshaking], "finish handshaking")?;
        let request = self.session.begin_login(credentials, service)?;
        self.state = ConnectionState::Authenticating;
        Ok(request)
    }

    /// Connect or handshake failed.
    pub fn on_transport_failed(&mut self, failure: SessionFailure) -> NextStep {
        self.record_failure(failure);
        self.on_disconnected()
    }

    /// Apply the outcome of a login response.
    pub fn on_login(&mut self, outcome: &LoginOutcome) -> LoginStep {
        if let LoginOutcome::Unsolicited { correlation_id } = outcome {
            tracing::debug!(
                state = %self.state,
                correlation_id,
                "Ignoring unsolicited login response"
            );
            return LoginStep::Ignored;
        }
        if self.state != ConnectionState::Authenticating {
            tracing::warn!(state = %self.state, "Login response outside authentication");
            return LoginStep::Ignored;
        }

        match outcome {
            LoginOutcome::Success { .. } => {
                self.state = ConnectionState::Ready;
                self.last_failure = None;
                self.backoff.reset();
                LoginStep::Ready
            }
            LoginOutcome::Failure { result, reason } => {
                let failure = SessionFailure::Auth {
                    result: *result,
                    reason: reason.clone(),
                };
                self.record_failure(failure.clone());
                LoginStep::Rejected(failure)
            }
            LoginOutcome::Unsolicited { .. } => LoginStep::Ignored,
        }
    }

    /// Apply the outcome of a logout response.
    ///
    /// The gateway ends the session after every logout response, so the
    /// driver always disconnects. Returns the failure to surface, if any.
    pub fn on_logout(&mut self, outcome: &LogoutOutcome) -> Option<SessionFailure> {
        match outcome {
            LogoutOutcome::Clean { requested: true } => {
                self.reconnect_enabled = false;
                None
            }
            LogoutOutcome::Clean { requested: false } => None,
            LogoutOutcome::DuplicateLogin { reason } if self.disable_on_duplicate_login => {
                self.reconnect_enabled = false;
                let failure = SessionFailure::FatalAuth {
                    result: ResultCode::DuplicateLogin,
                    reason: reason.clone(),
                };
                self.record_failure(failure.clone());
                Some(failure)
            }
            LogoutOutcome::DuplicateLogin { reason } => {
                let failure = SessionFailure::Auth {
                    result: ResultCode::DuplicateLogin,
                    reason: reason.clone(),
                };
                self.record_failure(failure.clone());
                Some(failure)
            }
            LogoutOutcome::Rejected { result, reason } => {
                let failure = SessionFailure::Auth {
                    result: *result,
                    reason: reason.clone(),
                };
                self.record_failure(failure.clone());
                Some(failure)
            }
        }
    }

    /// Transport closed. Clears the session and decides what comes next.
    pub fn on_disconnected(&mut self) -> NextStep {
        self.session.reset();

        if self.state == ConnectionState::Closed || !self.reconnect_enabled {
            self.state = ConnectionState::Closed;
            return NextStep::Terminate;
        }

        if let Some(delay) = self.backoff.next_delay() {
            self.state = ConnectionState::Reconnecting;
            NextStep::Reconnect(delay)
        } else {
            tracing::warn!(
                attempts = self.backoff.attempt_count(),
                "Reconnect attempts exhausted"
            );
            self.state = ConnectionState::Closed;
            NextStep::Terminate
        }
    }

    /// User-initiated close. Terminal.
    pub fn shutdown(&mut self) {
        self.reconnect_enabled = false;
        self.session.reset();
        self.state = ConnectionState::Closed;
    }

    /// Remember a failure until the next successful login.
    pub fn record_failure(&mut self, failure: SessionFailure) {
        self.last_failure = Some(failure);
    }

    fn expect(
        &self,
        allowed: &[ConnectionState],
        event: &'static str,
    ) -> Result<(), TransitionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                from: self.state,
                event,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("user", "secret").unwrap()
    }

    fn policy(reconnect: bool, disable_on_duplicate_login: bool) -> ConnectionPolicy {
        ConnectionPolicy {
            reconnect,
            backoff: ReconnectConfig::fixed(Duration::from_millis(50)),
            disable_on_duplicate_login,
        }
    }

    fn authenticating(policy: ConnectionPolicy) -> ConnectionStateMachine {
        let mut machine = ConnectionStateMachine::new(policy);
        machine.begin_connect().unwrap();
        machine.on_transport_connected().unwrap();
        machine
            .on_handshake_complete(&credentials(), Service::RealTime)
            .unwrap();
        machine
    }

    fn ready(policy: ConnectionPolicy) -> ConnectionStateMachine {
        let mut machine = authenticating(policy);
        let step = machine.on_login(&LoginOutcome::Success {
            token: "tok".to_string(),
        });
        assert_eq!(step, LoginStep::Ready);
        machine
    }

    #[test]
    fn happy_path_reaches_ready() {
        let mut machine = ConnectionStateMachine::new(ConnectionPolicy::default());
        assert_eq!(machine.state(), ConnectionState::Disconnected);

        machine.begin_connect().unwrap();
        assert_eq!(machine.state(), ConnectionState::Connecting);

        machine.on_transport_connected().unwrap();
        assert_eq!(machine.state(), ConnectionState::Handshaking);

        let login = machine
            .on_handshake_complete(&credentials(), Service::RealTime)
            .unwrap();
        assert_eq!(login.username, "user");
        assert_eq!(machine.state(), ConnectionState::Authenticating);

        machine.on_login(&LoginOutcome::Success {
            token: "tok".to_string(),
        });
        assert!(machine.is_ready());
        assert_eq!(machine.session().token(), Some("tok"));
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut machine = ConnectionStateMachine::new(ConnectionPolicy::default());
        assert!(machine.on_transport_connected().is_err());
        assert!(
            machine
                .on_handshake_complete(&credentials(), Service::RealTime)
                .is_err()
        );

        machine.begin_connect().unwrap();
        let err = machine.begin_connect().unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                from: ConnectionState::Connecting,
                event: "connect"
            }
        );
    }

    #[test]
    fn connect_failure_schedules_reconnect() {
        let mut machine = ConnectionStateMachine::new(policy(true, true));
        machine.begin_connect().unwrap();

        let next = machine.on_transport_failed(SessionFailure::Transport("refused".to_string()));
        assert_eq!(next, NextStep::Reconnect(Duration::from_millis(50)));
        assert_eq!(machine.state(), ConnectionState::Reconnecting);
        assert!(machine.last_failure().is_some());
        assert!(machine.begin_connect().is_ok());
    }

    #[test]
    fn connect_failure_without_reconnect_is_terminal() {
        let mut machine = ConnectionStateMachine::new(policy(false, true));
        machine.begin_connect().unwrap();

        let next = machine.on_transport_failed(SessionFailure::Transport("refused".to_string()));
        assert_eq!(next, NextStep::Terminate);
        assert_eq!(machine.state(), ConnectionState::Closed);
        assert!(machine.begin_connect().is_err());
    }

    #[test]
    fn failed_login_never_reaches_ready() {
        let mut machine = authenticating(policy(true, true));

        let step = machine.on_login(&LoginOutcome::Failure {
            result: ResultCode::InvalidCredentials,
            reason: "bad password".to_string(),
        });

        assert!(matches!(
            step,
            LoginStep::Rejected(SessionFailure::Auth {
                result: ResultCode::InvalidCredentials,
                ..
            })
        ));
        assert!(!machine.is_ready());
        assert_eq!(machine.on_disconnected(), NextStep::Reconnect(Duration::from_millis(50)));
    }

    #[test]
    fn successful_login_clears_prior_failure() {
        let mut machine = authenticating(policy(true, true));
        machine.on_login(&LoginOutcome::Failure {
            result: ResultCode::InvalidCredentials,
            reason: String::new(),
        });
        machine.on_disconnected();
        machine.begin_connect().unwrap();
        machine.on_transport_connected().unwrap();
        machine
            .on_handshake_complete(&credentials(), Service::RealTime)
            .unwrap();
        assert!(machine.last_failure().is_some());

        machine.on_login(&LoginOutcome::Success {
            token: "tok".to_string(),
        });
        assert!(machine.last_failure().is_none());
        assert!(machine.is_ready());
    }

    #[test]
    fn unsolicited_login_response_is_ignored_while_authenticating() {
        let mut machine = authenticating(policy(true, true));

        let step = machine.on_login(&LoginOutcome::Unsolicited { correlation_id: 99 });
        assert_eq!(step, LoginStep::Ignored);
        assert_eq!(machine.state(), ConnectionState::Authenticating);
        assert!(machine.last_failure().is_none());
    }

    #[test]
    fn login_outside_authenticating_is_ignored() {
        let mut machine = ready(policy(true, true));
        let step = machine.on_login(&LoginOutcome::Success {
            token: "other".to_string(),
        });
        assert_eq!(step, LoginStep::Ignored);
    }

    #[test_case(true, NextStep::Terminate, ConnectionState::Closed; "policy enabled closes for good")]
    #[test_case(false, NextStep::Reconnect(Duration::from_millis(50)), ConnectionState::Reconnecting; "policy disabled reconnects")]
    fn duplicate_login(disable: bool, expected_step: NextStep, expected_state: ConnectionState) {
        let mut machine = ready(policy(true, disable));

        let failure = machine
            .on_logout(&LogoutOutcome::DuplicateLogin {
                reason: "logged in elsewhere".to_string(),
            })
            .unwrap();
        assert_eq!(failure.is_fatal(), disable);
        assert_eq!(machine.reconnect_enabled(), !disable);

        assert_eq!(machine.on_disconnected(), expected_step);
        assert_eq!(machine.state(), expected_state);
        assert!(machine.session().token().is_none());
    }

    #[test]
    fn requested_logout_is_terminal() {
        let mut machine = ready(policy(true, true));
        assert!(machine.on_logout(&LogoutOutcome::Clean { requested: true }).is_none());
        assert_eq!(machine.on_disconnected(), NextStep::Terminate);
        assert_eq!(machine.state(), ConnectionState::Closed);
    }

    #[test]
    fn unsolicited_logout_reconnects() {
        let mut machine = ready(policy(true, true));
        assert!(machine.on_logout(&LogoutOutcome::Clean { requested: false }).is_none());
        assert!(matches!(machine.on_disconnected(), NextStep::Reconnect(_)));
    }

    #[test]
    fn disconnect_clears_token() {
        let mut machine = ready(policy(true, true));
        machine.on_disconnected();
        assert!(!machine.session().is_authenticated());
        assert_eq!(machine.state(), ConnectionState::Reconnecting);
    }

    #[test]
    fn shutdown_is_terminal() {
        let mut machine = ready(policy(true, true));
        machine.shutdown();
        assert_eq!(machine.state(), ConnectionState::Closed);
        assert_eq!(machine.on_disconnected(), NextStep::Terminate);
        assert!(machine.state().is_terminal());
    }

    #[test]
    fn exhausted_backoff_closes() {
        let mut machine = ConnectionStateMachine::new(ConnectionPolicy {
            backoff: ReconnectConfig {
                max_attempts: 1,
                ..ReconnectConfig::fixed(Duration::from_millis(10))
            },
            ..ConnectionPolicy::default()
        });

        machine.begin_connect().unwrap();
        assert!(matches!(
            machine.on_transport_failed(SessionFailure::Transport("x".to_string())),
            NextStep::Reconnect(_)
        ));
        machine.begin_connect().unwrap();
        assert_eq!(
            machine.on_transport_failed(SessionFailure::Transport("x".to_string())),
            NextStep::Terminate
        );
    }
}
