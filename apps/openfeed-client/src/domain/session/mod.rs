//! Openfeed Authentication Session
//!
//! Tracks login/logout request-response correlation and owns the session
//! token for one connection.
//!
//! # Authentication Flow
//!
//! 1. WebSocket handshake completes
//! 2. Send `LoginRequest { correlationId, username, password }`
//! 3. Receive `LoginResponse { status, token }`
//! 4. Stamp the token on every subsequent request
//! 5. `LogoutResponse` ends the session; `DUPLICATE_LOGIN` means another
//!    client logged in with the same credentials
//!
//! Only one login may be in flight at a time.

use thiserror::Error;

use crate::domain::envelope::{
    LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, ResultCode, Service, Status,
};

// =============================================================================
// Constants
// =============================================================================

/// Client version reported at login.
pub const CLIENT_VERSION: &str = concat!("openfeed-client-rs/", env!("CARGO_PKG_VERSION"));

/// Openfeed protocol version spoken by this client.
pub const PROTOCOL_VERSION: i32 = 1;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by invalid session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// A login is already awaiting its response.
    #[error("already authenticating: a login request is in flight")]
    AlreadyAuthenticating,

    /// Operation requires a session token.
    #[error("not authenticated: no session token")]
    NotAuthenticated,

    /// Credentials are unusable.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
}

// =============================================================================
// Credentials
// =============================================================================

/// Openfeed account credentials.
///
/// The `Debug` implementation redacts the password for safe logging.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Create new credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if either username or password is empty.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let username = username.into();
        let password = password.into();

        if username.is_empty() {
            return Err(AuthError::InvalidCredentials(
                "username cannot be empty".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials(
                "password cannot be empty".to_string(),
            ));
        }

        Ok(Self { username, password })
    }

    /// Get the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of processing a `LoginResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Login accepted; the token is now held by the session.
    Success {
        /// Session token.
        token: String,
    },
    /// Login rejected.
    Failure {
        /// Result code from the gateway.
        result: ResultCode,
        /// Reason text from the gateway.
        reason: String,
    },
    /// Response to no login in flight. The session is left untouched.
    Unsolicited {
        /// Correlation id the response carried.
        correlation_id: i64,
    },
}

impl LoginOutcome {
    /// Whether the login succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Result of processing a `LogoutResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// Session ended normally.
    Clean {
        /// Whether this client asked for the logout.
        requested: bool,
    },
    /// Session ended because the same identity logged in elsewhere.
    DuplicateLogin {
        /// Reason text from the gateway.
        reason: String,
    },
    /// Logout ended with another non-success result.
    Rejected {
        /// Result code from the gateway.
        result: ResultCode,
        /// Reason text from the gateway.
        reason: String,
    },
}

// =============================================================================
// Auth Session
// =============================================================================

/// Authentication context for one connection.
///
/// # Example
///
/// ```rust
/// use openfeed_client::domain::envelope::{LoginResponse, ResultCode, Service, Status};
/// use openfeed_client::domain::session::{AuthSession, Credentials};
///
/// let credentials = Credentials::new("user", "secret").unwrap();
/// let mut session = AuthSession::new();
///
/// let request = session.begin_login(&credentials, Service::RealTime).unwrap();
/// let response = LoginResponse {
///     correlation_id: request.correlation_id,
///     status: Some(Status::new(ResultCode::Success, "")),
///     token: "token-1".to_string(),
/// };
///
/// assert!(session.on_login_response(&response).is_success());
/// assert_eq!(session.token(), Some("token-1"));
/// ```
#[derive(Debug, Default)]
pub struct AuthSession {
    token: Option<String>,
    login_in_flight: Option<i64>,
    logout_requested: bool,
    service: Option<Service>,
    next_correlation_id: i64,
}

impl AuthSession {
    /// Create a session with no token.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            token: None,
            login_in_flight: None,
            logout_requested: false,
            service: None,
            next_correlation_id: 0,
        }
    }

    /// Build a login request and mark the login in flight.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyAuthenticating` if a login is already outstanding.
    pub fn begin_login(
        &mut self,
        credentials: &Credentials,
        service: Service,
    ) -> Result<LoginRequest, AuthError> {
        if self.login_in_flight.is_some() {
            return Err(AuthError::AlreadyAuthenticating);
        }

        let correlation_id = self.next_correlation();
        self.login_in_flight = Some(correlation_id);
        self.logout_requested = false;
        self.service = Some(service);

        Ok(LoginRequest {
            correlation_id,
            username: credentials.username().to_string(),
            password: credentials.password().to_string(),
            client_version: CLIENT_VERSION.to_string(),
            protocol_version: PROTOCOL_VERSION,
        })
    }

    /// Process a login response.
    ///
    /// Only the response to the login in flight changes the token; any other
    /// is reported as `Unsolicited`.
    pub fn on_login_response(&mut self, response: &LoginResponse) -> LoginOutcome {
        match self.login_in_flight {
            Some(expected) if expected == response.correlation_id => {
                self.login_in_flight = None;
            }
            Some(expected) => {
                tracing::warn!(
                    expected,
                    received = response.correlation_id,
                    "Login response correlation mismatch"
                );
                return LoginOutcome::Unsolicited {
                    correlation_id: response.correlation_id,
                };
            }
            None => {
                tracing::warn!(
                    received = response.correlation_id,
                    "Login response without a login in flight"
                );
                return LoginOutcome::Unsolicited {
                    correlation_id: response.correlation_id,
                };
            }
        }

        match status_parts(response.status.as_ref()) {
            (ResultCode::Success, _) => {
                self.token = Some(response.token.clone());
                LoginOutcome::Success {
                    token: response.token.clone(),
                }
            }
            (result, reason) => {
                self.token = None;
                LoginOutcome::Failure { result, reason }
            }
        }
    }

    /// Build a logout request for the current token.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` if the session holds no token.
    pub fn begin_logout(&mut self) -> Result<LogoutRequest, AuthError> {
        let token = self.token.clone().ok_or(AuthError::NotAuthenticated)?;
        self.logout_requested = true;
        Ok(LogoutRequest {
            correlation_id: self.next_correlation(),
            token,
        })
    }

    /// Process a logout response. The token is cleared in every case.
    pub fn on_logout_response(&mut self, response: &LogoutResponse) -> LogoutOutcome {
        self.token = None;
        let requested = std::mem::take(&mut self.logout_requested);

        match status_parts(response.status.as_ref()) {
            (ResultCode::Success, _) => LogoutOutcome::Clean { requested },
            (ResultCode::DuplicateLogin, reason) => LogoutOutcome::DuplicateLogin { reason },
            (result, reason) => LogoutOutcome::Rejected { result, reason },
        }
    }

    /// Current token, if authenticated.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Whether a token is held.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Whether a login awaits its response.
    #[must_use]
    pub const fn is_authenticating(&self) -> bool {
        self.login_in_flight.is_some()
    }

    /// Service requested at the last login.
    #[must_use]
    pub fn service(&self) -> Service {
        self.service.unwrap_or(Service::RealTime)
    }

    /// Allocate a correlation id for an outbound request.
    pub const fn next_correlation(&mut self) -> i64 {
        self.next_correlation_id += 1;
        self.next_correlation_id
    }

    /// Token in a form safe to log.
    ///
    /// Shows only a short prefix unless `reveal` is set.
    #[must_use]
    pub fn loggable_token(&self, reveal: bool) -> String {
        self.token
            .as_deref()
            .map_or_else(|| "<none>".to_string(), |token| redact_token(token, reveal))
    }

    /// Drop the token and any in-flight correlation state.
    ///
    /// Correlation ids keep increasing across resets.
    pub fn reset(&mut self) {
        self.token = None;
        self.login_in_flight = None;
        self.logout_requested = false;
    }
}

/// Redact a token for logging, keeping a four character prefix.
#[must_use]
pub fn redact_token(token: &str, reveal: bool) -> String {
    if reveal {
        return token.to_string();
    }
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}***")
}

fn status_parts(status: Option<&Status>) -> (ResultCode, String) {
    status.map_or_else(
        || (ResultCode::UnknownResult, "response without status".to_string()),
        |status| (status.result(), status.message.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("user", "secret").unwrap()
    }

    fn login_response(correlation_id: i64, result: ResultCode, token: &str) -> LoginResponse {
        LoginResponse {
            correlation_id,
            status: Some(Status::new(result, "detail")),
            token: token.to_string(),
        }
    }

    fn logout_response(result: ResultCode) -> LogoutResponse {
        LogoutResponse {
            correlation_id: 0,
            status: Some(Status::new(result, "bye")),
        }
    }

    #[test]
    fn credentials_reject_empty_values() {
        assert!(Credentials::new("", "secret").is_err());
        assert!(Credentials::new("user", "").is_err());
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let debug = format!("{:?}", credentials());
        assert!(debug.contains("user"));
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn begin_login_builds_request() {
        let mut session = AuthSession::new();
        let request = session.begin_login(&credentials(), Service::Delayed).unwrap();

        assert_eq!(request.username, "user");
        assert_eq!(request.password, "secret");
        assert_eq!(request.protocol_version, PROTOCOL_VERSION);
        assert!(request.correlation_id > 0);
        assert!(session.is_authenticating());
        assert_eq!(session.service(), Service::Delayed);
    }

    #[test]
    fn second_login_while_in_flight_is_rejected() {
        let mut session = AuthSession::new();
        session.begin_login(&credentials(), Service::RealTime).unwrap();

        let second = session.begin_login(&credentials(), Service::RealTime);
        assert_eq!(second, Err(AuthError::AlreadyAuthenticating));
    }

    #[test]
    fn successful_login_stores_token() {
        let mut session = AuthSession::new();
        let request = session.begin_login(&credentials(), Service::RealTime).unwrap();

        let outcome = session.on_login_response(&login_response(
            request.correlation_id,
            ResultCode::Success,
            "tok-123",
        ));

        assert_eq!(
            outcome,
            LoginOutcome::Success {
                token: "tok-123".to_string()
            }
        );
        assert_eq!(session.token(), Some("tok-123"));
        assert!(!session.is_authenticating());
    }

    #[test]
    fn failed_login_keeps_session_unauthenticated() {
        let mut session = AuthSession::new();
        let request = session.begin_login(&credentials(), Service::RealTime).unwrap();

        let outcome = session.on_login_response(&login_response(
            request.correlation_id,
            ResultCode::InvalidCredentials,
            "",
        ));

        assert_eq!(
            outcome,
            LoginOutcome::Failure {
                result: ResultCode::InvalidCredentials,
                reason: "detail".to_string()
            }
        );
        assert!(!session.is_authenticated());
        assert!(session.begin_login(&credentials(), Service::RealTime).is_ok());
    }

    #[test]
    fn success_without_token_is_accepted() {
        let mut session = AuthSession::new();
        let request = session.begin_login(&credentials(), Service::RealTime).unwrap();

        let response = login_response(request.correlation_id, ResultCode::Success, "");
        let outcome = session.on_login_response(&response);
        assert!(outcome.is_success());
        assert_eq!(session.token(), Some(""));
    }

    #[test]
    fn response_without_login_in_flight_keeps_token() {
        let mut session = AuthSession::new();
        let request = session.begin_login(&credentials(), Service::RealTime).unwrap();
        let response = login_response(request.correlation_id, ResultCode::Success, "tok");
        session.on_login_response(&response);

        let outcome =
            session.on_login_response(&login_response(99, ResultCode::InvalidCredentials, ""));
        assert_eq!(outcome, LoginOutcome::Unsolicited { correlation_id: 99 });
        assert_eq!(session.token(), Some("tok"));
    }

    #[test]
    fn mismatched_correlation_keeps_login_in_flight() {
        let mut session = AuthSession::new();
        let request = session.begin_login(&credentials(), Service::RealTime).unwrap();

        let stray = session.on_login_response(&login_response(
            request.correlation_id + 10,
            ResultCode::Success,
            "stray",
        ));
        assert!(!stray.is_success());
        assert!(session.is_authenticating());
        assert!(session.token().is_none());

        let response = login_response(request.correlation_id, ResultCode::Success, "tok");
        let outcome = session.on_login_response(&response);
        assert!(outcome.is_success());
        assert_eq!(session.token(), Some("tok"));
    }

    #[test]
    fn logout_requires_token() {
        let mut session = AuthSession::new();
        assert_eq!(session.begin_logout(), Err(AuthError::NotAuthenticated));
    }

    #[test]
    fn requested_logout_is_clean() {
        let mut session = AuthSession::new();
        session.begin_login(&credentials(), Service::RealTime).unwrap();
        session.on_login_response(&login_response(1, ResultCode::Success, "tok"));

        let request = session.begin_logout().unwrap();
        assert_eq!(request.token, "tok");

        let outcome = session.on_logout_response(&logout_response(ResultCode::Success));
        assert_eq!(outcome, LogoutOutcome::Clean { requested: true });
        assert!(!session.is_authenticated());
    }

    #[test]
    fn duplicate_login_logout() {
        let mut session = AuthSession::new();
        session.begin_login(&credentials(), Service::RealTime).unwrap();
        session.on_login_response(&login_response(1, ResultCode::Success, "tok"));

        let outcome = session.on_logout_response(&logout_response(ResultCode::DuplicateLogin));
        assert_eq!(
            outcome,
            LogoutOutcome::DuplicateLogin {
                reason: "bye".to_string()
            }
        );
        assert!(session.token().is_none());
    }

    #[test]
    fn unsolicited_clean_logout_is_not_requested() {
        let mut session = AuthSession::new();
        let outcome = session.on_logout_response(&logout_response(ResultCode::Success));
        assert_eq!(outcome, LogoutOutcome::Clean { requested: false });
    }

    #[test]
    fn reset_clears_token_and_flight() {
        let mut session = AuthSession::new();
        session.begin_login(&credentials(), Service::RealTime).unwrap();
        session.reset();

        assert!(!session.is_authenticating());
        assert!(!session.is_authenticated());
        assert!(session.begin_login(&credentials(), Service::RealTime).is_ok());
    }

    #[test]
    fn correlation_ids_increase_across_resets() {
        let mut session = AuthSession::new();
        let first = session.begin_login(&credentials(), Service::RealTime).unwrap();
        session.reset();
        let second = session.begin_login(&credentials(), Service::RealTime).unwrap();
        assert!(second.correlation_id > first.correlation_id);
    }

    #[test]
    fn token_redaction() {
        assert_eq!(redact_token("abcdef123456", false), "abcd***");
        assert_eq!(redact_token("abcdef123456", true), "abcdef123456");

        let session = AuthSession::new();
        assert_eq!(session.loggable_token(false), "<none>");
    }
}
