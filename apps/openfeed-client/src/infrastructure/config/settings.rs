//! Client Configuration Settings
//!
//! Configuration types for the Openfeed client, loaded from `OPENFEED_*`
//! environment variables. Numeric and boolean values fall back to their
//! default when unparseable; credentials are required and names (wire
//! protocol, service, subscription types) must be recognised.

use std::collections::HashSet;
use std::time::Duration;

use crate::application::ports::Endpoint;
use crate::application::services::LogPolicy;
use crate::domain::connection::{ConnectionPolicy, ReconnectConfig};
use crate::domain::envelope::{Service, SubscriptionTarget, SubscriptionType};
use crate::domain::session::Credentials;
use crate::domain::subscription::SubscriptionRequest;
use crate::infrastructure::openfeed::{
    ClientConfig, ConnectionSettings, LivenessConfig, ReferenceRequests, WireProtocol,
};

/// Default gateway host.
pub const DEFAULT_HOST: &str = "openfeed.aws.barchart.com";

/// Default gateway port.
pub const DEFAULT_PORT: u16 = 80;

/// Default WebSocket path.
pub const DEFAULT_PATH: &str = "/ws";

/// Reconnection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectSettings {
    /// Reconnect after a disconnect.
    pub enabled: bool,
    /// Initial reconnection delay.
    pub delay_initial: Duration,
    /// Maximum reconnection delay.
    pub delay_max: Duration,
    /// Delay multiplier (1.0 keeps the delay fixed).
    pub delay_multiplier: f64,
    /// Jitter fraction applied to every delay.
    pub jitter: f64,
    /// Maximum consecutive attempts (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_initial: Duration::from_secs(2),
            delay_max: Duration::from_secs(60),
            delay_multiplier: 1.0,
            jitter: 0.0,
            max_attempts: 0, // Unlimited
        }
    }
}

/// Subscriptions registered at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSettings {
    /// Symbols.
    pub symbols: Vec<String>,
    /// Market ids.
    pub market_ids: Vec<i64>,
    /// Exchange codes.
    pub exchanges: Vec<String>,
    /// Channel ids.
    pub channel_ids: Vec<i32>,
    /// Stream kinds requested for every target.
    pub types: Vec<SubscriptionType>,
    /// Snapshot interval in seconds.
    pub snapshot_interval_secs: i32,
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            market_ids: Vec::new(),
            exchanges: Vec::new(),
            channel_ids: Vec::new(),
            types: vec![SubscriptionType::Quote],
            snapshot_interval_secs: 0,
        }
    }
}

impl SubscriptionSettings {
    /// One request per configured target.
    #[must_use]
    pub fn requests(&self) -> Vec<SubscriptionRequest> {
        let targets = self
            .symbols
            .iter()
            .cloned()
            .map(SubscriptionTarget::Symbol)
            .chain(self.market_ids.iter().copied().map(SubscriptionTarget::MarketId))
            .chain(self.exchanges.iter().cloned().map(SubscriptionTarget::Exchange))
            .chain(self.channel_ids.iter().copied().map(SubscriptionTarget::ChannelId));

        targets
            .map(|target| {
                SubscriptionRequest::new(target, self.types.iter().copied())
                    .with_snapshot_interval(self.snapshot_interval_secs)
            })
            .collect()
    }
}

/// Reference data requested after each login.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RequestSettings {
    /// Instrument definitions per symbol and market id.
    pub instrument: bool,
    /// Instrument cross-references per symbol and market id.
    pub instrument_cross_reference: bool,
    /// Exchange list.
    pub exchange: bool,
}

/// Heartbeat liveness settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatSettings {
    /// Expected heartbeat interval (zero disables liveness).
    pub interval: Duration,
    /// Missed intervals tolerated before disconnecting.
    pub timeout_multiple: u32,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout_multiple: 3,
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Identifier used in logs.
    pub client_id: String,
    /// Gateway address.
    pub endpoint: Endpoint,
    /// Outbound wire encoding.
    pub protocol: WireProtocol,
    /// Account credentials.
    pub credentials: Credentials,
    /// Requested service level.
    pub service: Service,
    /// Reconnection settings.
    pub reconnect: ReconnectSettings,
    /// Startup subscriptions.
    pub subscriptions: SubscriptionSettings,
    /// Reference requests at login.
    pub requests: RequestSettings,
    /// Message logging.
    pub logging: LogPolicy,
    /// Parallel connections.
    pub number_of_connections: usize,
    /// One subscription manager for all connections.
    pub share_subscriptions: bool,
    /// Wire stats interval (`None` = disabled).
    pub stats_interval: Option<Duration>,
    /// Treat duplicate login as fatal.
    pub disable_on_duplicate_login: bool,
    /// Heartbeat liveness.
    pub heartbeat: HeartbeatSettings,
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
}

impl ClientSettings {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or empty, or a named
    /// value is not recognised.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let username = env.required("OPENFEED_USERNAME")?;
        let password = env.required("OPENFEED_PASSWORD")?;
        let credentials = Credentials::new(username, password).map_err(|e| {
            ConfigError::InvalidValue {
                key: "OPENFEED_USERNAME".to_string(),
                value: e.to_string(),
            }
        })?;

        let client_id = env
            .string("OPENFEED_CLIENT_ID")
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let endpoint = Endpoint::new(
            env.string("OPENFEED_HOST")
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            env.parse("OPENFEED_PORT", DEFAULT_PORT),
            env.string("OPENFEED_PATH")
                .unwrap_or_else(|| DEFAULT_PATH.to_string()),
        );

        let protocol = match env.string("OPENFEED_WIRE_PROTOCOL") {
            Some(value) => value.parse::<WireProtocol>().map_err(|_| {
                ConfigError::invalid("OPENFEED_WIRE_PROTOCOL", &value)
            })?,
            None => WireProtocol::default(),
        };

        let service = match env.string("OPENFEED_SERVICE") {
            Some(value) => Service::from_str_name(&value)
                .filter(|service| *service != Service::UnknownService)
                .ok_or_else(|| ConfigError::invalid("OPENFEED_SERVICE", &value))?,
            None => Service::RealTime,
        };

        let defaults = ReconnectSettings::default();
        let reconnect = ReconnectSettings {
            enabled: env.flag("OPENFEED_RECONNECT", defaults.enabled),
            delay_initial: env
                .duration_secs("OPENFEED_RECONNECT_DELAY_SECS", defaults.delay_initial),
            delay_max: env.duration_secs("OPENFEED_RECONNECT_DELAY_MAX_SECS", defaults.delay_max),
            delay_multiplier: env.float(
                "OPENFEED_RECONNECT_DELAY_MULTIPLIER",
                defaults.delay_multiplier,
                |v| v > 0.0,
            )?,
            jitter: env.float("OPENFEED_RECONNECT_JITTER", defaults.jitter, |v| {
                (0.0..=1.0).contains(&v)
            })?,
            max_attempts: env.parse("OPENFEED_MAX_RECONNECT_ATTEMPTS", defaults.max_attempts),
        };

        let subscriptions = SubscriptionSettings {
            symbols: env.list("OPENFEED_SYMBOLS"),
            market_ids: env.numbers("OPENFEED_MARKET_IDS")?,
            exchanges: env.list("OPENFEED_EXCHANGES"),
            channel_ids: env.numbers("OPENFEED_CHANNEL_IDS")?,
            types: env.subscription_types("OPENFEED_SUBSCRIPTION_TYPES")?,
            snapshot_interval_secs: env.parse("OPENFEED_SNAPSHOT_INTERVAL_SECS", 0),
        };

        let requests = RequestSettings {
            instrument: env.flag("OPENFEED_INSTRUMENT_REQUEST", false),
            instrument_cross_reference: env
                .flag("OPENFEED_INSTRUMENT_CROSS_REFERENCE_REQUEST", false),
            exchange: env.flag("OPENFEED_EXCHANGE_REQUEST", false),
        };

        let log_defaults = LogPolicy::default();
        let logging = LogPolicy {
            log_all: env.flag("OPENFEED_LOG_ALL", log_defaults.log_all),
            request_response: env
                .flag("OPENFEED_LOG_REQUEST_RESPONSE", log_defaults.request_response),
            heartbeat: env.flag("OPENFEED_LOG_HEARTBEAT", log_defaults.heartbeat),
            instrument: env.flag("OPENFEED_LOG_INSTRUMENT", log_defaults.instrument),
            snapshot: env.flag("OPENFEED_LOG_SNAPSHOT", log_defaults.snapshot),
            update: env.flag("OPENFEED_LOG_UPDATE", log_defaults.update),
            bbo: env.flag("OPENFEED_LOG_BBO", log_defaults.bbo),
            trade: env.flag("OPENFEED_LOG_TRADE", log_defaults.trade),
            depth: env.flag("OPENFEED_LOG_DEPTH", log_defaults.depth),
            trade_cancel: env.flag("OPENFEED_LOG_TRADE_CANCEL", log_defaults.trade_cancel),
            trade_correction: env
                .flag("OPENFEED_LOG_TRADE_CORRECTION", log_defaults.trade_correction),
            ohlc: env.flag("OPENFEED_LOG_OHLC", log_defaults.ohlc),
            pretty_print: env.flag("OPENFEED_LOG_PRETTY_PRINT", log_defaults.pretty_print),
            log_tokens: env.flag("OPENFEED_LOG_TOKENS", log_defaults.log_tokens),
            symbols: env.list("OPENFEED_LOG_SYMBOLS").into_iter().collect::<HashSet<_>>(),
        };

        let stats_interval = Some(env.duration_secs("OPENFEED_STATS_INTERVAL_SECS", Duration::ZERO))
            .filter(|interval| !interval.is_zero());

        let heartbeat_defaults = HeartbeatSettings::default();
        let heartbeat = HeartbeatSettings {
            interval: env
                .duration_secs("OPENFEED_HEARTBEAT_INTERVAL_SECS", heartbeat_defaults.interval),
            timeout_multiple: env.parse(
                "OPENFEED_HEARTBEAT_TIMEOUT_MULTIPLE",
                heartbeat_defaults.timeout_multiple,
            ),
        };

        Ok(Self {
            client_id,
            endpoint,
            protocol,
            credentials,
            service,
            reconnect,
            subscriptions,
            requests,
            logging,
            number_of_connections: env.parse("OPENFEED_NUMBER_OF_CONNECTIONS", 1_usize).max(1),
            share_subscriptions: env.flag("OPENFEED_SHARE_SUBSCRIPTIONS", false),
            stats_interval,
            disable_on_duplicate_login: env
                .flag("OPENFEED_DISABLE_CLIENT_ON_DUPLICATE_LOGIN", true),
            heartbeat,
            metrics_port: env.parse("OPENFEED_METRICS_PORT", 0),
        })
    }

    /// Reconnect and duplicate-login policy.
    #[must_use]
    pub fn connection_policy(&self) -> ConnectionPolicy {
        ConnectionPolicy {
            reconnect: self.reconnect.enabled,
            backoff: ReconnectConfig {
                initial_delay: self.reconnect.delay_initial,
                max_delay: self.reconnect.delay_max,
                multiplier: self.reconnect.delay_multiplier,
                jitter_factor: self.reconnect.jitter,
                max_attempts: self.reconnect.max_attempts,
            },
            disable_on_duplicate_login: self.disable_on_duplicate_login,
        }
    }

    /// Heartbeat liveness configuration.
    #[must_use]
    pub const fn liveness(&self) -> LivenessConfig {
        LivenessConfig::new(self.heartbeat.interval, self.heartbeat.timeout_multiple)
    }

    /// Reference requests sent at each login.
    #[must_use]
    pub fn reference_requests(&self) -> ReferenceRequests {
        ReferenceRequests {
            instrument: self.requests.instrument,
            instrument_reference: self.requests.instrument_cross_reference,
            exchange: self.requests.exchange,
            symbols: self.subscriptions.symbols.clone(),
            market_ids: self.subscriptions.market_ids.clone(),
        }
    }

    /// Settings shared by every connection.
    #[must_use]
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            endpoint: self.endpoint.clone(),
            credentials: self.credentials.clone(),
            service: self.service,
            policy: self.connection_policy(),
            liveness: self.liveness(),
            stats_interval: self.stats_interval,
            references: self.reference_requests(),
            log_tokens: self.logging.log_tokens,
        }
    }

    /// Build the client configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            client_id: self.client_id.clone(),
            connection: self.connection_settings(),
            protocol: self.protocol,
            log_policy: self.logging.clone(),
            number_of_connections: self.number_of_connections,
            share_subscriptions: self.share_subscriptions,
            subscriptions: self.subscriptions.requests(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable holds an unrecognised value.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: &str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        let value = (self.0)(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyValue(key.to_string()));
        }
        Ok(value)
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.string(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Unparseable values fall back to `default`; non-finite values and
    /// values failing `valid` are errors.
    fn float(
        &self,
        key: &str,
        default: f64,
        valid: impl Fn(f64) -> bool,
    ) -> Result<f64, ConfigError> {
        let Some(raw) = self.string(key) else {
            return Ok(default);
        };
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && valid(value) => Ok(value),
            Ok(_) => Err(ConfigError::invalid(key, &raw)),
            Err(_) => Ok(default),
        }
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.string(key).map(|v| v.to_ascii_lowercase()).as_deref() {
            Some("true" | "1" | "yes" | "on") => true,
            Some("false" | "0" | "no" | "off") => false,
            _ => default,
        }
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Duration {
        self.string(key)
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.string(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn numbers<T: std::str::FromStr>(&self, key: &str) -> Result<Vec<T>, ConfigError> {
        self.list(key)
            .into_iter()
            .map(|item| item.parse().map_err(|_| ConfigError::invalid(key, &item)))
            .collect()
    }

    fn subscription_types(&self, key: &str) -> Result<Vec<SubscriptionType>, ConfigError> {
        let names = self.list(key);
        if names.is_empty() {
            return Ok(SubscriptionSettings::default().types);
        }
        names
            .iter()
            .map(|name| {
                SubscriptionType::from_str_name(name).ok_or_else(|| ConfigError::invalid(key, name))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const CREDENTIALS: [(&str, &str); 2] = [
        ("OPENFEED_USERNAME", "user"),
        ("OPENFEED_PASSWORD", "secret"),
    ];

    #[test]
    fn defaults_with_only_credentials() {
        let settings = ClientSettings::from_lookup(lookup(&CREDENTIALS)).unwrap();

        assert_eq!(settings.endpoint, Endpoint::new(DEFAULT_HOST, DEFAULT_PORT, DEFAULT_PATH));
        assert_eq!(settings.protocol, WireProtocol::Pb);
        assert_eq!(settings.service, Service::RealTime);
        assert_eq!(settings.reconnect, ReconnectSettings::default());
        assert_eq!(settings.subscriptions.types, vec![SubscriptionType::Quote]);
        assert!(settings.subscriptions.requests().is_empty());
        assert_eq!(settings.logging, LogPolicy::default());
        assert_eq!(settings.number_of_connections, 1);
        assert!(!settings.share_subscriptions);
        assert_eq!(settings.stats_interval, None);
        assert!(settings.disable_on_duplicate_login);
        assert_eq!(settings.liveness(), LivenessConfig::default());
        assert_eq!(settings.metrics_port, 0);
        assert!(uuid::Uuid::parse_str(&settings.client_id).is_ok());
    }

    #[test]
    fn missing_credentials() {
        let err =
            ClientSettings::from_lookup(lookup(&[("OPENFEED_USERNAME", "user")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "OPENFEED_PASSWORD"));

        let err = ClientSettings::from_lookup(lookup(&[
            ("OPENFEED_USERNAME", ""),
            ("OPENFEED_PASSWORD", "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(key) if key == "OPENFEED_USERNAME"));
    }

    #[test]
    fn subscriptions_from_lists() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("OPENFEED_SYMBOLS", "AAPL, MSFT,"),
            ("OPENFEED_MARKET_IDS", "42"),
            ("OPENFEED_EXCHANGES", "NYSE"),
            ("OPENFEED_SUBSCRIPTION_TYPES", "bbo,TRADES"),
            ("OPENFEED_SNAPSHOT_INTERVAL_SECS", "5"),
        ]);
        let settings = ClientSettings::from_lookup(lookup(&vars)).unwrap();

        let requests = settings.subscriptions.requests();
        let targets: Vec<String> = requests.iter().map(|r| r.target.to_string()).collect();
        assert_eq!(
            targets,
            vec!["symbol:AAPL", "symbol:MSFT", "marketId:42", "exchange:NYSE"]
        );
        assert!(requests.iter().all(|r| r.types.len() == 2
            && r.types.contains(&SubscriptionType::Quote)
            && r.snapshot_interval_seconds == 5));

        let references = settings.reference_requests();
        assert_eq!(references.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(references.market_ids, vec![42]);
    }

    #[test]
    fn unrecognised_names_are_errors() {
        for (key, value) in [
            ("OPENFEED_WIRE_PROTOCOL", "xml"),
            ("OPENFEED_SERVICE", "SOMETIMES"),
            ("OPENFEED_SUBSCRIPTION_TYPES", "QUOTE,GOSSIP"),
            ("OPENFEED_MARKET_IDS", "12,abc"),
        ] {
            let mut vars = CREDENTIALS.to_vec();
            vars.push((key, value));
            let err = ClientSettings::from_lookup(lookup(&vars)).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidValue { key: k, .. } if k == key),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn out_of_range_backoff_factors_are_errors() {
        for (key, value) in [
            ("OPENFEED_RECONNECT_JITTER", "NaN"),
            ("OPENFEED_RECONNECT_JITTER", "inf"),
            ("OPENFEED_RECONNECT_JITTER", "1.5"),
            ("OPENFEED_RECONNECT_JITTER", "-0.1"),
            ("OPENFEED_RECONNECT_DELAY_MULTIPLIER", "NaN"),
            ("OPENFEED_RECONNECT_DELAY_MULTIPLIER", "infinity"),
            ("OPENFEED_RECONNECT_DELAY_MULTIPLIER", "0"),
        ] {
            let mut vars = CREDENTIALS.to_vec();
            vars.push((key, value));
            let err = ClientSettings::from_lookup(lookup(&vars)).unwrap_err();
            assert!(
                matches!(
                    &err,
                    ConfigError::InvalidValue { key: k, value: v } if k == key && v == value
                ),
                "{key}={value}: {err}"
            );
        }
    }

    #[test]
    fn backoff_factors_in_range_are_accepted() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("OPENFEED_RECONNECT_JITTER", "0.25"),
            ("OPENFEED_RECONNECT_DELAY_MULTIPLIER", "2"),
        ]);
        let settings = ClientSettings::from_lookup(lookup(&vars)).unwrap();
        assert!((settings.reconnect.jitter - 0.25).abs() < f64::EPSILON);
        assert!((settings.reconnect.delay_multiplier - 2.0).abs() < f64::EPSILON);

        let mut vars = CREDENTIALS.to_vec();
        vars.push(("OPENFEED_RECONNECT_JITTER", "lots"));
        let settings = ClientSettings::from_lookup(lookup(&vars)).unwrap();
        assert!(settings.reconnect.jitter.abs() < f64::EPSILON);
    }

    #[test]
    fn unparseable_numbers_fall_back() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("OPENFEED_PORT", "eighty"),
            ("OPENFEED_RECONNECT", "maybe"),
            ("OPENFEED_NUMBER_OF_CONNECTIONS", "0"),
            ("OPENFEED_HEARTBEAT_INTERVAL_SECS", "-1"),
        ]);
        let settings = ClientSettings::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(settings.endpoint.port, DEFAULT_PORT);
        assert!(settings.reconnect.enabled);
        assert_eq!(settings.number_of_connections, 1);
        assert_eq!(settings.heartbeat.interval, Duration::from_secs(10));
    }

    #[test]
    fn logging_and_connection_policy() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("OPENFEED_LOG_BBO", "true"),
            ("OPENFEED_LOG_REQUEST_RESPONSE", "false"),
            ("OPENFEED_LOG_SYMBOLS", "AAPL"),
            ("OPENFEED_DISABLE_CLIENT_ON_DUPLICATE_LOGIN", "false"),
            ("OPENFEED_RECONNECT_DELAY_SECS", "5"),
            ("OPENFEED_MAX_RECONNECT_ATTEMPTS", "3"),
            ("OPENFEED_STATS_INTERVAL_SECS", "30"),
            ("OPENFEED_WIRE_PROTOCOL", "json"),
            ("OPENFEED_SERVICE", "delayed"),
        ]);
        let settings = ClientSettings::from_lookup(lookup(&vars)).unwrap();

        assert!(settings.logging.bbo);
        assert!(!settings.logging.request_response);
        assert!(settings.logging.symbols.contains("AAPL"));
        assert_eq!(settings.protocol, WireProtocol::Json);
        assert_eq!(settings.service, Service::Delayed);
        assert_eq!(settings.stats_interval, Some(Duration::from_secs(30)));

        let policy = settings.connection_policy();
        assert!(!policy.disable_on_duplicate_login);
        assert_eq!(policy.backoff.initial_delay, Duration::from_secs(5));
        assert_eq!(policy.backoff.max_attempts, 3);
    }

    #[test]
    fn credentials_are_redacted() {
        let settings = ClientSettings::from_lookup(lookup(&CREDENTIALS)).unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
