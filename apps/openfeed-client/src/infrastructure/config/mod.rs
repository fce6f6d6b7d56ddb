//! Configuration Module
//!
//! Configuration loading for the Openfeed client.

mod settings;

pub use settings::{
    ClientSettings, ConfigError, DEFAULT_HOST, DEFAULT_PATH, DEFAULT_PORT, HeartbeatSettings,
    ReconnectSettings, RequestSettings, SubscriptionSettings,
};
