//! Application Services
//!
//! - `MessageDispatcher`: decodes, logs and routes inbound frames
//! - `WireStats`: per-connection frame and byte counters

mod dispatcher;
mod wire_stats;

pub use dispatcher::{LogPolicy, MessageDispatcher, SessionSignal, invoke_isolated};
pub use wire_stats::{WireSnapshot, WireStats};
