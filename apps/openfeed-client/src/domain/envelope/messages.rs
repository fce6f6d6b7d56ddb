//! Openfeed Payload Types
//!
//! Protobuf payloads carried by the gateway envelopes. Field tags follow the
//! Openfeed wire contract; serde derives provide the JSON mapping used by the
//! `JSON` wire protocol and by message logging.

use serde::{Deserialize, Serialize};

// =============================================================================
// Enumerations
// =============================================================================

/// Result code carried in every response `Status`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
)]
#[repr(i32)]
pub enum ResultCode {
    /// Result not set by the gateway.
    UnknownResult = 0,
    /// Request succeeded.
    Success = 1,
    /// Account lacks the entitlement for the request.
    InsufficientPrivileges = 100,
    /// Symbol not recognized.
    InvalidSymbol = 101,
    /// Market id not recognized.
    InvalidMarketId = 102,
    /// Exchange not recognized.
    InvalidExchange = 103,
    /// Channel id not recognized.
    InvalidChannelId = 104,
    /// Request could not be parsed.
    MalformedMessage = 105,
    /// Request not valid in the current session state.
    UnexpectedMessage = 106,
    /// Unsubscribe for a subscription that does not exist.
    NotSubscribed = 107,
    /// Subscription already active.
    DuplicateSubscription = 108,
    /// Username or password rejected.
    InvalidCredentials = 109,
    /// Login temporarily suspended.
    LoginSuspended = 110,
    /// Token unknown or expired.
    InvalidToken = 111,
    /// The same identity logged in on another session.
    DuplicateLogin = 112,
    /// Gateway internal failure.
    SystemError = 500,
}

impl ResultCode {
    /// Protobuf name of the value.
    #[must_use]
    pub const fn as_str_name(&self) -> &'static str {
        match self {
            Self::UnknownResult => "UNKNOWN_RESULT",
            Self::Success => "SUCCESS",
            Self::InsufficientPrivileges => "INSUFFICIENT_PRIVILEGES",
            Self::InvalidSymbol => "INVALID_SYMBOL",
            Self::InvalidMarketId => "INVALID_MARKET_ID",
            Self::InvalidExchange => "INVALID_EXCHANGE",
            Self::InvalidChannelId => "INVALID_CHANNEL_ID",
            Self::MalformedMessage => "MALFORMED_MESSAGE",
            Self::UnexpectedMessage => "UNEXPECTED_MESSAGE",
            Self::NotSubscribed => "NOT_SUBSCRIBED",
            Self::DuplicateSubscription => "DUPLICATE_SUBSCRIPTION",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::LoginSuspended => "LOGIN_SUSPENDED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::DuplicateLogin => "DUPLICATE_LOGIN",
            Self::SystemError => "SYSTEM_ERROR",
        }
    }
}

/// Data service level requested at login and on subscriptions.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
)]
#[repr(i32)]
pub enum Service {
    /// Not specified.
    UnknownService = 0,
    /// Real-time streaming data.
    RealTime = 1,
    /// Delayed streaming data.
    Delayed = 2,
    /// Real-time periodic snapshots.
    RealTimeSnapshot = 3,
    /// Delayed periodic snapshots.
    DelayedSnapshot = 4,
    /// End-of-day data.
    EndOfDay = 5,
}

impl Service {
    /// Protobuf name of the value.
    #[must_use]
    pub const fn as_str_name(&self) -> &'static str {
        match self {
            Self::UnknownService => "UNKNOWN_SERVICE",
            Self::RealTime => "REAL_TIME",
            Self::Delayed => "DELAYED",
            Self::RealTimeSnapshot => "REAL_TIME_SNAPSHOT",
            Self::DelayedSnapshot => "DELAYED_SNAPSHOT",
            Self::EndOfDay => "END_OF_DAY",
        }
    }

    /// Parse from the protobuf name, case-insensitively.
    #[must_use]
    pub fn from_str_name(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "UNKNOWN_SERVICE" => Some(Self::UnknownService),
            "REAL_TIME" => Some(Self::RealTime),
            "DELAYED" => Some(Self::Delayed),
            "REAL_TIME_SNAPSHOT" => Some(Self::RealTimeSnapshot),
            "DELAYED_SNAPSHOT" => Some(Self::DelayedSnapshot),
            "END_OF_DAY" => Some(Self::EndOfDay),
            _ => None,
        }
    }
}

/// Kind of market data stream requested by a subscription.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
)]
#[repr(i32)]
pub enum SubscriptionType {
    /// Every stream the entitlement allows.
    All = 0,
    /// Top of book (best bid/offer).
    Quote = 1,
    /// Per-participant quotes.
    QuoteParticipant = 2,
    /// Price-aggregated depth.
    DepthPrice = 3,
    /// Order-level depth.
    DepthOrder = 4,
    /// Trades, corrections and cancels.
    Trades = 5,
    /// Cumulative volume at price.
    CumulativeVolume = 6,
    /// Bars for the regular session.
    Ohlc = 7,
    /// Bars including extended hours.
    OhlcNonRegular = 8,
    /// Settlement prices.
    Settlement = 9,
}

impl SubscriptionType {
    /// Protobuf name of the value.
    #[must_use]
    pub const fn as_str_name(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Quote => "QUOTE",
            Self::QuoteParticipant => "QUOTE_PARTICIPANT",
            Self::DepthPrice => "DEPTH_PRICE",
            Self::DepthOrder => "DEPTH_ORDER",
            Self::Trades => "TRADES",
            Self::CumulativeVolume => "CUMULATIVE_VOLUME",
            Self::Ohlc => "OHLC",
            Self::OhlcNonRegular => "OHLC_NON_REGULAR",
            Self::Settlement => "SETTLEMENT",
        }
    }

    /// Parse from the protobuf name, case-insensitively.
    ///
    /// `BBO` is accepted as an alias of `QUOTE`.
    #[must_use]
    pub fn from_str_name(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "ALL" => Some(Self::All),
            "QUOTE" | "BBO" => Some(Self::Quote),
            "QUOTE_PARTICIPANT" => Some(Self::QuoteParticipant),
            "DEPTH_PRICE" => Some(Self::DepthPrice),
            "DEPTH_ORDER" => Some(Self::DepthOrder),
            "TRADES" | "TRADE" => Some(Self::Trades),
            "CUMULATIVE_VOLUME" => Some(Self::CumulativeVolume),
            "OHLC" => Some(Self::Ohlc),
            "OHLC_NON_REGULAR" => Some(Self::OhlcNonRegular),
            "SETTLEMENT" => Some(Self::Settlement),
            _ => None,
        }
    }
}

/// Side of a book entry.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
)]
#[repr(i32)]
pub enum BookSide {
    /// Side not set.
    UnknownBookSide = 0,
    /// Bid side.
    Bid = 1,
    /// Offer side.
    Offer = 2,
}

// =============================================================================
// Common
// =============================================================================

/// Outcome of a request, present on every response.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Status {
    /// `ResultCode` value.
    #[prost(enumeration = "ResultCode", tag = "1")]
    pub result: i32,
    /// Human readable detail.
    #[prost(string, tag = "2")]
    pub message: String,
    /// Service granted, when relevant.
    #[prost(enumeration = "Service", tag = "3")]
    pub service: i32,
}

impl Status {
    /// Build a status with the given result and message.
    #[must_use]
    pub fn new(result: ResultCode, message: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            message: message.into(),
            service: Service::UnknownService.into(),
        }
    }

    /// Whether the result is `SUCCESS`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result() == ResultCode::Success
    }
}

/// Target of a subscription or instrument request.
///
/// Doubles as the domain identity of a subscription target.
#[derive(
    Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Oneof, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionTarget {
    /// Exchange symbol, e.g. `AAPL`.
    #[prost(string, tag = "5")]
    Symbol(String),
    /// Openfeed market id.
    #[prost(sint64, tag = "6")]
    MarketId(i64),
    /// Every instrument of an exchange.
    #[prost(string, tag = "7")]
    Exchange(String),
    /// Every instrument of a channel.
    #[prost(sint32, tag = "8")]
    ChannelId(i32),
}

impl std::fmt::Display for SubscriptionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Symbol(symbol) => write!(f, "symbol:{symbol}"),
            Self::MarketId(id) => write!(f, "marketId:{id}"),
            Self::Exchange(code) => write!(f, "exchange:{code}"),
            Self::ChannelId(id) => write!(f, "channel:{id}"),
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Login with username and password.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    /// Client-chosen id echoed in the response.
    #[prost(sint64, tag = "1")]
    pub correlation_id: i64,
    /// Account username.
    #[prost(string, tag = "2")]
    pub username: String,
    /// Account password.
    #[prost(string, tag = "3")]
    pub password: String,
    /// Client software version.
    #[prost(string, tag = "4")]
    pub client_version: String,
    /// Openfeed protocol version.
    #[prost(sint32, tag = "5")]
    pub protocol_version: i32,
}

/// End the authenticated session.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogoutRequest {
    /// Client-chosen id echoed in the response.
    #[prost(sint64, tag = "1")]
    pub correlation_id: i64,
    /// Session token.
    #[prost(string, tag = "2")]
    pub token: String,
}

/// Subscribe to (or unsubscribe from) a stream of market data.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionRequest {
    /// Client-chosen id echoed in the response.
    #[prost(sint64, tag = "1")]
    pub correlation_id: i64,
    /// Session token.
    #[prost(string, tag = "2")]
    pub token: String,
    /// Requested service level.
    #[prost(enumeration = "Service", tag = "3")]
    pub service: i32,
    /// Remove instead of add.
    #[prost(bool, tag = "4")]
    pub unsubscribe: bool,
    /// What to subscribe to.
    #[prost(oneof = "SubscriptionTarget", tags = "5, 6, 7, 8")]
    pub target: Option<SubscriptionTarget>,
    /// `SubscriptionType` values.
    #[prost(enumeration = "SubscriptionType", repeated, tag = "10")]
    pub subscription_type: Vec<i32>,
    /// Snapshot interval, 0 for none.
    #[prost(sint32, tag = "11")]
    pub snapshot_interval_seconds: i32,
}

/// Request instrument definitions.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentRequest {
    /// Client-chosen id echoed in the response.
    #[prost(sint64, tag = "1")]
    pub correlation_id: i64,
    /// Session token.
    #[prost(string, tag = "2")]
    pub token: String,
    /// Instruments to describe.
    #[prost(oneof = "SubscriptionTarget", tags = "5, 6, 7, 8")]
    pub target: Option<SubscriptionTarget>,
}

/// Request symbol cross-references for instruments.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentReferenceRequest {
    /// Client-chosen id echoed in the response.
    #[prost(sint64, tag = "1")]
    pub correlation_id: i64,
    /// Session token.
    #[prost(string, tag = "2")]
    pub token: String,
    /// Instruments to cross-reference.
    #[prost(oneof = "SubscriptionTarget", tags = "5, 6, 7, 8")]
    pub target: Option<SubscriptionTarget>,
}

/// Request the list of available exchanges.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExchangeRequest {
    /// Client-chosen id echoed in the response.
    #[prost(sint64, tag = "1")]
    pub correlation_id: i64,
    /// Session token.
    #[prost(string, tag = "2")]
    pub token: String,
}

// =============================================================================
// Responses
// =============================================================================

/// Result of a login.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginResponse {
    /// Echo of the request correlation id.
    #[prost(sint64, tag = "1")]
    pub correlation_id: i64,
    /// Outcome.
    #[prost(message, optional, tag = "2")]
    pub status: Option<Status>,
    /// Session token on success.
    #[prost(string, tag = "3")]
    pub token: String,
}

/// Result of a logout, or an unsolicited session end.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogoutResponse {
    /// Echo of the request correlation id.
    #[prost(sint64, tag = "1")]
    pub correlation_id: i64,
    /// Outcome. `DUPLICATE_LOGIN` when another session took over.
    #[prost(message, optional, tag = "2")]
    pub status: Option<Status>,
}

/// Result of a subscription request.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionResponse {
    /// Echo of the request correlation id.
    #[prost(sint64, tag = "1")]
    pub correlation_id: i64,
    /// Outcome.
    #[prost(message, optional, tag = "2")]
    pub status: Option<Status>,
    /// Set when acknowledging an unsubscribe.
    #[prost(bool, tag = "4")]
    pub unsubscribe: bool,
    /// Target the response refers to.
    #[prost(oneof = "SubscriptionTarget", tags = "5, 6, 7, 8")]
    pub target: Option<SubscriptionTarget>,
}

/// Result of an instrument request.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentResponse {
    /// Echo of the request correlation id.
    #[prost(sint64, tag = "1")]
    pub correlation_id: i64,
    /// Outcome.
    #[prost(message, optional, tag = "2")]
    pub status: Option<Status>,
    /// Requested symbol.
    #[prost(string, tag = "3")]
    pub symbol: String,
    /// Requested market id.
    #[prost(sint64, tag = "4")]
    pub market_id: i64,
    /// Number of definitions that follow.
    #[prost(sint32, tag = "5")]
    pub number_of_definitions: i32,
}

/// Result of an instrument cross-reference request.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentReferenceResponse {
    /// Echo of the request correlation id.
    #[prost(sint64, tag = "1")]
    pub correlation_id: i64,
    /// Outcome.
    #[prost(message, optional, tag = "2")]
    pub status: Option<Status>,
    /// Requested symbol.
    #[prost(string, tag = "3")]
    pub symbol: String,
    /// Resolved market id.
    #[prost(sint64, tag = "4")]
    pub market_id: i64,
    /// Barchart DDF symbol.
    #[prost(string, tag = "5")]
    pub ddf_symbol: String,
    /// Exchange code.
    #[prost(string, tag = "6")]
    pub exchange: String,
}

/// An exchange known to the gateway.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Exchange {
    /// Exchange code.
    #[prost(string, tag = "1")]
    pub code: String,
    /// Exchange description.
    #[prost(string, tag = "2")]
    pub description: String,
}

/// Result of an exchange request.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExchangeResponse {
    /// Echo of the request correlation id.
    #[prost(sint64, tag = "1")]
    pub correlation_id: i64,
    /// Outcome.
    #[prost(message, optional, tag = "2")]
    pub status: Option<Status>,
    /// Available exchanges.
    #[prost(message, repeated, tag = "3")]
    pub exchanges: Vec<Exchange>,
}

// =============================================================================
// Streaming Data
// =============================================================================

/// Market-wide status change.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketStatus {
    /// Nanoseconds since the epoch.
    #[prost(sint64, tag = "1")]
    pub transaction_time: i64,
    /// Raw market-wide status value.
    #[prost(sint32, tag = "2")]
    pub market_wide_status: i32,
}

/// Periodic liveness message from the gateway.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeartBeat {
    /// Nanoseconds since the epoch.
    #[prost(sint64, tag = "1")]
    pub transaction_time: i64,
    /// Exchange heartbeat rather than gateway heartbeat.
    #[prost(bool, tag = "3")]
    pub exchange: bool,
    /// Channel the heartbeat belongs to.
    #[prost(sint32, tag = "4")]
    pub channel: i32,
}

/// Static description of an instrument.
#[derive(Clone, PartialEq, Eq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentDefinition {
    /// Openfeed market id.
    #[prost(sint64, tag = "1")]
    pub market_id: i64,
    /// Exchange symbol.
    #[prost(string, tag = "2")]
    pub symbol: String,
    /// Description.
    #[prost(string, tag = "3")]
    pub description: String,
    /// Exchange code.
    #[prost(string, tag = "4")]
    pub exchange_code: String,
    /// Currency code.
    #[prost(string, tag = "6")]
    pub currency: String,
    /// Divisor applied to integer prices.
    #[prost(sint32, tag = "7")]
    pub price_denominator: i32,
    /// Channel carrying the instrument.
    #[prost(sint32, tag = "8")]
    pub channel: i32,
}

/// Top of book.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BestBidOffer {
    /// Bid price (scaled by the price denominator).
    #[prost(sint64, tag = "1")]
    pub bid_price: i64,
    /// Bid quantity.
    #[prost(sint64, tag = "2")]
    pub bid_quantity: i64,
    /// Offer price (scaled by the price denominator).
    #[prost(sint64, tag = "3")]
    pub offer_price: i64,
    /// Offer quantity.
    #[prost(sint64, tag = "4")]
    pub offer_quantity: i64,
    /// Nanoseconds since the epoch.
    #[prost(sint64, tag = "5")]
    pub transaction_time: i64,
}

/// Price-aggregated book level change.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DepthPriceLevel {
    /// `BookSide` value.
    #[prost(enumeration = "BookSide", tag = "1")]
    pub side: i32,
    /// Level index, 1 is top of book.
    #[prost(sint32, tag = "2")]
    pub level: i32,
    /// Level price.
    #[prost(sint64, tag = "3")]
    pub price: i64,
    /// Level quantity.
    #[prost(sint64, tag = "4")]
    pub quantity: i64,
}

/// Order-level book change.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DepthOrder {
    /// Exchange order id.
    #[prost(sint64, tag = "1")]
    pub order_id: i64,
    /// `BookSide` value.
    #[prost(enumeration = "BookSide", tag = "2")]
    pub side: i32,
    /// Order price.
    #[prost(sint64, tag = "3")]
    pub price: i64,
    /// Order quantity.
    #[prost(sint64, tag = "4")]
    pub quantity: i64,
}

/// A trade print.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Trade {
    /// Exchange trade id.
    #[prost(string, tag = "1")]
    pub trade_id: String,
    /// Trade price.
    #[prost(sint64, tag = "2")]
    pub price: i64,
    /// Trade quantity.
    #[prost(sint64, tag = "3")]
    pub quantity: i64,
    /// Nanoseconds since the epoch.
    #[prost(sint64, tag = "4")]
    pub transaction_time: i64,
}

/// Correction of an earlier trade.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradeCorrection {
    /// Trade being corrected.
    #[prost(string, tag = "1")]
    pub trade_id: String,
    /// Corrected price.
    #[prost(sint64, tag = "2")]
    pub price: i64,
    /// Corrected quantity.
    #[prost(sint64, tag = "3")]
    pub quantity: i64,
}

/// Cancellation of an earlier trade.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradeCancel {
    /// Trade being cancelled.
    #[prost(string, tag = "1")]
    pub trade_id: String,
}

/// One entry of a `Trades` batch.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradeEntry {
    /// Entry payload.
    #[prost(oneof = "trade_entry::Data", tags = "1, 2, 3")]
    pub data: Option<trade_entry::Data>,
}

/// Nested types for `TradeEntry`.
pub mod trade_entry {
    use serde::{Deserialize, Serialize};

    /// Payload of a trade entry.
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum Data {
        /// New trade.
        #[prost(message, tag = "1")]
        Trade(super::Trade),
        /// Correction of an earlier trade.
        #[prost(message, tag = "2")]
        TradeCorrection(super::TradeCorrection),
        /// Cancellation of an earlier trade.
        #[prost(message, tag = "3")]
        TradeCancel(super::TradeCancel),
    }
}

/// Batch of trade events.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Trades {
    /// Trade events in exchange order.
    #[prost(message, repeated, tag = "1")]
    pub entries: Vec<TradeEntry>,
}

/// Full state of an instrument.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketSnapshot {
    /// Openfeed market id.
    #[prost(sint64, tag = "1")]
    pub market_id: i64,
    /// Nanoseconds since the epoch.
    #[prost(sint64, tag = "2")]
    pub transaction_time: i64,
    /// Sequence number within the market.
    #[prost(sint64, tag = "3")]
    pub market_sequence: i64,
    /// Exchange symbol, when the gateway includes it.
    #[prost(string, tag = "4")]
    pub symbol: String,
    /// Top of book.
    #[prost(message, optional, tag = "10")]
    pub bbo: Option<BestBidOffer>,
    /// Last trade.
    #[prost(message, optional, tag = "11")]
    pub last_trade: Option<Trade>,
}

/// Incremental change to an instrument.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketUpdate {
    /// Openfeed market id.
    #[prost(sint64, tag = "1")]
    pub market_id: i64,
    /// Exchange symbol, when the gateway includes it.
    #[prost(string, tag = "2")]
    pub symbol: String,
    /// Nanoseconds since the epoch.
    #[prost(sint64, tag = "3")]
    pub transaction_time: i64,
    /// Sequence number within the market.
    #[prost(sint64, tag = "4")]
    pub market_sequence: i64,
    /// Update payload.
    #[prost(oneof = "market_update::Data", tags = "23, 24, 25, 27")]
    pub data: Option<market_update::Data>,
}

/// Nested types for `MarketUpdate`.
pub mod market_update {
    use serde::{Deserialize, Serialize};

    /// Payload of a market update.
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum Data {
        /// Top of book change.
        #[prost(message, tag = "23")]
        Bbo(super::BestBidOffer),
        /// Price level change.
        #[prost(message, tag = "24")]
        DepthPriceLevel(super::DepthPriceLevel),
        /// Order change.
        #[prost(message, tag = "25")]
        DepthOrder(super::DepthOrder),
        /// Trade events.
        #[prost(message, tag = "27")]
        Trades(super::Trades),
    }
}

/// Volume traded at a price.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceVolume {
    /// Price.
    #[prost(sint64, tag = "1")]
    pub price: i64,
    /// Volume.
    #[prost(sint64, tag = "2")]
    pub volume: i64,
}

/// Cumulative volume-at-price table for an instrument.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeAtPrice {
    /// Openfeed market id.
    #[prost(sint64, tag = "1")]
    pub market_id: i64,
    /// Exchange symbol.
    #[prost(string, tag = "2")]
    pub symbol: String,
    /// Volume per price.
    #[prost(message, repeated, tag = "3")]
    pub price_volumes: Vec<PriceVolume>,
}

/// Open/high/low/close bar.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ohlc {
    /// Openfeed market id.
    #[prost(sint64, tag = "1")]
    pub market_id: i64,
    /// Exchange symbol.
    #[prost(string, tag = "2")]
    pub symbol: String,
    /// Open price.
    #[prost(sint64, tag = "3")]
    pub open: i64,
    /// High price.
    #[prost(sint64, tag = "4")]
    pub high: i64,
    /// Low price.
    #[prost(sint64, tag = "5")]
    pub low: i64,
    /// Close price.
    #[prost(sint64, tag = "6")]
    pub close: i64,
    /// Volume traded in the bar.
    #[prost(sint64, tag = "7")]
    pub volume: i64,
    /// Bar start, nanoseconds since the epoch.
    #[prost(sint64, tag = "8")]
    pub start_time: i64,
    /// Bar end, nanoseconds since the epoch.
    #[prost(sint64, tag = "9")]
    pub end_time: i64,
}

/// Corporate or exchange action affecting an instrument.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentAction {
    /// Nanoseconds since the epoch.
    #[prost(sint64, tag = "1")]
    pub transaction_time: i64,
    /// Description of the action.
    #[prost(string, tag = "2")]
    pub message: String,
    /// Definition after the action.
    #[prost(message, optional, tag = "3")]
    pub instrument: Option<InstrumentDefinition>,
}
