//! Envelope & Message Model
//!
//! The gateway exchanges two envelopes: `GatewayMessage` (inbound) and
//! `GatewayRequest` (outbound). Each wraps exactly one typed payload in a
//! protobuf `oneof`, modelled here as `Option<Data>` so that "exactly one
//! variant" holds by construction and `None` is the Unset kind.

pub mod messages;

use serde::{Deserialize, Serialize};

pub use messages::*;

// =============================================================================
// Inbound Envelope
// =============================================================================

/// Inbound envelope from the gateway.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GatewayMessage {
    /// The single populated payload, `None` when unset or unknown.
    #[prost(
        oneof = "gateway_message::Data",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14"
    )]
    pub data: Option<gateway_message::Data>,
}

/// Nested types for `GatewayMessage`.
pub mod gateway_message {
    use serde::{Deserialize, Serialize};

    use super::MessageKind;

    /// Payload of an inbound envelope.
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum Data {
        /// Result of a login.
        #[prost(message, tag = "1")]
        LoginResponse(super::LoginResponse),
        /// Result of a logout or unsolicited session end.
        #[prost(message, tag = "2")]
        LogoutResponse(super::LogoutResponse),
        /// Result of an instrument request.
        #[prost(message, tag = "3")]
        InstrumentResponse(super::InstrumentResponse),
        /// Result of an instrument cross-reference request.
        #[prost(message, tag = "4")]
        InstrumentReferenceResponse(super::InstrumentReferenceResponse),
        /// Result of a subscription request.
        #[prost(message, tag = "5")]
        SubscriptionResponse(super::SubscriptionResponse),
        /// Market-wide status.
        #[prost(message, tag = "6")]
        MarketStatus(super::MarketStatus),
        /// Gateway liveness.
        #[prost(message, tag = "7")]
        HeartBeat(super::HeartBeat),
        /// Instrument metadata.
        #[prost(message, tag = "8")]
        InstrumentDefinition(super::InstrumentDefinition),
        /// Full instrument state.
        #[prost(message, tag = "9")]
        MarketSnapshot(super::MarketSnapshot),
        /// Incremental instrument change.
        #[prost(message, tag = "10")]
        MarketUpdate(super::MarketUpdate),
        /// Volume-at-price table.
        #[prost(message, tag = "11")]
        VolumeAtPrice(super::VolumeAtPrice),
        /// Bar.
        #[prost(message, tag = "12")]
        Ohlc(super::Ohlc),
        /// Result of an exchange request.
        #[prost(message, tag = "13")]
        ExchangeResponse(super::ExchangeResponse),
        /// Corporate or exchange action.
        #[prost(message, tag = "14")]
        InstrumentAction(super::InstrumentAction),
    }

    impl Data {
        /// Kind tag of this payload.
        #[must_use]
        pub const fn kind(&self) -> MessageKind {
            match self {
                Self::LoginResponse(_) => MessageKind::LoginResponse,
                Self::LogoutResponse(_) => MessageKind::LogoutResponse,
                Self::InstrumentResponse(_) => MessageKind::InstrumentResponse,
                Self::InstrumentReferenceResponse(_) => MessageKind::InstrumentReferenceResponse,
                Self::SubscriptionResponse(_) => MessageKind::SubscriptionResponse,
                Self::MarketStatus(_) => MessageKind::MarketStatus,
                Self::HeartBeat(_) => MessageKind::HeartBeat,
                Self::InstrumentDefinition(_) => MessageKind::InstrumentDefinition,
                Self::MarketSnapshot(_) => MessageKind::MarketSnapshot,
                Self::MarketUpdate(_) => MessageKind::MarketUpdate,
                Self::VolumeAtPrice(_) => MessageKind::VolumeAtPrice,
                Self::Ohlc(_) => MessageKind::Ohlc,
                Self::ExchangeResponse(_) => MessageKind::ExchangeResponse,
                Self::InstrumentAction(_) => MessageKind::InstrumentAction,
            }
        }
    }
}

impl GatewayMessage {
    /// Wrap a payload.
    #[must_use]
    pub const fn new(data: gateway_message::Data) -> Self {
        Self { data: Some(data) }
    }

    /// Kind tag of the payload, `Unset` when empty.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match &self.data {
            Some(data) => data.kind(),
            None => MessageKind::Unset,
        }
    }
}

// =============================================================================
// Outbound Envelope
// =============================================================================

/// Outbound envelope to the gateway.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GatewayRequest {
    /// The single populated payload.
    #[prost(oneof = "gateway_request::Data", tags = "1, 2, 3, 4, 5, 6")]
    pub data: Option<gateway_request::Data>,
}

/// Nested types for `GatewayRequest`.
pub mod gateway_request {
    use serde::{Deserialize, Serialize};

    /// Payload of an outbound envelope.
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum Data {
        /// Login.
        #[prost(message, tag = "1")]
        LoginRequest(super::LoginRequest),
        /// Logout.
        #[prost(message, tag = "2")]
        LogoutRequest(super::LogoutRequest),
        /// Subscribe or unsubscribe.
        #[prost(message, tag = "3")]
        SubscriptionRequest(super::SubscriptionRequest),
        /// Instrument definitions.
        #[prost(message, tag = "4")]
        InstrumentRequest(super::InstrumentRequest),
        /// Instrument cross-references.
        #[prost(message, tag = "5")]
        InstrumentReferenceRequest(super::InstrumentReferenceRequest),
        /// Exchange list.
        #[prost(message, tag = "6")]
        ExchangeRequest(super::ExchangeRequest),
    }

    impl Data {
        /// Short name for logs.
        #[must_use]
        pub const fn name(&self) -> &'static str {
            match self {
                Self::LoginRequest(_) => "login_request",
                Self::LogoutRequest(_) => "logout_request",
                Self::SubscriptionRequest(_) => "subscription_request",
                Self::InstrumentRequest(_) => "instrument_request",
                Self::InstrumentReferenceRequest(_) => "instrument_reference_request",
                Self::ExchangeRequest(_) => "exchange_request",
            }
        }
    }
}

impl GatewayRequest {
    /// Wrap a login request.
    #[must_use]
    pub const fn login(request: LoginRequest) -> Self {
        Self {
            data: Some(gateway_request::Data::LoginRequest(request)),
        }
    }

    /// Wrap a logout request.
    #[must_use]
    pub const fn logout(request: LogoutRequest) -> Self {
        Self {
            data: Some(gateway_request::Data::LogoutRequest(request)),
        }
    }

    /// Wrap a subscription request.
    #[must_use]
    pub const fn subscription(request: SubscriptionRequest) -> Self {
        Self {
            data: Some(gateway_request::Data::SubscriptionRequest(request)),
        }
    }

    /// Wrap an instrument request.
    #[must_use]
    pub const fn instrument(request: InstrumentRequest) -> Self {
        Self {
            data: Some(gateway_request::Data::InstrumentRequest(request)),
        }
    }

    /// Wrap an instrument cross-reference request.
    #[must_use]
    pub const fn instrument_reference(request: InstrumentReferenceRequest) -> Self {
        Self {
            data: Some(gateway_request::Data::InstrumentReferenceRequest(request)),
        }
    }

    /// Wrap an exchange request.
    #[must_use]
    pub const fn exchange(request: ExchangeRequest) -> Self {
        Self {
            data: Some(gateway_request::Data::ExchangeRequest(request)),
        }
    }

    /// Short name of the payload for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match &self.data {
            Some(data) => data.name(),
            None => "unset",
        }
    }
}

// =============================================================================
// Message Kind
// =============================================================================

/// Identifying tag of an inbound envelope payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// `LoginResponse`.
    LoginResponse,
    /// `LogoutResponse`.
    LogoutResponse,
    /// `InstrumentResponse`.
    InstrumentResponse,
    /// `InstrumentReferenceResponse`.
    InstrumentReferenceResponse,
    /// `ExchangeResponse`.
    ExchangeResponse,
    /// `SubscriptionResponse`.
    SubscriptionResponse,
    /// `MarketStatus`.
    MarketStatus,
    /// `HeartBeat`.
    HeartBeat,
    /// `InstrumentDefinition`.
    InstrumentDefinition,
    /// `MarketSnapshot`.
    MarketSnapshot,
    /// `MarketUpdate`.
    MarketUpdate,
    /// `VolumeAtPrice`.
    VolumeAtPrice,
    /// `Ohlc`.
    Ohlc,
    /// `InstrumentAction`.
    InstrumentAction,
    /// No payload, or a payload this client does not know.
    Unset,
}

impl MessageKind {
    /// Every kind, `Unset` last.
    pub const ALL: [Self; 15] = [
        Self::LoginResponse,
        Self::LogoutResponse,
        Self::InstrumentResponse,
        Self::InstrumentReferenceResponse,
        Self::ExchangeResponse,
        Self::SubscriptionResponse,
        Self::MarketStatus,
        Self::HeartBeat,
        Self::InstrumentDefinition,
        Self::MarketSnapshot,
        Self::MarketUpdate,
        Self::VolumeAtPrice,
        Self::Ohlc,
        Self::InstrumentAction,
        Self::Unset,
    ];

    /// Snake-case name, used for metric labels and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoginResponse => "login_response",
            Self::LogoutResponse => "logout_response",
            Self::InstrumentResponse => "instrument_response",
            Self::InstrumentReferenceResponse => "instrument_reference_response",
            Self::ExchangeResponse => "exchange_response",
            Self::SubscriptionResponse => "subscription_response",
            Self::MarketStatus => "market_status",
            Self::HeartBeat => "heart_beat",
            Self::InstrumentDefinition => "instrument_definition",
            Self::MarketSnapshot => "market_snapshot",
            Self::MarketUpdate => "market_update",
            Self::VolumeAtPrice => "volume_at_price",
            Self::Ohlc => "ohlc",
            Self::InstrumentAction => "instrument_action",
            Self::Unset => "unset",
        }
    }

    /// JSON field name of the kind in the `JSON` wire protocol.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::LoginResponse => "loginResponse",
            Self::LogoutResponse => "logoutResponse",
            Self::InstrumentResponse => "instrumentResponse",
            Self::InstrumentReferenceResponse => "instrumentReferenceResponse",
            Self::ExchangeResponse => "exchangeResponse",
            Self::SubscriptionResponse => "subscriptionResponse",
            Self::MarketStatus => "marketStatus",
            Self::HeartBeat => "heartBeat",
            Self::InstrumentDefinition => "instrumentDefinition",
            Self::MarketSnapshot => "marketSnapshot",
            Self::MarketUpdate => "marketUpdate",
            Self::VolumeAtPrice => "volumeAtPrice",
            Self::Ohlc => "ohlc",
            Self::InstrumentAction => "instrumentAction",
            Self::Unset => "",
        }
    }

    /// Look up a kind by its JSON field name.
    ///
    /// Returns `None` for unknown names and for the empty name.
    #[must_use]
    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .filter(|kind| *kind != Self::Unset)
            .find(|kind| kind.field_name() == name)
    }

    /// Whether this kind answers a client request.
    #[must_use]
    pub const fn is_request_response(self) -> bool {
        matches!(
            self,
            Self::LoginResponse
                | Self::LogoutResponse
                | Self::InstrumentResponse
                | Self::InstrumentReferenceResponse
                | Self::ExchangeResponse
                | Self::SubscriptionResponse
        )
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
