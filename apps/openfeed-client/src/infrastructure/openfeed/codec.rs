//! Openfeed Wire Codec
//!
//! Two wire protocols are supported:
//!
//! - **PB**: every binary frame carries one protobuf-encoded envelope
//! - **JSON**: every text frame carries an object with a single key naming
//!   the payload kind in camelCase, e.g. `{"heartBeat": {...}}`
//!
//! Inbound frames are decoded by frame type regardless of the configured
//! protocol; the protocol only selects the outbound encoding. An unknown JSON
//! key decodes to an empty (Unset) envelope, mirroring how protobuf skips
//! unknown fields.

use std::str::FromStr;

use prost::Message;

use crate::application::ports::{CodecError, Frame, WireCodec};
use crate::domain::envelope::{GatewayMessage, GatewayRequest, MessageKind, gateway_message};

/// Outbound wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireProtocol {
    /// Protobuf binary frames.
    #[default]
    Pb,
    /// JSON text frames.
    Json,
}

impl WireProtocol {
    /// Configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pb => "PB",
            Self::Json => "JSON",
        }
    }
}

impl FromStr for WireProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PB" | "PROTOBUF" => Ok(Self::Pb),
            "JSON" => Ok(Self::Json),
            other => Err(format!("unknown wire protocol: {other}")),
        }
    }
}

impl std::fmt::Display for WireProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Codec for Openfeed envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenfeedCodec {
    protocol: WireProtocol,
}

impl OpenfeedCodec {
    /// Create a codec that encodes with `protocol`.
    #[must_use]
    pub const fn new(protocol: WireProtocol) -> Self {
        Self { protocol }
    }

    /// Outbound protocol.
    #[must_use]
    pub const fn protocol(&self) -> WireProtocol {
        self.protocol
    }

    fn decode_json(text: &str) -> Result<GatewayMessage, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let serde_json::Value::Object(object) = value else {
            return Err(CodecError::Envelope("expected a JSON object".to_string()));
        };

        let mut entries = object.into_iter();
        let Some((key, payload)) = entries.next() else {
            return Ok(GatewayMessage::default());
        };
        if entries.next().is_some() {
            return Err(CodecError::Envelope(
                "expected exactly one payload key".to_string(),
            ));
        }

        if MessageKind::from_field_name(&key).is_none() {
            tracing::trace!(key = %key, "Unknown JSON payload kind");
            return Ok(GatewayMessage::default());
        }

        let mut tagged = serde_json::Map::with_capacity(1);
        tagged.insert(key, payload);
        let data: gateway_message::Data =
            serde_json::from_value(serde_json::Value::Object(tagged))?;
        Ok(GatewayMessage::new(data))
    }
}

impl WireCodec for OpenfeedCodec {
    fn decode(&self, frame: &Frame) -> Result<GatewayMessage, CodecError> {
        match frame {
            Frame::Binary(bytes) => Ok(GatewayMessage::decode(bytes.as_slice())?),
            Frame::Text(text) => Self::decode_json(text),
        }
    }

    fn encode(&self, request: &GatewayRequest) -> Result<Frame, CodecError> {
        let data = request.data.as_ref().ok_or(CodecError::EmptyRequest)?;
        match self.protocol {
            WireProtocol::Pb => Ok(Frame::Binary(request.encode_to_vec())),
            WireProtocol::Json => Ok(Frame::Text(serde_json::to_string(data)?)),
        }
    }
}
