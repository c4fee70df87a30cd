//! WebSocket signaling envelope and payload DTOs.
//!
//! Every frame is one JSON object:
//!
//! ```json
//! {"type": "offer", "room_id": "r1", "user_id": "u2", "data": {...}, "error": "..."}
//! ```
//!
//! Decoding happens in two steps: the envelope is read first, then `data` is
//! checked against the payload shape of its `type`. Relayed payloads are kept
//! as raw JSON and forwarded byte for byte.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;

use crate::domain::{Frame, Identity, RoomId, UserId};

/// Message type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    JoinRoom,
    UserJoined,
    UserLeft,
    Offer,
    Answer,
    IceCandidate,
    Error,
}

impl MessageType {
    /// Wire name of the message type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JoinRoom => "join-room",
            Self::UserJoined => "user-joined",
            Self::UserLeft => "user-left",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
            Self::Error => "error",
        }
    }

    /// Parse a wire name; `None` for anything unrecognised
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "join-room" => Some(Self::JoinRoom),
            "user-joined" => Some(Self::UserJoined),
            "user-left" => Some(Self::UserLeft),
            "offer" => Some(Self::Offer),
            "answer" => Some(Self::Answer),
            "ice-candidate" => Some(Self::IceCandidate),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Envelope as received from a client.
///
/// `type` stays a plain string so unknown kinds can be reported by name.
#[derive(Debug, Deserialize)]
pub struct InboundEnvelope {
    pub r#type: String,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}

/// Envelope as sent by the hub
#[derive(Debug, Serialize)]
pub struct OutboundEnvelope<'a> {
    pub r#type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

/// `join-room` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomData {
    #[serde(default)]
    pub room_id: String,
    pub user_id: String,
    #[serde(default)]
    pub name: String,
}

/// `user-joined` / `user-left` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipData {
    pub user_id: String,
    pub name: String,
}

/// `offer` / `answer` payload
#[derive(Debug, Clone, Deserialize)]
pub struct SessionDescriptionData {
    #[serde(default)]
    pub sdp: String,
    #[serde(default, rename = "type", alias = "sdp-type")]
    pub sdp_type: String,
    pub target: String,
}

/// `ice-candidate` payload
#[derive(Debug, Clone, Deserialize)]
pub struct IceCandidateData {
    #[serde(default)]
    pub candidate: String,
    #[serde(default, rename = "sdpMid", alias = "sdp-mid")]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex", alias = "sdp-mline-index")]
    pub sdp_mline_index: Option<u32>,
    pub target: String,
}

/// A negotiation message to relay to one peer
#[derive(Debug)]
pub struct RelaySignal {
    pub kind: MessageType,
    pub target: String,
    /// Original payload, untouched
    pub data: Box<RawValue>,
}

/// A decoded client message
#[derive(Debug)]
pub enum SignalCommand {
    JoinRoom(JoinRoomData),
    Relay(RelaySignal),
    /// A recognised type that clients must not send (hub-only kinds)
    Unsupported(MessageType),
    /// A type the hub does not know
    Unknown(String),
}

/// Decoding failures. All of them are recoverable: the frame is skipped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    #[error("missing data for {}", .0.as_str())]
    MissingPayload(MessageType),

    #[error("invalid {} data: {source}", .kind.as_str())]
    InvalidPayload {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Message type the failure relates to, when the envelope was readable
    pub fn kind(&self) -> Option<MessageType> {
        match self {
            Self::InvalidEnvelope(_) => None,
            Self::MissingPayload(kind) | Self::InvalidPayload { kind, .. } => Some(*kind),
        }
    }
}

/// Decode one text frame.
pub fn decode(text: &str) -> Result<SignalCommand, DecodeError> {
    let envelope: InboundEnvelope =
        serde_json::from_str(text).map_err(DecodeError::InvalidEnvelope)?;

    let Some(kind) = MessageType::from_wire(&envelope.r#type) else {
        return Ok(SignalCommand::Unknown(envelope.r#type));
    };

    match kind {
        MessageType::JoinRoom => {
            let data = envelope.data.ok_or(DecodeError::MissingPayload(kind))?;
            let join = parse_payload::<JoinRoomData>(kind, &data)?;
            Ok(SignalCommand::JoinRoom(join))
        }
        MessageType::Offer | MessageType::Answer => {
            let data = envelope.data.ok_or(DecodeError::MissingPayload(kind))?;
            let target = parse_payload::<SessionDescriptionData>(kind, &data)?.target;
            Ok(SignalCommand::Relay(RelaySignal { kind, target, data }))
        }
        MessageType::IceCandidate => {
            let data = envelope.data.ok_or(DecodeError::MissingPayload(kind))?;
            let target = parse_payload::<IceCandidateData>(kind, &data)?.target;
            Ok(SignalCommand::Relay(RelaySignal { kind, target, data }))
        }
        MessageType::UserJoined | MessageType::UserLeft | MessageType::Error => {
            Ok(SignalCommand::Unsupported(kind))
        }
    }
}

fn parse_payload<'a, T: Deserialize<'a>>(
    kind: MessageType,
    data: &'a RawValue,
) -> Result<T, DecodeError> {
    serde_json::from_str(data.get()).map_err(|source| DecodeError::InvalidPayload { kind, source })
}

/// Encode a `user-joined` / `user-left` notification.
pub fn encode_membership(
    kind: MessageType,
    room_id: &RoomId,
    identity: &Identity,
) -> Result<Frame, serde_json::Error> {
    let data = serde_json::value::to_raw_value(&MembershipData {
        user_id: identity.user_id.as_str().to_string(),
        name: identity.name.as_str().to_string(),
    })?;
    encode(&OutboundEnvelope {
        r#type: kind,
        room_id: Some(room_id.as_str()),
        user_id: Some(identity.user_id.as_str()),
        data: Some(&*data),
        error: None,
    })
}

/// Encode a relayed negotiation message, stamped with the sender's identity.
pub fn encode_relay(
    kind: MessageType,
    room_id: &RoomId,
    sender: &UserId,
    data: &RawValue,
) -> Result<Frame, serde_json::Error> {
    encode(&OutboundEnvelope {
        r#type: kind,
        room_id: Some(room_id.as_str()),
        user_id: Some(sender.as_str()),
        data: Some(data),
        error: None,
    })
}

/// Encode an `error` reply.
pub fn encode_error(message: &str) -> Result<Frame, serde_json::Error> {
    encode(&OutboundEnvelope {
        r#type: MessageType::Error,
        room_id: None,
        user_id: None,
        data: None,
        error: Some(message),
    })
}

fn encode(envelope: &OutboundEnvelope<'_>) -> Result<Frame, serde_json::Error> {
    serde_json::to_string(envelope).map(Arc::from)
}
