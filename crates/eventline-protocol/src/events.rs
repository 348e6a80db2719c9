//! Event types carried by the bridge protocol.
//!
//! Every wire payload is a JSON object tagged by a `type` field; each known
//! discriminator maps to one variant of [`Event`]. Field names on the wire
//! are camelCase, so every payload struct carries
//! `#[serde(rename_all = "camelCase")]`.
//!
//! Events are immutable once constructed: the engine decodes them, then
//! hands shared references to subscribers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A decoded bridge event.
///
/// The enum is closed over the discriminators the bridge documents;
/// anything else decodes into [`Event::Generic`], which preserves the
/// observed discriminator and all other fields verbatim so unknown events
/// can be forwarded losslessly.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Greeting sent by the bridge once the connection is accepted.
    Established(Established),
    /// Server heartbeat. Consumed by the engine, never dispatched.
    Ping(Ping),
    /// Heartbeat reply, client to server.
    Pong(Pong),
    /// A chat message relayed from the platform.
    Message(ChatMessage),
    /// A platform system notice. Same shape as a chat message.
    System(SystemNotice),
    /// A gift sent by a viewer.
    Gift(Gift),
    /// Any event with a discriminator this crate does not know.
    Generic(Generic),
}

impl Event {
    /// The wire discriminator for this event.
    pub fn event_type(&self) -> &str {
        match self {
            Event::Established(_) => "established",
            Event::Ping(_) => "ping",
            Event::Pong(_) => "pong",
            Event::Message(_) => "message",
            Event::System(_) => "system",
            Event::Gift(_) => "gift",
            Event::Generic(g) => &g.event_type,
        }
    }

    /// The event's own timestamp in milliseconds since the epoch, when the
    /// bridge supplied one.
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Event::Established(e) => e.timestamp,
            Event::Ping(e) => e.timestamp,
            Event::Pong(e) => e.timestamp,
            Event::Message(e) => e.timestamp,
            Event::System(e) => e.timestamp,
            Event::Gift(e) => e.timestamp,
            Event::Generic(e) => e.timestamp,
        }
    }
}

/// Payload of the `established` greeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Established {
    /// Identifier the bridge assigned to this client.
    pub client_id: String,
    /// Bridge server version, a `major.minor.patch` string.
    pub version: String,
    /// Human-readable welcome line.
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Payload of a server `ping`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Payload of a client `pong` reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pong {
    /// The `timestamp` of the ping this pong answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responding_to: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Payload of a relayed chat `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    /// Numeric code of the originating platform.
    pub origin: i32,
    pub origin_idx: i32,
    /// Platform user id of the sender.
    pub uid: i64,
    pub username: String,
    /// The message text.
    pub message: String,
    /// Event time normalized to milliseconds since the epoch.
    pub timestamp_normalized: i64,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Payload of a platform `system` notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemNotice {
    pub id: String,
    pub origin: i32,
    pub origin_idx: i32,
    pub uid: i64,
    pub username: String,
    pub message: String,
    pub timestamp_normalized: i64,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Payload of a viewer `gift`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gift {
    pub id: String,
    pub origin: i32,
    pub origin_idx: i32,
    pub uid: i64,
    pub username: String,
    pub gift_name: String,
    pub gift_count: i32,
    pub timestamp_normalized: i64,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// An event with an unrecognized discriminator.
///
/// `extra` captures every field other than `type` and `timestamp`
/// verbatim, so re-encoding a generic event reproduces the original
/// payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generic {
    /// The discriminator observed on the wire.
    #[serde(skip)]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
