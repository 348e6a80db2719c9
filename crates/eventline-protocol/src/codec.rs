//! JSON codec for bridge payloads.
//!
//! Decoding dispatches on the `type` discriminator: known values map to
//! their [`Event`] variant, unknown values fall back to [`Event::Generic`]
//! with every other field captured verbatim. A payload with a missing or
//! empty discriminator decodes to `None` and is silently dropped by the
//! caller — that is protocol behavior, not an error.
//!
//! Encoding writes the discriminator plus the variant's declared fields,
//! omitting absent optionals rather than emitting `null`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ProtocolError;
use crate::events::{Event, Generic};

/// Decodes one wire payload into an [`Event`].
///
/// Returns `Ok(None)` when the payload carries no usable `type` field.
///
/// # Errors
///
/// [`ProtocolError::Parse`] if the payload is not JSON,
/// [`ProtocolError::NotAnObject`] if it is not an object, and
/// [`ProtocolError::Decode`] if a known discriminator's fields do not
/// match the expected shape.
pub fn decode(payload: &str) -> Result<Option<Event>, ProtocolError> {
    let value: Value = serde_json::from_str(payload).map_err(ProtocolError::Parse)?;
    let Value::Object(mut fields) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    let event_type = match fields.get("type").and_then(Value::as_str) {
        Some(t) if !t.is_empty() => t.to_owned(),
        _ => return Ok(None),
    };

    let event = match event_type.as_str() {
        "established" => Event::Established(from_fields(&event_type, fields)?),
        "ping" => Event::Ping(from_fields(&event_type, fields)?),
        "pong" => Event::Pong(from_fields(&event_type, fields)?),
        "message" => Event::Message(from_fields(&event_type, fields)?),
        "system" => Event::System(from_fields(&event_type, fields)?),
        "gift" => Event::Gift(from_fields(&event_type, fields)?),
        _ => {
            // The discriminator lives in `Generic::event_type`, not in the
            // flattened remainder.
            fields.remove("type");
            let mut generic: Generic = from_fields(&event_type, fields)?;
            generic.event_type = event_type;
            Event::Generic(generic)
        }
    };

    Ok(Some(event))
}

/// Encodes an [`Event`] into its wire payload.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode(event: &Event) -> Result<String, ProtocolError> {
    let value = match event {
        Event::Established(e) => to_tagged(event.event_type(), e),
        Event::Ping(e) => to_tagged(event.event_type(), e),
        Event::Pong(e) => to_tagged(event.event_type(), e),
        Event::Message(e) => to_tagged(event.event_type(), e),
        Event::System(e) => to_tagged(event.event_type(), e),
        Event::Gift(e) => to_tagged(event.event_type(), e),
        Event::Generic(e) => to_tagged(&e.event_type, e),
    }?;

    serde_json::to_string(&value).map_err(ProtocolError::Encode)
}

fn from_fields<T: serde::de::DeserializeOwned>(
    event_type: &str,
    fields: Map<String, Value>,
) -> Result<T, ProtocolError> {
    serde_json::from_value(Value::Object(fields)).map_err(|source| ProtocolError::Decode {
        event_type: event_type.to_owned(),
        source,
    })
}

fn to_tagged<T: Serialize>(event_type: &str, payload: &T) -> Result<Value, ProtocolError> {
    let value = serde_json::to_value(payload).map_err(ProtocolError::Encode)?;
    let Value::Object(mut fields) = value else {
        // Every payload struct serializes to an object.
        return Err(ProtocolError::NotAnObject);
    };
    fields.insert("type".to_owned(), Value::String(event_type.to_owned()));
    Ok(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChatMessage, Ping, Pong};

    #[test]
    fn test_decode_established() {
        let payload = r#"{
            "type": "established",
            "clientId": "c-123",
            "version": "4.1.0",
            "message": "welcome",
            "timestamp": 1700000000000
        }"#;
        let event = decode(payload).unwrap().expect("event");

        let Event::Established(e) = event else {
            panic!("expected established, got {event:?}");
        };
        assert_eq!(e.client_id, "c-123");
        assert_eq!(e.version, "4.1.0");
        assert_eq!(e.message, "welcome");
        assert_eq!(e.timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn test_decode_ping_with_timestamp() {
        let event = decode(r#"{"type":"ping","timestamp":42}"#)
            .unwrap()
            .expect("event");
        assert_eq!(event, Event::Ping(Ping { timestamp: Some(42) }));
    }

    #[test]
    fn test_decode_chat_message() {
        let payload = r#"{
            "type": "message",
            "id": "m-1",
            "origin": 2,
            "originIdx": 0,
            "uid": 99,
            "username": "alice",
            "message": "hello chat",
            "timestampNormalized": 1700000000001,
            "read": false
        }"#;
        let event = decode(payload).unwrap().expect("event");

        let Event::Message(m) = event else {
            panic!("expected message, got {event:?}");
        };
        assert_eq!(m.username, "alice");
        assert_eq!(m.message, "hello chat");
        assert_eq!(m.timestamp_normalized, 1_700_000_000_001);
        assert_eq!(m.timestamp, None);
    }

    #[test]
    fn test_decode_gift() {
        let payload = r#"{
            "type": "gift",
            "id": "g-1",
            "origin": 1,
            "originIdx": 3,
            "uid": 7,
            "username": "bob",
            "giftName": "rocket",
            "giftCount": 5,
            "timestampNormalized": 1700000000002,
            "read": true
        }"#;
        let event = decode(payload).unwrap().expect("event");

        let Event::Gift(g) = event else {
            panic!("expected gift, got {event:?}");
        };
        assert_eq!(g.gift_name, "rocket");
        assert_eq!(g.gift_count, 5);
    }

    #[test]
    fn test_decode_missing_type_is_dropped() {
        let result = decode(r#"{"message":"no discriminator"}"#).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_empty_type_is_dropped() {
        let result = decode(r#"{"type":"","message":"x"}"#).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_non_string_type_is_dropped() {
        let result = decode(r#"{"type":7}"#).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_garbage_is_an_error() {
        let result = decode("not json at all");
        assert!(matches!(result, Err(ProtocolError::Parse(_))));
    }

    #[test]
    fn test_decode_non_object_is_an_error() {
        let result = decode("[1,2,3]");
        assert!(matches!(result, Err(ProtocolError::NotAnObject)));
    }

    #[test]
    fn test_decode_known_type_with_wrong_shape_is_an_error() {
        // `uid` must be a number.
        let payload = r#"{
            "type": "message",
            "id": "m-1",
            "origin": 2,
            "originIdx": 0,
            "uid": "not-a-number",
            "username": "alice",
            "message": "hello",
            "timestampNormalized": 0,
            "read": false
        }"#;
        let result = decode(payload);
        assert!(matches!(
            result,
            Err(ProtocolError::Decode { ref event_type, .. }) if event_type == "message"
        ));
    }

    #[test]
    fn test_unknown_type_decodes_to_generic() {
        let payload = r#"{
            "type": "superchat",
            "amount": 500,
            "currency": "JPY",
            "timestamp": 1700000000003
        }"#;
        let event = decode(payload).unwrap().expect("event");

        let Event::Generic(g) = &event else {
            panic!("expected generic, got {event:?}");
        };
        assert_eq!(g.event_type, "superchat");
        assert_eq!(g.timestamp, Some(1_700_000_000_003));
        assert_eq!(g.extra["amount"], 500);
        assert_eq!(g.extra["currency"], "JPY");
        assert!(g.extra.get("type").is_none());
    }

    #[test]
    fn test_generic_round_trip_is_lossless() {
        let payload = r#"{
            "type": "superchat",
            "amount": 500,
            "nested": {"a": [1, 2, 3]},
            "timestamp": 9
        }"#;
        let event = decode(payload).unwrap().expect("event");
        let encoded = encode(&event).unwrap();

        let original: Value = serde_json::from_str(payload).unwrap();
        let round_tripped: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(original, round_tripped);
    }

    #[test]
    fn test_encode_pong_includes_responding_to() {
        let event = Event::Pong(Pong {
            responding_to: Some(42),
            timestamp: Some(43),
        });
        let json: Value = serde_json::from_str(&encode(&event).unwrap()).unwrap();

        assert_eq!(json["type"], "pong");
        assert_eq!(json["respondingTo"], 42);
        assert_eq!(json["timestamp"], 43);
    }

    #[test]
    fn test_encode_omits_absent_optionals() {
        let event = Event::Pong(Pong {
            responding_to: None,
            timestamp: None,
        });
        let json: Value = serde_json::from_str(&encode(&event).unwrap()).unwrap();

        assert_eq!(json["type"], "pong");
        assert!(json.get("respondingTo").is_none());
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn test_encode_decode_round_trip_for_known_variants() {
        let event = Event::Message(ChatMessage {
            id: "m-9".into(),
            origin: 1,
            origin_idx: 2,
            uid: 1234,
            username: "carol".into(),
            message: "round trip".into(),
            timestamp_normalized: 77,
            read: true,
            timestamp: Some(78),
        });

        let encoded = encode(&event).unwrap();
        let decoded = decode(&encoded).unwrap().expect("event");
        assert_eq!(event, decoded);
    }
}
