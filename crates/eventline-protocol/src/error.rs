//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding bridge payloads.
///
/// A decode error refers to a single payload; the engine logs it and drops
/// that message rather than tearing the connection down.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The payload is not valid JSON at all.
    #[error("payload is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// The payload parsed, but is not a JSON object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// The payload named a known discriminator but its fields did not
    /// match that variant's shape.
    #[error("decode failed for {event_type:?}: {source}")]
    Decode {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing an event failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}
