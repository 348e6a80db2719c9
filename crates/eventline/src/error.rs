//! Unified error type for the Eventline client.

use eventline_protocol::ProtocolError;
use eventline_transport::TransportError;

/// Errors surfaced by [`BridgeClient`](crate::BridgeClient) operations.
///
/// Background tasks (the receive loop, the reconnect and liveness timers)
/// never surface errors through this type — their failures become state
/// transitions and log output. The only transport failure a caller sees
/// is a connect attempt that cannot be retried.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The endpoint URL or auth token is unusable. Surfaced synchronously
    /// at connect time; never retried.
    #[error("invalid configuration: {0}")]
    Config(#[source] TransportError),

    /// A transport-level failure (handshake, send).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An outbound event failed to serialize.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The operation requires a live connection.
    #[error("not connected to the bridge")]
    NotConnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::InvalidToken;
        let client_err: ClientError = err.into();
        assert!(matches!(client_err, ClientError::Transport(_)));
    }

    #[test]
    fn test_config_error_message_names_the_cause() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err = ClientError::Config(TransportError::InvalidUrl(parse_err));
        assert!(err.to_string().contains("invalid configuration"));
    }
}
