use std::time::Duration;

use tokio_tungstenite::tungstenite;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint URL could not be parsed.
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The auth token contains bytes that cannot travel in a header.
    #[error("auth token is not a valid header value")]
    InvalidToken,

    /// The handshake failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] tungstenite::Error),

    /// The handshake did not complete in time.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Sending a message failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] tungstenite::Error),

    /// Receiving a message failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] tungstenite::Error),
}
