//! Transport layer for the Eventline client.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract the
//! duplex socket the engine runs over, plus the WebSocket implementation
//! via `tokio-tungstenite`.
//!
//! The engine dials through a [`Connector`] (one fresh [`Connection`] per
//! attempt) and then exchanges whole logical text messages — the transport
//! is responsible for frame reassembly, so a message has no fixed size.

#![allow(async_fn_in_trait)]

mod error;
mod websocket;

pub use error::TransportError;
pub use websocket::{ROLE_SUBPROTOCOL, WsConnection, WsConnector};

/// Dials the bridge endpoint, producing one fresh connection per attempt.
///
/// A connector is cheap to keep around for the lifetime of a client; the
/// reconnection path calls [`Connector::connect`] again for every attempt.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Performs the transport handshake against the configured endpoint.
    async fn connect(&self) -> Result<Self::Connection, TransportError>;
}

/// A single duplex connection carrying logical text messages.
pub trait Connection: Send + Sync + 'static {
    /// Sends one logical text message to the remote peer.
    async fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Receives the next logical text message from the remote peer.
    ///
    /// Returns `Ok(None)` when the peer closes the connection (close frame
    /// or clean end of stream). Transport-level control frames are consumed
    /// internally and never surface here.
    async fn recv(&self) -> Result<Option<String>, TransportError>;

    /// Closes the connection, performing the close handshake if possible.
    async fn close(&self) -> Result<(), TransportError>;
}
