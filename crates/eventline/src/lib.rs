//! # Eventline
//!
//! Resilient client engine for a JSON-over-WebSocket event bridge.
//!
//! The engine keeps one duplex connection alive for you: it reconnects
//! with exponential backoff after failures, answers and monitors
//! heartbeats to detect silently dead connections, decodes inbound
//! frames into typed [`Event`]s and fans them out to subscribers.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use eventline::prelude::*;
//!
//! # async fn run() -> Result<(), eventline::ClientError> {
//! let client = BridgeClient::new(
//!     ConnectionOptions::builder()
//!         .url("ws://localhost:9696")
//!         .build(),
//! );
//!
//! client.on("message", |event: &Event| {
//!     if let Event::Message(msg) = event {
//!         println!("{}: {}", msg.username, msg.message);
//!     }
//! });
//! client.on_state_change(|state| println!("connection state: {state}"));
//!
//! client.connect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layering
//!
//! ```text
//! eventline (this crate)   ← lifecycle, dispatch, liveness, backoff
//!     ↕
//! eventline-session        ← per-handshake identity and version gate
//!     ↕
//! eventline-protocol       ← typed events and the JSON codec
//!     ↕
//! eventline-transport      ← WebSocket dial / send / receive / close
//! ```

mod client;
mod dispatch;
mod error;
mod liveness;
mod options;
mod reconnect;
mod state;

pub use client::BridgeClient;
pub use dispatch::HandlerId;
pub use error::ClientError;
pub use options::{ConnectionOptions, ConnectionOptionsBuilder};
pub use state::ConnectionState;

pub use eventline_protocol::{
    ChatMessage, Established, Event, Generic, Gift, Ping, Pong, ProtocolError, SystemNotice,
    codec,
};
pub use eventline_session::{ClientSession, ServerVersion};
pub use eventline_transport::TransportError;

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use crate::{
        BridgeClient, ClientError, ConnectionOptions, ConnectionState, Event, HandlerId,
    };
}
