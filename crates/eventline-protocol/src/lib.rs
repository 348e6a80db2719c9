//! Wire protocol for the Eventline bridge.
//!
//! This crate defines the "language" the bridge speaks:
//!
//! - **Events** ([`Event`] and its variant payloads) — the tagged JSON
//!   objects that travel on the wire, discriminated by their `type` field.
//! - **Codec** ([`codec::decode`] / [`codec::encode`]) — how payloads are
//!   converted to and from those events, including the lossless fallback
//!   for discriminators this crate does not know about.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! The protocol layer sits between the transport (whole text messages) and
//! the engine (connection lifecycle, dispatch). It knows nothing about
//! sockets or subscribers.

pub mod codec;
mod error;
mod events;

pub use error::ProtocolError;
pub use events::{
    ChatMessage, Established, Event, Generic, Gift, Ping, Pong, SystemNotice,
};
