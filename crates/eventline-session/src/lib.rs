//! Per-handshake session state for the Eventline client.
//!
//! A [`ClientSession`] exists only between a successful handshake (the
//! bridge's `established` greeting) and the next disconnect, and carries:
//!
//! 1. **Identity** — the client id the bridge assigned.
//! 2. **Capabilities** — the negotiated server version, which gates
//!    heartbeat liveness monitoring ([`ServerVersion`]).
//! 3. **Liveness bookkeeping** — the last heartbeat instant.
//!
//! The engine above owns the session and clears it on every disconnect;
//! nothing here outlives one connection epoch.

mod session;
mod version;

pub use session::ClientSession;
pub use version::ServerVersion;
