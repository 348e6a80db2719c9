//! The per-connection session record.

use std::time::{Duration, Instant};

use crate::ServerVersion;

/// State derived from a successful handshake.
///
/// Created when the bridge's `established` greeting arrives and dropped on
/// every disconnect — the engine never carries a session across connection
/// epochs.
#[derive(Debug, Clone)]
pub struct ClientSession {
    client_id: String,
    raw_version: String,
    version: Option<ServerVersion>,
    last_heartbeat: Instant,
}

impl ClientSession {
    /// Builds a session from the `established` greeting's fields.
    ///
    /// The heartbeat clock starts now, so a server that never pings is
    /// measured from the moment the session began.
    pub fn new(client_id: impl Into<String>, version: impl Into<String>) -> Self {
        let raw_version = version.into();
        let version = ServerVersion::parse(&raw_version);
        Self {
            client_id: client_id.into(),
            raw_version,
            version,
            last_heartbeat: Instant::now(),
        }
    }

    /// The identifier the bridge assigned to this client.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The version string exactly as the bridge reported it.
    pub fn raw_version(&self) -> &str {
        &self.raw_version
    }

    /// The parsed server version, if it was a well-formed triple.
    pub fn version(&self) -> Option<ServerVersion> {
        self.version
    }

    /// Whether this session's server emits heartbeat pings. Unparseable
    /// versions count as unsupported.
    pub fn supports_heartbeat(&self) -> bool {
        self.version
            .is_some_and(|v| v.supports_heartbeat())
    }

    /// Records that a heartbeat arrived just now.
    pub fn record_heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    /// Time since the last heartbeat (or since the session began, when no
    /// heartbeat has arrived yet).
    pub fn heartbeat_elapsed(&self) -> Duration {
        self.last_heartbeat.elapsed()
    }
}
