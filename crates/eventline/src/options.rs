//! Client configuration.

use std::time::Duration;

/// Configuration snapshot for a [`BridgeClient`](crate::BridgeClient).
///
/// Captured at construction and immutable for the lifetime of a connect
/// cycle; changing options means building a new client.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Bridge endpoint URL.
    pub url: String,

    /// Optional bearer token. Applied both as a `token=` query parameter
    /// and through the subprotocol offer.
    pub token: Option<String>,

    /// Whether the client reconnects automatically after a lost
    /// connection or a failed handshake.
    pub reconnect: bool,

    /// Base interval between reconnect attempts in milliseconds. Each
    /// attempt multiplies this by 1.5^(attempt−1), capped at 60 seconds.
    pub reconnect_interval_ms: u64,

    /// Maximum number of automatic reconnect attempts per outage.
    pub max_reconnect_attempts: u32,

    /// Heartbeat timeout in milliseconds. With liveness monitoring
    /// active, a connection that stays silent this long is considered
    /// dead.
    pub ping_timeout_ms: u64,

    /// Transport handshake timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            url: "ws://localhost:9696".to_owned(),
            token: None,
            reconnect: true,
            reconnect_interval_ms: 3_000,
            max_reconnect_attempts: 1_000,
            ping_timeout_ms: 90_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl ConnectionOptions {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder::default()
    }

    /// The base reconnect interval as a [`Duration`].
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// The heartbeat timeout as a [`Duration`].
    #[must_use]
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    /// The handshake timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Builder for [`ConnectionOptions`].
#[derive(Debug, Default)]
pub struct ConnectionOptionsBuilder {
    url: Option<String>,
    token: Option<String>,
    reconnect: Option<bool>,
    reconnect_interval_ms: Option<u64>,
    max_reconnect_attempts: Option<u32>,
    ping_timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
}

impl ConnectionOptionsBuilder {
    /// Sets the bridge endpoint URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the auth token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Enables or disables automatic reconnection.
    #[must_use]
    pub fn reconnect(mut self, enabled: bool) -> Self {
        self.reconnect = Some(enabled);
        self
    }

    /// Sets the base reconnect interval.
    #[must_use]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    /// Sets the maximum number of automatic reconnect attempts.
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Sets the heartbeat timeout.
    #[must_use]
    pub fn ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Sets the transport handshake timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Builds the options, falling back to defaults for anything unset.
    #[must_use]
    pub fn build(self) -> ConnectionOptions {
        let defaults = ConnectionOptions::default();
        ConnectionOptions {
            url: self.url.unwrap_or(defaults.url),
            token: self.token,
            reconnect: self.reconnect.unwrap_or(defaults.reconnect),
            reconnect_interval_ms: self
                .reconnect_interval_ms
                .unwrap_or(defaults.reconnect_interval_ms),
            max_reconnect_attempts: self
                .max_reconnect_attempts
                .unwrap_or(defaults.max_reconnect_attempts),
            ping_timeout_ms: self.ping_timeout_ms.unwrap_or(defaults.ping_timeout_ms),
            connect_timeout_ms: self
                .connect_timeout_ms
                .unwrap_or(defaults.connect_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConnectionOptions::default();
        assert_eq!(options.url, "ws://localhost:9696");
        assert_eq!(options.token, None);
        assert!(options.reconnect);
        assert_eq!(options.reconnect_interval_ms, 3_000);
        assert_eq!(options.max_reconnect_attempts, 1_000);
        assert_eq!(options.ping_timeout_ms, 90_000);
    }

    #[test]
    fn test_builder_overrides() {
        let options = ConnectionOptions::builder()
            .url("ws://bridge.example:9696")
            .token("abc")
            .reconnect(false)
            .reconnect_interval(Duration::from_secs(1))
            .max_reconnect_attempts(5)
            .ping_timeout(Duration::from_secs(30))
            .build();

        assert_eq!(options.url, "ws://bridge.example:9696");
        assert_eq!(options.token.as_deref(), Some("abc"));
        assert!(!options.reconnect);
        assert_eq!(options.reconnect_interval(), Duration::from_secs(1));
        assert_eq!(options.max_reconnect_attempts, 5);
        assert_eq!(options.ping_timeout(), Duration::from_secs(30));
    }
}
