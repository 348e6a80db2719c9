//! WebSocket transport implementation using `tokio-tungstenite`.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::{Connection, Connector, TransportError};

/// Fixed role marker offered as the first subprotocol value when a token
/// is present; the token itself is offered as the second value.
pub const ROLE_SUBPROTOCOL: &str = "laplace-event-bridge-role-client";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// A [`Connector`] that dials a `ws://` / `wss://` bridge endpoint.
///
/// When a token is configured it is applied through both mechanisms the
/// bridge accepts: appended to the query string as `token=...` and offered
/// as an ordered subprotocol pair ([`ROLE_SUBPROTOCOL`], then the token).
pub struct WsConnector {
    endpoint: Url,
    token: Option<String>,
    connect_timeout: Duration,
}

impl WsConnector {
    /// Builds a connector for the given endpoint.
    ///
    /// The URL is parsed eagerly so a malformed endpoint surfaces before
    /// any dial attempt.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if `url` does not parse.
    pub fn new(
        url: &str,
        token: Option<&str>,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let mut endpoint = Url::parse(url)?;
        let token = token.filter(|t| !t.is_empty()).map(str::to_owned);

        if let Some(token) = &token {
            endpoint.query_pairs_mut().append_pair("token", token);
        }

        Ok(Self {
            endpoint,
            token,
            connect_timeout,
        })
    }

    /// The endpoint this connector dials, with the token folded into the
    /// query string.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Connector for WsConnector {
    type Connection = WsConnection;

    async fn connect(&self) -> Result<WsConnection, TransportError> {
        let mut request = self
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(TransportError::ConnectFailed)?;

        if let Some(token) = &self.token {
            let offered = format!("{ROLE_SUBPROTOCOL}, {token}");
            let value = HeaderValue::from_str(&offered)
                .map_err(|_| TransportError::InvalidToken)?;
            request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }

        let (ws, response) = timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| TransportError::ConnectTimeout(self.connect_timeout))?
            .map_err(TransportError::ConnectFailed)?;

        tracing::debug!(
            status = %response.status(),
            "websocket handshake complete"
        );

        let (sink, stream) = ws.split();
        Ok(WsConnection {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single WebSocket connection.
///
/// The write and read halves are split so a send never waits behind a
/// pending receive.
pub struct WsConnection {
    sink: Mutex<WsSink>,
    stream: Mutex<WsSource>,
}

impl Connection for WsConnection {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::text(text))
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        loop {
            let next = self.stream.lock().await.next().await;
            match next {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.to_string()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // The bridge speaks JSON text; binary payloads and
                // transport-level ping/pong are consumed here.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::ReceiveFailed(e)),
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(TransportError::SendFailed)
    }
}
