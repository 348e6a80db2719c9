//! Integration tests for the WebSocket transport.
//!
//! These spin up a real WebSocket server on a loopback port and dial it
//! with [`WsConnector`] to verify that messages actually flow, that the
//! auth token travels through both negotiated mechanisms, and that a
//! server-side close surfaces as a clean end of stream.

use std::time::Duration;

use eventline_transport::{Connection, Connector, ROLE_SUBPROTOCOL, WsConnector};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Binds a listener on an OS-assigned port and returns it with the
/// matching `ws://` URL.
async fn bind_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let addr = listener.local_addr().expect("local addr");
    (listener, format!("ws://{addr}"))
}

#[tokio::test]
async fn test_connect_send_recv_roundtrip() {
    let (listener, url) = bind_server().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(stream)
            .await
            .expect("ws accept");

        let msg = ws.next().await.expect("client message").expect("ok");
        assert_eq!(msg.into_text().expect("text").as_str(), "hello from client");

        ws.send(Message::text("hello from server"))
            .await
            .expect("server send");
    });

    let connector = WsConnector::new(&url, None, CONNECT_TIMEOUT).expect("connector");
    let conn = connector.connect().await.expect("connect");

    conn.send("hello from client").await.expect("send");
    let received = conn.recv().await.expect("recv");
    assert_eq!(received.as_deref(), Some("hello from server"));

    server.await.expect("server task");
    conn.close().await.expect("close");
}

#[tokio::test]
async fn test_token_travels_in_query_and_subprotocol() {
    let (listener, url) = bind_server().await;
    let (captured_tx, captured_rx) = tokio::sync::oneshot::channel::<(String, String)>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");

        let callback = move |req: &Request, mut resp: Response| {
            let query = req.uri().query().unwrap_or("").to_owned();
            let offered = req
                .headers()
                .get("sec-websocket-protocol")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_owned();
            let _ = captured_tx.send((query, offered));

            // Select the role marker so negotiation completes.
            resp.headers_mut().insert(
                "sec-websocket-protocol",
                HeaderValue::from_static(ROLE_SUBPROTOCOL),
            );
            Ok(resp)
        };

        let _ws = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .expect("ws accept");
    });

    let connector = WsConnector::new(&url, Some("s3cret"), CONNECT_TIMEOUT).expect("connector");
    let _conn = connector.connect().await.expect("connect");

    let (query, offered) = captured_rx.await.expect("handshake captured");
    assert!(query.contains("token=s3cret"), "query was {query:?}");
    assert!(offered.contains(ROLE_SUBPROTOCOL), "offered was {offered:?}");
    assert!(offered.contains("s3cret"), "offered was {offered:?}");

    server.await.expect("server task");
}

#[tokio::test]
async fn test_recv_returns_none_on_server_close() {
    let (listener, url) = bind_server().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(stream)
            .await
            .expect("ws accept");
        ws.send(Message::Close(None)).await.expect("close frame");
    });

    let connector = WsConnector::new(&url, None, CONNECT_TIMEOUT).expect("connector");
    let conn = connector.connect().await.expect("connect");

    let received = conn.recv().await.expect("recv should not error");
    assert!(received.is_none(), "close should surface as None");

    server.await.expect("server task");
}

#[tokio::test]
async fn test_connect_fails_when_nothing_listens() {
    // Bind and immediately drop so the port is very likely unoccupied.
    let (listener, url) = bind_server().await;
    drop(listener);

    let connector = WsConnector::new(&url, None, CONNECT_TIMEOUT).expect("connector");
    let result = connector.connect().await;
    assert!(result.is_err(), "dialing a dead port should fail");
}
