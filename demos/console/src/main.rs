//! Console event viewer.
//!
//! Connects to a bridge and prints chat, system and gift events as they
//! arrive. Usage:
//!
//! ```text
//! console-viewer [url] [token]
//! ```

use chrono::{Local, TimeZone};
use eventline::prelude::*;

/// Formats a milliseconds-since-epoch timestamp as local wall-clock time.
fn clock(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_owned())
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "ws://localhost:9696".to_owned());
    let token = args.next().filter(|t| !t.is_empty());

    println!("Eventline console viewer");
    println!("connecting to: {url}");
    if token.is_some() {
        println!("using authentication token");
    }

    let mut options = ConnectionOptions::builder()
        .url(&url)
        .reconnect(true)
        .max_reconnect_attempts(10);
    if let Some(token) = token {
        options = options.token(token);
    }
    let client = BridgeClient::new(options.build());

    client.on_state_change(|state| println!("connection state: {state}"));

    client.on("message", |event: &Event| {
        if let Event::Message(msg) = event {
            println!("[{}] {}: {}", clock(msg.timestamp_normalized), msg.username, msg.message);
        }
    });
    client.on("system", |event: &Event| {
        if let Event::System(notice) = event {
            println!("[{}] [SYSTEM] {}", clock(notice.timestamp_normalized), notice.message);
        }
    });
    client.on("gift", |event: &Event| {
        if let Event::Gift(gift) = event {
            println!(
                "[{}] {} sent {}x {}",
                clock(gift.timestamp_normalized),
                gift.username,
                gift.gift_count,
                gift.gift_name
            );
        }
    });

    client.connect().await?;
    println!("connected, listening for events (Ctrl-C to exit)");

    let _ = tokio::signal::ctrl_c().await;
    println!("shutting down");
    client.disconnect().await;
    Ok(())
}
