//! Caller-side reconnect and heartbeat back-off policy.
//!
//! Demonstrates:
//! - Bounded reconnect on close (3 attempts, 1s apart)
//! - Raising the heartbeat interval by 500ms on overtime
//! - Reconnecting once the interval passes 2000ms
//! - Logging lifecycle errors
//!
//! Without `--url`, a local server is started that acks heartbeats and
//! drops every connection after a few seconds.
//!
//! Usage:
//!   cargo run --example reconnect
//!   cargo run --example reconnect -- --debug
//!   cargo run --example reconnect -- --url ws://127.0.0.1:2048/ws/?name=alice

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use common::Args;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use socket_webox::{
    CloseEvent, ErrorEvent, HeartbeatOptions, OpenEvent, ReservedEvent, WebSocketClient,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::sleep;

// ============================================================================
// Constants
// ============================================================================

const RECONNECT_LIMIT: u32 = 3;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1500);
const HEARTBEAT_STEP: Duration = Duration::from_millis(500);
const HEARTBEAT_CEILING: Duration = Duration::from_millis(2000);
const SERVER_SESSION: Duration = Duration::from_secs(4);

// ============================================================================
// Types
// ============================================================================

/// Lifecycle signals forwarded out of bus callbacks.
#[derive(Debug)]
enum Signal {
    Open(OpenEvent),
    Close(CloseEvent),
    Error(ErrorEvent),
    Overtime,
    Chat(Value),
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== Reconnect Policy ===\n");

    let url = match args.url {
        Some(url) => url,
        None => spawn_local_server().await?,
    };
    println!("[Setup] Server: {url}");

    // ========================================================================
    // Create Client
    // ========================================================================

    let client = WebSocketClient::builder()
        .url(&url)
        .receive_tag_field("msgID")
        .heartbeat(
            HeartbeatOptions::new(
                json!({ "msgID": "heartbeat", "msg": null }),
                "heartbeat",
                HEARTBEAT_INTERVAL,
            )
            .with_retry_limit(1),
        )
        .build()?;

    let mut signals = subscribe(&client)?;
    client.connect()?;

    // ========================================================================
    // Policy Loop
    // ========================================================================

    let mut attempts = 0;
    loop {
        let signal = tokio::select! {
            signal = signals.recv() => signal,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(signal) = signal else {
            break;
        };

        match signal {
            Signal::Open(event) => {
                println!("[Open] Connected to {}", event.url);
                attempts = 0;
                client.send_msg(&json!({ "msgID": "chat", "msg": "hello" }))?;
            }

            Signal::Chat(frame) => {
                println!("[Chat] {}", frame["msg"]);
            }

            Signal::Error(event) => {
                println!("[Error] {} ({})", event.message, event.kind.as_str());
            }

            Signal::Overtime => {
                let interval = client.heartbeat_interval().unwrap_or(HEARTBEAT_INTERVAL);
                if interval > HEARTBEAT_CEILING {
                    println!("[Heartbeat] Peer silent, reconnecting");
                    client.connect()?;
                    continue;
                }
                let next = interval + HEARTBEAT_STEP;
                println!("[Heartbeat] Overtime, retrying at {}ms", next.as_millis());
                client.start_heartbeat(Some(next), Some(1))?;
            }

            Signal::Close(event) => {
                println!("[Close] code={:?} clean={}", event.code, event.was_clean);
                if attempts >= RECONNECT_LIMIT {
                    println!("[Close] Giving up after {attempts} attempts");
                    break;
                }
                sleep(RECONNECT_DELAY).await;
                attempts += 1;
                println!("[Reconnect] Attempt {attempts}/{RECONNECT_LIMIT}");
                client.connect()?;
            }
        }
    }

    client.dispose()?;
    println!("\n[Done] Client disposed");
    Ok(())
}

// ============================================================================
// Wiring
// ============================================================================

/// Forwards lifecycle and chat events to a channel.
fn subscribe(client: &WebSocketClient) -> socket_webox::Result<mpsc::UnboundedReceiver<Signal>> {
    let (tx, rx) = mpsc::unbounded_channel();

    let t = tx.clone();
    client.on(ReservedEvent::Open.as_str(), move |v| {
        if let Some(event) = OpenEvent::from_value(v) {
            let _ = t.send(Signal::Open(event));
        }
    })?;

    let t = tx.clone();
    client.on(ReservedEvent::Close.as_str(), move |v| {
        let event = CloseEvent::from_value(v).unwrap_or_default();
        let _ = t.send(Signal::Close(event));
    })?;

    let t = tx.clone();
    client.on(ReservedEvent::Error.as_str(), move |v| {
        if let Some(event) = ErrorEvent::from_value(v) {
            let _ = t.send(Signal::Error(event));
        }
    })?;

    let t = tx.clone();
    client.on(ReservedEvent::HeartbeatOvertime.as_str(), move |_| {
        let _ = t.send(Signal::Overtime);
    })?;

    client.on("chat", move |v| {
        let _ = tx.send(Signal::Chat(v.clone()));
    })?;

    Ok(rx)
}

// ============================================================================
// Local Server
// ============================================================================

/// Echoes every frame (which acks heartbeats) and drops each session after
/// a few seconds.
async fn spawn_local_server() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                let deadline = sleep(SERVER_SESSION);
                tokio::pin!(deadline);
                loop {
                    tokio::select! {
                        message = ws.next() => match message {
                            Some(Ok(message)) if message.is_text() => {
                                if ws.send(message).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(_)) => {}
                            _ => break,
                        },
                        _ = &mut deadline => {
                            let _ = ws.close(None).await;
                            break;
                        }
                    }
                }
            });
        }
    });

    Ok(format!("ws://{addr}/ws/?name=demo"))
}
