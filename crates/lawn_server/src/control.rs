//! Rendezvous/handshake layer: the reliable TCP control channel.
//!
//! One task per accepted connection. The layer issues identities, brokers
//! room joins, hands back the room's datagram endpoint, and cleans up
//! membership when the stream closes.

use std::io::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use lawn_core::protocol::{ControlReply, ControlRequest, ParseError};

use crate::config;
use crate::rooms::{RoomHandle, RoomRegistry, RoomSettings};

/// Lifecycle phase announced right after the identity.
const PHASE_CONNECTED: u8 = 1;

static NEXT_CLIENT_ID: AtomicU32 = AtomicU32::new(1000);

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Accept-loop entry point, factored out so tests can run the server on
/// an ephemeral listener with their own settings.
pub async fn run(listener: TcpListener, registry: Arc<RoomRegistry>) -> Result<()> {
    let address = listener.local_addr()?;
    info!(%address, "control channel listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        let client_id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(client_id, %peer, "client connected");
        tokio::spawn(handle_client(stream, client_id, registry.clone()));
    }
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let registry = Arc::new(RoomRegistry::new(RoomSettings {
        action_capacity: config::ACTION_CHANNEL_CAPACITY,
        tick_interval: config::tick_interval(),
        time_scale: config::time_scale(),
        udp_port_base: config::udp_port_base(),
        udp_port_span: config::udp_port_span(),
        public_host: config::public_host(),
    }));

    let address = ("0.0.0.0", config::control_port());
    let listener = TcpListener::bind(address).await.inspect_err(|e| {
        tracing::error!(port = config::control_port(), error = %e, "failed to bind");
    })?;

    run(listener, registry).await
}

async fn handle_client(stream: TcpStream, client_id: u32, registry: Arc<RoomRegistry>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let mut current_room: Option<RoomHandle> = None;

    // Identity first, then the connect-acknowledged phase.
    if send_reply(&mut write_half, &ControlReply::Id(client_id)).await.is_err()
        || send_reply(&mut write_half, &ControlReply::State(PHASE_CONNECTED)).await.is_err()
    {
        debug!(client_id, "client gone before handshake");
        return;
    }

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            // EOF or a failed read both mean departure.
            Ok(None) => break,
            Err(e) => {
                debug!(client_id, error = %e, "control read failed");
                break;
            }
        };

        match ControlRequest::parse(&line) {
            Ok(ControlRequest::Join(room_id)) => {
                if current_room.is_some() {
                    let reply = ControlReply::Error("Already in a room".to_string());
                    if send_reply(&mut write_half, &reply).await.is_err() {
                        break;
                    }
                    continue;
                }
                match registry.join(&room_id, client_id).await {
                    Ok(handle) => {
                        let reply = ControlReply::Udp {
                            host: handle.udp_addr.ip().to_string(),
                            port: handle.udp_addr.port(),
                        };
                        info!(client_id, room_id = %handle.room_id, "join accepted");
                        let sent = send_reply(&mut write_half, &reply).await;
                        current_room = Some(handle);
                        if sent.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        info!(client_id, room_id = %room_id, reason = e.reason(), "join rejected");
                        let reply = ControlReply::Error(e.reason().to_string());
                        if send_reply(&mut write_half, &reply).await.is_err() {
                            break;
                        }
                    }
                }
            }
            Ok(ControlRequest::Quit) => {
                info!(client_id, "client quit");
                break;
            }
            Err(ParseError::UnknownMessage(raw)) if raw.is_empty() => {}
            Err(e) => {
                // Malformed control traffic is ignored, not fatal.
                debug!(client_id, error = %e, "ignoring malformed control line");
            }
        }
    }

    if let Some(handle) = current_room {
        registry.leave(&handle.room_id, client_id).await;
    }
    debug!(client_id, "client cleanup complete");
}

async fn send_reply(
    write_half: &mut tokio::net::tcp::OwnedWriteHalf,
    reply: &ControlReply,
) -> Result<()> {
    let mut line = reply.encode();
    line.push('\n');
    write_half.write_all(line.as_bytes()).await
}
