//! Headless client bootstrap.
//!
//! Presentation (rendering, input, audio) is a separate concern; this
//! binary wires the mirror and network loops together and logs the state
//! transitions the presentation layer would consume.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Notify};
use tracing::info;

use lawn_client::{config, mirror_task, net};
use lawn_core::{Game, GameConfig, GameSnapshot};

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

fn empty_snapshot() -> GameSnapshot {
    GameSnapshot::build(&[], &[], &[], 0, 0, false, None, false)
}

#[tokio::main]
async fn main() {
    init_runtime();

    if config::solo_mode() {
        run_solo().await;
    } else if let Err(e) = run_online().await {
        tracing::error!(error = ?e, "client error");
        std::process::exit(1);
    }
}

/// One local engine, no relay: the spawn director drives the attackers.
async fn run_solo() {
    let seed = config::solo_seed();
    info!(seed, "starting solo game");

    let (_action_tx, action_rx) = mpsc::channel(64);
    let (snapshot_tx, mut snapshot_rx) = watch::channel(empty_snapshot());
    let shutdown = Arc::new(Notify::new());

    let mirror = tokio::spawn(mirror_task(
        Game::new(GameConfig::solo(seed)),
        action_rx,
        snapshot_tx,
        config::tick_interval(),
        shutdown,
    ));

    while snapshot_rx.changed().await.is_ok() {
        let snap = snapshot_rx.borrow_and_update().clone();
        if snap.game_over {
            info!("game over");
            break;
        }
    }
    let _ = mirror.await;
}

async fn run_online() -> Result<(), net::NetError> {
    let client_config = net::ClientConfig {
        server_addr: config::server_addr(),
        room: config::room(),
    };
    info!(server = %client_config.server_addr, room = %client_config.room, "connecting");

    let mut session = net::connect(&client_config).await?;
    info!(
        client_id = session.client_id,
        role = session.role.wire_name(),
        "session established"
    );

    let (relay_tx, relay_rx) = mpsc::channel(256);
    // Local action intake; a presentation layer would hold the sender.
    let (_outgoing_tx, outgoing_rx) = mpsc::channel(64);
    let (snapshot_tx, mut snapshot_rx) = watch::channel(empty_snapshot());
    let shutdown = Arc::new(Notify::new());

    let mirror = tokio::spawn(mirror_task(
        Game::new(GameConfig::versus()),
        relay_rx,
        snapshot_tx,
        config::tick_interval(),
        shutdown.clone(),
    ));

    let watcher = tokio::spawn(async move {
        while snapshot_rx.changed().await.is_ok() {
            let snap = snapshot_rx.borrow_and_update().clone();
            if snap.game_over {
                info!(winner = ?snap.winner, "game over");
                break;
            }
        }
    });

    let result = net::run_session(&mut session, outgoing_rx, relay_tx).await;
    shutdown.notify_waiters();
    let _ = mirror.await;
    watcher.abort();
    result
}
