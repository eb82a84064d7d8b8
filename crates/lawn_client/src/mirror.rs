//! The peer mirror: a local engine fed only by validated actions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Notify};
use tracing::debug;

use lawn_core::protocol::GameplayMessage;
use lawn_core::{Game, GameSnapshot};

/// Tick a local engine on its own clock and apply relayed actions.
///
/// Continuous state (timers, fractional positions) runs uncorrected
/// against the authority; discrete transitions converge because exactly
/// the same validated actions go through exactly the same engine calls.
/// Snapshots are published over `snapshot_tx` for the presentation layer.
/// The task ends on shutdown, when a terminal `GAME_STATE` arrives (its
/// authoritative snapshot is published last), or when the local engine
/// itself reaches terminal state (solo mode).
pub async fn mirror_task(
    mut game: Game,
    mut action_rx: mpsc::Receiver<GameplayMessage>,
    snapshot_tx: watch::Sender<GameSnapshot>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) {
    let dt = tick_interval.as_secs_f32();
    let mut interval = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = interval.tick() => {
                game.update(dt);
                let over = game.is_over();
                let _ = snapshot_tx.send(game.snapshot());
                if over {
                    break;
                }
            }
            action = action_rx.recv() => {
                let Some(action) = action else { break };
                match action {
                    GameplayMessage::GameState(final_state) => {
                        // Terminal broadcast: adopt the authority's view.
                        let _ = snapshot_tx.send(*final_state);
                        break;
                    }
                    action => {
                        // The authority already validated this; a local
                        // rejection only means our continuous state had
                        // drifted, which is tolerated.
                        if !action.apply(&mut game) {
                            debug!(action = %action.encode(), "relayed action not applicable locally");
                        }
                        let _ = snapshot_tx.send(game.snapshot());
                    }
                }
            }
        }
    }
}
