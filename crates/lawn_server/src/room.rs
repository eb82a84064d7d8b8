//! Per-room authoritative loop and datagram plumbing.
//!
//! Each room owns exactly one `Game`, touched only by its room task. The
//! UDP drain task never sees the engine: it parses datagrams into
//! `RoomEvent`s and forwards them over the room's mailbox, so engine
//! access is serialized without any locking.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch, Notify};
use tracing::{debug, info, warn};

use lawn_core::protocol::{GameplayMessage, Role};
use lawn_core::{Game, GameConfig};

/// Events delivered to a room task through its mailbox.
#[derive(Debug)]
pub enum RoomEvent {
    /// Second participant joined on the control channel; start ticking.
    Activate,
    /// A datagram registered a participant's gameplay address.
    Connect { client_id: u32, addr: SocketAddr },
    /// A gameplay action arrived from `addr`.
    Action { addr: SocketAddr, msg: GameplayMessage },
    /// A participant left via the control channel.
    Leave { client_id: u32 },
}

/// One registered gameplay endpoint.
struct Peer {
    client_id: u32,
    addr: SocketAddr,
    role: Role,
}

/// Drains inbound datagrams into the room mailbox.
pub async fn udp_drain_task(
    socket: Arc<UdpSocket>,
    event_tx: mpsc::Sender<RoomEvent>,
    shutdown: Arc<Notify>,
) {
    let mut buf = [0u8; 2048];
    loop {
        let (len, addr) = tokio::select! {
            _ = shutdown.notified() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "udp recv error");
                    continue;
                }
            },
        };
        let Ok(raw) = std::str::from_utf8(&buf[..len]) else {
            debug!(%addr, len, "non-utf8 datagram ignored");
            continue;
        };
        let event = match GameplayMessage::parse(raw) {
            Ok(GameplayMessage::Connect(client_id)) => RoomEvent::Connect { client_id, addr },
            Ok(msg) => RoomEvent::Action { addr, msg },
            Err(e) => {
                // Malformed traffic is dropped, never fatal.
                debug!(%addr, error = %e, "malformed datagram ignored");
                continue;
            }
        };
        if event_tx.send(event).await.is_err() {
            break;
        }
    }
}

/// The authoritative loop: fixed-rate engine ticks, action validation and
/// relay, terminal full-state broadcast.
pub async fn room_task(
    room_id: Arc<str>,
    socket: Arc<UdpSocket>,
    mut event_rx: mpsc::Receiver<RoomEvent>,
    terminal_tx: watch::Sender<bool>,
    shutdown: Arc<Notify>,
    tick_interval: Duration,
    time_scale: f32,
) {
    let mut game = Game::new(GameConfig::versus());
    let mut peers: Vec<Peer> = Vec::new();
    let mut active = false;
    let mut announced = false;
    let dt = tick_interval.as_secs_f32() * time_scale;
    let mut interval = tokio::time::interval(tick_interval);

    info!(%room_id, "room task started");

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!(%room_id, "room task shut down");
                break;
            }
            _ = interval.tick() => {
                if !active {
                    continue;
                }
                game.update(dt);
                if game.is_over() {
                    let snapshot = game.snapshot();
                    let payload = GameplayMessage::GameState(Box::new(snapshot)).encode();
                    for peer in &peers {
                        send_to(&socket, &payload, peer.addr).await;
                    }
                    info!(%room_id, winner = ?game.winner(), "game over");
                    let _ = terminal_tx.send(true);
                    break;
                }
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    RoomEvent::Activate => {
                        active = true;
                        announce_if_ready(&socket, &peers, &mut announced, active).await;
                        info!(%room_id, "room active");
                    }
                    RoomEvent::Connect { client_id, addr } => {
                        let role = register_peer(&mut peers, client_id, addr);
                        let Some(role) = role else {
                            debug!(%room_id, client_id, "connect from full room ignored");
                            continue;
                        };
                        // Reply is resent on duplicate CONNECTs so a lost
                        // ROLE datagram is recovered by retrying.
                        send_to(&socket, &GameplayMessage::Role(role).encode(), addr).await;
                        announce_if_ready(&socket, &peers, &mut announced, active).await;
                    }
                    RoomEvent::Action { addr, msg } => {
                        handle_action(&room_id, &socket, &mut game, &peers, addr, msg).await;
                    }
                    RoomEvent::Leave { client_id } => {
                        peers.retain(|p| p.client_id != client_id);
                        if active {
                            // Below two participants the loop idles again.
                            active = false;
                            let notice =
                                GameplayMessage::System(format!("Client {client_id} disconnected"));
                            for peer in &peers {
                                send_to(&socket, &notice.encode(), peer.addr).await;
                            }
                        }
                        info!(%room_id, client_id, "participant left room");
                    }
                }
            }
        }
    }
}

/// First registered endpoint defends, the second takes the other side;
/// fixed per peer thereafter. A replacement arriving after a departure
/// gets the complement of the surviving peer's role, never a duplicate.
/// A repeated CONNECT for a known id refreshes the address and keeps the
/// assigned role.
fn register_peer(peers: &mut Vec<Peer>, client_id: u32, addr: SocketAddr) -> Option<Role> {
    if let Some(peer) = peers.iter_mut().find(|p| p.client_id == client_id) {
        peer.addr = addr;
        return Some(peer.role);
    }
    let role = match peers.as_slice() {
        [] => Role::Def,
        [survivor] => survivor.role.opponent(),
        _ => return None,
    };
    peers.push(Peer { client_id, addr, role });
    Some(role)
}

/// Announce `STATE:2` once, when the room is active and both gameplay
/// endpoints are known.
async fn announce_if_ready(
    socket: &UdpSocket,
    peers: &[Peer],
    announced: &mut bool,
    active: bool,
) {
    if *announced || !active || peers.len() < 2 {
        return;
    }
    *announced = true;
    let payload = GameplayMessage::State(2).encode();
    for peer in peers {
        send_to(socket, &payload, peer.addr).await;
    }
}

/// Authorize, replay against the authoritative engine, and relay only on
/// acceptance. Rejected or unauthorized actions are dropped silently.
async fn handle_action(
    room_id: &str,
    socket: &UdpSocket,
    game: &mut Game,
    peers: &[Peer],
    addr: SocketAddr,
    msg: GameplayMessage,
) {
    let Some(sender) = peers.iter().find(|p| p.addr == addr) else {
        debug!(room_id, %addr, "action from unregistered address dropped");
        return;
    };
    let Some(required) = msg.required_role() else {
        debug!(room_id, client_id = sender.client_id, ?msg, "non-action message ignored");
        return;
    };
    if sender.role != required {
        info!(
            room_id,
            client_id = sender.client_id,
            role = sender.role.wire_name(),
            action = %msg.encode(),
            "unauthorized action dropped"
        );
        return;
    }
    if !msg.apply(game) {
        debug!(room_id, client_id = sender.client_id, action = %msg.encode(), "action rejected");
        return;
    }
    // Relay to every registered endpoint, the sender included: mirrors
    // apply an action only once the authority has validated it.
    let payload = msg.encode();
    for peer in peers {
        send_to(socket, &payload, peer.addr).await;
    }
}

async fn send_to(socket: &UdpSocket, payload: &str, addr: SocketAddr) {
    // Fire-and-forget by design; losses are part of the protocol.
    if let Err(e) = socket.send_to(payload.as_bytes(), addr).await {
        debug!(%addr, error = %e, "udp send failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn first_peer_defends_second_attacks_third_is_refused() {
        let mut peers = Vec::new();
        assert_eq!(register_peer(&mut peers, 1, addr(1)), Some(Role::Def));
        assert_eq!(register_peer(&mut peers, 2, addr(2)), Some(Role::Att));
        assert_eq!(register_peer(&mut peers, 3, addr(3)), None);
    }

    #[test]
    fn reconnect_keeps_the_role_and_refreshes_the_address() {
        let mut peers = Vec::new();
        register_peer(&mut peers, 1, addr(1));
        assert_eq!(register_peer(&mut peers, 1, addr(9)), Some(Role::Def));
        assert_eq!(peers[0].addr, addr(9));
    }

    #[test]
    fn replacement_takes_the_vacated_side() {
        let mut peers = Vec::new();
        register_peer(&mut peers, 1, addr(1));
        register_peer(&mut peers, 2, addr(2));

        // Defender leaves; the newcomer must defend, not double up on att.
        peers.retain(|p| p.client_id != 1);
        assert_eq!(register_peer(&mut peers, 3, addr(3)), Some(Role::Def));

        // And symmetrically for a departed attacker.
        peers.retain(|p| p.client_id != 2);
        assert_eq!(register_peer(&mut peers, 4, addr(4)), Some(Role::Att));
    }
}
