//! Room registry: the only owner of the room table.
//!
//! All access goes through the registry's methods; nothing else sees the
//! map. Rooms are created on first join, handed out as cloneable handles,
//! and torn down when their last participant leaves.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch, Notify, RwLock};
use tracing::{debug, info, warn};

use crate::room::{room_task, udp_drain_task, RoomEvent};

/// Shared configuration for spawning rooms.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Capacity of each room's event mailbox.
    pub action_capacity: usize,
    /// Fixed tick interval for the authoritative loop.
    pub tick_interval: Duration,
    /// Simulated seconds per real second (1.0 outside tests).
    pub time_scale: f32,
    /// First UDP port tried for a new room's endpoint.
    pub udp_port_base: u16,
    /// Ports past the base to try before giving up.
    pub udp_port_span: u16,
    /// Host advertised to clients for the datagram endpoint.
    pub public_host: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum JoinError {
    /// Two participants are already present.
    RoomFull,
    /// No UDP port could be bound for a new room.
    NoPortsAvailable,
}

impl JoinError {
    /// Reason text carried by the `ERROR:` control reply.
    pub fn reason(&self) -> &'static str {
        match self {
            JoinError::RoomFull => "Room is full",
            JoinError::NoPortsAvailable => "No rooms available",
        }
    }
}

/// Per-room channels and membership. Cheap to clone; the registry keeps
/// the canonical copy.
#[derive(Clone)]
pub struct RoomHandle {
    pub room_id: Arc<str>,
    /// Datagram endpoint advertised in the `UDP:` reply.
    pub udp_addr: SocketAddr,
    /// Mailbox into the room task.
    pub event_tx: mpsc::Sender<RoomEvent>,
    shutdown: Arc<Notify>,
    members: Arc<Mutex<Vec<u32>>>,
}

impl RoomHandle {
    fn member_count(&self) -> usize {
        self.members.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Add a participant. Returns whether the room just became full (two
    /// participants) so the caller can activate it.
    fn add_member(&self, client_id: u32) -> Result<bool, JoinError> {
        let mut members = self.members.lock().unwrap_or_else(|e| e.into_inner());
        if members.len() >= 2 {
            return Err(JoinError::RoomFull);
        }
        members.push(client_id);
        Ok(members.len() == 2)
    }

    /// Remove a participant; returns whether the room is now empty.
    fn remove_member(&self, client_id: u32) -> bool {
        let mut members = self.members.lock().unwrap_or_else(|e| e.into_inner());
        members.retain(|id| *id != client_id);
        members.is_empty()
    }
}

/// Thread-safe registry for active rooms.
pub struct RoomRegistry {
    settings: RoomSettings,
    rooms: Arc<RwLock<HashMap<String, RoomHandle>>>,
    /// Next UDP port to try; freed ports are retried on wrap-around.
    next_udp_port: Mutex<u16>,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings) -> Self {
        let base = settings.udp_port_base;
        Self {
            settings,
            rooms: Arc::new(RwLock::new(HashMap::new())),
            next_udp_port: Mutex::new(base),
        }
    }

    /// Join a room by name, creating it (and its UDP endpoint and tasks)
    /// on first reference. On the second join the room is activated.
    pub async fn join(&self, room_id: &str, client_id: u32) -> Result<RoomHandle, JoinError> {
        let mut rooms = self.rooms.write().await;
        let handle = match rooms.get(room_id) {
            Some(handle) => handle.clone(),
            None => {
                let handle = self.spawn_room(room_id).await?;
                rooms.insert(room_id.to_string(), handle.clone());
                handle
            }
        };
        drop(rooms);

        let now_full = handle.add_member(client_id)?;
        info!(room_id, client_id, members = handle.member_count(), "joined room");
        if now_full {
            let _ = handle.event_tx.send(RoomEvent::Activate).await;
        }
        Ok(handle)
    }

    /// Remove a participant from its room. Tells the room task so the
    /// remaining peer is notified, and destroys the room once empty.
    /// Returns true when the room was destroyed.
    pub async fn leave(&self, room_id: &str, client_id: u32) -> bool {
        let handle = {
            let rooms = self.rooms.read().await;
            rooms.get(room_id).cloned()
        };
        let Some(handle) = handle else {
            return false;
        };

        let _ = handle.event_tx.send(RoomEvent::Leave { client_id }).await;
        if !handle.remove_member(client_id) {
            return false;
        }

        let mut rooms = self.rooms.write().await;
        // Re-check under the write lock; a new participant may have raced in.
        if handle.member_count() == 0 {
            rooms.remove(room_id);
            handle.shutdown.notify_waiters();
            info!(room_id, "room closed");
            return true;
        }
        false
    }

    /// Bind a UDP endpoint and spawn the drain + authoritative tasks,
    /// plus a reaper that evicts the room once its game turns terminal.
    async fn spawn_room(&self, room_id: &str) -> Result<RoomHandle, JoinError> {
        let socket = self.bind_udp().await?;
        let port = socket
            .local_addr()
            .map_err(|_| JoinError::NoPortsAvailable)?
            .port();
        let udp_addr: SocketAddr = format!("{}:{port}", self.settings.public_host)
            .parse()
            .map_err(|_| JoinError::NoPortsAvailable)?;

        let socket = Arc::new(socket);
        let (event_tx, event_rx) = mpsc::channel(self.settings.action_capacity);
        let (terminal_tx, mut terminal_rx) = watch::channel(false);
        let shutdown = Arc::new(Notify::new());
        let id: Arc<str> = Arc::from(room_id);

        tokio::spawn(udp_drain_task(
            socket.clone(),
            event_tx.clone(),
            shutdown.clone(),
        ));
        tokio::spawn(room_task(
            id.clone(),
            socket,
            event_rx,
            terminal_tx,
            shutdown.clone(),
            self.settings.tick_interval,
            self.settings.time_scale,
        ));

        // Terminal reaper: once the game ends the room is unregistered so
        // its name is immediately reusable, whether or not the participants
        // ever say QUIT. Their later `leave` calls find no room and no-op.
        let rooms = Arc::clone(&self.rooms);
        let reaper_id = id.clone();
        tokio::spawn(async move {
            while terminal_rx.changed().await.is_ok() {
                if !*terminal_rx.borrow() {
                    continue;
                }
                let mut rooms = rooms.write().await;
                if let Some(handle) = rooms.remove(&*reaper_id) {
                    handle.shutdown.notify_waiters();
                    info!(room_id = %reaper_id, "terminal room evicted");
                }
                break;
            }
        });

        info!(room_id, %udp_addr, "room created");
        Ok(RoomHandle {
            room_id: id,
            udp_addr,
            event_tx,
            shutdown,
            members: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Sequential scan from the base port, skipping ports that fail to
    /// bind (still held by another room or another process).
    async fn bind_udp(&self) -> Result<UdpSocket, JoinError> {
        let base = self.settings.udp_port_base;
        let span = self.settings.udp_port_span.max(1);
        for _ in 0..span {
            let port = {
                let mut next = self.next_udp_port.lock().unwrap_or_else(|e| e.into_inner());
                let port = *next;
                *next = if port >= base.saturating_add(span - 1) {
                    base
                } else {
                    port + 1
                };
                port
            };
            match UdpSocket::bind(("0.0.0.0", port)).await {
                Ok(socket) => return Ok(socket),
                Err(e) => {
                    debug!(port, error = %e, "udp port unavailable, trying next");
                }
            }
        }
        warn!(base, span, "udp port range exhausted");
        Err(JoinError::NoPortsAvailable)
    }
}
