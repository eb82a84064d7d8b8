// Shared helpers for integration tests: a real server on an ephemeral
// port, and thin wrappers over the raw control/gameplay channels.
// Each test binary uses a subset of these.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use lawn_core::protocol::{ControlReply, GameplayMessage};
use lawn_server::{RoomRegistry, RoomSettings};

pub fn test_settings(time_scale: f32) -> RoomSettings {
    RoomSettings {
        action_capacity: 64,
        tick_interval: Duration::from_millis(10),
        time_scale,
        // Port 0 asks the OS for an ephemeral port per room.
        udp_port_base: 0,
        udp_port_span: 1,
        public_host: "127.0.0.1".to_string(),
    }
}

/// Start a real server on an ephemeral port and return its address.
pub async fn spawn_server(settings: RoomSettings) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("local addr");
    let registry = Arc::new(RoomRegistry::new(settings));
    tokio::spawn(lawn_server::run(listener, registry));
    addr
}

/// A raw control-channel connection that has completed the ID handshake.
pub struct ControlClient {
    pub client_id: u32,
    lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl ControlClient {
    pub async fn connect(addr: SocketAddr) -> ControlClient {
        let stream = TcpStream::connect(addr).await.expect("control connect");
        let (read, write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        let id_line = next_line(&mut lines).await;
        let ControlReply::Id(client_id) = ControlReply::parse(&id_line).expect("parse id") else {
            panic!("expected ID reply, got {id_line:?}");
        };
        let state_line = next_line(&mut lines).await;
        assert_eq!(state_line, "STATE:1");

        ControlClient { client_id, lines, write }
    }

    pub async fn send_line(&mut self, line: &str) {
        self.write
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("control send");
    }

    pub async fn reply(&mut self) -> ControlReply {
        let line = next_line(&mut self.lines).await;
        ControlReply::parse(&line).expect("parse control reply")
    }

    /// Join a room, expecting success, and return the UDP endpoint.
    pub async fn join(&mut self, room: &str) -> SocketAddr {
        self.send_line(&format!("JOIN:{room}")).await;
        match self.reply().await {
            ControlReply::Udp { host, port } => {
                format!("{host}:{port}").parse().expect("udp addr")
            }
            other => panic!("join failed: {other:?}"),
        }
    }
}

async fn next_line(lines: &mut tokio::io::Lines<BufReader<OwnedReadHalf>>) -> String {
    timeout(Duration::from_secs(5), lines.next_line())
        .await
        .expect("control read timed out")
        .expect("control read failed")
        .expect("control stream closed")
}

/// A gameplay endpoint registered with a room.
pub struct GameplayClient {
    pub socket: UdpSocket,
}

impl GameplayClient {
    /// Bind, register with `CONNECT:<id>`, and return the assigned role
    /// message (`ROLE:def` / `ROLE:att`).
    pub async fn register(room_addr: SocketAddr, client_id: u32) -> (GameplayClient, String) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("udp bind");
        socket.connect(room_addr).await.expect("udp connect");
        socket
            .send(GameplayMessage::Connect(client_id).encode().as_bytes())
            .await
            .expect("udp send");
        let client = GameplayClient { socket };
        let role = client.expect_message(|raw| raw.starts_with("ROLE:")).await;
        (client, role)
    }

    pub async fn send(&self, raw: &str) {
        self.socket.send(raw.as_bytes()).await.expect("udp send");
    }

    /// Receive datagrams until one matches, failing after 5 seconds.
    pub async fn expect_message(&self, matches: impl Fn(&str) -> bool) -> String {
        let mut buf = [0u8; 4096];
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let len = tokio::time::timeout_at(deadline, self.socket.recv(&mut buf))
                .await
                .expect("no matching datagram before timeout")
                .expect("udp recv");
            let raw = std::str::from_utf8(&buf[..len]).expect("utf8 datagram");
            if matches(raw) {
                return raw.to_string();
            }
        }
    }

    /// Assert that nothing matching arrives within the window. Used to pin
    /// down drop semantics: rejected and unauthorized actions are never
    /// relayed.
    pub async fn expect_silence(&self, window: Duration, matches: impl Fn(&str) -> bool) {
        let mut buf = [0u8; 4096];
        let deadline = tokio::time::Instant::now() + window;
        loop {
            match tokio::time::timeout_at(deadline, self.socket.recv(&mut buf)).await {
                Err(_) => return,
                Ok(received) => {
                    let len = received.expect("udp recv");
                    let raw = std::str::from_utf8(&buf[..len]).expect("utf8 datagram");
                    assert!(!matches(raw), "unexpected datagram: {raw:?}");
                }
            }
        }
    }
}
