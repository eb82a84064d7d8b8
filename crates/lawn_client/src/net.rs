//! Control-channel handshake and the gameplay loop.
//!
//! Connection lifecycle mirrors the server's expectations: the reliable
//! TCP channel is only used to obtain an identity and a room's datagram
//! endpoint (and to say `QUIT`); everything during play rides the
//! unreliable UDP channel with no acknowledgements.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use lawn_core::protocol::{
    ControlReply, ControlRequest, GameplayMessage, ParseError, Role,
};

/// Attempts and per-attempt wait for the `CONNECT` → `ROLE` exchange. The
/// channel is lossy; a lost reply is recovered by re-sending `CONNECT`.
const ROLE_ATTEMPTS: u32 = 5;
const ROLE_WAIT: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub enum NetError {
    Io(std::io::Error),
    Protocol(ParseError),
    /// Control stream closed before the handshake completed.
    ControlClosed,
    /// Server answered `JOIN` with `ERROR:<reason>`.
    JoinRejected(String),
    /// No `ROLE:` reply after all `CONNECT` attempts.
    RoleTimeout,
}

impl From<std::io::Error> for NetError {
    fn from(e: std::io::Error) -> Self {
        NetError::Io(e)
    }
}

impl From<ParseError> for NetError {
    fn from(e: ParseError) -> Self {
        NetError::Protocol(e)
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Control-channel address, `host:port`.
    pub server_addr: String,
    /// Room name; `public` selects shared matchmaking.
    pub room: String,
}

/// An established connection: identity issued, room joined, role assigned.
pub struct Session {
    pub client_id: u32,
    pub role: Role,
    pub udp: Arc<UdpSocket>,
    control_tx: OwnedWriteHalf,
    // Held open so the server keeps our membership alive.
    _control_rx: BufReader<OwnedReadHalf>,
}

impl Session {
    /// Announce departure on the control channel.
    pub async fn quit(&mut self) {
        let line = format!("{}\n", ControlRequest::Quit.encode());
        if let Err(e) = self.control_tx.write_all(line.as_bytes()).await {
            debug!(error = %e, "quit send failed");
        }
    }
}

/// Full rendezvous: TCP handshake, room join, UDP registration.
pub async fn connect(config: &ClientConfig) -> Result<Session, NetError> {
    let stream = TcpStream::connect(&config.server_addr).await?;
    let (read_half, mut control_tx) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    // Identity arrives first; tolerate STATE announcements around it.
    let client_id = loop {
        match read_reply(&mut lines).await? {
            ControlReply::Id(id) => break id,
            ControlReply::State(n) => debug!(phase = n, "lifecycle announcement"),
            other => debug!(?other, "ignoring pre-identity reply"),
        }
    };
    info!(client_id, "identity issued");

    let join = format!("{}\n", ControlRequest::Join(config.room.clone()).encode());
    control_tx.write_all(join.as_bytes()).await?;

    let (host, port) = loop {
        match read_reply(&mut lines).await? {
            ControlReply::Udp { host, port } => break (host, port),
            ControlReply::Error(reason) => return Err(NetError::JoinRejected(reason)),
            ControlReply::State(n) => debug!(phase = n, "lifecycle announcement"),
            other => debug!(?other, "ignoring reply while joining"),
        }
    };
    info!(client_id, host = %host, port, "room endpoint received");

    let udp = UdpSocket::bind("0.0.0.0:0").await?;
    udp.connect((host.as_str(), port)).await?;
    let role = request_role(&udp, client_id).await?;
    info!(client_id, role = role.wire_name(), "role assigned");

    Ok(Session {
        client_id,
        role,
        udp: Arc::new(udp),
        control_tx,
        _control_rx: lines.into_inner(),
    })
}

async fn read_reply(
    lines: &mut tokio::io::Lines<BufReader<OwnedReadHalf>>,
) -> Result<ControlReply, NetError> {
    let line = lines
        .next_line()
        .await?
        .ok_or(NetError::ControlClosed)?;
    Ok(ControlReply::parse(&line)?)
}

/// Register the gameplay endpoint, retrying until a `ROLE:` comes back.
async fn request_role(udp: &UdpSocket, client_id: u32) -> Result<Role, NetError> {
    let connect = GameplayMessage::Connect(client_id).encode();
    let mut buf = [0u8; 2048];
    for attempt in 0..ROLE_ATTEMPTS {
        udp.send(connect.as_bytes()).await?;
        let deadline = tokio::time::Instant::now() + ROLE_WAIT;
        loop {
            let received = match tokio::time::timeout_at(deadline, udp.recv(&mut buf)).await {
                Ok(result) => result?,
                Err(_) => break,
            };
            match parse_datagram(&buf[..received]) {
                Some(GameplayMessage::Role(role)) => return Ok(role),
                // Anything else this early (a premature STATE:2, say) is
                // droppable; the room resends what matters.
                Some(other) => debug!(?other, attempt, "ignoring datagram while awaiting role"),
                None => {}
            }
        }
        debug!(attempt, "role reply timed out, re-sending connect");
    }
    Err(NetError::RoleTimeout)
}

fn parse_datagram(raw: &[u8]) -> Option<GameplayMessage> {
    let text = std::str::from_utf8(raw).ok()?;
    match GameplayMessage::parse(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            debug!(error = %e, "malformed datagram ignored");
            None
        }
    }
}

/// Pump the gameplay channel until the game ends or the caller hangs up.
///
/// Inbound validated actions (and the terminal `GAME_STATE`) are forwarded
/// to the mirror; outbound actions from the local player are sent to the
/// authority and NOT applied locally, since the mirror waits for the relay.
pub async fn run_session(
    session: &mut Session,
    mut outgoing_rx: mpsc::Receiver<GameplayMessage>,
    relay_tx: mpsc::Sender<GameplayMessage>,
) -> Result<(), NetError> {
    let mut buf = [0u8; 4096];
    loop {
        tokio::select! {
            received = session.udp.recv(&mut buf) => {
                let len = received?;
                let Some(msg) = parse_datagram(&buf[..len]) else { continue };
                match msg {
                    GameplayMessage::State(phase) => {
                        info!(phase, "room lifecycle update");
                    }
                    GameplayMessage::System(text) => {
                        info!(notice = %text, "system message");
                    }
                    GameplayMessage::Connect(_) | GameplayMessage::Role(_) => {}
                    GameplayMessage::GameState(snapshot) => {
                        let terminal = snapshot.game_over;
                        let _ = relay_tx.send(GameplayMessage::GameState(snapshot)).await;
                        if terminal {
                            session.quit().await;
                            return Ok(());
                        }
                    }
                    action => {
                        if relay_tx.send(action).await.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
            action = outgoing_rx.recv() => {
                let Some(action) = action else {
                    session.quit().await;
                    return Ok(());
                };
                // Save a pointless round trip on the wrong role; the
                // authority validates regardless.
                if action.required_role().is_some_and(|r| r != session.role) {
                    warn!(role = session.role.wire_name(), action = %action.encode(),
                        "action not permitted for our role");
                    continue;
                }
                session.udp.send(action.encode().as_bytes()).await?;
            }
        }
    }
}
