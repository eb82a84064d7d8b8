//! Text wire protocol for the control (TCP) and gameplay (UDP) channels.
//!
//! Control messages are newline-delimited; gameplay messages are one
//! datagram each. Both use the `VERB:field:field` format. The snapshot
//! payload inside `GAME_STATE:` is JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::Game;
use crate::snapshot::GameSnapshot;
use crate::tuning::{PlantKind, ZombieKind};

/// Asymmetric side assignment, fixed for a room's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Defending side: places and manages plants.
    Def,
    /// Attacking side: spawns zombies.
    Att,
}

impl Role {
    pub fn wire_name(self) -> &'static str {
        match self {
            Role::Def => "def",
            Role::Att => "att",
        }
    }

    pub fn from_wire(name: &str) -> Option<Role> {
        match name {
            "def" => Some(Role::Def),
            "att" => Some(Role::Att),
            _ => None,
        }
    }

    pub fn opponent(self) -> Role {
        match self {
            Role::Def => Role::Att,
            Role::Att => Role::Def,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unknown message: {0:?}")]
    UnknownMessage(String),
    #[error("malformed field in {verb} message")]
    BadField { verb: &'static str },
    #[error("bad snapshot payload: {0}")]
    BadSnapshot(#[from] serde_json::Error),
}

fn field<'a>(parts: &mut std::str::Split<'a, char>, verb: &'static str) -> Result<&'a str, ParseError> {
    parts.next().ok_or(ParseError::BadField { verb })
}

fn num<T: std::str::FromStr>(raw: &str, verb: &'static str) -> Result<T, ParseError> {
    raw.trim().parse().map_err(|_| ParseError::BadField { verb })
}

/// Control-channel messages a client sends to the rendezvous layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    /// Join a room by name; the reserved name `public` selects shared
    /// matchmaking, anything else keys a private room.
    Join(String),
    Quit,
}

impl ControlRequest {
    pub fn encode(&self) -> String {
        match self {
            ControlRequest::Join(room) => format!("JOIN:{room}"),
            ControlRequest::Quit => "QUIT".to_string(),
        }
    }

    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_end();
        if let Some(room) = line.strip_prefix("JOIN:") {
            if room.is_empty() {
                return Err(ParseError::BadField { verb: "JOIN" });
            }
            return Ok(ControlRequest::Join(room.to_string()));
        }
        if line == "QUIT" || line.starts_with("QUIT:") {
            return Ok(ControlRequest::Quit);
        }
        Err(ParseError::UnknownMessage(line.to_string()))
    }
}

/// Control-channel messages the rendezvous layer sends to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlReply {
    /// Identity issued on connect.
    Id(u32),
    /// Lifecycle phase announcement (`STATE:1` = connect acknowledged).
    State(u8),
    /// Datagram endpoint for the joined room.
    Udp { host: String, port: u16 },
    Error(String),
}

impl ControlReply {
    pub fn encode(&self) -> String {
        match self {
            ControlReply::Id(id) => format!("ID:{id}"),
            ControlReply::State(n) => format!("STATE:{n}"),
            ControlReply::Udp { host, port } => format!("UDP:{host}:{port}"),
            ControlReply::Error(reason) => format!("ERROR:{reason}"),
        }
    }

    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_end();
        if let Some(raw) = line.strip_prefix("ID:") {
            return Ok(ControlReply::Id(num(raw, "ID")?));
        }
        if let Some(raw) = line.strip_prefix("STATE:") {
            return Ok(ControlReply::State(num(raw, "STATE")?));
        }
        if let Some(raw) = line.strip_prefix("UDP:") {
            let mut parts = raw.split(':');
            let host = field(&mut parts, "UDP")?.to_string();
            let port = num(field(&mut parts, "UDP")?, "UDP")?;
            return Ok(ControlReply::Udp { host, port });
        }
        if let Some(reason) = line.strip_prefix("ERROR:") {
            return Ok(ControlReply::Error(reason.to_string()));
        }
        Err(ParseError::UnknownMessage(line.to_string()))
    }
}

/// Gameplay-channel messages, shared by both directions of the datagram
/// endpoint. Action messages are relayed verbatim once the authority
/// accepts them, so clients re-parse exactly what the sender encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum GameplayMessage {
    /// Registers the sender's datagram address for a participant id.
    Connect(u32),
    /// Reply to `Connect`: the side this participant plays.
    Role(Role),
    /// Room lifecycle announcement (`STATE:2` = room active).
    State(u8),
    AddPlant { kind: PlantKind, row: usize, col: usize },
    AddZombie { kind: ZombieKind, row: usize },
    RemovePlant { row: usize, col: usize },
    Harvest { row: usize, col: usize },
    /// Terminal-only full state broadcast.
    GameState(Box<GameSnapshot>),
    /// Human-readable notice (peer departure etc.).
    System(String),
}

impl GameplayMessage {
    pub fn encode(&self) -> String {
        match self {
            GameplayMessage::Connect(id) => format!("CONNECT:{id}"),
            GameplayMessage::Role(role) => format!("ROLE:{}", role.wire_name()),
            GameplayMessage::State(n) => format!("STATE:{n}"),
            GameplayMessage::AddPlant { kind, row, col } => {
                format!("ADD_PLANT:{}:{row}:{col}", kind.wire_name())
            }
            GameplayMessage::AddZombie { kind, row } => {
                format!("ADD_ZOMBIE:{}:{row}", kind.wire_name())
            }
            GameplayMessage::RemovePlant { row, col } => format!("REMOVE_PLANT:{row}:{col}"),
            GameplayMessage::Harvest { row, col } => format!("HARVEST_SUNFLOWER:{row}:{col}"),
            GameplayMessage::GameState(snapshot) => {
                // Snapshot serialization is infallible for these types.
                let json = serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());
                format!("GAME_STATE:{json}")
            }
            GameplayMessage::System(text) => format!("SYSTEM:{text}"),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let raw = raw.trim_end();
        if let Some(rest) = raw.strip_prefix("CONNECT:") {
            return Ok(GameplayMessage::Connect(num(rest, "CONNECT")?));
        }
        if let Some(rest) = raw.strip_prefix("ROLE:") {
            let role =
                Role::from_wire(rest).ok_or(ParseError::BadField { verb: "ROLE" })?;
            return Ok(GameplayMessage::Role(role));
        }
        if let Some(rest) = raw.strip_prefix("STATE:") {
            return Ok(GameplayMessage::State(num(rest, "STATE")?));
        }
        if let Some(rest) = raw.strip_prefix("ADD_PLANT:") {
            let mut parts = rest.split(':');
            let kind = PlantKind::from_wire(field(&mut parts, "ADD_PLANT")?)
                .ok_or(ParseError::BadField { verb: "ADD_PLANT" })?;
            let row = num(field(&mut parts, "ADD_PLANT")?, "ADD_PLANT")?;
            let col = num(field(&mut parts, "ADD_PLANT")?, "ADD_PLANT")?;
            return Ok(GameplayMessage::AddPlant { kind, row, col });
        }
        if let Some(rest) = raw.strip_prefix("ADD_ZOMBIE:") {
            let mut parts = rest.split(':');
            let kind = ZombieKind::from_wire(field(&mut parts, "ADD_ZOMBIE")?)
                .ok_or(ParseError::BadField { verb: "ADD_ZOMBIE" })?;
            let row = num(field(&mut parts, "ADD_ZOMBIE")?, "ADD_ZOMBIE")?;
            return Ok(GameplayMessage::AddZombie { kind, row });
        }
        if let Some(rest) = raw.strip_prefix("REMOVE_PLANT:") {
            let mut parts = rest.split(':');
            let row = num(field(&mut parts, "REMOVE_PLANT")?, "REMOVE_PLANT")?;
            let col = num(field(&mut parts, "REMOVE_PLANT")?, "REMOVE_PLANT")?;
            return Ok(GameplayMessage::RemovePlant { row, col });
        }
        if let Some(rest) = raw.strip_prefix("HARVEST_SUNFLOWER:") {
            let mut parts = rest.split(':');
            let row = num(field(&mut parts, "HARVEST_SUNFLOWER")?, "HARVEST_SUNFLOWER")?;
            let col = num(field(&mut parts, "HARVEST_SUNFLOWER")?, "HARVEST_SUNFLOWER")?;
            return Ok(GameplayMessage::Harvest { row, col });
        }
        if let Some(rest) = raw.strip_prefix("GAME_STATE:") {
            let snapshot: GameSnapshot = serde_json::from_str(rest)?;
            return Ok(GameplayMessage::GameState(Box::new(snapshot)));
        }
        if let Some(text) = raw.strip_prefix("SYSTEM:") {
            return Ok(GameplayMessage::System(text.to_string()));
        }
        Err(ParseError::UnknownMessage(raw.to_string()))
    }

    /// The role allowed to originate this message, when it is a gameplay
    /// action subject to authorization. Non-action messages return `None`.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            GameplayMessage::AddPlant { .. }
            | GameplayMessage::RemovePlant { .. }
            | GameplayMessage::Harvest { .. } => Some(Role::Def),
            GameplayMessage::AddZombie { .. } => Some(Role::Att),
            _ => None,
        }
    }

    /// Replay an action against an engine, authoritative or mirror. Both
    /// sides call exactly this, which is what keeps discrete state
    /// converging. Returns whether the engine accepted the action.
    pub fn apply(&self, game: &mut Game) -> bool {
        match *self {
            GameplayMessage::AddPlant { kind, row, col } => game.add_plant(kind, row, col),
            GameplayMessage::AddZombie { kind, row } => game.add_zombie(kind, row, 0.0),
            GameplayMessage::RemovePlant { row, col } => game.remove_plant(row, col),
            GameplayMessage::Harvest { row, col } => {
                // Harvest is fire-and-forget: a not-ready generator on a
                // desynced mirror fails harmlessly with 0.
                game.harvest(row, col);
                true
            }
            _ => false,
        }
    }
}
