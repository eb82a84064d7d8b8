//! Shared simulation and wire-protocol library for the lane-defense game.
//!
//! Everything in here is transport-free: the server's authoritative room
//! loop and each client's local mirror run the exact same `Game` engine,
//! and converge by replaying the same validated actions through it.

pub mod entities;
pub mod game;
pub mod protocol;
pub mod snapshot;
pub mod tuning;

pub use game::{Game, GameConfig, GameMode};
pub use protocol::Role;
pub use snapshot::GameSnapshot;
pub use tuning::{PlantKind, ZombieKind};
