//! Serialized, sorted view of the world state.
//!
//! This is the payload carried by the terminal `GAME_STATE:` broadcast and
//! the read surface for the (out-of-scope) presentation layer. Ordering is
//! stable: plants and zombies are sorted by (row, position), so two
//! serializations of the same state diff cleanly.

use serde::{Deserialize, Serialize};

use crate::entities::{Plant, Projectile, Zombie};
use crate::protocol::Role;
use crate::tuning::{PlantKind, ZombieKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantState {
    pub kind: PlantKind,
    pub row: usize,
    pub col: usize,
    pub health: i32,
    pub ready: bool,
}

impl From<&Plant> for PlantState {
    fn from(plant: &Plant) -> Self {
        Self {
            kind: plant.kind,
            row: plant.row,
            col: plant.col,
            health: plant.health,
            ready: plant.ready,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZombieState {
    /// Stable identity for animation continuity across snapshots.
    pub id: u64,
    pub kind: ZombieKind,
    pub row: usize,
    pub col: f32,
    pub health: i32,
    pub eating: bool,
}

impl From<&Zombie> for ZombieState {
    fn from(zombie: &Zombie) -> Self {
        Self {
            id: zombie.id,
            kind: zombie.kind,
            row: zombie.row,
            col: zombie.col,
            health: zombie.health,
            eating: zombie.eating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileState {
    pub row: usize,
    pub col: f32,
}

impl From<&Projectile> for ProjectileState {
    fn from(projectile: &Projectile) -> Self {
        Self {
            row: projectile.row,
            col: projectile.col,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub plants: Vec<PlantState>,
    pub zombies: Vec<ZombieState>,
    pub projectiles: Vec<ProjectileState>,
    pub sun: u32,
    pub energy: u32,
    pub game_over: bool,
    pub winner: Option<Role>,
    /// One-shot feedback flag: a projectile connected since the last
    /// snapshot was taken.
    pub last_hit: bool,
}

impl GameSnapshot {
    /// Assemble a sorted snapshot from raw entity slices. The engine's
    /// `snapshot()` is the usual entry point; this is public so tests and
    /// presentation shims can fabricate states.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        plants: &[Plant],
        zombies: &[Zombie],
        projectiles: &[Projectile],
        sun: u32,
        energy: u32,
        game_over: bool,
        winner: Option<Role>,
        last_hit: bool,
    ) -> Self {
        let mut plants: Vec<PlantState> = plants.iter().map(PlantState::from).collect();
        plants.sort_by_key(|p| (p.row, p.col));
        let mut zombies: Vec<ZombieState> = zombies.iter().map(ZombieState::from).collect();
        zombies.sort_by(|a, b| {
            (a.row, a.col, a.id)
                .partial_cmp(&(b.row, b.col, b.id))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self {
            plants,
            zombies,
            projectiles: projectiles.iter().map(ProjectileState::from).collect(),
            sun,
            energy,
            game_over,
            winner,
            last_hit,
        }
    }
}
