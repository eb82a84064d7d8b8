//! Gameplay tuning: grid dimensions, unit stat tables, economy numbers.
//!
//! Keep this separate from runtime/server configuration (tick rates,
//! ports, buffer sizes) which lives with each binary.

use serde::{Deserialize, Serialize};

/// Lanes the zombies advance along.
pub const GRID_ROWS: usize = 5;
/// Cells per lane. Zombies spawn at `col = GRID_COLS as f32`.
pub const GRID_COLS: usize = 9;

/// A zombie whose position drops below this has breached the lawn.
pub const BREACH_COL: f32 = -1.0;

/// Starting sun for the defender.
pub const SUN_START: u32 = 50;
pub const SUN_CAP: u32 = 999;
/// Starting energy for the attacker.
pub const ENERGY_START: u32 = 50;
pub const ENERGY_CAP: u32 = 999;
/// Versus mode: passive energy income, every `ENERGY_INTERVAL` seconds.
pub const ENERGY_TICK: u32 = 25;
pub const ENERGY_INTERVAL: f32 = 5.0;
/// Energy granted to the attacker each time a plant dies.
pub const PLANT_KILL_ENERGY: u32 = 50;

/// Seconds for a candycane to become ready to harvest.
pub const HARVEST_INTERVAL: f32 = 5.0;
/// Sun granted per harvest.
pub const HARVEST_SUN: u32 = 25;
/// Seconds between peashooter shots while a zombie is in its lane.
pub const SHOOT_INTERVAL: f32 = 1.0;

/// Projectile speed in cells per second.
pub const PROJECTILE_SPEED: f32 = 5.0;
pub const PROJECTILE_DAMAGE: i32 = 20;
/// A projectile within this distance of a zombie in the same lane hits.
pub const HIT_RADIUS: f32 = 0.5;

/// Stationary defensive unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlantKind {
    /// Resource generator: accrues a harvestable sun payout.
    Candycane,
    /// Ranged: fires down its lane while a zombie is ahead of it.
    Peashooter,
    /// Blocking wall.
    Wallnut,
    /// Durable barrier: wallnut mechanics, more health.
    Tallnut,
}

impl PlantKind {
    pub const ALL: [PlantKind; 4] = [
        PlantKind::Candycane,
        PlantKind::Peashooter,
        PlantKind::Wallnut,
        PlantKind::Tallnut,
    ];

    pub fn cost(self) -> u32 {
        match self {
            PlantKind::Candycane => 50,
            PlantKind::Peashooter => 50,
            PlantKind::Wallnut => 50,
            PlantKind::Tallnut => 75,
        }
    }

    pub fn health(self) -> i32 {
        match self {
            PlantKind::Candycane => 100,
            PlantKind::Peashooter => 100,
            PlantKind::Wallnut => 300,
            PlantKind::Tallnut => 600,
        }
    }

    /// Wire name used by `ADD_PLANT:<kind>:...`.
    pub fn wire_name(self) -> &'static str {
        match self {
            PlantKind::Candycane => "candycane",
            PlantKind::Peashooter => "peashooter",
            PlantKind::Wallnut => "wallnut",
            PlantKind::Tallnut => "tallnut",
        }
    }

    pub fn from_wire(name: &str) -> Option<PlantKind> {
        PlantKind::ALL.into_iter().find(|k| k.wire_name() == name)
    }
}

/// Mobile attacker kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZombieKind {
    Basic,
    Cone,
    Bucket,
    Sprinter,
}

impl ZombieKind {
    pub const ALL: [ZombieKind; 4] = [
        ZombieKind::Basic,
        ZombieKind::Cone,
        ZombieKind::Bucket,
        ZombieKind::Sprinter,
    ];

    pub fn health(self) -> i32 {
        match self {
            ZombieKind::Basic => 100,
            ZombieKind::Cone => 200,
            ZombieKind::Bucket => 500,
            ZombieKind::Sprinter => 100,
        }
    }

    /// Raw speed stat; actual advance is `speed / 5` cells per second.
    pub fn speed(self) -> f32 {
        match self {
            ZombieKind::Sprinter => 3.0,
            _ => 1.0,
        }
    }

    pub fn attack_damage(self) -> i32 {
        10
    }

    /// Seconds between bites while eating a plant.
    pub fn attack_interval(self) -> f32 {
        1.0
    }

    /// Energy cost in versus mode.
    pub fn cost(self) -> u32 {
        match self {
            ZombieKind::Basic => 50,
            ZombieKind::Cone => 75,
            ZombieKind::Bucket => 100,
            ZombieKind::Sprinter => 75,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            ZombieKind::Basic => "basic",
            ZombieKind::Cone => "cone",
            ZombieKind::Bucket => "bucket",
            ZombieKind::Sprinter => "sprinter",
        }
    }

    pub fn from_wire(name: &str) -> Option<ZombieKind> {
        ZombieKind::ALL.into_iter().find(|k| k.wire_name() == name)
    }
}

/// Solo-mode spawn director tuning.
#[derive(Debug, Clone, Copy)]
pub struct DirectorTuning {
    /// Seconds between waves.
    pub wave_interval: f32,
    /// Delay before the first zombie of a wave appears.
    pub wave_lead_in: f32,
    /// Stagger between zombies within a wave.
    pub wave_stagger: f32,
}

impl Default for DirectorTuning {
    fn default() -> Self {
        Self {
            wave_interval: 30.0,
            wave_lead_in: 2.0,
            wave_stagger: 0.3,
        }
    }
}
