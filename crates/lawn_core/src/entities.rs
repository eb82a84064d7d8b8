//! Entity model: plants, zombies, projectiles.
//!
//! Entities hold no reference to the engine. Cross-entity queries ("is a
//! zombie ahead of me", "which plant blocks me") are resolved by the engine
//! per tick and passed in, so each `update` stays a pure state step.

use crate::tuning::{
    self, PlantKind, ZombieKind, GRID_COLS, HARVEST_INTERVAL, HIT_RADIUS, PROJECTILE_DAMAGE,
    PROJECTILE_SPEED, SHOOT_INTERVAL,
};

#[derive(Debug, Clone)]
pub struct Plant {
    pub kind: PlantKind,
    pub row: usize,
    pub col: usize,
    pub health: i32,
    /// Candycane: seconds accrued toward the next harvest.
    pub harvest_timer: f32,
    /// Candycane: a harvest is waiting to be collected.
    pub ready: bool,
    /// Peashooter: seconds accrued toward the next shot.
    pub shoot_timer: f32,
}

impl Plant {
    pub fn new(kind: PlantKind, row: usize, col: usize) -> Self {
        Self {
            kind,
            row,
            col,
            health: kind.health(),
            harvest_timer: 0.0,
            ready: false,
            shoot_timer: 0.0,
        }
    }

    pub fn cost(&self) -> u32 {
        self.kind.cost()
    }

    /// Advance timers. `zombie_ahead` is true when any live zombie shares
    /// this plant's lane with a greater position. Returns a projectile when
    /// a peashooter fires this tick.
    pub fn update(&mut self, dt: f32, zombie_ahead: bool) -> Option<Projectile> {
        match self.kind {
            PlantKind::Candycane => {
                if !self.ready {
                    self.harvest_timer += dt;
                    if self.harvest_timer >= HARVEST_INTERVAL {
                        self.harvest_timer = 0.0;
                        self.ready = true;
                    }
                }
                None
            }
            PlantKind::Peashooter => {
                self.shoot_timer += dt;
                if self.shoot_timer >= SHOOT_INTERVAL && zombie_ahead {
                    self.shoot_timer = 0.0;
                    Some(Projectile::new(self.row, (self.col + 1) as f32))
                } else {
                    None
                }
            }
            PlantKind::Wallnut | PlantKind::Tallnut => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Collect an accrued harvest. Returns 0 unless ready; always resets
    /// the ready flag and timer so a desynced mirror converges harmlessly.
    pub fn harvest(&mut self) -> u32 {
        let sun = if self.kind == PlantKind::Candycane && self.ready {
            tuning::HARVEST_SUN
        } else {
            0
        };
        self.ready = false;
        self.harvest_timer = 0.0;
        sun
    }

    pub fn take_damage(&mut self, damage: i32) {
        self.health -= damage;
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }
}

#[derive(Debug, Clone)]
pub struct Zombie {
    pub kind: ZombieKind,
    /// Stable identity so presentation can track units across snapshots.
    pub id: u64,
    pub row: usize,
    /// Continuous lane position; decreases toward the house.
    pub col: f32,
    pub health: i32,
    pub attack_timer: f32,
    pub eating: bool,
}

impl Zombie {
    pub fn new(kind: ZombieKind, id: u64, row: usize, offset: f32) -> Self {
        Self {
            kind,
            id,
            row,
            col: GRID_COLS as f32 + offset,
            health: kind.health(),
            attack_timer: 0.0,
            eating: false,
        }
    }

    /// Advance or eat. When a blocking plant is passed in, the zombie
    /// halts (snapping just ahead of the plant on first contact) and bites
    /// on its attack interval; otherwise it resumes its walk.
    pub fn update(&mut self, dt: f32, blocking: Option<&mut Plant>) {
        match blocking {
            Some(plant) => {
                if !self.eating {
                    self.col = (plant.col + 1) as f32;
                    self.eating = true;
                }
                self.attack_timer += dt;
                if self.attack_timer >= self.kind.attack_interval() {
                    plant.take_damage(self.kind.attack_damage());
                    self.attack_timer = 0.0;
                }
            }
            None => {
                self.eating = false;
                self.col -= self.kind.speed() / 5.0 * dt;
            }
        }
    }

    pub fn take_damage(&mut self, damage: i32) {
        self.health -= damage;
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub row: usize,
    pub col: f32,
    pub speed: f32,
    pub damage: i32,
}

impl Projectile {
    pub fn new(row: usize, col: f32) -> Self {
        Self {
            row,
            col,
            speed: PROJECTILE_SPEED,
            damage: PROJECTILE_DAMAGE,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.col += self.speed * dt;
    }

    pub fn off_grid(&self) -> bool {
        self.col >= GRID_COLS as f32
    }

    pub fn hits(&self, zombie: &Zombie) -> bool {
        self.row == zombie.row && (self.col - zombie.col).abs() < HIT_RADIUS
    }
}
