//! The simulation engine.
//!
//! `Game` advances the whole world by real-time deltas, independent of
//! transport or role: the server's room loop and every client mirror run
//! the same code. All entity removal uses mark-and-reap so a unit killed
//! mid-pass is never processed twice in the same tick.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::entities::{Plant, Projectile, Zombie};
use crate::protocol::Role;
use crate::snapshot::GameSnapshot;
use crate::tuning::{
    self, DirectorTuning, PlantKind, ZombieKind, BREACH_COL, GRID_COLS, GRID_ROWS,
};

/// Who drives the attacking side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// One human defends; the engine's spawn director attacks. Energy is
    /// never charged or regenerated.
    Solo,
    /// Two participants with asymmetric roles and a live energy economy.
    Versus,
}

/// Configuration for starting a new engine.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub mode: GameMode,
    /// RNG seed for the solo spawn director. Same seed = same spawns.
    pub seed: u64,
    pub director: DirectorTuning,
}

impl GameConfig {
    pub fn versus() -> Self {
        Self {
            mode: GameMode::Versus,
            seed: 0,
            director: DirectorTuning::default(),
        }
    }

    pub fn solo(seed: u64) -> Self {
        Self {
            mode: GameMode::Solo,
            seed,
            director: DirectorTuning::default(),
        }
    }
}

/// A zombie scheduled by the solo director for a future instant of the
/// engine's own clock.
#[derive(Debug, Clone)]
struct PendingZombie {
    kind: ZombieKind,
    row: usize,
    offset: f32,
    at: f32,
}

pub struct Game {
    mode: GameMode,
    occupied: [[bool; GRID_COLS]; GRID_ROWS],
    plants: Vec<Plant>,
    zombies: Vec<Zombie>,
    projectiles: Vec<Projectile>,
    sun: u32,
    energy: u32,
    energy_timer: f32,
    /// Engine-clock seconds since construction.
    elapsed: f32,
    game_over: bool,
    winner: Option<Role>,
    /// One-shot presentation flag, cleared when a snapshot is taken.
    last_hit: bool,
    next_zombie_id: u64,
    pending: Vec<PendingZombie>,
    // Solo director state.
    director: DirectorTuning,
    difficulty: u32,
    spawn_interval: f32,
    last_spawn: f32,
    last_wave: f32,
    rng: ChaCha8Rng,
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        Self {
            mode: config.mode,
            occupied: [[false; GRID_COLS]; GRID_ROWS],
            plants: Vec::new(),
            zombies: Vec::new(),
            projectiles: Vec::new(),
            sun: tuning::SUN_START,
            energy: tuning::ENERGY_START,
            energy_timer: 0.0,
            elapsed: 0.0,
            game_over: false,
            winner: None,
            last_hit: false,
            next_zombie_id: 1,
            pending: Vec::new(),
            director: config.director,
            difficulty: 1,
            spawn_interval: 7.0,
            last_spawn: 0.0,
            last_wave: 0.0,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    pub fn winner(&self) -> Option<Role> {
        self.winner
    }

    pub fn sun(&self) -> u32 {
        self.sun
    }

    pub fn energy(&self) -> u32 {
        self.energy
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advance the world by `dt` seconds. No-op once terminal.
    pub fn update(&mut self, dt: f32) {
        if self.game_over {
            return;
        }
        self.elapsed += dt;

        if self.mode == GameMode::Solo {
            self.run_director();
        } else {
            self.energy_timer += dt;
            if self.energy_timer >= tuning::ENERGY_INTERVAL {
                self.energy_timer = 0.0;
                self.energy = (self.energy + tuning::ENERGY_TICK).min(tuning::ENERGY_CAP);
            }
        }

        self.drain_pending();
        self.step_plants(dt);
        self.step_projectiles(dt);
        self.step_zombies(dt);
        self.reap_dead_plants();
    }

    /// Release scheduled wave spawns whose time has arrived.
    fn drain_pending(&mut self) {
        let now = self.elapsed;
        let due: Vec<PendingZombie> = {
            let (due, rest): (Vec<_>, Vec<_>) =
                self.pending.drain(..).partition(|p| now >= p.at);
            self.pending = rest;
            due
        };
        for spawn in due {
            self.spawn_zombie(spawn.kind, spawn.row, spawn.offset);
        }
    }

    fn step_plants(&mut self, dt: f32) {
        let mut fired: Vec<Projectile> = Vec::new();
        for plant in &mut self.plants {
            let zombie_ahead = self
                .zombies
                .iter()
                .any(|z| z.row == plant.row && z.col > plant.col as f32);
            if let Some(projectile) = plant.update(dt, zombie_ahead) {
                fired.push(projectile);
            }
        }
        self.projectiles.extend(fired);
    }

    fn step_projectiles(&mut self, dt: f32) {
        let mut spent = vec![false; self.projectiles.len()];
        for (pi, projectile) in self.projectiles.iter_mut().enumerate() {
            projectile.update(dt);
            for zombie in &mut self.zombies {
                // A zombie killed earlier in this pass absorbs no more hits.
                if zombie.is_dead() {
                    continue;
                }
                if projectile.hits(zombie) {
                    zombie.take_damage(projectile.damage);
                    self.last_hit = true;
                    spent[pi] = true;
                    break;
                }
            }
            // Off-grid cleanup runs after collision: a shot fired from the
            // last column can still land on a zombie at the spawn edge.
            if !spent[pi] && projectile.off_grid() {
                spent[pi] = true;
            }
        }
        let mut keep = spent.iter().map(|s| !s);
        self.projectiles.retain(|_| keep.next().unwrap_or(true));
        self.zombies.retain(|z| !z.is_dead());
    }

    fn step_zombies(&mut self, dt: f32) {
        let mut breached: Option<usize> = None;
        for zi in 0..self.zombies.len() {
            let (row, col) = (self.zombies[zi].row, self.zombies[zi].col);
            let blocking = self.blocking_plant_index(row, col);
            match blocking {
                Some(pi) => self.zombies[zi].update(dt, Some(&mut self.plants[pi])),
                None => self.zombies[zi].update(dt, None),
            }
            if self.zombies[zi].col < BREACH_COL {
                breached = Some(zi);
                break;
            }
        }
        if let Some(zi) = breached {
            let zombie = self.zombies.remove(zi);
            self.game_over = true;
            if self.mode == GameMode::Versus {
                self.winner = Some(Role::Att);
            }
            debug!(row = zombie.row, kind = zombie.kind.wire_name(), "lawn breached");
        }
    }

    /// The plant directly ahead of a zombie in its lane: highest column
    /// still at or just behind the zombie's cell.
    fn blocking_plant_index(&self, row: usize, col: f32) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (pi, plant) in self.plants.iter().enumerate() {
            if plant.row != row || plant.is_dead() {
                continue;
            }
            let pc = plant.col as f32;
            if pc <= col && pc >= col.floor() - 0.1 {
                match best {
                    Some(bi) if self.plants[bi].col >= plant.col => {}
                    _ => best = Some(pi),
                }
            }
        }
        best
    }

    fn reap_dead_plants(&mut self) {
        let mut freed = 0u32;
        for plant in self.plants.iter().filter(|p| p.is_dead()) {
            self.occupied[plant.row][plant.col] = false;
            freed += 1;
        }
        if freed > 0 {
            self.plants.retain(|p| !p.is_dead());
            self.energy =
                (self.energy + freed * tuning::PLANT_KILL_ENERGY).min(tuning::ENERGY_CAP);
        }
    }

    /// Place a plant. Fails on out-of-bounds, occupied cell, or
    /// insufficient sun; success debits the cost and occupies the cell.
    pub fn add_plant(&mut self, kind: PlantKind, row: usize, col: usize) -> bool {
        if row >= GRID_ROWS || col >= GRID_COLS {
            debug!(row, col, "plant placement out of bounds");
            return false;
        }
        if self.occupied[row][col] {
            debug!(row, col, "cell already occupied");
            return false;
        }
        let cost = kind.cost();
        if cost > self.sun {
            debug!(cost, sun = self.sun, "not enough sun");
            return false;
        }
        self.sun -= cost;
        self.occupied[row][col] = true;
        self.plants.push(Plant::new(kind, row, col));
        true
    }

    /// Spawn a zombie at the lane's far edge. In versus mode the attack
    /// side pays the kind's energy cost; solo spawns are free.
    pub fn add_zombie(&mut self, kind: ZombieKind, row: usize, offset: f32) -> bool {
        if row >= GRID_ROWS {
            debug!(row, "zombie row out of bounds");
            return false;
        }
        if self.mode == GameMode::Versus {
            let cost = kind.cost();
            if cost > self.energy {
                debug!(cost, energy = self.energy, "not enough energy");
                return false;
            }
            self.energy -= cost;
        }
        self.spawn_zombie(kind, row, offset);
        true
    }

    fn spawn_zombie(&mut self, kind: ZombieKind, row: usize, offset: f32) {
        let id = self.next_zombie_id;
        self.next_zombie_id += 1;
        self.zombies.push(Zombie::new(kind, id, row, offset));
    }

    /// Dig up a plant, refunding half its cost (rounded down).
    pub fn remove_plant(&mut self, row: usize, col: usize) -> bool {
        if row >= GRID_ROWS || col >= GRID_COLS {
            debug!(row, col, "removal out of bounds");
            return false;
        }
        let Some(pi) = self
            .plants
            .iter()
            .position(|p| p.row == row && p.col == col)
        else {
            debug!(row, col, "no plant to remove");
            return false;
        };
        let refund = self.plants[pi].cost() / 2;
        self.plants.remove(pi);
        self.occupied[row][col] = false;
        self.sun = (self.sun + refund).min(tuning::SUN_CAP);
        true
    }

    /// Collect a ready candycane. Returns the sun gained, 0 if the cell
    /// holds no candycane or it is not ready (the mirror may disagree with
    /// the authority about readiness; both outcomes are harmless).
    pub fn harvest(&mut self, row: usize, col: usize) -> u32 {
        let Some(plant) = self
            .plants
            .iter_mut()
            .find(|p| p.row == row && p.col == col && p.kind == PlantKind::Candycane)
        else {
            return 0;
        };
        let sun = plant.harvest();
        self.sun = (self.sun + sun).min(tuning::SUN_CAP);
        sun
    }

    /// Materialize a stable, sorted view of the world. Clears the one-shot
    /// `last_hit` presentation flag.
    pub fn snapshot(&mut self) -> GameSnapshot {
        let last_hit = std::mem::take(&mut self.last_hit);
        GameSnapshot::build(
            &self.plants,
            &self.zombies,
            &self.projectiles,
            self.sun,
            self.energy,
            self.game_over,
            self.winner,
            last_hit,
        )
    }

    // --- Solo spawn director -------------------------------------------

    fn run_director(&mut self) {
        self.difficulty = 1 + (self.elapsed / 60.0) as u32;
        self.spawn_interval = (7.0 - 0.5 * self.difficulty as f32).max(2.0);

        if self.elapsed - self.last_wave >= self.director.wave_interval {
            self.schedule_wave();
            self.last_wave = self.elapsed;
        } else if self.elapsed - self.last_spawn > self.spawn_interval {
            let kind = self.choose_zombie_kind();
            let row = self.rng.gen_range(0..GRID_ROWS);
            self.spawn_zombie(kind, row, 0.0);
            self.last_spawn = self.elapsed;
        }
    }

    /// Queue a staggered burst of spawns instead of one zombie.
    fn schedule_wave(&mut self) {
        let size = 2 + (self.difficulty - 1) * 2;
        debug!(size, level = self.difficulty, "scheduling wave");
        for i in 0..size {
            let kind = self.choose_zombie_kind();
            let row = self.rng.gen_range(0..GRID_ROWS);
            let stagger = i as f32 * self.director.wave_stagger;
            self.pending.push(PendingZombie {
                kind,
                row,
                offset: stagger,
                at: self.elapsed + self.director.wave_lead_in + stagger,
            });
        }
    }

    /// Weighted pick that shifts toward tougher kinds as difficulty rises.
    fn choose_zombie_kind(&mut self) -> ZombieKind {
        let level = self.difficulty;
        let weights = [
            (ZombieKind::Basic, 10u32.saturating_sub(level * 2).max(1)),
            (ZombieKind::Cone, 5u32.saturating_sub(level).max(1)),
            (ZombieKind::Bucket, level.saturating_sub(2).max(1)),
        ];
        let total: u32 = weights.iter().map(|(_, w)| w).sum();
        let mut pick = self.rng.gen_range(0..total);
        for (kind, weight) in weights {
            if pick < weight {
                return kind;
            }
            pick -= weight;
        }
        ZombieKind::Basic
    }

    #[cfg(test)]
    pub(crate) fn zombies(&self) -> &[Zombie] {
        &self.zombies
    }

    #[cfg(test)]
    pub(crate) fn plants(&self) -> &[Plant] {
        &self.plants
    }

    #[cfg(test)]
    pub(crate) fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }
}

#[cfg(test)]
mod tests;
