//! Match orchestration: the state machine and the per-tick loop.
//!
//! The simulation owns the whole entity population and advances it in a
//! fixed phase order each tick. The order is load-bearing: an entity
//! killed during collision resolution is never treated as alive later
//! in the same tick, and no phase observes a collection another phase
//! is mutating.
//!
//! # Determinism
//!
//! All randomness flows through one seeded [`ChaCha8Rng`] and all
//! wall-clock reads go through the injected [`Clock`], so the same
//! seed, clock schedule and intent schedule reproduce the same match.
//!
//! # Example
//!
//! ```
//! use tank_core::geometry::Direction;
//! use tank_core::simulation::{MatchState, Simulation};
//!
//! let mut sim = Simulation::new();
//! sim.start_match(3, 1);
//! assert_eq!(sim.state(), MatchState::Running);
//!
//! sim.set_player_move_intent(Some(Direction::Right));
//! sim.request_player_fire();
//! sim.tick();
//! ```

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::arena::{Arena, MapTheme};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SimError};
use crate::geometry::{Direction, Rect};
use crate::units::{
    random_direction, Combatant, ImpactEffect, Projectile, COMBATANT_SIZE, ENEMY_STEP, PLAYER_STEP,
};

/// Ticks per second the external driver should target.
pub const TICK_RATE: u32 = 50;

/// Duration of one tick in milliseconds.
pub const TICK_PERIOD_MS: u64 = 1000 / TICK_RATE as u64;

/// Per-tick probability that an off-cooldown enemy attempts to fire.
const ENEMY_FIRE_CHANCE: f64 = 0.05;

/// Half-width of the enemy sight corridor.
const SIGHT_CORRIDOR: i32 = 50;

/// Length of the enemy sight corridor.
const SIGHT_RANGE: i32 = 500;

/// Offset that roughly centres a wall-hit flash on the impact point.
const WALL_HIT_OFFSET: i32 = 15;

/// Inclusive clamp bounds for the enemy count at match start.
const MIN_ENEMIES: u32 = 1;
const MAX_ENEMIES: u32 = 50;

/// Seed used when the embedder does not supply one.
const DEFAULT_SEED: u64 = 12345;

/// Lifecycle state of a match.
///
/// Only `Running` executes ticks. `Victory` and `Defeat` are terminal
/// display states for the finished match; `return_to_menu` is the only
/// way out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchState {
    /// No match in progress.
    #[default]
    Menu,
    /// Match in progress; `tick` advances the world.
    Running,
    /// All enemies destroyed. Terminal.
    Victory,
    /// Player destroyed. Terminal.
    Defeat,
}

/// Match configuration consumed by [`Simulation::start_match_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Requested enemy count; clamped into `[1, 50]` at match start.
    pub enemy_count: u32,
    /// Map layout id; unrecognized ids yield an empty bordered map.
    pub map_id: i32,
    /// RNG seed for spawn positions and enemy behavior.
    pub seed: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            enemy_count: 3,
            map_id: 1,
            seed: DEFAULT_SEED,
        }
    }
}

impl MatchConfig {
    /// Set the enemy count.
    #[must_use]
    pub const fn with_enemy_count(mut self, enemy_count: u32) -> Self {
        self.enemy_count = enemy_count;
        self
    }

    /// Set the map id.
    #[must_use]
    pub const fn with_map_id(mut self, map_id: i32) -> Self {
        self.map_id = map_id;
        self
    }

    /// Set the RNG seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Owned copy of the visible world after a tick.
///
/// Presentation layers on another thread read these instead of
/// iterating the live collections; the codec methods make the copy
/// transportable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Match state at the end of the last tick.
    pub state: MatchState,
    /// Theme label of the current map.
    pub theme: MapTheme,
    /// Enemies destroyed so far.
    pub score: u32,
    /// The player combatant, if a match has been started.
    pub player: Option<Combatant>,
    /// Living enemy combatants.
    pub enemies: Vec<Combatant>,
    /// Projectiles in flight.
    pub projectiles: Vec<Projectile>,
    /// Impact effects still animating.
    pub effects: Vec<ImpactEffect>,
    /// Obstacle rectangles of the current map.
    pub obstacles: Vec<Rect>,
}

impl WorldSnapshot {
    /// Serialize the snapshot to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Snapshot`] if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| SimError::Snapshot {
            message: e.to_string(),
        })
    }

    /// Deserialize a snapshot from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Snapshot`] if decoding fails.
    pub fn decode(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| SimError::Snapshot {
            message: e.to_string(),
        })
    }
}

/// The core combat simulation.
///
/// Owns the arena, the entity population and the match state for the
/// match's lifetime. All mutation happens inside [`tick`](Self::tick)
/// and the intent/boundary methods; readers get shared slices or an
/// owned [`WorldSnapshot`].
///
/// # Tick phase order
///
/// 1. **Consume intents** - apply queued player facing/movement, fire
///    if requested and off cooldown
/// 2. **Advance timers** - projectiles move one speed-step and die at
///    the map boundary; effects count down
/// 3. **Resolve movement** - validate projected boxes against bounds
///    and obstacles; rejected enemy moves pick a new random facing
/// 4. **Enemy fire** - cooldown, chance and sight-corridor gated
/// 5. **Collision resolution** - walls first, then combatants, over a
///    stable snapshot of the projectile list
/// 6. **Cleanup** - drop everything with a cleared liveness flag
/// 7. **Match end** - victory checked before defeat; both terminal
#[derive(Debug, Clone)]
pub struct Simulation {
    state: MatchState,
    arena: Arena,
    player: Option<Combatant>,
    enemies: Vec<Combatant>,
    projectiles: Vec<Projectile>,
    effects: Vec<ImpactEffect>,
    score: u32,
    target_enemy_count: u32,
    tick: u64,
    rng: ChaCha8Rng,
    clock: Arc<dyn Clock>,
    move_intent: Option<Direction>,
    fire_requested: bool,
}

impl Simulation {
    /// Create a simulation in the menu state with the system clock and
    /// the default seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock_and_seed(Arc::new(SystemClock::new()), DEFAULT_SEED)
    }

    /// Create a simulation with a specific seed and the system clock.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_clock_and_seed(Arc::new(SystemClock::new()), seed)
    }

    /// Create a simulation with a specific clock and the default seed.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_clock_and_seed(clock, DEFAULT_SEED)
    }

    /// Create a simulation with a specific clock and seed.
    #[must_use]
    pub fn with_clock_and_seed(clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self {
            state: MatchState::Menu,
            arena: Arena::build(0),
            player: None,
            enemies: Vec::new(),
            projectiles: Vec::new(),
            effects: Vec::new(),
            score: 0,
            target_enemy_count: 0,
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            clock,
            move_intent: None,
            fire_requested: false,
        }
    }

    /// Start a match: build the arena, spawn the population, reset the
    /// score and transition to `Running`.
    ///
    /// `enemy_count` is clamped into `[1, 50]`; an unrecognized
    /// `map_id` falls back to an empty bordered map. Malformed
    /// configuration is never an error.
    pub fn start_match(&mut self, enemy_count: u32, map_id: i32) {
        let clamped = enemy_count.clamp(MIN_ENEMIES, MAX_ENEMIES);
        if clamped != enemy_count {
            tracing::debug!(requested = enemy_count, clamped, "enemy count clamped");
        }

        self.arena = Arena::build(map_id);

        let size = (COMBATANT_SIZE, COMBATANT_SIZE);
        let (px, py) = self.arena.find_safe_spawn(&mut self.rng, size);
        self.player = Some(Combatant::player(px, py));

        self.enemies.clear();
        for _ in 0..clamped {
            let (x, y) = self.arena.find_safe_spawn(&mut self.rng, size);
            self.enemies.push(Combatant::enemy(x, y));
        }

        self.projectiles.clear();
        self.effects.clear();
        self.score = 0;
        self.target_enemy_count = clamped;
        self.tick = 0;
        self.move_intent = None;
        self.fire_requested = false;
        self.state = MatchState::Running;
        tracing::debug!(enemy_count = clamped, map_id, "match started");
    }

    /// Start a match from a [`MatchConfig`], reseeding the RNG first so
    /// the whole match replays from the config alone.
    pub fn start_match_with(&mut self, config: MatchConfig) {
        self.rng = ChaCha8Rng::seed_from_u64(config.seed);
        self.start_match(config.enemy_count, config.map_id);
    }

    /// Record the player's intended facing/movement for the next tick.
    ///
    /// `Some(direction)` means face that way and advance; `None` means
    /// stand still. Ignored unless the match is running.
    pub fn set_player_move_intent(&mut self, direction: Option<Direction>) {
        if self.state == MatchState::Running {
            self.move_intent = direction;
        }
    }

    /// Queue a fire attempt for the next tick.
    ///
    /// The cooldown is checked when the intent is consumed. Ignored
    /// unless the match is running.
    pub fn request_player_fire(&mut self) {
        if self.state == MatchState::Running {
            self.fire_requested = true;
        }
    }

    /// Force the state back to the menu from anywhere.
    pub fn return_to_menu(&mut self) {
        self.state = MatchState::Menu;
    }

    /// Advance the simulation exactly one step.
    ///
    /// No-op unless the match is running. Runs the phases documented on
    /// [`Simulation`] in order; every phase is total, so `tick` cannot
    /// fail.
    pub fn tick(&mut self) {
        if self.state != MatchState::Running {
            return;
        }
        let now = self.clock.now_ms();

        self.consume_intents(now);
        self.advance_timers();
        self.resolve_movement();
        self.enemy_fire(now);
        self.resolve_collisions();
        self.prune_dead();
        self.evaluate_match_end();

        self.tick += 1;
        tracing::trace!(
            tick = self.tick,
            enemies = self.enemies.len(),
            projectiles = self.projectiles.len(),
            score = self.score,
            "tick complete"
        );
    }

    /// Apply the queued player intents.
    fn consume_intents(&mut self, now_ms: u64) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        if !player.is_alive() {
            self.fire_requested = false;
            return;
        }

        match self.move_intent {
            Some(direction) => {
                player.set_direction(direction);
                player.set_moving(true);
            }
            None => player.set_moving(false),
        }

        if std::mem::take(&mut self.fire_requested) {
            if let Some(shot) = player.try_fire(now_ms) {
                self.projectiles.push(shot);
            }
        }
    }

    /// Advance projectiles and effect lifetimes.
    fn advance_timers(&mut self) {
        for shot in &mut self.projectiles {
            shot.advance();
        }
        for effect in &mut self.effects {
            effect.advance();
        }
    }

    /// Validate and commit movement intents.
    ///
    /// A projected box that leaves the map or overlaps an obstacle
    /// rejects the move. Rejected enemy moves immediately pick a new
    /// random facing - crude obstacle avoidance, not pathfinding.
    fn resolve_movement(&mut self) {
        if let Some(player) = self.player.as_mut() {
            if player.is_alive() && player.is_moving() {
                let future = player.projected_bounds(PLAYER_STEP);
                if self.arena.contains(&future) && !self.arena.blocks(&future) {
                    player.commit_move(future.x, future.y);
                }
            }
        }

        for enemy in &mut self.enemies {
            enemy.steer(&mut self.rng);
            if !enemy.is_alive() || !enemy.is_moving() {
                continue;
            }
            let future = enemy.projected_bounds(ENEMY_STEP);
            if self.arena.contains(&future) && !self.arena.blocks(&future) {
                enemy.commit_move(future.x, future.y);
            } else {
                enemy.set_direction(random_direction(&mut self.rng));
            }
        }
    }

    /// Chance-gated enemy fire at the player.
    fn enemy_fire(&mut self, now_ms: u64) {
        let Some((px, py)) = self.player.as_ref().map(|p| (p.x(), p.y())) else {
            return;
        };

        for enemy in &mut self.enemies {
            if !enemy.is_alive() || !enemy.can_fire(now_ms) {
                continue;
            }
            if !self.rng.gen_bool(ENEMY_FIRE_CHANCE) {
                continue;
            }
            if !in_sight_corridor(enemy.x(), enemy.y(), px, py) {
                continue;
            }
            if let Some(shot) = enemy.try_fire(now_ms) {
                self.projectiles.push(shot);
            }
        }
    }

    /// Resolve projectile collisions over a stable snapshot of the
    /// projectile list (this tick's new projectiles included).
    ///
    /// Per projectile, in list order: walls first, then the opposing
    /// side. A projectile damages at most one combatant, and only a
    /// killing hit on an enemy scores.
    fn resolve_collisions(&mut self) {
        for shot in &mut self.projectiles {
            if !shot.is_alive() {
                continue;
            }
            let bounds = shot.bounds();

            if self.arena.blocks(&bounds) {
                shot.kill();
                self.effects.push(ImpactEffect::new(
                    shot.x() - WALL_HIT_OFFSET,
                    shot.y() - WALL_HIT_OFFSET,
                ));
                continue;
            }

            if shot.is_from_player() {
                for enemy in &mut self.enemies {
                    if enemy.is_alive() && enemy.bounds().intersects(&bounds) {
                        enemy.apply_damage();
                        shot.kill();
                        if !enemy.is_alive() {
                            self.score += 1;
                            self.effects.push(ImpactEffect::new(enemy.x(), enemy.y()));
                            tracing::debug!(score = self.score, "enemy destroyed");
                        }
                        break;
                    }
                }
            } else if let Some(player) = self.player.as_mut() {
                if player.is_alive() && player.bounds().intersects(&bounds) {
                    player.apply_damage();
                    shot.kill();
                    self.effects.push(ImpactEffect::new(player.x(), player.y()));
                }
            }
        }
    }

    /// Drop every entity whose liveness flag is cleared.
    fn prune_dead(&mut self) {
        self.enemies.retain(Combatant::is_alive);
        self.projectiles.retain(Projectile::is_alive);
        self.effects.retain(ImpactEffect::is_alive);
    }

    /// End-of-tick state evaluation. Victory is checked before defeat.
    fn evaluate_match_end(&mut self) {
        if self.score >= self.target_enemy_count && self.target_enemy_count > 0 {
            self.state = MatchState::Victory;
            tracing::debug!(score = self.score, "match won");
        } else if self.player.as_ref().is_some_and(|p| !p.is_alive()) {
            self.state = MatchState::Defeat;
            tracing::debug!("match lost");
        }
    }

    /// Current match state.
    #[must_use]
    pub const fn state(&self) -> MatchState {
        self.state
    }

    /// Enemies destroyed this match.
    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Ticks executed since match start.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// The arena of the current match.
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Theme label of the current map.
    #[must_use]
    pub const fn theme(&self) -> MapTheme {
        self.arena.theme()
    }

    /// The player combatant, once a match has been started.
    #[must_use]
    pub fn player(&self) -> Option<&Combatant> {
        self.player.as_ref()
    }

    /// Living enemy combatants.
    #[must_use]
    pub fn enemies(&self) -> &[Combatant] {
        &self.enemies
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Impact effects still animating.
    #[must_use]
    pub fn effects(&self) -> &[ImpactEffect] {
        &self.effects
    }

    /// Obstacle rectangles of the current map.
    #[must_use]
    pub fn obstacles(&self) -> &[Rect] {
        self.arena.obstacles()
    }

    /// Owned copy of the visible world, safe to hand across threads.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            state: self.state,
            theme: self.arena.theme(),
            score: self.score,
            player: self.player.clone(),
            enemies: self.enemies.clone(),
            projectiles: self.projectiles.clone(),
            effects: self.effects.clone(),
            obstacles: self.arena.obstacles().to_vec(),
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse axis-aligned corridor visibility check.
///
/// True when the two points share a narrow horizontal or vertical band.
/// Deliberately not a ray cast: obstacles do not block it, so enemies
/// can sight the player through walls inside the corridor.
fn in_sight_corridor(sx: i32, sy: i32, tx: i32, ty: i32) -> bool {
    let dx = (sx - tx).abs();
    let dy = (sy - ty).abs();
    (dx < SIGHT_CORRIDOR && dy < SIGHT_RANGE) || (dy < SIGHT_CORRIDOR && dx < SIGHT_RANGE)
}
