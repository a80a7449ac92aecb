//! Unit definitions: combatants, projectiles, and impact effects.
//!
//! Units are plain data plus the small operations the orchestrator
//! composes each tick. There is no shared base type and no virtual
//! dispatch; each kind is updated by its own function in a fixed order
//! (see [`crate::simulation`]).

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::arena::{MAP_HEIGHT, MAP_WIDTH};
use crate::geometry::{Direction, Rect};

/// Side length of a combatant's square bounding box.
pub const COMBATANT_SIZE: i32 = 40;

/// Distance the player covers per accepted move.
pub const PLAYER_STEP: i32 = 5;

/// Distance an enemy covers per accepted move.
pub const ENEMY_STEP: i32 = 3;

/// Starting health of the player combatant.
pub const PLAYER_HEALTH: u32 = 3;

/// Starting health of an enemy combatant.
pub const ENEMY_HEALTH: u32 = 1;

/// Minimum wall-clock interval between two shots from one combatant.
pub const FIRE_COOLDOWN_MS: u64 = 600;

/// Side length of a projectile's square bounding box.
pub const PROJECTILE_SIZE: i32 = 6;

/// Distance a projectile covers per tick.
pub const PROJECTILE_SPEED: i32 = 15;

/// How far ahead of the body centre a projectile spawns.
pub const MUZZLE_OFFSET: i32 = COMBATANT_SIZE / 2 + 15;

/// Ticks an impact effect stays alive.
pub const EFFECT_LIFETIME: u32 = 12;

/// Per-tick probability that an enemy combatant picks a new random facing.
const STEER_CHANCE: f64 = 0.02;

/// Draw a uniformly random facing.
pub(crate) fn random_direction<R: Rng>(rng: &mut R) -> Direction {
    Direction::from_index(rng.gen_range(0..4usize))
}

// ============================================================================
// Combatant
// ============================================================================

/// A tank-like unit: the player or one enemy.
///
/// Position is the top-left corner of a [`COMBATANT_SIZE`] square.
/// Movement is intent-based: the combatant records where it wants to go
/// ([`projected_bounds`](Self::projected_bounds)) and the orchestrator
/// commits the move only after validating it against the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    x: i32,
    y: i32,
    direction: Direction,
    health: u32,
    is_player: bool,
    moving: bool,
    last_shot_at: Option<u64>,
    alive: bool,
}

impl Combatant {
    fn new(x: i32, y: i32, direction: Direction, is_player: bool, health: u32) -> Self {
        Self {
            x,
            y,
            direction,
            health,
            is_player,
            // Enemies advance continuously; the player only on intent.
            moving: !is_player,
            last_shot_at: None,
            alive: true,
        }
    }

    /// Create the player combatant, facing up.
    #[must_use]
    pub fn player(x: i32, y: i32) -> Self {
        Self::new(x, y, Direction::Up, true, PLAYER_HEALTH)
    }

    /// Create an enemy combatant, facing down.
    #[must_use]
    pub fn enemy(x: i32, y: i32) -> Self {
        Self::new(x, y, Direction::Down, false, ENEMY_HEALTH)
    }

    /// Left edge of the bounding box.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Top edge of the bounding box.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Current facing.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Whether this is the player-controlled combatant.
    #[must_use]
    pub const fn is_player(&self) -> bool {
        self.is_player
    }

    /// Whether the combatant intends to advance this tick.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.moving
    }

    /// Liveness flag. Dead combatants are removed at end of tick.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Current bounding box.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, COMBATANT_SIZE, COMBATANT_SIZE)
    }

    pub(crate) fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub(crate) fn set_moving(&mut self, moving: bool) {
        self.moving = moving;
    }

    /// Random steering for autonomous combatants: with a small per-tick
    /// probability, pick a new uniformly random facing. Player
    /// combatants never steer themselves.
    pub fn steer<R: Rng>(&mut self, rng: &mut R) {
        if !self.is_player && rng.gen_bool(STEER_CHANCE) {
            self.direction = random_direction(rng);
        }
    }

    /// The bounding box this combatant would occupy after moving
    /// `distance` units along its current facing. Pure; no mutation.
    #[must_use]
    pub const fn projected_bounds(&self, distance: i32) -> Rect {
        let (dx, dy) = self.direction.offset(distance);
        self.bounds().translated(dx, dy)
    }

    /// Unconditionally overwrite the position. The orchestrator calls
    /// this only after validating the move against bounds and obstacles.
    pub fn commit_move(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    /// Whether the fire cooldown has elapsed at `now_ms`.
    #[must_use]
    pub fn can_fire(&self, now_ms: u64) -> bool {
        self.last_shot_at
            .map_or(true, |t| now_ms.saturating_sub(t) > FIRE_COOLDOWN_MS)
    }

    /// Fire a projectile if the cooldown allows it.
    ///
    /// On success the cooldown clock resets and the projectile spawns
    /// centred on the muzzle point, [`MUZZLE_OFFSET`] ahead of the body
    /// centre along the current facing. Otherwise returns `None` with
    /// no side effect.
    pub fn try_fire(&mut self, now_ms: u64) -> Option<Projectile> {
        if !self.can_fire(now_ms) {
            return None;
        }
        self.last_shot_at = Some(now_ms);

        let (dx, dy) = self.direction.offset(MUZZLE_OFFSET);
        let x = self.x + COMBATANT_SIZE / 2 - PROJECTILE_SIZE / 2 + dx;
        let y = self.y + COMBATANT_SIZE / 2 - PROJECTILE_SIZE / 2 + dy;
        Some(Projectile::new(x, y, self.direction, self.is_player))
    }

    /// Apply one point of damage; at zero health the combatant dies.
    ///
    /// The orchestrator never calls this on a dead combatant.
    pub fn apply_damage(&mut self) {
        self.health = self.health.saturating_sub(1);
        if self.health == 0 {
            self.alive = false;
        }
    }
}

// ============================================================================
// Projectile
// ============================================================================

/// A shot travelling in a straight line until it leaves the map or hits
/// something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    x: i32,
    y: i32,
    direction: Direction,
    from_player: bool,
    alive: bool,
}

impl Projectile {
    /// Create a projectile at the given position.
    #[must_use]
    pub const fn new(x: i32, y: i32, direction: Direction, from_player: bool) -> Self {
        Self {
            x,
            y,
            direction,
            from_player,
            alive: true,
        }
    }

    /// Left edge of the bounding box.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Top edge of the bounding box.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Flight direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the player fired this projectile.
    #[must_use]
    pub const fn is_from_player(&self) -> bool {
        self.from_player
    }

    /// Liveness flag. Dead projectiles never re-enter play and are
    /// removed at end of tick.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Current bounding box.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, PROJECTILE_SIZE, PROJECTILE_SIZE)
    }

    pub(crate) fn kill(&mut self) {
        self.alive = false;
    }

    /// Move one speed-step along the flight direction and die on
    /// leaving the map bounds.
    pub fn advance(&mut self) {
        let (dx, dy) = self.direction.offset(PROJECTILE_SPEED);
        self.x += dx;
        self.y += dy;
        if self.x < 0 || self.x > MAP_WIDTH || self.y < 0 || self.y > MAP_HEIGHT {
            self.alive = false;
        }
    }
}

// ============================================================================
// Impact effect
// ============================================================================

/// Short-lived visual marker left by a hit.
///
/// Carries no gameplay logic: it counts down and exposes an animation
/// phase for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactEffect {
    x: i32,
    y: i32,
    remaining: u32,
    alive: bool,
}

impl ImpactEffect {
    /// Create an effect at the given position with a full lifetime.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            remaining: EFFECT_LIFETIME,
            alive: true,
        }
    }

    /// Left edge of the bounding box.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Top edge of the bounding box.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Liveness flag. Expired effects are removed at end of tick.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Current bounding box (combatant-sized flash).
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, COMBATANT_SIZE, COMBATANT_SIZE)
    }

    /// Animation phase, monotonically increasing from 1 to 7 over the
    /// effect's lifetime.
    #[must_use]
    pub const fn phase(&self) -> u32 {
        (EFFECT_LIFETIME - self.remaining) / 2 + 1
    }

    /// Count down one tick; at zero the effect expires.
    pub fn advance(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.alive = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_player_spawns_facing_up_with_full_health() {
        let player = Combatant::player(100, 200);
        assert_eq!(player.direction(), Direction::Up);
        assert_eq!(player.health(), PLAYER_HEALTH);
        assert!(player.is_player());
        assert!(!player.is_moving());
        assert!(player.is_alive());
    }

    #[test]
    fn test_enemy_spawns_facing_down_and_moving() {
        let enemy = Combatant::enemy(0, 0);
        assert_eq!(enemy.direction(), Direction::Down);
        assert_eq!(enemy.health(), ENEMY_HEALTH);
        assert!(!enemy.is_player());
        assert!(enemy.is_moving());
    }

    #[test]
    fn test_projected_bounds_is_pure() {
        let mut enemy = Combatant::enemy(100, 100);
        enemy.set_direction(Direction::Right);
        let future = enemy.projected_bounds(3);
        assert_eq!(future, Rect::new(103, 100, COMBATANT_SIZE, COMBATANT_SIZE));
        assert_eq!(enemy.x(), 100);
        assert_eq!(enemy.y(), 100);
    }

    #[test]
    fn test_commit_move_overwrites_position() {
        let mut player = Combatant::player(10, 10);
        player.commit_move(300, 400);
        assert_eq!((player.x(), player.y()), (300, 400));
    }

    #[test]
    fn test_player_never_steers_randomly() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut player = Combatant::player(0, 0);
        for _ in 0..1000 {
            player.steer(&mut rng);
        }
        assert_eq!(player.direction(), Direction::Up);
    }

    #[test]
    fn test_enemy_steers_eventually() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut enemy = Combatant::enemy(0, 0);
        let mut changed = false;
        for _ in 0..1000 {
            let before = enemy.direction();
            enemy.steer(&mut rng);
            changed |= enemy.direction() != before;
        }
        assert!(changed);
    }

    #[test]
    fn test_first_shot_is_always_allowed() {
        let mut player = Combatant::player(100, 100);
        assert!(player.can_fire(0));
        assert!(player.try_fire(0).is_some());
    }

    #[test]
    fn test_cooldown_blocks_rapid_fire() {
        let mut player = Combatant::player(100, 100);
        assert!(player.try_fire(1000).is_some());
        // Within the cooldown window, including the exact boundary.
        assert!(player.try_fire(1100).is_none());
        assert!(player.try_fire(1600).is_none());
        assert!(player.try_fire(1601).is_some());
    }

    #[test]
    fn test_failed_fire_has_no_side_effect() {
        let mut player = Combatant::player(100, 100);
        assert!(player.try_fire(1000).is_some());
        assert!(player.try_fire(1100).is_none());
        // The cooldown clock still dates from the first shot.
        assert!(player.try_fire(1601).is_some());
    }

    #[test]
    fn test_muzzle_position_up() {
        let mut player = Combatant::player(100, 100);
        let shot = player.try_fire(0).expect("first shot");
        assert_eq!(shot.x(), 100 + COMBATANT_SIZE / 2 - PROJECTILE_SIZE / 2);
        assert_eq!(shot.y(), 100 + COMBATANT_SIZE / 2 - PROJECTILE_SIZE / 2 - MUZZLE_OFFSET);
        assert_eq!(shot.direction(), Direction::Up);
        assert!(shot.is_from_player());
    }

    #[test]
    fn test_muzzle_position_right() {
        let mut enemy = Combatant::enemy(200, 300);
        enemy.set_direction(Direction::Right);
        let shot = enemy.try_fire(0).expect("first shot");
        assert_eq!(shot.x(), 200 + COMBATANT_SIZE / 2 - PROJECTILE_SIZE / 2 + MUZZLE_OFFSET);
        assert_eq!(shot.y(), 300 + COMBATANT_SIZE / 2 - PROJECTILE_SIZE / 2);
        assert!(!shot.is_from_player());
    }

    #[test]
    fn test_damage_kills_at_zero_health() {
        let mut player = Combatant::player(0, 0);
        player.apply_damage();
        player.apply_damage();
        assert_eq!(player.health(), 1);
        assert!(player.is_alive());
        player.apply_damage();
        assert_eq!(player.health(), 0);
        assert!(!player.is_alive());
    }

    #[test]
    fn test_projectile_advances_one_speed_step() {
        let mut shot = Projectile::new(600, 450, Direction::Left, true);
        shot.advance();
        assert_eq!((shot.x(), shot.y()), (600 - PROJECTILE_SPEED, 450));
        assert!(shot.is_alive());
    }

    #[test]
    fn test_projectile_dies_at_map_boundary() {
        let mut shot = Projectile::new(10, 100, Direction::Left, true);
        shot.advance();
        assert!(!shot.is_alive());

        let mut shot = Projectile::new(MAP_WIDTH - 10, 100, Direction::Right, false);
        shot.advance();
        assert!(!shot.is_alive());
    }

    #[test]
    fn test_effect_phase_ramps_monotonically() {
        let mut effect = ImpactEffect::new(0, 0);
        assert_eq!(effect.phase(), 1);
        let mut last = effect.phase();
        for _ in 0..EFFECT_LIFETIME - 1 {
            effect.advance();
            assert!(effect.is_alive());
            assert!(effect.phase() >= last);
            last = effect.phase();
        }
        effect.advance();
        assert!(!effect.is_alive());
        assert_eq!(effect.phase(), 7);
    }
}
