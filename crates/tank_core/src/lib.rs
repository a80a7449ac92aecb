//! # Tank Core
//!
//! Deterministic combat simulation core for the tank arena game.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No input handling
//! - No IO
//! - No implicit randomness (explicit seeded RNG throughout)
//!
//! A player-controlled combatant and autonomous enemies move on a
//! tile-based map, fire projectiles, collide with obstacles and each
//! other, and drive the match through menu, running and terminal
//! states. An external driver owns the fixed-interval tick loop and the
//! presentation layer reads post-tick snapshots; both embed this crate
//! in-process through [`simulation::Simulation`].
//!
//! ## Crate Structure
//!
//! - [`geometry`] - Integer rectangles and facings
//! - [`units`] - Combatants, projectiles, impact effects
//! - [`arena`] - Tile grid, obstacles, safe-spawn search
//! - [`simulation`] - Match state machine and the per-tick loop
//! - [`clock`] - Injectable wall-clock source for fire cooldowns
//! - [`error`] - Error types for the snapshot codec

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod arena;
pub mod clock;
pub mod error;
pub mod geometry;
pub mod simulation;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::arena::{Arena, MapTheme, MAP_HEIGHT, MAP_WIDTH, TILE_SIZE};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::error::{Result, SimError};
    pub use crate::geometry::{Direction, Rect};
    pub use crate::simulation::{MatchConfig, MatchState, Simulation, WorldSnapshot};
    pub use crate::units::{Combatant, ImpactEffect, Projectile};
}
