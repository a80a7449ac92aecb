//! Map model: tile grid, obstacle rectangles, and safe-spawn search.
//!
//! A match plays on a fixed-size grid of 50-unit tiles. The border is
//! always solid, interior layouts are fixed per map id, and the grid is
//! flattened once per match into an immutable list of obstacle
//! rectangles that both collision checks and the presentation layer
//! read.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Map width in world units.
pub const MAP_WIDTH: i32 = 1200;

/// Map height in world units.
pub const MAP_HEIGHT: i32 = 900;

/// Side length of one tile in world units.
pub const TILE_SIZE: i32 = 50;

/// Grid width in tiles (`MAP_WIDTH / TILE_SIZE`).
pub const GRID_WIDTH: usize = 24;

/// Grid height in tiles (`MAP_HEIGHT / TILE_SIZE`).
pub const GRID_HEIGHT: usize = 18;

/// Attempt budget for the uniform safe-spawn search.
const SPAWN_ATTEMPTS: u32 = 200;

/// Inset from the map edge for spawn draws.
const SPAWN_MARGIN: i32 = 50;

/// Degraded-but-defined position returned when the spawn search
/// exhausts its budget.
const SPAWN_FALLBACK: (i32, i32) = (100, 100);

/// One cell of the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tile {
    /// Passable ground.
    #[default]
    Empty,
    /// Impassable block; flattened into an obstacle rectangle.
    Solid,
}

/// Visual theme of a map layout. Affects rendering only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapTheme {
    /// Open summer field.
    #[default]
    Summer,
    /// Dense desert pillar lattice.
    Desert,
}

/// Tile-based map with derived obstacle rectangles.
///
/// Built once per match by [`build`](Self::build); the obstacle list is
/// immutable for the match's duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arena {
    /// Row-major tile grid (`idx = y * GRID_WIDTH + x`).
    tiles: Vec<Tile>,
    theme: MapTheme,
    obstacles: Vec<Rect>,
}

const fn idx(x: usize, y: usize) -> usize {
    y * GRID_WIDTH + x
}

impl Arena {
    /// Build the map for `map_id`.
    ///
    /// Clears the grid, marks the full border solid, and overlays the
    /// named layout. Unrecognized ids yield an empty-but-bordered map
    /// rather than an error. Deterministic given `map_id`.
    #[must_use]
    pub fn build(map_id: i32) -> Self {
        let mut tiles = vec![Tile::Empty; GRID_WIDTH * GRID_HEIGHT];

        for x in 0..GRID_WIDTH {
            for y in 0..GRID_HEIGHT {
                if x == 0 || x == GRID_WIDTH - 1 || y == 0 || y == GRID_HEIGHT - 1 {
                    tiles[idx(x, y)] = Tile::Solid;
                }
            }
        }

        let theme = match map_id {
            1 => {
                overlay_summer(&mut tiles);
                MapTheme::Summer
            }
            2 => {
                overlay_desert(&mut tiles);
                MapTheme::Desert
            }
            other => {
                tracing::debug!(map_id = other, "unknown map id, using empty bordered map");
                MapTheme::Summer
            }
        };

        // Flatten the grid into per-tile hitboxes, column by column.
        let mut obstacles = Vec::new();
        for x in 0..GRID_WIDTH {
            for y in 0..GRID_HEIGHT {
                if tiles[idx(x, y)] == Tile::Solid {
                    obstacles.push(Rect::new(
                        x as i32 * TILE_SIZE,
                        y as i32 * TILE_SIZE,
                        TILE_SIZE,
                        TILE_SIZE,
                    ));
                }
            }
        }

        Self {
            tiles,
            theme,
            obstacles,
        }
    }

    /// Theme label of the current layout.
    #[must_use]
    pub const fn theme(&self) -> MapTheme {
        self.theme
    }

    /// Tile at grid coordinates, if in range.
    #[must_use]
    pub fn tile(&self, x: usize, y: usize) -> Option<Tile> {
        if x < GRID_WIDTH && y < GRID_HEIGHT {
            self.tiles.get(idx(x, y)).copied()
        } else {
            None
        }
    }

    /// Solid-tile hitboxes, one 50-unit square per solid tile.
    #[must_use]
    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }

    /// Whether `rect` overlaps any obstacle.
    #[must_use]
    pub fn blocks(&self, rect: &Rect) -> bool {
        self.obstacles.iter().any(|wall| wall.intersects(rect))
    }

    /// Whether `rect` lies entirely inside the map bounds.
    #[must_use]
    pub const fn contains(&self, rect: &Rect) -> bool {
        rect.x >= 0 && rect.right() <= MAP_WIDTH && rect.y >= 0 && rect.bottom() <= MAP_HEIGHT
    }

    /// Find a position where a box of `size` overlaps no obstacle.
    ///
    /// Draws up to 200 uniform positions inside the spawn margin and
    /// returns the first safe one. An exhausted budget
    /// degrades to a fixed fallback position; the search never blocks
    /// or recurses.
    pub fn find_safe_spawn<R: Rng>(&self, rng: &mut R, size: (i32, i32)) -> (i32, i32) {
        for _ in 0..SPAWN_ATTEMPTS {
            let x = rng.gen_range(SPAWN_MARGIN..MAP_WIDTH - SPAWN_MARGIN);
            let y = rng.gen_range(SPAWN_MARGIN..MAP_HEIGHT - SPAWN_MARGIN);
            let probe = Rect::new(x, y, size.0, size.1);
            if !self.blocks(&probe) {
                return (x, y);
            }
        }
        tracing::warn!(
            attempts = SPAWN_ATTEMPTS,
            "safe-spawn search exhausted its budget, using fallback position"
        );
        SPAWN_FALLBACK
    }
}

/// Summer layout: scattered short walls on an open field.
fn overlay_summer(tiles: &mut [Tile]) {
    const BLOCKS: [(usize, usize); 16] = [
        (5, 5),
        (6, 5),
        (15, 5),
        (15, 6),
        (10, 10),
        (11, 10),
        (12, 10),
        (5, 12),
        (18, 12),
        (19, 12),
        (8, 3),
        (8, 4),
        (3, 8),
        (3, 9),
        (16, 15),
        (17, 15),
    ];
    for (x, y) in BLOCKS {
        tiles[idx(x, y)] = Tile::Solid;
    }
}

/// Desert layout: a pillar lattice plus one short wall.
fn overlay_desert(tiles: &mut [Tile]) {
    for x in (4..GRID_WIDTH - 4).step_by(4) {
        for y in (3..GRID_HEIGHT - 3).step_by(3) {
            tiles[idx(x, y)] = Tile::Solid;
        }
    }
    for x in 10..=12 {
        tiles[idx(x, 8)] = Tile::Solid;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    /// Border tiles of a 24x18 grid.
    const BORDER_TILES: usize = 2 * GRID_WIDTH + 2 * (GRID_HEIGHT - 2);

    #[test]
    fn test_border_is_always_solid() {
        for map_id in [1, 2, 99] {
            let arena = Arena::build(map_id);
            for x in 0..GRID_WIDTH {
                assert_eq!(arena.tile(x, 0), Some(Tile::Solid));
                assert_eq!(arena.tile(x, GRID_HEIGHT - 1), Some(Tile::Solid));
            }
            for y in 0..GRID_HEIGHT {
                assert_eq!(arena.tile(0, y), Some(Tile::Solid));
                assert_eq!(arena.tile(GRID_WIDTH - 1, y), Some(Tile::Solid));
            }
        }
    }

    #[test]
    fn test_summer_layout() {
        let arena = Arena::build(1);
        assert_eq!(arena.theme(), MapTheme::Summer);
        assert_eq!(arena.obstacles().len(), BORDER_TILES + 16);
        assert_eq!(arena.tile(5, 5), Some(Tile::Solid));
        assert_eq!(arena.tile(12, 10), Some(Tile::Solid));
        assert_eq!(arena.tile(6, 6), Some(Tile::Empty));
    }

    #[test]
    fn test_desert_layout() {
        let arena = Arena::build(2);
        assert_eq!(arena.theme(), MapTheme::Desert);
        // 4x4 pillar lattice plus the three-tile wall at y=8.
        assert_eq!(arena.obstacles().len(), BORDER_TILES + 16 + 3);
        assert_eq!(arena.tile(4, 3), Some(Tile::Solid));
        assert_eq!(arena.tile(16, 12), Some(Tile::Solid));
        assert_eq!(arena.tile(11, 8), Some(Tile::Solid));
    }

    #[test]
    fn test_unknown_map_id_is_empty_bordered() {
        let arena = Arena::build(42);
        assert_eq!(arena.theme(), MapTheme::Summer);
        assert_eq!(arena.obstacles().len(), BORDER_TILES);
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(Arena::build(1), Arena::build(1));
        assert_eq!(Arena::build(2), Arena::build(2));
    }

    #[test]
    fn test_obstacles_are_tile_aligned() {
        let arena = Arena::build(1);
        for wall in arena.obstacles() {
            assert_eq!(wall.w, TILE_SIZE);
            assert_eq!(wall.h, TILE_SIZE);
            assert_eq!(wall.x % TILE_SIZE, 0);
            assert_eq!(wall.y % TILE_SIZE, 0);
        }
    }

    #[test]
    fn test_blocks_detects_wall_overlap() {
        let arena = Arena::build(1);
        // Inside the (5,5) summer block.
        assert!(arena.blocks(&Rect::new(5 * TILE_SIZE + 10, 5 * TILE_SIZE + 10, 40, 40)));
        // Open ground near the map centre.
        assert!(!arena.blocks(&Rect::new(320, 320, 40, 40)));
    }

    #[test]
    fn test_contains_map_bounds() {
        let arena = Arena::build(1);
        assert!(arena.contains(&Rect::new(0, 0, 40, 40)));
        assert!(arena.contains(&Rect::new(MAP_WIDTH - 40, MAP_HEIGHT - 40, 40, 40)));
        assert!(!arena.contains(&Rect::new(-1, 0, 40, 40)));
        assert!(!arena.contains(&Rect::new(MAP_WIDTH - 39, 0, 40, 40)));
    }

    #[test]
    fn test_safe_spawn_avoids_obstacles() {
        let arena = Arena::build(2);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let (x, y) = arena.find_safe_spawn(&mut rng, (40, 40));
            let spawned = Rect::new(x, y, 40, 40);
            assert!(!arena.blocks(&spawned));
            assert!(x >= SPAWN_MARGIN && x < MAP_WIDTH - SPAWN_MARGIN);
            assert!(y >= SPAWN_MARGIN && y < MAP_HEIGHT - SPAWN_MARGIN);
        }
    }

    #[test]
    fn test_safe_spawn_is_deterministic_per_seed() {
        let arena = Arena::build(1);
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        assert_eq!(
            arena.find_safe_spawn(&mut a, (40, 40)),
            arena.find_safe_spawn(&mut b, (40, 40))
        );
    }

    #[test]
    fn test_fully_solid_map_falls_back() {
        let mut arena = Arena::build(1);
        arena.obstacles = vec![Rect::new(0, 0, MAP_WIDTH, MAP_HEIGHT)];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(arena.find_safe_spawn(&mut rng, (40, 40)), SPAWN_FALLBACK);
    }
}
