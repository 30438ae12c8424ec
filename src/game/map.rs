//! Tile map: walls, destructible boxes and open ground
//!
//! The map is the only source of blocking information the AI uses for
//! path and escape planning. Blocking is kept in a bit mask alongside the
//! tile array so the hot `is_blocking` query is a single bit test.

use bitvec::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game::constants::map::{HEIGHT, WIDTH};
use crate::game::coords::GridCoord;

/// Chance that an open tile gets a box in a generated map
const BOX_DENSITY: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Ground,
    /// Indestructible
    Wall,
    /// Destroyed by explosions
    Box,
}

impl Tile {
    #[inline]
    pub fn is_blocking(self) -> bool {
        matches!(self, Tile::Wall | Tile::Box)
    }
}

#[derive(Debug, Clone)]
pub struct TileMap {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    blocking: BitVec,
}

impl TileMap {
    /// Open map of the given size
    pub fn new(width: i32, height: i32) -> Self {
        let count = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            tiles: vec![Tile::Ground; count],
            blocking: bitvec![0; count],
        }
    }

    /// Parse a map drawn with `#` (wall), `+` (box) and `.` (ground)
    ///
    /// Rows may have different lengths; the map is as wide as the longest row
    /// and short rows are padded with ground.
    pub fn from_ascii(art: &str) -> Self {
        let rows: Vec<&str> = art
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let height = rows.len() as i32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;

        let mut map = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let tile = match ch {
                    '#' => Tile::Wall,
                    '+' => Tile::Box,
                    _ => Tile::Ground,
                };
                map.set(GridCoord::new(x as i32, y as i32), tile);
            }
        }
        map
    }

    /// Standard arena: border walls, a pillar on every even tile and random
    /// boxes, keeping the four spawn corners open
    pub fn classic(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut map = Self::new(WIDTH, HEIGHT);

        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let pos = GridCoord::new(x, y);
                let border = x == 0 || y == 0 || x == WIDTH - 1 || y == HEIGHT - 1;
                let pillar = x % 2 == 0 && y % 2 == 0;
                let tile = if border || pillar {
                    Tile::Wall
                } else if Self::is_spawn_area(pos) || !rng.gen_bool(BOX_DENSITY) {
                    Tile::Ground
                } else {
                    Tile::Box
                };
                map.set(pos, tile);
            }
        }
        map
    }

    /// Corner tiles where bombers start; the tiles next to them stay open too.
    /// The map is an even number of tiles wide, so the right-hand spawns sit one
    /// column in from the pillar column.
    pub fn spawn_points() -> [GridCoord; 4] {
        [
            GridCoord::new(1, 1),
            GridCoord::new(WIDTH - 3, HEIGHT - 2),
            GridCoord::new(WIDTH - 3, 1),
            GridCoord::new(1, HEIGHT - 2),
        ]
    }

    fn is_spawn_area(pos: GridCoord) -> bool {
        Self::spawn_points().iter().any(|s| {
            let dx = (s.x - pos.x).abs();
            let dy = (s.y - pos.y).abs();
            dx + dy <= 1
        })
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: GridCoord) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    #[inline]
    fn index(&self, pos: GridCoord) -> Option<usize> {
        self.in_bounds(pos).then(|| (pos.y * self.width + pos.x) as usize)
    }

    pub fn get(&self, pos: GridCoord) -> Option<Tile> {
        self.index(pos).map(|i| self.tiles[i])
    }

    pub fn set(&mut self, pos: GridCoord, tile: Tile) {
        if let Some(i) = self.index(pos) {
            self.tiles[i] = tile;
            self.blocking.set(i, tile.is_blocking());
        }
    }

    /// Out-of-bounds tiles are blocking
    #[inline]
    pub fn is_blocking(&self, pos: GridCoord) -> bool {
        self.index(pos).map_or(true, |i| self.blocking[i])
    }

    #[inline]
    pub fn is_walkable(&self, pos: GridCoord) -> bool {
        !self.is_blocking(pos)
    }

    pub fn is_destructible(&self, pos: GridCoord) -> bool {
        self.get(pos) == Some(Tile::Box)
    }

    /// Turn a box into ground; returns true if something was destroyed
    pub fn destroy(&mut self, pos: GridCoord) -> bool {
        if self.is_destructible(pos) {
            self.set(pos, Tile::Ground);
            true
        } else {
            false
        }
    }

    pub fn box_count(&self) -> usize {
        self.tiles.iter().filter(|&&t| t == Tile::Box).count()
    }
}

impl Default for TileMap {
    fn default() -> Self {
        Self::new(WIDTH, HEIGHT)
    }
}
