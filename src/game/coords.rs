//! Grid/pixel coordinate conversions
//!
//! The game uses two coordinate systems: pixels for object positions and
//! tiles for the map, explosions and the spatial index. A tile is
//! `TILE_SIZE` pixels square and the map origin is the pixel origin.

use serde::{Deserialize, Serialize};

use crate::game::constants::map::{HEIGHT, TILE_SIZE, WIDTH};
use crate::util::vec2::Vec2;

/// Integer tile (or spatial cell) coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing a pixel position, using `floor` so negative positions
    /// land in negative tiles
    #[inline]
    pub fn from_pixel(position: Vec2) -> Self {
        Self::from_pixel_with_size(position, TILE_SIZE)
    }

    #[inline]
    pub fn from_pixel_with_size(position: Vec2, cell_size: f32) -> Self {
        Self {
            x: (position.x / cell_size).floor() as i32,
            y: (position.y / cell_size).floor() as i32,
        }
    }

    /// Pixel position of the tile centre
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.x as f32 * TILE_SIZE + TILE_SIZE / 2.0,
            self.y as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        )
    }

    /// Pixel position of the tile's top-left corner
    #[inline]
    pub fn top_left(&self) -> Vec2 {
        Vec2::new(self.x as f32 * TILE_SIZE, self.y as f32 * TILE_SIZE)
    }

    #[inline]
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Inside the standard map bounds
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x >= 0 && self.x < WIDTH && self.y >= 0 && self.y < HEIGHT
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// The four cardinal steps, in up/right/down/left order
pub const CARDINALS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
