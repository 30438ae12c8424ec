//! Domain-level collision queries built on the spatial grid
//!
//! `CollisionHelper` is a stateless view: it borrows the grid and the object
//! arena for the duration of a query and answers the questions gameplay code
//! actually asks (who picks up this extra, who dies in this explosion, what
//! can this bot see).

use rustc_hash::FxHashSet;

use crate::game::constants::map::TILE_SIZE;
use crate::game::coords::GridCoord;
use crate::game::object::{ObjectId, ObjectKind, Objects};
use crate::game::spatial::SpatialGrid;
use crate::util::vec2::Vec2;

/// Objects around an AI agent, bucketed by what the agent cares about
#[derive(Debug, Clone, Default)]
pub struct AiTargets {
    pub enemy_bombers: Vec<ObjectId>,
    pub bombs: Vec<ObjectId>,
    pub extras: Vec<ObjectId>,
}

impl AiTargets {
    pub fn is_empty(&self) -> bool {
        self.enemy_bombers.is_empty() && self.bombs.is_empty() && self.extras.is_empty()
    }
}

#[derive(Clone, Copy)]
pub struct CollisionHelper<'a> {
    grid: &'a SpatialGrid,
    objects: &'a Objects,
}

impl<'a> CollisionHelper<'a> {
    pub fn new(grid: &'a SpatialGrid, objects: &'a Objects) -> Self {
        Self { grid, objects }
    }

    /// Closest living bomber within `max_distance` pixels of `position`
    ///
    /// Searches rings of growing radius (starting at one cell) and stops at the
    /// first ring that contains a bomber in range, returning the closest one
    /// from that ring. A closer bomber that only shows up in a later ring is
    /// never considered.
    pub fn find_nearest_bomber(&self, position: Vec2, max_distance: f32) -> Option<ObjectId> {
        let max_radius = (max_distance / TILE_SIZE).ceil().max(1.0) as i32;

        for radius in 1..=max_radius {
            let mut nearest: Option<(ObjectId, f32)> = None;

            for id in self.grid.bombers_near(self.objects, position, radius) {
                let Some(obj) = self.objects.get(id) else { continue };
                if !obj.is_alive() {
                    continue;
                }
                let distance = position.distance_to(obj.position);
                if distance <= max_distance && nearest.map_or(true, |(_, d)| distance < d) {
                    nearest = Some((id, distance));
                }
            }

            if let Some((id, _)) = nearest {
                return Some(id);
            }
        }
        None
    }

    /// Bombers and corpses killed by an explosion covering `explosion_cells`
    ///
    /// Each explosion cell and its eight neighbours are scanned to tolerate
    /// rounding at tile borders, but an object only counts when its own tile
    /// is exactly the explosion tile. Being visually close is never enough.
    pub fn find_explosion_victims(&self, explosion_cells: &[GridCoord]) -> Vec<ObjectId> {
        let mut found: FxHashSet<ObjectId> = FxHashSet::default();
        let mut victims = Vec::new();

        for &tile in explosion_cells {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let probe = tile.offset(dx, dy).center();
                    for &id in self.grid.objects_at_position(probe) {
                        let Some(obj) = self.objects.get(id) else {
                            tracing::trace!("Stale handle {:?} near explosion at {}", id, tile);
                            continue;
                        };
                        if !obj.is_alive() {
                            continue;
                        }
                        if !matches!(obj.kind(), ObjectKind::Bomber | ObjectKind::BomberCorpse) {
                            continue;
                        }
                        if obj.tile() == tile && found.insert(id) {
                            victims.push(id);
                        }
                    }
                }
            }
        }
        victims
    }

    /// Single sweep over the neighbourhood of `position`, sorting live objects
    /// into enemy bombers, bombs and extras. `exclude` (the scanning agent) is
    /// left out.
    pub fn scan_ai_targets(&self, position: Vec2, radius: i32, exclude: Option<ObjectId>) -> AiTargets {
        let mut targets = AiTargets::default();

        self.grid.for_each_near(self.objects, position, None, radius, |id, obj| {
            if Some(id) == exclude || !obj.is_alive() {
                return;
            }
            match obj.kind() {
                ObjectKind::Bomber => targets.enemy_bombers.push(id),
                ObjectKind::Bomb => targets.bombs.push(id),
                ObjectKind::Extra => targets.extras.push(id),
                _ => {}
            }
        });
        targets
    }
}
