//! Spatial hash grid for proximity queries over moving objects
//!
//! Divides the world into tile-sized cells and stores object handles in each
//! occupied cell. Queries only visit the cells around the query point, so
//! their cost scales with local density rather than total population.
//!
//! The grid never owns objects. It stores [`ObjectId`] handles plus a reverse
//! cache (handle -> cell) that makes moves and removals O(1) lookups. Type and
//! liveness filtering resolve handles against the owning [`Objects`] arena; a
//! handle whose object is gone simply fails to resolve and is skipped.
//!
//! Queries may still return objects that were marked `delete_me` earlier in
//! the same tick if the caller asks for raw cell contents
//! ([`SpatialGrid::objects_at_position`]). Callers must check liveness before
//! acting on them.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::game::constants::map::TILE_SIZE;
use crate::game::coords::GridCoord;
use crate::game::object::{GameObject, ObjectId, ObjectKind, Objects};
use crate::util::vec2::Vec2;

/// Initial capacity for the cell map (number of expected non-empty cells)
const GRID_INITIAL_CAPACITY: usize = 256;

/// Objects stored inline per cell before spilling to the heap
const CELL_INLINE_CAPACITY: usize = 4;

/// Handles sharing one cell, in insertion order
pub type SpatialCell = SmallVec<[ObjectId; CELL_INLINE_CAPACITY]>;

/// Sparse uniform grid over object positions
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    /// Cell size in world units (the game's tile size)
    cell_size: f32,
    /// Inverse cell size for fast position-to-cell conversion
    inv_cell_size: f32,
    /// Occupied cells only; empty cells are pruned
    cells: HashMap<GridCoord, SpatialCell>,
    /// Reverse cache: the cell each tracked object currently lives in
    object_cells: HashMap<ObjectId, GridCoord>,
}

impl SpatialGrid {
    /// Create a new spatial grid with the given cell size
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::with_capacity(GRID_INITIAL_CAPACITY),
            object_cells: HashMap::with_capacity(GRID_INITIAL_CAPACITY),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Remove every object and cell
    pub fn clear(&mut self) {
        self.cells.clear();
        self.object_cells.clear();
    }

    /// Convert world position to cell key
    #[inline]
    pub fn position_to_cell(&self, position: Vec2) -> GridCoord {
        // Must agree bit-for-bit with GridCoord::from_pixel at cell borders,
        // so divide rather than multiply by the inverse
        GridCoord::from_pixel_with_size(position, self.cell_size)
    }

    /// Start tracking an object at `position`
    ///
    /// Adding an object that is already tracked is a caller bug; it is not
    /// detected here and leaves a stale entry in the old cell.
    pub fn add_object(&mut self, id: ObjectId, position: Vec2) {
        let cell = self.position_to_cell(position);
        self.insert_into_cell(id, cell);
        self.object_cells.insert(id, cell);
    }

    /// Stop tracking an object; unknown handles are ignored
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        match self.object_cells.remove(&id) {
            Some(cell) => {
                self.remove_from_cell(id, cell);
                true
            }
            None => false,
        }
    }

    /// Record a move from `old_position` to `new_position`
    ///
    /// Nothing changes if both positions fall into the same cell.
    pub fn update_object_position(&mut self, id: ObjectId, old_position: Vec2, new_position: Vec2) {
        let old_cell = self.position_to_cell(old_position);
        let new_cell = self.position_to_cell(new_position);
        if old_cell == new_cell {
            return;
        }

        // Trust the reverse cache over the caller's old position
        let tracked = self.object_cells.get(&id).copied().unwrap_or(old_cell);
        self.remove_from_cell(id, tracked);
        self.insert_into_cell(id, new_cell);
        self.object_cells.insert(id, new_cell);
    }

    /// Clear the grid and re-insert every object not marked for deletion
    ///
    /// Used to recover a consistent index after bulk changes.
    pub fn rebuild_from_objects(&mut self, objects: &Objects) {
        self.clear();
        for (id, obj) in objects.iter().filter(|(_, o)| !o.delete_me) {
            self.add_object(id, obj.position);
        }
        tracing::debug!(
            "Spatial grid rebuilt: {} objects in {} cells",
            self.object_cells.len(),
            self.cells.len()
        );
    }

    /// Is the object tracked by the grid?
    #[inline]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.object_cells.contains_key(&id)
    }

    /// Cell the object was last recorded in
    #[inline]
    pub fn cell_of(&self, id: ObjectId) -> Option<GridCoord> {
        self.object_cells.get(&id).copied()
    }

    /// Number of tracked objects
    #[inline]
    pub fn len(&self) -> usize {
        self.object_cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.object_cells.is_empty()
    }

    /// Raw members of a cell
    #[inline]
    pub fn cell(&self, coord: GridCoord) -> Option<&SpatialCell> {
        self.cells.get(&coord)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Raw contents of the cell under `position`, without liveness filtering
    pub fn objects_at_position(&self, position: Vec2) -> &[ObjectId] {
        self.cells
            .get(&self.position_to_cell(position))
            .map(|cell| cell.as_slice())
            .unwrap_or(&[])
    }

    /// Live objects of `kind` (`None` = any kind) within `radius` cells of
    /// `position`, i.e. in the `(2r+1)²` square of cells around it
    pub fn objects_of_type_near(
        &self,
        objects: &Objects,
        position: Vec2,
        kind: Option<ObjectKind>,
        radius: i32,
    ) -> Vec<ObjectId> {
        let mut result = Vec::new();
        self.for_each_near(objects, position, kind, radius, |id, _| result.push(id));
        result
    }

    pub fn bombers_near(&self, objects: &Objects, position: Vec2, radius: i32) -> Vec<ObjectId> {
        self.objects_of_type_near(objects, position, Some(ObjectKind::Bomber), radius)
    }

    pub fn bombs_near(&self, objects: &Objects, position: Vec2, radius: i32) -> Vec<ObjectId> {
        self.objects_of_type_near(objects, position, Some(ObjectKind::Bomb), radius)
    }

    pub fn extras_near(&self, objects: &Objects, position: Vec2, radius: i32) -> Vec<ObjectId> {
        self.objects_of_type_near(objects, position, Some(ObjectKind::Extra), radius)
    }

    /// Visit every live object of `kind` in the square of cells around
    /// `position`, without allocating
    pub fn for_each_near<'a, F>(
        &self,
        objects: &'a Objects,
        position: Vec2,
        kind: Option<ObjectKind>,
        radius: i32,
        mut visit: F,
    ) where
        F: FnMut(ObjectId, &'a GameObject),
    {
        let center = self.position_to_cell(position);
        let radius = radius.max(0);

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let Some(cell) = self.cells.get(&center.offset(dx, dy)) else {
                    continue;
                };
                for &id in cell {
                    match objects.get(id) {
                        Some(obj) if !obj.delete_me && obj.is_kind(kind) => visit(id, obj),
                        Some(_) => {}
                        None => tracing::trace!("Skipping stale handle {:?} in cell {}", id, center.offset(dx, dy)),
                    }
                }
            }
        }
    }

    /// Live objects of `kind` whose position lies inside the box
    /// `top_left..=bottom_right`
    ///
    /// The covering cells are coarser than the box, so every candidate gets an
    /// exact bounds check.
    pub fn objects_in_area(
        &self,
        objects: &Objects,
        top_left: Vec2,
        bottom_right: Vec2,
        kind: Option<ObjectKind>,
    ) -> Vec<ObjectId> {
        let min = self.position_to_cell(top_left);
        let max = self.position_to_cell(bottom_right);
        let mut result = Vec::new();

        for y in min.y..=max.y {
            for x in min.x..=max.x {
                let Some(cell) = self.cells.get(&GridCoord::new(x, y)) else {
                    continue;
                };
                for &id in cell {
                    let Some(obj) = objects.get(id) else { continue };
                    if obj.delete_me || !obj.is_kind(kind) {
                        continue;
                    }
                    let p = obj.position;
                    if p.x >= top_left.x && p.x <= bottom_right.x && p.y >= top_left.y && p.y <= bottom_right.y {
                        result.push(id);
                    }
                }
            }
        }
        result
    }

    /// Live objects of `kind` within `collision_radius` pixels of `id`
    /// (the object itself excluded)
    pub fn find_collisions(
        &self,
        objects: &Objects,
        id: ObjectId,
        collision_radius: f32,
        kind: Option<ObjectKind>,
    ) -> Vec<ObjectId> {
        let Some(obj) = objects.get(id) else {
            return Vec::new();
        };
        let cell_radius = (collision_radius * self.inv_cell_size).ceil() as i32;
        let radius_sq = collision_radius * collision_radius;
        let mut result = Vec::new();

        self.for_each_near(objects, obj.position, kind, cell_radius, |other_id, other| {
            if other_id != id && obj.position.distance_sq_to(other.position) <= radius_sq {
                result.push(other_id);
            }
        });
        result
    }

    /// Is there a live object of `kind` in the cell under `position`?
    pub fn has_object_at_position(&self, objects: &Objects, position: Vec2, kind: Option<ObjectKind>) -> bool {
        self.objects_at_position(position)
            .iter()
            .filter_map(|&id| objects.get(id))
            .any(|obj| !obj.delete_me && obj.is_kind(kind))
    }

    // ========================================================================
    // Cell bookkeeping
    // ========================================================================

    fn insert_into_cell(&mut self, id: ObjectId, cell: GridCoord) {
        self.cells.entry(cell).or_default().push(id);
    }

    fn remove_from_cell(&mut self, id: ObjectId, cell: GridCoord) {
        if let Some(members) = self.cells.get_mut(&cell) {
            members.retain(|m| *m != id);
            if members.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    // ========================================================================
    // Statistics & debugging
    // ========================================================================

    /// Get statistics about the grid
    pub fn stats(&self) -> SpatialGridStats {
        let total_cells = self.cells.len();
        let occupied_cells = self.cells.values().filter(|c| !c.is_empty()).count();
        let total_objects = self.object_cells.len();
        let max_per_cell = self.cells.values().map(|c| c.len()).max().unwrap_or(0);

        SpatialGridStats {
            total_cells,
            occupied_cells,
            total_objects,
            max_per_cell,
            average_per_cell: if occupied_cells > 0 {
                total_objects as f32 / occupied_cells as f32
            } else {
                0.0
            },
            load_factor: if total_cells > 0 {
                occupied_cells as f32 / total_cells as f32
            } else {
                0.0
            },
        }
    }

    /// ASCII picture of occupancy: `.` empty, `#` 1-5 objects, `@` 6+
    pub fn visualize(&self, max_width: usize, max_height: usize) -> String {
        let mut out = String::from("Legend: . = empty, # = 1-5 objects, @ = 6+ objects\n");
        if self.cells.is_empty() {
            return out;
        }

        let min_x = self.cells.keys().map(|c| c.x).min().unwrap_or(0);
        let max_x = self.cells.keys().map(|c| c.x).max().unwrap_or(0);
        let min_y = self.cells.keys().map(|c| c.y).min().unwrap_or(0);
        let max_y = self.cells.keys().map(|c| c.y).max().unwrap_or(0);
        let width = ((max_x - min_x + 1) as usize).min(max_width) as i32;
        let height = ((max_y - min_y + 1) as usize).min(max_height) as i32;

        for y in min_y..min_y + height {
            for x in min_x..min_x + width {
                let ch = match self.cells.get(&GridCoord::new(x, y)).map_or(0, |c| c.len()) {
                    0 => '.',
                    1..=5 => '#',
                    _ => '@',
                };
                out.push(ch);
            }
            out.push('\n');
        }
        out
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(TILE_SIZE)
    }
}

/// Statistics about the spatial grid
#[derive(Debug, Clone)]
pub struct SpatialGridStats {
    pub total_cells: usize,
    pub occupied_cells: usize,
    pub total_objects: usize,
    pub max_per_cell: usize,
    pub average_per_cell: f32,
    pub load_factor: f32,
}
