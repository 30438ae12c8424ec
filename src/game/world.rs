//! Match state: the object arena, the tile map, the spatial index and the
//! controllers driving each bomber
//!
//! `World` owns every object. The spatial grid only holds handles, and all
//! mutations go through `World` so the two never disagree: objects are
//! added to the grid when spawned, repositioned whenever they move, and
//! removed from the grid before their arena slot is freed.
//!
//! The grid is optional. Without it every proximity query falls back to
//! enumerating the arena with the same filtering rules.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::game::collision::{AiTargets, CollisionHelper};
use crate::game::coords::GridCoord;
use crate::game::input::{Controller, Intent};
use crate::game::map::TileMap;
use crate::game::object::{ExtraKind, GameObject, ObjectBody, ObjectId, ObjectKind, Objects};
use crate::game::spatial::SpatialGrid;
use crate::game::systems::{bombs, extras, movement};
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("Object handle is stale or was never issued")]
    StaleHandle,
    #[error("Object is not a bomber")]
    NotABomber,
    #[error("Tile {0} is outside the map")]
    OutOfBounds(GridCoord),
}

/// A bomber and the device steering it
pub struct ControlledBomber {
    pub bomber: ObjectId,
    pub controller: Box<dyn Controller>,
}

/// What happened during one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub bombs_placed: usize,
    pub explosions: usize,
    pub boxes_destroyed: usize,
    /// (victim, credited bomber)
    pub kills: Vec<(ObjectId, Option<ObjectId>)>,
    /// (bomber, pickup)
    pub pickups: Vec<(ObjectId, ExtraKind)>,
}

pub struct World {
    pub(crate) objects: Objects,
    pub(crate) grid: Option<SpatialGrid>,
    pub(crate) map: Option<TileMap>,
    pub(crate) controllers: Vec<ControlledBomber>,
    pub(crate) rng: StdRng,
    elapsed: f32,
}

impl World {
    pub fn new(map: Option<TileMap>, use_spatial_grid: bool, seed: u64) -> Self {
        Self {
            objects: Objects::with_key(),
            grid: use_spatial_grid.then(SpatialGrid::default),
            map,
            controllers: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            elapsed: 0.0,
        }
    }

    /// World with an open map and a spatial grid
    pub fn with_map(map: TileMap) -> Self {
        Self::new(Some(map), true, 0)
    }

    /// World with no map and no grid
    pub fn empty() -> Self {
        Self::new(None, false, 0)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn objects(&self) -> &Objects {
        &self.objects
    }

    #[inline]
    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(id)
    }

    #[inline]
    pub fn map(&self) -> Option<&TileMap> {
        self.map.as_ref()
    }

    #[inline]
    pub fn map_mut(&mut self) -> Option<&mut TileMap> {
        self.map.as_mut()
    }

    #[inline]
    pub fn spatial_grid(&self) -> Option<&SpatialGrid> {
        self.grid.as_ref()
    }

    /// Seconds simulated so far
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn collision_helper(&self) -> Option<CollisionHelper<'_>> {
        self.grid.as_ref().map(|grid| CollisionHelper::new(grid, &self.objects))
    }

    // ========================================================================
    // Object lifecycle
    // ========================================================================

    /// Register an object with the arena and the spatial index
    pub fn spawn(&mut self, obj: GameObject) -> ObjectId {
        let position = obj.position;
        let id = self.objects.insert(obj);
        if let Some(grid) = self.grid.as_mut() {
            grid.add_object(id, position);
        }
        id
    }

    pub fn spawn_bomber(&mut self, tile: GridCoord, name: impl Into<String>) -> ObjectId {
        self.spawn(GameObject::bomber(tile.center(), name))
    }

    pub fn spawn_bomb(&mut self, tile: GridCoord, power: u32, owner: Option<ObjectId>) -> ObjectId {
        self.spawn(GameObject::bomb(tile.center(), power, owner))
    }

    pub fn spawn_extra(&mut self, tile: GridCoord, kind: ExtraKind) -> ObjectId {
        self.spawn(GameObject::extra(tile.center(), kind))
    }

    /// Move an object, keeping the spatial index in sync. Positions off the
    /// map are rejected.
    pub fn move_object(&mut self, id: ObjectId, position: Vec2) -> Result<(), WorldError> {
        if let Some(map) = &self.map {
            let tile = GridCoord::from_pixel(position);
            if !map.in_bounds(tile) {
                return Err(WorldError::OutOfBounds(tile));
            }
        }
        let obj = self.objects.get_mut(id).ok_or(WorldError::StaleHandle)?;
        let old = obj.position;
        obj.position = position;
        if let Some(grid) = self.grid.as_mut() {
            grid.update_object_position(id, old, position);
        }
        Ok(())
    }

    /// Flag an object for removal at the end of the tick
    pub fn mark_for_deletion(&mut self, id: ObjectId) -> Result<(), WorldError> {
        let obj = self.objects.get_mut(id).ok_or(WorldError::StaleHandle)?;
        obj.delete_me = true;
        Ok(())
    }

    /// Kill a bomber: it stops being indexed and leaves a corpse behind
    pub fn kill_bomber(&mut self, id: ObjectId) -> Result<(), WorldError> {
        let obj = self.objects.get_mut(id).ok_or(WorldError::StaleHandle)?;
        let position = obj.position;
        let bomber = obj.as_bomber_mut().ok_or(WorldError::NotABomber)?;
        if bomber.dead {
            return Ok(());
        }
        bomber.dead = true;
        tracing::info!("{} was blown up at {}", bomber.name, GridCoord::from_pixel(position));

        if let Some(grid) = self.grid.as_mut() {
            grid.remove_object(id);
        }
        self.spawn(GameObject::new(position, ObjectBody::BomberCorpse));
        Ok(())
    }

    /// Free every object marked `delete_me`, unindexing it first
    pub fn reap(&mut self) -> usize {
        let doomed: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, o)| o.delete_me)
            .map(|(id, _)| id)
            .collect();

        for &id in &doomed {
            if let Some(grid) = self.grid.as_mut() {
                grid.remove_object(id);
            }
            self.objects.remove(id);
        }
        doomed.len()
    }

    /// Re-index everything from scratch
    pub fn rebuild_spatial_grid(&mut self) {
        if let Some(grid) = self.grid.as_mut() {
            grid.rebuild_from_objects(&self.objects);
            // Dead bombers are never indexed
            for (id, obj) in self.objects.iter() {
                if obj.as_bomber().is_some_and(|b| b.dead) {
                    grid.remove_object(id);
                }
            }
        }
    }

    // ========================================================================
    // Controllers
    // ========================================================================

    /// Hand a bomber over to a controller
    pub fn attach_controller(
        &mut self,
        bomber: ObjectId,
        mut controller: Box<dyn Controller>,
    ) -> Result<(), WorldError> {
        let obj = self.objects.get(bomber).ok_or(WorldError::StaleHandle)?;
        if obj.as_bomber().is_none() {
            return Err(WorldError::NotABomber);
        }
        controller.attach(bomber);
        tracing::debug!("Attached {:?} controller to {:?}", controller.kind(), bomber);

        self.controllers.retain(|c| c.bomber != bomber);
        self.controllers.push(ControlledBomber { bomber, controller });
        Ok(())
    }

    pub fn controller(&self, bomber: ObjectId) -> Option<&dyn Controller> {
        self.controllers
            .iter()
            .find(|c| c.bomber == bomber)
            .map(|c| c.controller.as_ref())
    }

    pub fn controllers(&self) -> impl Iterator<Item = &ControlledBomber> {
        self.controllers.iter()
    }

    // ========================================================================
    // Queries (spatial grid with enumeration fallback)
    // ========================================================================

    /// Objects of `kind` not marked for deletion within `radius` cells of
    /// `position`
    pub fn objects_near(&self, position: Vec2, kind: Option<ObjectKind>, radius: i32) -> Vec<ObjectId> {
        match &self.grid {
            Some(grid) => grid.objects_of_type_near(&self.objects, position, kind, radius),
            None => {
                let center = GridCoord::from_pixel(position);
                self.objects
                    .iter()
                    .filter(|(_, o)| !o.delete_me && o.is_kind(kind))
                    .filter(|(_, o)| {
                        let tile = o.tile();
                        (tile.x - center.x).abs() <= radius && (tile.y - center.y).abs() <= radius
                    })
                    .map(|(id, _)| id)
                    .collect()
            }
        }
    }

    pub fn bombs_near(&self, position: Vec2, radius: i32) -> Vec<ObjectId> {
        self.objects_near(position, Some(ObjectKind::Bomb), radius)
    }

    /// Living bombers within `radius` cells
    pub fn bombers_near(&self, position: Vec2, radius: i32) -> Vec<ObjectId> {
        let mut ids = self.objects_near(position, Some(ObjectKind::Bomber), radius);
        ids.retain(|&id| self.objects.get(id).is_some_and(GameObject::is_alive));
        ids
    }

    pub fn extras_near(&self, position: Vec2, radius: i32) -> Vec<ObjectId> {
        self.objects_near(position, Some(ObjectKind::Extra), radius)
    }

    /// Enemies, bombs and extras around an AI agent
    pub fn scan_targets(&self, position: Vec2, radius: i32, exclude: Option<ObjectId>) -> AiTargets {
        if let Some(helper) = self.collision_helper() {
            return helper.scan_ai_targets(position, radius, exclude);
        }

        let mut targets = AiTargets::default();
        for id in self.objects_near(position, None, radius) {
            if Some(id) == exclude {
                continue;
            }
            let Some(obj) = self.objects.get(id) else { continue };
            if !obj.is_alive() {
                continue;
            }
            match obj.kind() {
                ObjectKind::Bomber => targets.enemy_bombers.push(id),
                ObjectKind::Bomb => targets.bombs.push(id),
                ObjectKind::Extra => targets.extras.push(id),
                _ => {}
            }
        }
        targets
    }

    /// Bombers and corpses standing exactly on one of `tiles`
    pub fn explosion_victims(&self, tiles: &[GridCoord]) -> Vec<ObjectId> {
        if let Some(helper) = self.collision_helper() {
            return helper.find_explosion_victims(tiles);
        }
        self.objects
            .iter()
            .filter(|(_, o)| o.is_alive())
            .filter(|(_, o)| matches!(o.kind(), ObjectKind::Bomber | ObjectKind::BomberCorpse))
            .filter(|(_, o)| tiles.contains(&o.tile()))
            .map(|(id, _)| id)
            .collect()
    }

    /// Closest living bomber able to collect something at `position`
    pub fn nearest_bomber(&self, position: Vec2, max_distance: f32) -> Option<ObjectId> {
        if let Some(helper) = self.collision_helper() {
            return helper.find_nearest_bomber(position, max_distance);
        }
        self.objects
            .iter()
            .filter(|(_, o)| o.kind() == ObjectKind::Bomber && o.is_alive())
            .map(|(id, o)| (id, o.position.distance_to(position)))
            .filter(|&(_, d)| d <= max_distance)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(id, _)| id)
    }

    pub fn has_bomb_at(&self, tile: GridCoord) -> bool {
        self.objects_near(tile.center(), Some(ObjectKind::Bomb), 0)
            .iter()
            .filter_map(|&id| self.objects.get(id))
            .any(|o| o.tile() == tile)
    }

    pub fn alive_bombers(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.kind() == ObjectKind::Bomber && o.is_alive())
            .map(|(id, _)| id)
            .collect()
    }

    /// The last bomber standing, once everyone else is dead
    pub fn winner(&self) -> Option<ObjectId> {
        match self.alive_bombers().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    // ========================================================================
    // Game loop
    // ========================================================================

    /// Advance the match by `dt` seconds
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let mut report = TickReport::default();

        // Controllers perceive the world as it was at the start of the tick
        let mut controllers = std::mem::take(&mut self.controllers);
        for entry in controllers.iter_mut() {
            if self.objects.get(entry.bomber).is_some_and(GameObject::is_alive) {
                entry.controller.update(self, dt);
            }
        }

        for entry in &controllers {
            let intent = Intent::read(entry.controller.as_ref());
            movement::apply_intent(self, entry.bomber, intent, dt);
            if intent.bomb && bombs::place_bomb(self, entry.bomber).is_some() {
                report.bombs_placed += 1;
            }
        }
        self.controllers = controllers;

        bombs::update_bombs(self, dt, &mut report);
        bombs::update_explosions(self, dt, &mut report);
        extras::collect_extras(self, &mut report);

        self.reap();
        self.elapsed += dt;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::{Key, KeyEvent, KeyboardController, Keymap};

    fn open_world(use_grid: bool) -> World {
        World::new(Some(TileMap::new(10, 10)), use_grid, 1)
    }

    #[test]
    fn test_spawn_indexes_object() {
        let mut world = open_world(true);
        let id = world.spawn_bomber(GridCoord::new(2, 2), "A");
        assert_eq!(world.spatial_grid().unwrap().cell_of(id), Some(GridCoord::new(2, 2)));
    }

    #[test]
    fn test_move_object_keeps_grid_in_sync() {
        let mut world = open_world(true);
        let id = world.spawn_bomber(GridCoord::new(2, 2), "A");
        world.move_object(id, GridCoord::new(4, 2).center()).unwrap();

        assert_eq!(world.spatial_grid().unwrap().cell_of(id), Some(GridCoord::new(4, 2)));
        assert_eq!(world.bombers_near(GridCoord::new(4, 2).center(), 0), vec![id]);
        assert!(world.bombers_near(GridCoord::new(2, 2).center(), 0).is_empty());
    }

    #[test]
    fn test_move_off_map_rejected() {
        let mut world = open_world(true);
        let id = world.spawn_bomber(GridCoord::new(2, 2), "A");
        assert_eq!(
            world.move_object(id, GridCoord::new(12, 2).center()),
            Err(WorldError::OutOfBounds(GridCoord::new(12, 2)))
        );
        assert_eq!(world.object(id).unwrap().tile(), GridCoord::new(2, 2));
    }

    #[test]
    fn test_reap_unindexes_before_free() {
        let mut world = open_world(true);
        let id = world.spawn_extra(GridCoord::new(3, 3), ExtraKind::Bomb);
        world.mark_for_deletion(id).unwrap();

        assert_eq!(world.reap(), 1);
        assert!(world.object(id).is_none());
        assert!(!world.spatial_grid().unwrap().contains(id));
        assert_eq!(world.mark_for_deletion(id), Err(WorldError::StaleHandle));
    }

    #[test]
    fn test_kill_bomber_leaves_corpse() {
        let mut world = open_world(true);
        let id = world.spawn_bomber(GridCoord::new(2, 2), "A");
        world.kill_bomber(id).unwrap();

        assert!(!world.object(id).unwrap().is_alive());
        assert!(!world.spatial_grid().unwrap().contains(id));
        let corpses = world.objects_near(GridCoord::new(2, 2).center(), Some(ObjectKind::BomberCorpse), 0);
        assert_eq!(corpses.len(), 1);
        // Idempotent
        world.kill_bomber(id).unwrap();
        assert_eq!(world.objects().len(), 2);
    }

    #[test]
    fn test_kill_non_bomber_is_error() {
        let mut world = open_world(true);
        let bomb = world.spawn_bomb(GridCoord::new(2, 2), 1, None);
        assert_eq!(world.kill_bomber(bomb), Err(WorldError::NotABomber));
    }

    #[test]
    fn test_fallback_queries_match_grid() {
        let mut with_grid = open_world(true);
        let mut without_grid = open_world(false);
        for world in [&mut with_grid, &mut without_grid] {
            let me = world.spawn_bomber(GridCoord::new(5, 5), "Me");
            world.spawn_bomber(GridCoord::new(6, 5), "Enemy");
            world.spawn_bomb(GridCoord::new(5, 7), 2, None);
            world.spawn_extra(GridCoord::new(9, 9), ExtraKind::Flame);

            let targets = world.scan_targets(GridCoord::new(5, 5).center(), 2, Some(me));
            assert_eq!(targets.enemy_bombers.len(), 1);
            assert_eq!(targets.bombs.len(), 1);
            assert!(targets.extras.is_empty());

            let victims = world.explosion_victims(&[GridCoord::new(6, 5)]);
            assert_eq!(victims.len(), 1);
        }
    }

    #[test]
    fn test_rebuild_spatial_grid() {
        let mut world = open_world(true);
        let alive = world.spawn_bomber(GridCoord::new(1, 1), "A");
        let dead = world.spawn_bomber(GridCoord::new(2, 1), "B");
        world.kill_bomber(dead).unwrap();

        world.rebuild_spatial_grid();
        let grid = world.spatial_grid().unwrap();
        assert!(grid.contains(alive));
        assert!(!grid.contains(dead));
        assert_eq!(grid.len(), 2); // alive bomber + corpse
    }

    #[test]
    fn test_attach_controller_validates_target() {
        let mut world = open_world(true);
        let bomb = world.spawn_bomb(GridCoord::new(2, 2), 1, None);
        let (keyboard, _keys) = KeyboardController::new(Keymap::arrows());
        assert!(matches!(
            world.attach_controller(bomb, Box::new(keyboard)),
            Err(WorldError::NotABomber)
        ));
    }

    #[test]
    fn test_keyboard_drives_bomber() {
        let mut world = open_world(true);
        let id = world.spawn_bomber(GridCoord::new(2, 2), "Human");
        let (keyboard, keys) = KeyboardController::new(Keymap::arrows());
        world.attach_controller(id, Box::new(keyboard)).unwrap();

        keys.send(KeyEvent::Pressed(Key::Right)).unwrap();
        let start = world.object(id).unwrap().position;
        for _ in 0..30 {
            world.tick(1.0 / 60.0);
        }
        let end = world.object(id).unwrap().position;
        assert!(end.x > start.x + 30.0, "moved from {:?} to {:?}", start, end);
        assert!((end.y - start.y).abs() < 1e-3);
        assert!(world.elapsed() > 0.49);
    }

    #[test]
    fn test_winner() {
        let mut world = open_world(true);
        let a = world.spawn_bomber(GridCoord::new(1, 1), "A");
        let b = world.spawn_bomber(GridCoord::new(3, 3), "B");
        assert_eq!(world.winner(), None);
        world.kill_bomber(b).unwrap();
        assert_eq!(world.winner(), Some(a));
    }
}
