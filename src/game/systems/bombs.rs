use std::collections::VecDeque;

use rand::Rng;
use rustc_hash::FxHashSet;

use crate::game::constants::bomb::{EXPLOSION_LIFETIME, EXTRA_DROP_CHANCE};
use crate::game::coords::{GridCoord, CARDINALS};
use crate::game::map::{Tile, TileMap};
use crate::game::object::{ExtraKind, GameObject, ObjectBody, ObjectId, ObjectKind};
use crate::game::world::{TickReport, World};

/// Tiles covered by a bomb of `power` at `origin`
///
/// The blast is a cross. Each ray stops before a wall, and stops on (but
/// includes) a box. Without a map the rays are unobstructed.
pub fn explosion_tiles(map: Option<&TileMap>, origin: GridCoord, power: u32) -> Vec<GridCoord> {
    let mut tiles = Vec::with_capacity(1 + 4 * power as usize);
    tiles.push(origin);

    for (dx, dy) in CARDINALS {
        for step in 1..=power as i32 {
            let tile = origin.offset(dx * step, dy * step);
            match map.map(|m| m.get(tile)) {
                None => tiles.push(tile),
                Some(None) | Some(Some(Tile::Wall)) => break,
                Some(Some(Tile::Box)) => {
                    tiles.push(tile);
                    break;
                }
                Some(Some(Tile::Ground)) => tiles.push(tile),
            }
        }
    }
    tiles
}

/// Drop a bomb on the bomber's tile if it has one to spare and the tile is free
pub fn place_bomb(world: &mut World, bomber: ObjectId) -> Option<ObjectId> {
    let obj = world.object(bomber)?;
    if !obj.is_alive() {
        return None;
    }
    let state = obj.as_bomber()?;
    if !state.can_place_bomb() {
        return None;
    }
    let power = state.power;
    let tile = obj.tile();
    if world.has_bomb_at(tile) {
        return None;
    }

    let bomb = world.spawn_bomb(tile, power, Some(bomber));
    if let Some(state) = world.objects.get_mut(bomber).and_then(|o| o.as_bomber_mut()) {
        state.bombs_placed += 1;
        tracing::debug!("{} placed a bomb at {}", state.name, tile);
    }
    Some(bomb)
}

/// Burn fuses and detonate expired bombs, chaining through bombs caught in a
/// blast
pub fn update_bombs(world: &mut World, dt: f32, report: &mut TickReport) {
    let mut expired = Vec::new();
    for (id, obj) in world.objects.iter_mut() {
        if obj.delete_me {
            continue;
        }
        if let ObjectBody::Bomb(bomb) = &mut obj.body {
            bomb.fuse -= dt;
            if bomb.fuse <= 0.0 {
                expired.push(id);
            }
        }
    }
    chain(world, expired, report);
}

/// Detonate `seeds`, then every bomb caught by the resulting blasts
fn chain(world: &mut World, seeds: Vec<ObjectId>, report: &mut TickReport) {
    let mut queue: VecDeque<ObjectId> = seeds.into();
    let mut detonated: FxHashSet<ObjectId> = FxHashSet::default();
    while let Some(id) = queue.pop_front() {
        if !detonated.insert(id) {
            continue;
        }
        for tile in detonate(world, id, report) {
            for other in bombs_on(world, tile) {
                if !detonated.contains(&other) {
                    queue.push_back(other);
                }
            }
        }
    }
}

/// Live bombs lying on `tile`
fn bombs_on(world: &World, tile: GridCoord) -> Vec<ObjectId> {
    world
        .objects_near(tile.center(), Some(ObjectKind::Bomb), 0)
        .into_iter()
        .filter(|&id| world.object(id).is_some_and(|o| !o.delete_me && o.tile() == tile))
        .collect()
}

/// Blow up one bomb; returns the tiles its explosion covered
fn detonate(world: &mut World, id: ObjectId, report: &mut TickReport) -> Vec<GridCoord> {
    let Some(obj) = world.objects.get_mut(id) else { return Vec::new() };
    let Some((power, owner)) = obj.as_bomb().map(|b| (b.power, b.owner)) else {
        return Vec::new();
    };
    let origin = obj.tile();
    obj.delete_me = true;
    report.explosions += 1;

    if let Some(state) = owner
        .and_then(|o| world.objects.get_mut(o))
        .and_then(|o| o.as_bomber_mut())
    {
        state.bombs_placed = state.bombs_placed.saturating_sub(1);
    }

    let tiles = explosion_tiles(world.map(), origin, power);
    tracing::debug!("Bomb at {} exploded over {} tiles", origin, tiles.len());

    for &tile in &tiles {
        let destroyed = world.map.as_mut().is_some_and(|m| m.destroy(tile));
        if destroyed {
            report.boxes_destroyed += 1;
            if world.rng.gen_bool(EXTRA_DROP_CHANCE) {
                let kind = ExtraKind::ALL[world.rng.gen_range(0..ExtraKind::ALL.len())];
                world.spawn_extra(tile, kind);
            }
        }
        world.spawn(GameObject::new(
            tile.center(),
            ObjectBody::Explosion {
                remaining: EXPLOSION_LIFETIME,
                owner,
            },
        ));
    }

    burn(world, &tiles, owner, report);
    tiles
}

/// Kill bombers and clear corpses standing on `tiles`, crediting `owner`
fn burn(world: &mut World, tiles: &[GridCoord], owner: Option<ObjectId>, report: &mut TickReport) {
    for victim in world.explosion_victims(tiles) {
        match world.object(victim).map(GameObject::kind) {
            Some(ObjectKind::Bomber) => {
                if world.kill_bomber(victim).is_err() {
                    continue;
                }
                let credited = owner.filter(|&o| o != victim);
                if let Some(state) = credited
                    .and_then(|o| world.objects.get_mut(o))
                    .and_then(|o| o.as_bomber_mut())
                {
                    state.kills += 1;
                }
                report.kills.push((victim, credited));
            }
            Some(ObjectKind::BomberCorpse) => {
                let _ = world.mark_for_deletion(victim);
            }
            _ => {}
        }
    }
}

/// Age explosions and retire the burned out ones
///
/// A live explosion keeps burning its tile: bombers walking in die, bombs
/// landing on it go off and corpses on it are cleared.
pub fn update_explosions(world: &mut World, dt: f32, report: &mut TickReport) {
    let mut burning: Vec<(GridCoord, Option<ObjectId>)> = Vec::new();
    for (_, obj) in world.objects.iter_mut() {
        if obj.delete_me {
            continue;
        }
        let tile = obj.tile();
        if let ObjectBody::Explosion { remaining, owner } = &mut obj.body {
            *remaining -= dt;
            if *remaining <= 0.0 {
                obj.delete_me = true;
            } else {
                burning.push((tile, *owner));
            }
        }
    }

    let mut caught = Vec::new();
    for &(tile, _) in &burning {
        for bomb in bombs_on(world, tile) {
            if !caught.contains(&bomb) {
                caught.push(bomb);
            }
        }
    }
    chain(world, caught, report);

    for (tile, owner) in burning {
        burn(world, &[tile], owner, report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::bomb::FUSE;

    fn arena() -> TileMap {
        TileMap::from_ascii(
            "
            #########
            #.......#
            #.#+#.#.#
            #.......#
            #########
            ",
        )
    }

    #[test]
    fn test_explosion_stops_at_walls_and_boxes() {
        let map = arena();
        let tiles = explosion_tiles(Some(&map), GridCoord::new(3, 1), 3);

        // Box below is included, the border wall above is not
        assert!(tiles.contains(&GridCoord::new(3, 2)));
        assert!(!tiles.contains(&GridCoord::new(3, 3)));
        assert!(!tiles.contains(&GridCoord::new(3, 0)));
        // Horizontal ray: three tiles each way, clipped by the border on the left
        assert!(tiles.contains(&GridCoord::new(6, 1)));
        assert!(tiles.contains(&GridCoord::new(1, 1)));
        assert!(!tiles.contains(&GridCoord::new(0, 1)));
    }

    #[test]
    fn test_explosion_without_map_is_full_cross() {
        let tiles = explosion_tiles(None, GridCoord::new(5, 5), 2);
        assert_eq!(tiles.len(), 9);
    }

    #[test]
    fn test_place_bomb_respects_limits() {
        let mut world = World::new(Some(arena()), true, 0);
        let id = world.spawn_bomber(GridCoord::new(1, 1), "A");

        assert!(place_bomb(&mut world, id).is_some());
        // Only one bomb at a time by default
        assert!(place_bomb(&mut world, id).is_none());

        world.objects[id].as_bomber_mut().unwrap().max_bombs = 2;
        // Tile already has a bomb
        assert!(place_bomb(&mut world, id).is_none());
    }

    #[test]
    fn test_detonation_kills_and_credits() {
        let mut world = World::new(Some(arena()), true, 0);
        let attacker = world.spawn_bomber(GridCoord::new(1, 1), "Attacker");
        let victim = world.spawn_bomber(GridCoord::new(4, 1), "Victim");
        world.spawn_bomb(GridCoord::new(3, 1), 2, Some(attacker));

        let mut report = TickReport::default();
        update_bombs(&mut world, FUSE + 0.1, &mut report);

        assert_eq!(report.explosions, 1);
        assert_eq!(report.kills.len(), 2);
        assert!(report.kills.contains(&(victim, Some(attacker))));
        // Attacker stood in its own blast: no credit for that one
        assert!(report.kills.contains(&(attacker, None)));
        assert_eq!(world.object(attacker).unwrap().as_bomber().unwrap().kills, 1);
        assert_eq!(report.boxes_destroyed, 1);
        assert!(world.map().unwrap().is_walkable(GridCoord::new(3, 2)));
    }

    #[test]
    fn test_chain_reaction() {
        let mut world = World::new(Some(arena()), true, 0);
        let first = world.spawn_bomb(GridCoord::new(1, 3), 2, None);
        let second = world.spawn_bomb(GridCoord::new(3, 3), 2, None);
        world.objects[first].as_bomb_mut().unwrap().fuse = 0.01;

        let mut report = TickReport::default();
        update_bombs(&mut world, 0.02, &mut report);

        assert_eq!(report.explosions, 2);
        assert!(world.object(second).unwrap().delete_me);
    }

    #[test]
    fn test_explosions_fade() {
        let mut world = World::new(Some(arena()), true, 0);
        world.spawn_bomb(GridCoord::new(5, 3), 1, None);
        let mut report = TickReport::default();
        update_bombs(&mut world, FUSE, &mut report);
        world.reap();

        fn explosions(world: &World) -> usize {
            world
                .objects()
                .values()
                .filter(|o| o.kind() == ObjectKind::Explosion && !o.delete_me)
                .count()
        }
        assert!(explosions(&world) > 0);

        update_explosions(&mut world, EXPLOSION_LIFETIME + 0.01, &mut report);
        assert_eq!(explosions(&world), 0);
    }

    #[test]
    fn test_live_explosion_kills_late_arrivals() {
        let mut world = World::new(Some(arena()), true, 0);
        let attacker = world.spawn_bomber(GridCoord::new(1, 1), "Attacker");
        world.spawn_bomb(GridCoord::new(5, 3), 1, Some(attacker));
        let mut report = TickReport::default();
        update_bombs(&mut world, FUSE, &mut report);
        world.reap();
        assert!(report.kills.is_empty());

        let late = world.spawn_bomber(GridCoord::new(5, 3), "Late");
        let mut report = TickReport::default();
        update_explosions(&mut world, 0.1, &mut report);

        assert!(!world.object(late).unwrap().is_alive());
        assert_eq!(report.kills, vec![(late, Some(attacker))]);
        assert_eq!(world.object(attacker).unwrap().as_bomber().unwrap().kills, 1);
        // The corpse left behind burns on the next pass
        let corpse_at = GridCoord::new(5, 3).center();
        assert_eq!(world.objects_near(corpse_at, Some(ObjectKind::BomberCorpse), 0).len(), 1);
        update_explosions(&mut world, 0.1, &mut report);
        assert!(world.objects_near(corpse_at, Some(ObjectKind::BomberCorpse), 0).is_empty());
    }

    #[test]
    fn test_bomb_dropped_into_live_explosion_goes_off() {
        let mut world = World::new(Some(arena()), true, 0);
        world.spawn_bomb(GridCoord::new(5, 3), 1, None);
        let mut report = TickReport::default();
        update_bombs(&mut world, FUSE, &mut report);
        world.reap();

        let dropped = world.spawn_bomb(GridCoord::new(6, 3), 1, None);
        let mut report = TickReport::default();
        update_explosions(&mut world, 0.1, &mut report);

        assert_eq!(report.explosions, 1);
        assert!(world.object(dropped).unwrap().delete_me);
    }

    #[test]
    fn test_burned_out_explosion_is_harmless() {
        let mut world = World::new(Some(arena()), true, 0);
        world.spawn_bomb(GridCoord::new(5, 3), 1, None);
        let mut report = TickReport::default();
        update_bombs(&mut world, FUSE, &mut report);
        world.reap();

        let bystander = world.spawn_bomber(GridCoord::new(5, 3), "Bystander");
        let mut report = TickReport::default();
        update_explosions(&mut world, EXPLOSION_LIFETIME + 0.01, &mut report);

        assert!(world.object(bystander).unwrap().is_alive());
        assert!(report.kills.is_empty());
    }

    #[test]
    fn test_owner_gets_bomb_back() {
        let mut world = World::new(Some(arena()), true, 0);
        let id = world.spawn_bomber(GridCoord::new(7, 3), "A");
        place_bomb(&mut world, id).unwrap();
        assert_eq!(world.object(id).unwrap().as_bomber().unwrap().bombs_placed, 1);

        let mut report = TickReport::default();
        update_bombs(&mut world, FUSE, &mut report);
        assert_eq!(world.object(id).unwrap().as_bomber().unwrap().bombs_placed, 0);
    }
}
