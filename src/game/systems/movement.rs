use crate::game::constants::map::TILE_SIZE;
use crate::game::coords::GridCoord;
use crate::game::input::Intent;
use crate::game::map::TileMap;
use crate::game::object::ObjectId;
use crate::game::world::World;
use crate::util::vec2::Vec2;

/// Half the side of a bomber's collision square (pixels)
pub const BOMBER_HALF_EXTENT: f32 = 15.0;

/// Move a bomber according to its controller's intent
///
/// Axes are resolved separately so a bomber sliding along a wall keeps its
/// free component. While moving along one axis the bomber is pulled toward
/// the centre line of its tile on the other axis, which lets it slip into
/// corridors without pixel-perfect input.
pub fn apply_intent(world: &mut World, id: ObjectId, intent: Intent, dt: f32) {
    let Some(obj) = world.object(id) else { return };
    if !obj.is_alive() {
        return;
    }
    let Some(speed) = obj.as_bomber().map(|b| b.speed) else { return };

    let (dx, dy) = intent.axes();
    if dx == 0 && dy == 0 {
        return;
    }

    let step = speed * dt;
    let mut position = obj.position;

    if dx != 0 {
        position = try_move(world.map(), position, Vec2::new(dx as f32 * step, 0.0));
        if dy == 0 {
            position.y = nudge_to_centre(position.y, step);
        }
    }
    if dy != 0 {
        position = try_move(world.map(), position, Vec2::new(0.0, dy as f32 * step));
        if dx == 0 {
            position.x = nudge_to_centre(position.x, step);
        }
    }

    // try_move never leaves the map and the handle resolved above
    let _ = world.move_object(id, position);
}

/// Apply `delta` if the bomber's square stays on walkable tiles
fn try_move(map: Option<&TileMap>, from: Vec2, delta: Vec2) -> Vec2 {
    let to = from + delta;
    let Some(map) = map else { return to };

    let corners = [
        Vec2::new(to.x - BOMBER_HALF_EXTENT, to.y - BOMBER_HALF_EXTENT),
        Vec2::new(to.x + BOMBER_HALF_EXTENT, to.y - BOMBER_HALF_EXTENT),
        Vec2::new(to.x - BOMBER_HALF_EXTENT, to.y + BOMBER_HALF_EXTENT),
        Vec2::new(to.x + BOMBER_HALF_EXTENT, to.y + BOMBER_HALF_EXTENT),
    ];
    if corners.iter().all(|&c| map.is_walkable(GridCoord::from_pixel(c))) {
        to
    } else {
        from
    }
}

/// Move `coord` up to `max_step` toward the centre of the tile it lies in
fn nudge_to_centre(coord: f32, max_step: f32) -> f32 {
    let centre = (coord / TILE_SIZE).floor() * TILE_SIZE + TILE_SIZE / 2.0;
    let offset = centre - coord;
    coord + offset.clamp(-max_step, max_step)
}
