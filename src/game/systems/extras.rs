use crate::game::constants::extra::COLLECT_DISTANCE;
use crate::game::object::{ObjectBody, ObjectId};
use crate::game::world::{TickReport, World};

/// Hand every pickup to the nearest living bomber standing on it
pub fn collect_extras(world: &mut World, report: &mut TickReport) {
    let extras: Vec<(ObjectId, _, _)> = world
        .objects()
        .iter()
        .filter(|(_, o)| !o.delete_me)
        .filter_map(|(id, o)| match o.body {
            ObjectBody::Extra(kind) => Some((id, kind, o.position)),
            _ => None,
        })
        .collect();

    for (extra, kind, position) in extras {
        let Some(bomber) = world.nearest_bomber(position, COLLECT_DISTANCE) else {
            continue;
        };
        if let Some(state) = world.objects.get_mut(bomber).and_then(|o| o.as_bomber_mut()) {
            state.apply_extra(kind);
            tracing::debug!("{} picked up {:?}", state.name, kind);
        }
        let _ = world.mark_for_deletion(extra);
        report.pickups.push((bomber, kind));
    }
}
