//! Headless bot match: build a classic arena, put a planner on every
//! bomber and run it to completion

use crate::config::SimConfig;
use crate::game::map::TileMap;
use crate::game::match_result::{determine_result, MatchResult, MatchTotals};
use crate::game::systems::ai::{AiPersonality, TacticalPlanner};
use crate::game::world::{World, WorldError};

/// Arena with `config.bot_count` AI bombers in the spawn corners
pub fn build_world(config: &SimConfig) -> Result<World, WorldError> {
    let map = TileMap::classic(config.map_seed);
    let mut world = World::new(Some(map), config.use_spatial_grid, config.map_seed);

    for (slot, tile) in TileMap::spawn_points()
        .into_iter()
        .take(config.bot_count)
        .enumerate()
    {
        let personality = config.personality_for(slot);
        let id = world.spawn_bomber(tile, format!("Bot{} ({})", slot + 1, personality));
        let planner = TacticalPlanner::with_seed(
            AiPersonality::from_preset(personality),
            config.map_seed.wrapping_add(slot as u64),
        );
        world.attach_controller(id, Box::new(planner))?;
    }

    tracing::info!(
        "Arena ready: {} bots, {} boxes, grid {}",
        config.bot_count,
        world.map().map_or(0, TileMap::box_count),
        if config.use_spatial_grid { "on" } else { "off" }
    );
    Ok(world)
}

/// Play a full match and rank the bombers
pub fn run_match(config: &SimConfig) -> Result<MatchResult, WorldError> {
    let mut world = build_world(config)?;
    let dt = config.dt();
    let max_ticks = (config.match_seconds * config.tick_rate as f32).ceil() as u64;
    let mut totals = MatchTotals::default();

    for _ in 0..max_ticks {
        let report = world.tick(dt);
        totals.add(&report);

        for (victim, killer) in &report.kills {
            let name = |id| {
                world
                    .object(id)
                    .and_then(|o| o.as_bomber())
                    .map_or("?", |b| b.name.as_str())
            };
            match killer {
                Some(killer) => tracing::info!("{} killed {}", name(*killer), name(*victim)),
                None => tracing::info!("{} blew themselves up", name(*victim)),
            }
        }

        if world.alive_bombers().len() <= 1 {
            break;
        }
    }

    let result = determine_result(&world, totals);
    match &result.winner_name {
        Some(name) => tracing::info!("{} wins after {:.1}s", name, result.match_duration),
        None => tracing::info!("Draw after {:.1}s", result.match_duration),
    }
    Ok(result)
}
