//! Match result and ranking system
//!
//! Computes final match results and bomber rankings.

use serde::Serialize;

use crate::game::object::ObjectKind;
use crate::game::world::{TickReport, World};

/// Match result information
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub winner_name: Option<String>,
    pub rankings: Vec<BomberRanking>,
    pub match_duration: f32,
    pub total_kills: u32,
    pub bombs_placed: usize,
    pub boxes_destroyed: usize,
}

/// Bomber ranking in match results
#[derive(Debug, Clone, Serialize)]
pub struct BomberRanking {
    pub name: String,
    pub rank: u32,
    pub kills: u32,
    pub survived: bool,
    /// Last planner state for bots
    pub last_state: Option<String>,
}

/// Running totals over a match
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchTotals {
    pub bombs_placed: usize,
    pub boxes_destroyed: usize,
}

impl MatchTotals {
    pub fn add(&mut self, report: &TickReport) {
        self.bombs_placed += report.bombs_placed;
        self.boxes_destroyed += report.boxes_destroyed;
    }
}

/// Determine match result from the world
pub fn determine_result(world: &World, totals: MatchTotals) -> MatchResult {
    let mut rankings: Vec<BomberRanking> = world
        .objects()
        .iter()
        .filter(|(_, o)| o.kind() == ObjectKind::Bomber)
        .filter_map(|(id, o)| {
            let bomber = o.as_bomber()?;
            Some(BomberRanking {
                name: bomber.name.clone(),
                rank: 0,
                kills: bomber.kills,
                survived: !bomber.dead,
                last_state: world
                    .controller(id)
                    .and_then(|c| c.debug_state())
                    .map(str::to_string),
            })
        })
        .collect();

    // Sort by: survived (desc), kills (desc), name
    rankings.sort_by(|a, b| {
        b.survived
            .cmp(&a.survived)
            .then_with(|| b.kills.cmp(&a.kills))
            .then_with(|| a.name.cmp(&b.name))
    });

    for (i, ranking) in rankings.iter_mut().enumerate() {
        ranking.rank = (i + 1) as u32;
    }

    let total_kills: u32 = rankings.iter().map(|r| r.kills).sum();
    let survivors = rankings.iter().filter(|r| r.survived).count();
    let winner_name = match rankings.first() {
        Some(first) if first.survived && survivors == 1 => Some(first.name.clone()),
        _ => None,
    };

    MatchResult {
        winner_name,
        rankings,
        match_duration: world.elapsed(),
        total_kills,
        bombs_placed: totals.bombs_placed,
        boxes_destroyed: totals.boxes_destroyed,
    }
}
