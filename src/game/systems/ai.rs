use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::game::constants::ai::*;
use crate::game::constants::map::TILE_SIZE;
use crate::game::coords::{GridCoord, CARDINALS};
use crate::game::input::{Controller, ControllerKind, Intent};
use crate::game::map::TileMap;
use crate::game::object::ObjectId;
use crate::game::systems::bombs::explosion_tiles;
use crate::game::world::World;
use crate::util::vec2::Vec2;

/// Bombs remembered as "recently placed here"
const RECENT_BOMB_MEMORY: usize = 4;

/// Planner behaviour mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiState {
    /// Wander in a random direction
    Exploring,
    /// Chase an enemy bomber
    Hunting,
    /// Get away from danger
    Fleeing,
    /// Walk to a pickup
    Collecting,
    /// Drop a bomb where it is judged useful
    Bombing,
    /// Stay put
    Waiting,
}

impl AiState {
    pub fn name(&self) -> &'static str {
        match self {
            AiState::Exploring => "EXPLORING",
            AiState::Hunting => "HUNTING",
            AiState::Fleeing => "FLEEING",
            AiState::Collecting => "COLLECTING",
            AiState::Bombing => "BOMBING",
            AiState::Waiting => "WAITING",
        }
    }
}

impl fmt::Display for AiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Personality
// ============================================================================

/// Difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    Peaceful,
    Easy,
    Normal,
    Hard,
    Nightmare,
}

impl Personality {
    pub const ALL: [Personality; 5] = [
        Personality::Peaceful,
        Personality::Easy,
        Personality::Normal,
        Personality::Hard,
        Personality::Nightmare,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Personality::Peaceful => "peaceful",
            Personality::Easy => "easy",
            Personality::Normal => "normal",
            Personality::Hard => "hard",
            Personality::Nightmare => "nightmare",
        }
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown AI personality '{0}'")]
pub struct UnknownPersonality(pub String);

impl FromStr for Personality {
    type Err = UnknownPersonality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Personality::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPersonality(s.to_string()))
    }
}

/// Tuning scalars for one planner. Presets only differ in these numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct AiPersonality {
    pub preset: Personality,
    /// How eager the bot is to fight (0.0-1.0)
    pub aggression_level: f32,
    /// Base delay between actions in seconds
    pub reaction_time: f32,
    /// Seconds between two think cycles
    pub thinking_frequency: f32,
}

impl AiPersonality {
    pub fn from_preset(preset: Personality) -> Self {
        let (aggression_level, reaction_time, thinking_frequency) = match preset {
            Personality::Peaceful => (0.1, 0.8, 0.2),
            Personality::Easy => (0.3, 0.5, 0.15),
            Personality::Normal => (0.5, 0.2, 0.1),
            Personality::Hard => (0.8, 0.1, 0.05),
            Personality::Nightmare => (1.0, 0.03, 0.03),
        };
        Self {
            preset,
            aggression_level,
            reaction_time,
            thinking_frequency,
        }
    }

    /// Multiplier applied to enemy target priority
    pub fn aggression_modifier(&self) -> f32 {
        match self.preset {
            Personality::Peaceful => 0.1,
            Personality::Easy => 0.4,
            Personality::Normal => 0.7,
            Personality::Hard => 0.9,
            Personality::Nightmare => 1.2,
        }
    }

    /// Safe escape routes needed before the bot will drop a bomb
    pub fn required_escape_routes(&self) -> usize {
        match self.preset {
            Personality::Hard | Personality::Nightmare => 1,
            _ => 2,
        }
    }

    /// Scales the cooldown after a deliberate bomb
    pub fn bomb_frequency_modifier(&self) -> f32 {
        2.0 - self.aggression_level
    }

    pub fn should_hunt_enemies(&self) -> bool {
        self.aggression_level > 0.4 && self.preset != Personality::Peaceful
    }

    pub fn set_reaction_time(&mut self, seconds: f32) {
        self.reaction_time = seconds.clamp(0.01, 2.0);
    }

    pub fn set_aggression_level(&mut self, level: f32) {
        self.aggression_level = level.clamp(0.0, 1.0);
    }
}

impl Default for AiPersonality {
    fn default() -> Self {
        Self::from_preset(Personality::Normal)
    }
}

// ============================================================================
// Danger memory
// ============================================================================

/// Positions where bombs were seen, forgotten gradually
#[derive(Debug, Clone)]
pub struct DangerMemory {
    positions: Vec<Vec2>,
    fade_time: f32,
}

impl DangerMemory {
    pub fn new(fade_time: f32) -> Self {
        Self {
            positions: Vec::new(),
            fade_time,
        }
    }

    /// Record a hazard unless one nearby is already known
    pub fn remember(&mut self, position: Vec2) -> bool {
        let known = self
            .positions
            .iter()
            .any(|p| p.distance_to(position) < MEMORY_MERGE_DISTANCE);
        if !known {
            self.positions.push(position);
        }
        !known
    }

    /// Drop each entry with probability `elapsed / fade_time`
    pub fn fade(&mut self, elapsed: f32, rng: &mut impl Rng) {
        let p = (elapsed / self.fade_time).clamp(0.0, 1.0);
        self.positions.retain(|_| rng.gen::<f32>() >= p);
    }

    /// Linear falloff around every remembered hazard, unclamped
    pub fn danger_at(&self, position: Vec2) -> f32 {
        self.positions
            .iter()
            .map(|p| p.distance_to(position))
            .filter(|&d| d < HAZARD_RADIUS)
            .map(|d| (HAZARD_RADIUS - d) / HAZARD_RADIUS)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

impl Default for DangerMemory {
    fn default() -> Self {
        Self::new(MEMORY_FADE_TIME)
    }
}

// ============================================================================
// Planner
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Enemy,
    Powerup,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub id: ObjectId,
    pub kind: TargetKind,
    pub position: Vec2,
    pub priority: f32,
}

/// What the planner knows about its own bomber this update
#[derive(Debug, Clone, Copy)]
struct Agent {
    id: ObjectId,
    position: Vec2,
    tile: GridCoord,
    power: u32,
    can_bomb: bool,
}

/// Finite-state AI that drives a bomber through the same five signals a
/// keyboard produces
pub struct TacticalPlanner {
    agent: Option<ObjectId>,
    personality: AiPersonality,
    state: AiState,
    current_target: Option<Target>,
    memory: DangerMemory,
    input: Intent,

    since_think: f32,
    until_action: f32,
    bomb_cooldown: f32,
    stuck_timer: f32,
    stuck_anchor: Option<Vec2>,
    explore_timer: f32,
    explore_direction: (i32, i32),
    recently_bombed: SmallVec<[Vec2; RECENT_BOMB_MEMORY]>,

    rng: StdRng,
    warned_missing: bool,
}

impl TacticalPlanner {
    pub fn new(personality: AiPersonality) -> Self {
        Self::with_rng(personality, StdRng::from_entropy())
    }

    /// Planner with a deterministic random stream
    pub fn with_seed(personality: AiPersonality, seed: u64) -> Self {
        Self::with_rng(personality, StdRng::seed_from_u64(seed))
    }

    fn with_rng(personality: AiPersonality, rng: StdRng) -> Self {
        let mut planner = Self {
            agent: None,
            personality,
            state: AiState::Exploring,
            current_target: None,
            memory: DangerMemory::default(),
            input: Intent::default(),
            since_think: 0.0,
            until_action: 0.0,
            bomb_cooldown: 0.0,
            stuck_timer: 0.0,
            stuck_anchor: None,
            explore_timer: 0.0,
            explore_direction: (0, 0),
            recently_bombed: SmallVec::new(),
            rng,
            warned_missing: false,
        };
        planner.reset();
        planner
    }

    #[inline]
    pub fn state(&self) -> AiState {
        self.state
    }

    #[inline]
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    #[inline]
    pub fn current_target(&self) -> Option<&Target> {
        self.current_target.as_ref()
    }

    #[inline]
    pub fn danger_memory_len(&self) -> usize {
        self.memory.len()
    }

    #[inline]
    pub fn personality(&self) -> &AiPersonality {
        &self.personality
    }

    pub fn personality_mut(&mut self) -> &mut AiPersonality {
        &mut self.personality
    }

    #[inline]
    pub fn agent(&self) -> Option<ObjectId> {
        self.agent
    }

    /// Stop driving any bomber
    pub fn detach(&mut self) {
        self.agent = None;
        self.reset();
    }

    // ------------------------------------------------------------------------
    // Perception
    // ------------------------------------------------------------------------

    /// Risk at `position` in [0, 1] from remembered hazards, live bombs and
    /// hostile bombers. Bombers listed in `ignore` do not count as threats.
    pub fn calculate_danger_level(&self, world: &World, position: Vec2, ignore: &[ObjectId]) -> f32 {
        let mut danger = self.memory.danger_at(position);

        let bomb_cells = (BOMB_DANGER_RADIUS / TILE_SIZE).ceil() as i32;
        for id in world.bombs_near(position, bomb_cells) {
            let Some(bomb) = world.object(id).filter(|o| o.is_alive()) else { continue };
            let d = bomb.position.distance_to(position);
            if d < BOMB_DANGER_RADIUS {
                danger += (BOMB_DANGER_RADIUS - d) / BOMB_DANGER_RADIUS * BOMB_DANGER_WEIGHT;
            }
        }

        let enemy_cells = (ENEMY_DANGER_RADIUS / TILE_SIZE).ceil() as i32;
        for id in world.bombers_near(position, enemy_cells) {
            if ignore.contains(&id) || Some(id) == self.agent {
                continue;
            }
            let Some(enemy) = world.object(id) else { continue };
            let d = enemy.position.distance_to(position);
            if d < ENEMY_DANGER_RADIUS {
                danger += (ENEMY_DANGER_RADIUS - d) / ENEMY_DANGER_RADIUS * ENEMY_DANGER_WEIGHT;
            }
        }

        danger.min(1.0)
    }

    fn think(&mut self, world: &World, map: &TileMap, me: &Agent, elapsed: f32) {
        for id in world.bombs_near(me.position, TARGET_SCAN_RADIUS) {
            if let Some(bomb) = world.object(id) {
                self.memory.remember(bomb.position);
            }
        }
        self.memory.fade(elapsed, &mut self.rng);

        let previous = self.state;
        let danger = self.calculate_danger_level(world, me.position, &[me.id]);
        if danger > FLEE_THRESHOLD {
            self.state = AiState::Fleeing;
            self.current_target = None;
        } else {
            self.select_state(world, map, me);
        }

        if previous != self.state {
            tracing::debug!(
                "Bot {:?}: {} -> {} (danger {:.2})",
                me.id,
                previous,
                self.state,
                danger
            );
        }
    }

    fn select_state(&mut self, world: &World, map: &TileMap, me: &Agent) {
        let targets = world.scan_targets(me.position, TARGET_SCAN_RADIUS, Some(me.id));
        if targets.is_empty() {
            self.state = AiState::Exploring;
            self.current_target = None;
            return;
        }

        let hunt = self.personality.should_hunt_enemies();
        let mut best: Option<Target> = None;
        let mut consider = |planner: &Self, id: ObjectId, kind: TargetKind| {
            let Some(obj) = world.object(id) else { return };
            let distance = me.position.distance_to(obj.position);
            let base = match kind {
                TargetKind::Powerup => POWERUP_VALUE,
                TargetKind::Enemy => {
                    planner.personality.aggression_level * planner.personality.aggression_modifier()
                }
            };
            let mut priority = base / (1.0 + distance / TILE_SIZE);
            // An enemy's own presence counts against it here
            if planner.calculate_danger_level(world, obj.position, &[me.id]) >= SAFE_THRESHOLD {
                priority *= UNSAFE_TARGET_PENALTY;
            }
            if best.map_or(true, |b| priority > b.priority) {
                best = Some(Target {
                    id,
                    kind,
                    position: obj.position,
                    priority,
                });
            }
        };

        for &id in &targets.extras {
            consider(&*self, id, TargetKind::Powerup);
        }
        if hunt {
            for &id in &targets.enemy_bombers {
                consider(&*self, id, TargetKind::Enemy);
            }
        }

        self.current_target = best;
        self.state = match best.map(|t| t.kind) {
            Some(TargetKind::Enemy) => AiState::Hunting,
            Some(TargetKind::Powerup) => AiState::Collecting,
            None if self.should_place_bomb(world, map, me) => AiState::Bombing,
            None => AiState::Exploring,
        };
    }

    /// Tiles covered by live bombs once they go off
    fn hot_tiles(&self, world: &World, map: &TileMap, around: Vec2) -> FxHashSet<GridCoord> {
        let mut hot = FxHashSet::default();
        for id in world.bombs_near(around, TARGET_SCAN_RADIUS) {
            let Some(obj) = world.object(id) else { continue };
            if let Some(bomb) = obj.as_bomb() {
                hot.extend(explosion_tiles(Some(map), obj.tile(), bomb.power));
            }
        }
        hot
    }

    /// Directions in which a bomber at `tile` can run `power + 1` tiles in a
    /// straight line over open, blast-free ground
    pub fn escape_route_count(&self, world: &World, tile: GridCoord, power: u32) -> usize {
        let Some(map) = world.map() else { return 0 };
        let hot = self.hot_tiles(world, map, tile.center());

        CARDINALS
            .iter()
            .filter(|(dx, dy)| {
                (1..=power as i32 + 1).all(|step| {
                    let t = tile.offset(dx * step, dy * step);
                    map.in_bounds(t) && map.is_walkable(t) && !hot.contains(&t)
                })
            })
            .count()
    }

    /// Whether a bomb dropped on `me`'s tile would catch a living enemy
    fn would_hit_enemy(&self, world: &World, map: &TileMap, me: &Agent) -> bool {
        let blast = explosion_tiles(Some(map), me.tile, me.power);
        world
            .bombers_near(me.position, me.power as i32 + 1)
            .into_iter()
            .filter(|&id| id != me.id)
            .filter_map(|id| world.object(id))
            .any(|enemy| {
                blast
                    .iter()
                    .any(|t| t.center().distance_to(enemy.position) < BLAST_HIT_DISTANCE)
            })
    }

    fn should_place_bomb(&mut self, world: &World, map: &TileMap, me: &Agent) -> bool {
        if self.bomb_cooldown > 0.0 || !me.can_bomb {
            return false;
        }
        if self.escape_route_count(world, me.tile, me.power) < self.personality.required_escape_routes() {
            return false;
        }

        let hits_enemy = self.would_hit_enemy(world, map, me);
        if self.state == AiState::Hunting && hits_enemy {
            return true;
        }

        if self.personality.aggression_modifier() > BOMB_BENEFIT_THRESHOLD {
            let near_recent = self
                .recently_bombed
                .iter()
                .any(|p| p.distance_to(me.position) < RECENT_BOMB_DISTANCE);
            if near_recent {
                return false;
            }
            let chance = self.personality.aggression_level * 0.3;
            return self.rng.gen::<f32>() < chance;
        }
        false
    }

    // ------------------------------------------------------------------------
    // Pathing
    // ------------------------------------------------------------------------

    /// First quiet walkable tile around `me`, or failing that the least
    /// dangerous one within a few rings
    fn find_safe_position(&self, world: &World, map: &TileMap, me: &Agent) -> GridCoord {
        let mut best = me.tile;
        let mut best_danger = self.calculate_danger_level(world, me.tile.center(), &[me.id]);

        if best_danger < GOOD_ENOUGH_DANGER {
            return best;
        }
        for ring in 1..=SAFE_SEARCH_RINGS {
            for dy in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs() != ring && dy.abs() != ring {
                        continue;
                    }
                    let tile = me.tile.offset(dx, dy);
                    if !map.is_walkable(tile) {
                        continue;
                    }
                    let danger = self.calculate_danger_level(world, tile.center(), &[me.id]);
                    if danger < GOOD_ENOUGH_DANGER {
                        return tile;
                    }
                    if danger < best_danger {
                        best = tile;
                        best_danger = danger;
                    }
                }
            }
        }
        best
    }

    /// Straight-line waypoints from `from` to `to` in tile-sized steps
    ///
    /// The first blocked step is sidestepped once, to the left and then to
    /// the right of the travel direction. If both sides are blocked the path
    /// is just `[from]`.
    pub fn find_path_to(map: &TileMap, from: Vec2, to: Vec2) -> Vec<Vec2> {
        let mut path = vec![from];
        let delta = to - from;
        let distance = delta.length();
        if distance < PATH_STEP {
            path.push(to);
            return path;
        }

        let direction = delta.normalize();
        let walkable = |p: Vec2| map.is_walkable(GridCoord::from_pixel(p));
        let mut current = from;

        for _ in 0..(distance / PATH_STEP) as usize {
            let next = current + direction * PATH_STEP;
            if walkable(next) {
                path.push(next);
                current = next;
                continue;
            }

            let side = direction.perpendicular() * PATH_STEP;
            if walkable(current + side) {
                path.push(current + side);
            } else if walkable(current - side) {
                path.push(current - side);
            } else {
                return vec![from];
            }
            break;
        }

        if path.last().map_or(true, |last| !last.approx_eq(to, 0.5)) {
            path.push(to);
        }
        path
    }

    // ------------------------------------------------------------------------
    // Action
    // ------------------------------------------------------------------------

    fn steer_towards(&mut self, from: Vec2, to: Vec2) {
        let delta = to - from;
        self.input.right = delta.x > STEER_DEAD_ZONE;
        self.input.left = delta.x < -STEER_DEAD_ZONE;
        self.input.down = delta.y > STEER_DEAD_ZONE;
        self.input.up = delta.y < -STEER_DEAD_ZONE;
    }

    fn follow_path(&mut self, map: &TileMap, from: Vec2, to: Vec2) {
        let path = Self::find_path_to(map, from, to);
        if let Some(&waypoint) = path.get(1) {
            self.steer_towards(from, waypoint);
        }
    }

    fn drop_bomb(&mut self, at: Vec2, cooldown: f32) {
        self.input.bomb = true;
        self.bomb_cooldown = cooldown;
        if self.recently_bombed.len() >= RECENT_BOMB_MEMORY {
            self.recently_bombed.remove(0);
        }
        self.recently_bombed.push(at);
    }

    fn act(&mut self, world: &World, map: &TileMap, me: &Agent) {
        self.input = Intent::default();

        match self.state {
            AiState::Fleeing => {
                let safe = self.find_safe_position(world, map, me);
                if safe == me.tile {
                    self.state = AiState::Waiting;
                } else {
                    self.follow_path(map, me.position, safe.center());
                }
            }
            AiState::Hunting | AiState::Collecting => {
                let Some(target) = self.current_target else {
                    self.state = AiState::Exploring;
                    return;
                };
                let Some(obj) = world.object(target.id).filter(|o| o.is_alive()) else {
                    self.current_target = None;
                    self.state = AiState::Exploring;
                    return;
                };
                let position = obj.position;
                self.follow_path(map, me.position, position);

                if self.state == AiState::Hunting
                    && me.position.distance_to(position) < HUNT_BOMB_RANGE
                    && self.should_place_bomb(world, map, me)
                {
                    let cooldown = 1.0 + (1.0 - self.personality.aggression_level);
                    self.drop_bomb(me.position, cooldown);
                }
            }
            AiState::Bombing => {
                let routes = self.escape_route_count(world, me.tile, me.power);
                if me.can_bomb
                    && self.bomb_cooldown <= 0.0
                    && routes >= self.personality.required_escape_routes()
                {
                    let cooldown = 2.0 * self.personality.bomb_frequency_modifier();
                    self.drop_bomb(me.position, cooldown);
                } else {
                    self.state = AiState::Exploring;
                }
            }
            AiState::Exploring => {
                let (dx, dy) = self.explore_direction;
                let blocked = (dx, dy) == (0, 0) || !map.is_walkable(me.tile.offset(dx, dy));
                if blocked || self.explore_timer > EXPLORE_INTERVAL || self.stuck_timer > STUCK_TIME {
                    self.explore_direction = self.pick_explore_direction(map, me.tile);
                    self.explore_timer = 0.0;
                    self.stuck_timer = 0.0;
                }
                let (dx, dy) = self.explore_direction;
                self.input.left = dx < 0;
                self.input.right = dx > 0;
                self.input.up = dy < 0;
                self.input.down = dy > 0;
            }
            AiState::Waiting => {}
        }
    }

    fn pick_explore_direction(&mut self, map: &TileMap, tile: GridCoord) -> (i32, i32) {
        let open: SmallVec<[(i32, i32); 4]> = CARDINALS
            .iter()
            .copied()
            .filter(|&(dx, dy)| map.is_walkable(tile.offset(dx, dy)))
            .collect();
        if open.is_empty() {
            CARDINALS[self.rng.gen_range(0..CARDINALS.len())]
        } else {
            open[self.rng.gen_range(0..open.len())]
        }
    }

    fn track_stuck(&mut self, position: Vec2, dt: f32) {
        match self.stuck_anchor {
            Some(anchor) if anchor.distance_to(position) < STUCK_DISTANCE => self.stuck_timer += dt,
            _ => {
                self.stuck_anchor = Some(position);
                self.stuck_timer = 0.0;
            }
        }
    }

    fn idle(&mut self, reason: &str) {
        self.input = Intent::default();
        if !self.warned_missing {
            tracing::warn!("AI planner idle: {}", reason);
            self.warned_missing = true;
        }
    }
}

impl Controller for TacticalPlanner {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Ai
    }

    fn attach(&mut self, bomber: ObjectId) {
        self.agent = Some(bomber);
        self.reset();
    }

    fn update(&mut self, world: &World, dt: f32) {
        let Some(id) = self.agent else {
            self.idle("no bomber attached");
            return;
        };
        let Some(obj) = world.object(id) else {
            self.idle("attached bomber no longer exists");
            return;
        };
        let Some(map) = world.map() else {
            self.idle("world has no map");
            return;
        };
        let Some(bomber) = obj.as_bomber() else {
            self.idle("attached object is not a bomber");
            return;
        };
        self.warned_missing = false;

        if !obj.is_alive() {
            self.input = Intent::default();
            return;
        }
        let me = Agent {
            id,
            position: obj.position,
            tile: obj.tile(),
            power: bomber.power,
            can_bomb: bomber.can_place_bomb(),
        };

        self.bomb_cooldown = (self.bomb_cooldown - dt).max(0.0);
        self.explore_timer += dt;
        self.track_stuck(me.position, dt);

        self.since_think += dt;
        if self.since_think >= self.personality.thinking_frequency {
            let elapsed = self.since_think;
            self.since_think = 0.0;
            self.think(world, map, &me, elapsed);
        }

        self.until_action -= dt;
        if self.until_action <= 0.0 {
            self.act(world, map, &me);
            self.until_action = self.personality.reaction_time * self.rng.gen_range(0.5..1.0);
        }
    }

    fn reset(&mut self) {
        self.state = AiState::Exploring;
        self.current_target = None;
        self.memory.clear();
        self.input = Intent::default();
        self.since_think = self.personality.thinking_frequency;
        self.until_action = 0.0;
        self.bomb_cooldown = 0.0;
        self.stuck_timer = 0.0;
        self.stuck_anchor = None;
        self.explore_timer = 0.0;
        self.explore_direction = (0, 0);
        self.recently_bombed.clear();
    }

    fn is_left(&self) -> bool {
        self.input.left
    }

    fn is_right(&self) -> bool {
        self.input.right
    }

    fn is_up(&self) -> bool {
        self.input.up
    }

    fn is_down(&self) -> bool {
        self.input.down
    }

    fn is_bomb(&self) -> bool {
        self.input.bomb
    }

    fn debug_state(&self) -> Option<&str> {
        Some(self.state.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::object::ExtraKind;

    fn world_with_bot(tile: GridCoord) -> (World, ObjectId) {
        let mut world = World::new(Some(TileMap::default()), true, 3);
        let id = world.spawn_bomber(tile, "Bot");
        (world, id)
    }

    fn planner_for(id: ObjectId, preset: Personality) -> TacticalPlanner {
        let mut planner = TacticalPlanner::with_seed(AiPersonality::from_preset(preset), 11);
        planner.attach(id);
        planner
    }

    #[test]
    fn test_personality_ordering() {
        let normal = AiPersonality::from_preset(Personality::Normal);
        let nightmare = AiPersonality::from_preset(Personality::Nightmare);

        assert!(nightmare.aggression_modifier() >= normal.aggression_modifier());
        assert_eq!(nightmare.aggression_modifier(), 1.2);
        assert_eq!(normal.aggression_modifier(), 0.7);
        assert!(nightmare.required_escape_routes() <= normal.required_escape_routes());
        assert!(nightmare.reaction_time < normal.reaction_time);
    }

    #[test]
    fn test_should_hunt() {
        assert!(!AiPersonality::from_preset(Personality::Peaceful).should_hunt_enemies());
        assert!(!AiPersonality::from_preset(Personality::Easy).should_hunt_enemies());
        assert!(AiPersonality::from_preset(Personality::Normal).should_hunt_enemies());

        let mut peaceful = AiPersonality::from_preset(Personality::Peaceful);
        peaceful.set_aggression_level(5.0);
        assert_eq!(peaceful.aggression_level, 1.0);
        assert!(!peaceful.should_hunt_enemies());
    }

    #[test]
    fn test_personality_from_str() {
        assert_eq!("Nightmare".parse::<Personality>(), Ok(Personality::Nightmare));
        assert_eq!(" easy ".parse::<Personality>(), Ok(Personality::Easy));
        assert!("godlike".parse::<Personality>().is_err());
    }

    #[test]
    fn test_reaction_time_clamped() {
        let mut p = AiPersonality::default();
        p.set_reaction_time(0.0);
        assert_eq!(p.reaction_time, 0.01);
        p.set_reaction_time(10.0);
        assert_eq!(p.reaction_time, 2.0);
    }

    #[test]
    fn test_danger_memory_merges_nearby() {
        let mut memory = DangerMemory::default();
        assert!(memory.remember(Vec2::new(100.0, 100.0)));
        assert!(!memory.remember(Vec2::new(120.0, 100.0)));
        assert!(memory.remember(Vec2::new(200.0, 100.0)));
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_danger_memory_fade() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut memory = DangerMemory::default();
        memory.remember(Vec2::new(100.0, 100.0));
        memory.remember(Vec2::new(300.0, 100.0));

        memory.fade(0.0, &mut rng);
        assert_eq!(memory.len(), 2);

        memory.fade(MEMORY_FADE_TIME, &mut rng);
        assert!(memory.is_empty());
    }

    #[test]
    fn test_danger_from_adjacent_bomb_clamps() {
        let (mut world, id) = world_with_bot(GridCoord::new(5, 5));
        world.spawn_bomb(GridCoord::new(5, 6), 2, None);
        let planner = planner_for(id, Personality::Normal);

        let danger = planner.calculate_danger_level(&world, GridCoord::new(5, 5).center(), &[id]);
        assert_eq!(danger, 1.0);

        let far = planner.calculate_danger_level(&world, GridCoord::new(15, 5).center(), &[id]);
        assert_eq!(far, 0.0);
    }

    #[test]
    fn test_enemy_danger_is_light() {
        let (mut world, id) = world_with_bot(GridCoord::new(5, 5));
        let enemy = world.spawn_bomber(GridCoord::new(6, 5), "Enemy");
        let planner = planner_for(id, Personality::Normal);

        let danger = planner.calculate_danger_level(&world, GridCoord::new(5, 5).center(), &[id]);
        assert!((danger - 0.5 * ENEMY_DANGER_WEIGHT).abs() < 1e-4);
        let ignored = planner.calculate_danger_level(&world, GridCoord::new(5, 5).center(), &[id, enemy]);
        assert_eq!(ignored, 0.0);
    }

    #[test]
    fn test_bomb_preempts_collecting() {
        let (mut world, id) = world_with_bot(GridCoord::new(5, 5));
        world.spawn_extra(GridCoord::new(9, 5), ExtraKind::Bomb);
        let mut planner = planner_for(id, Personality::Normal);

        planner.update(&world, 0.016);
        assert_eq!(planner.state(), AiState::Collecting);

        world.spawn_bomb(GridCoord::new(5, 6), 2, None);
        planner.update(&world, planner.personality().thinking_frequency);
        assert_eq!(planner.state(), AiState::Fleeing);
        assert!(planner.current_target().is_none());
    }

    #[test]
    fn test_explores_when_alone() {
        let (world, id) = world_with_bot(GridCoord::new(5, 5));
        let mut planner = planner_for(id, Personality::Normal);

        planner.update(&world, 0.016);
        assert_eq!(planner.state(), AiState::Exploring);
        let moving = planner.is_left() || planner.is_right() || planner.is_up() || planner.is_down();
        assert!(moving);
        assert!(!planner.is_bomb());
    }

    #[test]
    fn test_hunts_enemy() {
        let (mut world, id) = world_with_bot(GridCoord::new(5, 5));
        let enemy = world.spawn_bomber(GridCoord::new(10, 5), "Enemy");
        let mut planner = planner_for(id, Personality::Hard);

        planner.update(&world, 0.016);
        assert_eq!(planner.state(), AiState::Hunting);
        assert_eq!(planner.current_target().map(|t| t.id), Some(enemy));
        assert!(planner.is_right());
    }

    #[test]
    fn test_peaceful_ignores_enemies() {
        let (mut world, id) = world_with_bot(GridCoord::new(5, 5));
        world.spawn_bomber(GridCoord::new(10, 5), "Enemy");
        let mut planner = planner_for(id, Personality::Peaceful);

        planner.update(&world, 0.016);
        assert_ne!(planner.state(), AiState::Hunting);
    }

    #[test]
    fn test_path_straight_line() {
        let map = TileMap::default();
        let from = GridCoord::new(2, 2).center();
        let to = GridCoord::new(2, 5).center();
        let path = TacticalPlanner::find_path_to(&map, from, to);

        assert_eq!(path.first(), Some(&from));
        assert_eq!(path.last(), Some(&to));
        assert_eq!(path.len(), 4);
        assert!(path[1].approx_eq(GridCoord::new(2, 3).center(), 1e-3));
    }

    #[test]
    fn test_path_deflects_around_obstacle() {
        let map = TileMap::from_ascii(
            "
            .....
            .....
            ..#..
            .....
            ",
        );
        let from = GridCoord::new(2, 1).center();
        let to = GridCoord::new(2, 3).center();
        let path = TacticalPlanner::find_path_to(&map, from, to);

        // Heading down, "left" of the travel direction is -x
        assert!(path[1].approx_eq(GridCoord::new(1, 1).center(), 1e-3));
        assert_eq!(path.last(), Some(&to));
    }

    #[test]
    fn test_path_fully_blocked_stays_put() {
        let map = TileMap::from_ascii(
            "
            .#.
            ###
            ...
            ",
        );
        let from = GridCoord::new(0, 0).center();
        let to = GridCoord::new(0, 2).center();
        let path = TacticalPlanner::find_path_to(&map, from, to);
        assert_eq!(path, vec![from]);
    }

    #[test]
    fn test_escape_routes() {
        let (mut world, id) = world_with_bot(GridCoord::new(5, 5));
        let planner = planner_for(id, Personality::Normal);
        assert_eq!(planner.escape_route_count(&world, GridCoord::new(5, 5), 2), 4);

        // A live bomb two tiles right covers the eastward run and the tile itself
        world.spawn_bomb(GridCoord::new(7, 5), 2, None);
        assert_eq!(planner.escape_route_count(&world, GridCoord::new(5, 5), 2), 3);

        // Map edge cuts the west route short
        assert_eq!(planner.escape_route_count(&world, GridCoord::new(1, 10), 2), 3);
    }

    #[test]
    fn test_escape_routes_dead_end() {
        let map = TileMap::from_ascii(
            "
            #####
            #...#
            #####
            ",
        );
        let mut world = World::new(Some(map), true, 0);
        let id = world.spawn_bomber(GridCoord::new(1, 1), "Bot");
        let planner = planner_for(id, Personality::Nightmare);
        assert_eq!(planner.escape_route_count(&world, GridCoord::new(1, 1), 2), 0);
    }

    #[test]
    fn test_missing_dependencies_are_noops() {
        let world = World::empty();
        let mut unattached = TacticalPlanner::with_seed(AiPersonality::default(), 1);
        unattached.update(&world, 0.1);
        assert!(!unattached.is_down() && !unattached.is_bomb());

        let mut no_map = World::new(None, true, 0);
        let id = no_map.spawn_bomber(GridCoord::new(1, 1), "Bot");
        let mut planner = planner_for(id, Personality::Normal);
        planner.update(&no_map, 0.1);
        planner.update(&no_map, 0.1);
        assert_eq!(planner.state(), AiState::Exploring);
        assert!(!planner.is_left() && !planner.is_right() && !planner.is_up() && !planner.is_down());
    }

    #[test]
    fn test_stale_agent_is_noop() {
        let (mut world, id) = world_with_bot(GridCoord::new(5, 5));
        let mut planner = planner_for(id, Personality::Normal);
        world.mark_for_deletion(id).unwrap();
        world.reap();

        planner.update(&world, 0.1);
        assert!(!planner.is_left() && !planner.is_right() && !planner.is_up() && !planner.is_down());
    }

    #[test]
    fn test_bombs_next_to_box_when_aggressive() {
        let map = TileMap::from_ascii(
            "
            ...........
            ...........
            .....+.....
            ...........
            ...........
            ",
        );
        let mut world = World::new(Some(map), true, 0);
        let id = world.spawn_bomber(GridCoord::new(5, 1), "Bot");
        // Out of danger range, but keeps the target scan from coming back empty
        world.spawn_bomb(GridCoord::new(0, 4), 1, None);
        let mut planner = planner_for(id, Personality::Nightmare);
        // Nightmare bombs a box-adjacent spot with probability 0.3 per think
        let mut placed = false;
        for _ in 0..200 {
            planner.update(&world, 0.05);
            if planner.is_bomb() {
                placed = true;
                break;
            }
        }
        assert!(placed);
    }

    #[test]
    fn test_bombs_speculatively_on_open_ground() {
        let mut world = World::new(Some(TileMap::default()), true, 0);
        let id = world.spawn_bomber(GridCoord::new(5, 7), "Bot");
        world.spawn_bomb(GridCoord::new(13, 7), 1, None);

        for seed in 0..5 {
            let mut planner = TacticalPlanner::with_seed(AiPersonality::from_preset(Personality::Nightmare), seed);
            planner.attach(id);
            let mut bombing = false;
            for _ in 0..100 {
                planner.update(&world, 0.05);
                if planner.is_bomb() {
                    bombing = true;
                    break;
                }
            }
            assert!(bombing, "seed {} never bombed", seed);
            assert_eq!(planner.state(), AiState::Bombing);
        }
    }

    #[test]
    fn test_prefers_pickup_over_nearby_enemy() {
        let (mut world, id) = world_with_bot(GridCoord::new(2, 2));
        world.spawn_bomber(GridCoord::new(7, 2), "Enemy");
        let pickup = world.spawn_extra(GridCoord::new(12, 12), ExtraKind::Flame);
        let mut planner = planner_for(id, Personality::Normal);

        planner.update(&world, 0.016);
        assert_eq!(planner.state(), AiState::Collecting);
        assert_eq!(planner.current_target().map(|t| t.id), Some(pickup));
    }

    #[test]
    fn test_bomb_preempts_hunting() {
        let (mut world, id) = world_with_bot(GridCoord::new(5, 5));
        world.spawn_bomber(GridCoord::new(10, 5), "Enemy");
        let mut planner = planner_for(id, Personality::Hard);

        planner.update(&world, 0.016);
        assert_eq!(planner.state(), AiState::Hunting);

        world.spawn_bomb(GridCoord::new(5, 6), 2, None);
        planner.update(&world, planner.personality().thinking_frequency);
        assert_eq!(planner.state(), AiState::Fleeing);
        assert!(planner.current_target().is_none());
    }

    #[test]
    fn test_safe_search_takes_first_quiet_tile() {
        let (mut world, id) = world_with_bot(GridCoord::new(5, 5));
        world.spawn_bomb(GridCoord::new(5, 6), 2, None);
        let planner = planner_for(id, Personality::Normal);
        let me = Agent {
            id,
            position: GridCoord::new(5, 5).center(),
            tile: GridCoord::new(5, 5),
            power: 2,
            can_bomb: true,
        };

        // Nothing within two rings is quiet enough; (2, 2) is the first
        // tile of ring three and sits exactly on the bomb's danger edge
        let safe = planner.find_safe_position(&world, world.map().unwrap(), &me);
        assert_eq!(safe, GridCoord::new(2, 2));
        assert!(planner.calculate_danger_level(&world, safe.center(), &[id]) < GOOD_ENOUGH_DANGER);
    }

    #[test]
    fn test_debug_state() {
        let (world, id) = world_with_bot(GridCoord::new(5, 5));
        let mut planner = planner_for(id, Personality::Easy);
        planner.update(&world, 0.016);
        assert_eq!(planner.debug_state(), Some("EXPLORING"));
        assert_eq!(planner.kind(), ControllerKind::Ai);
    }
}
