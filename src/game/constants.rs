/// Map geometry - everything else is derived from the tile size
pub mod map {
    /// Size of a tile (and of a spatial grid cell) in pixels
    pub const TILE_SIZE: f32 = 40.0;
    /// Tile size as an integer for grid arithmetic
    pub const TILE_SIZE_PX: i32 = 40;
    /// Map width in tiles
    pub const WIDTH: i32 = 20;
    /// Map height in tiles
    pub const HEIGHT: i32 = 15;
}

/// Simulation timing
pub mod sim {
    /// Default tick rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Delta time per tick in seconds at the default rate
    pub const DT: f32 = 1.0 / 60.0;
    /// Default match length in seconds
    pub const MATCH_SECONDS: f32 = 180.0;
}

/// Bomber stats
pub mod bomber {
    /// Starting speed in pixels per second
    pub const BASE_SPEED: f32 = 90.0;
    /// Slowest a bomber can get from negative pickups
    pub const MIN_SPEED: f32 = 40.0;
    /// Fastest a bomber can get from pickups
    pub const MAX_SPEED: f32 = 300.0;
    /// Starting explosion range in tiles
    pub const BASE_POWER: u32 = 2;
    /// Explosion range cap
    pub const MAX_POWER: u32 = 10;
    /// Bombs a bomber may have on the field at once
    pub const BASE_MAX_BOMBS: u32 = 1;
}

/// Bombs and explosions
pub mod bomb {
    /// Fuse length in seconds
    pub const FUSE: f32 = 2.5;
    /// How long an explosion keeps burning its tile
    pub const EXPLOSION_LIFETIME: f32 = 0.5;
    /// Chance that a destroyed box drops a pickup
    pub const EXTRA_DROP_CHANCE: f64 = 0.3;
}

/// Pickups
pub mod extra {
    /// Bombers closer than this collect a pickup (pixels)
    pub const COLLECT_DISTANCE: f32 = 20.0;
    /// Speed gained from a speed pickup
    pub const SPEED_BONUS: f32 = 20.0;
    /// Speed lost from a disease pickup
    pub const DISEASE_PENALTY: f32 = 40.0;
}

/// Tactical AI tuning
pub mod ai {
    /// Window over which a remembered hazard is forgotten
    pub const MEMORY_FADE_TIME: f32 = 5.0;
    /// Bombs closer than this to a remembered hazard are treated as known
    pub const MEMORY_MERGE_DISTANCE: f32 = 40.0;

    /// Danger radius around a remembered hazard (3 tiles)
    pub const HAZARD_RADIUS: f32 = 120.0;
    /// Danger radius around a live bomb (5 tiles)
    pub const BOMB_DANGER_RADIUS: f32 = 200.0;
    /// Weight of a live bomb in the danger field
    pub const BOMB_DANGER_WEIGHT: f32 = 2.0;
    /// Danger radius around a hostile bomber (2 tiles)
    pub const ENEMY_DANGER_RADIUS: f32 = 80.0;
    /// Weight of a hostile bomber in the danger field
    pub const ENEMY_DANGER_WEIGHT: f32 = 0.3;

    /// Danger above which the agent drops everything and flees
    pub const FLEE_THRESHOLD: f32 = 0.8;
    /// Danger below which a position counts as safe
    pub const SAFE_THRESHOLD: f32 = 0.3;
    /// Danger below which the safe-position search stops early
    pub const GOOD_ENOUGH_DANGER: f32 = 0.1;
    /// Outermost ring (tiles) searched for a safe position
    pub const SAFE_SEARCH_RINGS: i32 = 8;

    /// Radius (cells) of the target scan
    pub const TARGET_SCAN_RADIUS: i32 = 10;
    /// Base value of any pickup
    pub const POWERUP_VALUE: f32 = 0.7;
    /// Priority multiplier for targets whose surroundings are dangerous
    pub const UNSAFE_TARGET_PENALTY: f32 = 0.3;

    /// Movement dead zone when steering toward a waypoint (pixels)
    pub const STEER_DEAD_ZONE: f32 = 20.0;
    /// Step length of the straight-line path planner (pixels)
    pub const PATH_STEP: f32 = 40.0;

    /// Distance at which a hunter considers dropping a bomb on its target
    pub const HUNT_BOMB_RANGE: f32 = 100.0;
    /// Predicted blast tiles closer than this to an enemy count as a hit
    pub const BLAST_HIT_DISTANCE: f32 = 30.0;
    /// Don't bomb again within this distance of a recent bomb
    pub const RECENT_BOMB_DISTANCE: f32 = 80.0;
    /// Aggression modifier above which speculative bombing is considered
    pub const BOMB_BENEFIT_THRESHOLD: f32 = 0.6;

    /// Exploration re-rolls its direction this often (seconds)
    pub const EXPLORE_INTERVAL: f32 = 1.0;
    /// Displacement below which the agent is considered not moving
    pub const STUCK_DISTANCE: f32 = 5.0;
    /// Time without displacement after which the agent counts as stuck
    pub const STUCK_TIME: f32 = 2.0;
}
