use serde::{Deserialize, Serialize};

use crate::game::constants::sim;
use crate::game::systems::ai::Personality;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Headless match configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Match length in seconds before it is called a draw
    pub match_seconds: f32,
    /// Seed for map generation and the world's random stream
    pub map_seed: u64,
    /// Number of AI bombers (one per spawn corner)
    pub bot_count: usize,
    /// Preset for every bot; `None` gives each bot a different preset
    pub bot_personality: Option<Personality>,
    /// Index objects in the spatial grid instead of enumerating the arena
    pub use_spatial_grid: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: sim::TICK_RATE,
            match_seconds: sim::MATCH_SECONDS,
            map_seed: 1,
            bot_count: 4,
            bot_personality: None,
            use_spatial_grid: true,
        }
    }
}

impl SimConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config from an arbitrary key/value source; invalid values are
    /// reported and replaced by the default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(rate) = lookup("TICK_RATE") {
            match rate.parse::<u32>() {
                Ok(parsed) if (1..=1000).contains(&parsed) => config.tick_rate = parsed,
                Ok(_) => tracing::warn!("TICK_RATE must be 1-1000, using default"),
                Err(_) => tracing::warn!("Invalid TICK_RATE '{}', using default", rate),
            }
        }

        if let Some(seconds) = lookup("MATCH_SECONDS") {
            match seconds.parse::<f32>() {
                Ok(parsed) if parsed > 0.0 && parsed.is_finite() => config.match_seconds = parsed,
                Ok(_) => tracing::warn!("MATCH_SECONDS must be > 0, using default"),
                Err(_) => tracing::warn!("Invalid MATCH_SECONDS '{}', using default", seconds),
            }
        }

        if let Some(seed) = lookup("MAP_SEED") {
            if let Ok(parsed) = seed.parse::<u64>() {
                config.map_seed = parsed;
            } else {
                tracing::warn!("Invalid MAP_SEED '{}', using default", seed);
            }
        }

        if let Some(count) = lookup("BOT_COUNT") {
            match count.parse::<usize>() {
                Ok(parsed) if (2..=4).contains(&parsed) => config.bot_count = parsed,
                Ok(_) => tracing::warn!("BOT_COUNT must be 2-4, using default"),
                Err(_) => tracing::warn!("Invalid BOT_COUNT '{}', using default", count),
            }
        }

        if let Some(personality) = lookup("BOT_PERSONALITY") {
            if personality.trim().eq_ignore_ascii_case("mixed") {
                config.bot_personality = None;
            } else {
                match personality.parse::<Personality>() {
                    Ok(parsed) => config.bot_personality = Some(parsed),
                    Err(e) => tracing::warn!("{}, using default", e),
                }
            }
        }

        if let Some(flag) = lookup("USE_SPATIAL_GRID") {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.use_spatial_grid = true,
                "0" | "false" | "no" | "off" => config.use_spatial_grid = false,
                _ => tracing::warn!("Invalid USE_SPATIAL_GRID '{}', using default", flag),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate cannot be 0".to_string()));
        }
        if !(self.match_seconds > 0.0) {
            return Err(ConfigError::Invalid("match_seconds must be positive".to_string()));
        }
        if !(2..=4).contains(&self.bot_count) {
            return Err(ConfigError::Invalid(format!(
                "bot_count must be 2-4, got {}",
                self.bot_count
            )));
        }
        Ok(())
    }

    /// Seconds per tick
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Preset for the bot in spawn slot `slot`
    pub fn personality_for(&self, slot: usize) -> Personality {
        match self.bot_personality {
            Some(p) => p,
            // Mixed lineup skips the passive preset
            None => Personality::ALL[1 + slot % (Personality::ALL.len() - 1)],
        }
    }
}
