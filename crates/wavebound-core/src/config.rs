//! Encounter configuration, supplied once at startup.
//!
//! Every section is `#[serde(default)]`, so a partial JSON file only needs
//! the values it overrides. [`EncounterConfig::validate`] must pass before an
//! encounter is built; bad tuning fails fast instead of degrading silently.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;
use crate::types::{AreaBounds, Vec2};

/// A configuration fault detected at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("boss pool is empty; at least one boss archetype is required")]
    EmptyBossPool,
    #[error("`{field}` must be finite, got {value}")]
    NotFinite { field: &'static str, value: f32 },
    #[error("`{field}` must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("`{field}` must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("`{field}` must lie in [0, 1], got {value}")]
    RatioOutOfRange { field: &'static str, value: f32 },
    #[error("`base_kill_count` must be at least 1")]
    ZeroKillTarget,
    #[error("`max_sample_attempts` must be at least 1")]
    ZeroSampleBudget,
    #[error("`base_population` must be at least 1")]
    ZeroPopulation,
    #[error("spawn area is degenerate: min {min} must be strictly below max {max}")]
    DegenerateArea { min: Vec2, max: Vec2 },
    #[error("spawn polygon needs at least 3 vertices, got {vertices}")]
    PolygonTooSmall { vertices: usize },
}

/// Kill-quota progression.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    pub base_kill_count: u32,
    pub kill_increase_per_wave: u32,
    pub gold_growth_per_wave: f32,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            base_kill_count: BASE_KILL_COUNT,
            kill_increase_per_wave: KILL_INCREASE_PER_WAVE,
            gold_growth_per_wave: GOLD_GROWTH_PER_WAVE,
        }
    }
}

/// Spawn pacing and placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    pub base_interval: f32,
    pub interval_step: f32,
    pub interval_floor: f32,
    pub base_population: u32,
    pub population_step: u32,
    pub min_distance_from_player: f32,
    pub cancel_distance: f32,
    pub telegraph_delay: f32,
    pub max_sample_attempts: u32,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            base_interval: BASE_SPAWN_INTERVAL,
            interval_step: SPAWN_INTERVAL_STEP,
            interval_floor: SPAWN_INTERVAL_FLOOR,
            base_population: BASE_POPULATION,
            population_step: POPULATION_STEP,
            min_distance_from_player: MIN_DISTANCE_FROM_PLAYER,
            cancel_distance: CANCEL_DISTANCE,
            telegraph_delay: TELEGRAPH_DELAY,
            max_sample_attempts: MAX_SAMPLE_ATTEMPTS,
        }
    }
}

/// Variant probability tables for ordinary spawns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantTuning {
    pub tank_base_chance: f32,
    pub tank_chance_per_level: f32,
    pub level_multiplier_step: f32,
    pub elite_min_wave: u32,
    pub elite_base_chance: f32,
    pub elite_chance_step: f32,
    pub max_variant_chance: f32,
}

impl Default for VariantTuning {
    fn default() -> Self {
        Self {
            tank_base_chance: TANK_BASE_CHANCE,
            tank_chance_per_level: TANK_CHANCE_PER_LEVEL,
            level_multiplier_step: LEVEL_MULTIPLIER_STEP,
            elite_min_wave: ELITE_MIN_WAVE,
            elite_base_chance: ELITE_BASE_CHANCE,
            elite_chance_step: ELITE_CHANCE_STEP,
            max_variant_chance: MAX_VARIANT_CHANCE,
        }
    }
}

/// Per-wave and per-rotation stat growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatScaling {
    pub hp_wave_step: f32,
    pub damage_wave_step: f32,
    pub speed_wave_step: f32,
    pub hp_cycle_step: f32,
    pub damage_cycle_step: f32,
    pub speed_cycle_step: f32,
}

impl Default for StatScaling {
    fn default() -> Self {
        Self {
            hp_wave_step: HP_WAVE_STEP,
            damage_wave_step: DAMAGE_WAVE_STEP,
            speed_wave_step: SPEED_WAVE_STEP,
            hp_cycle_step: HP_CYCLE_STEP,
            damage_cycle_step: DAMAGE_CYCLE_STEP,
            speed_cycle_step: SPEED_CYCLE_STEP,
        }
    }
}

/// Elite phase timing and arena layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EliteTuning {
    pub time_limit: f32,
    pub pre_elite_delay: f32,
    pub pre_upgrade_delay: f32,
    pub fail_toast_duration: f32,
    pub chest_spawn_delay: f32,
    /// Where the player is moved when the elite phase starts.
    pub player_center: Vec2,
    pub boss_spawn_direction: Vec2,
    pub boss_spawn_distance: f32,
    pub boss_spawn_side_jitter: f32,
    /// Boss archetypes in rotation order.
    pub boss_pool: Vec<String>,
}

impl Default for EliteTuning {
    fn default() -> Self {
        Self {
            time_limit: ELITE_TIME_LIMIT,
            pre_elite_delay: PRE_ELITE_DELAY,
            pre_upgrade_delay: PRE_UPGRADE_DELAY,
            fail_toast_duration: FAIL_TOAST_DURATION,
            chest_spawn_delay: CHEST_SPAWN_DELAY,
            player_center: Vec2::ZERO,
            boss_spawn_direction: Vec2::Y,
            boss_spawn_distance: BOSS_SPAWN_DISTANCE,
            boss_spawn_side_jitter: BOSS_SPAWN_SIDE_JITTER,
            boss_pool: vec![
                "Chaser".to_string(),
                "PatrolShooter".to_string(),
                "Warden".to_string(),
            ],
        }
    }
}

/// Pending-reward economy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardTuning {
    /// When false, accrued gold/XP goes straight to the player.
    pub use_pending_rewards: bool,
    pub fail_commit_ratio: f32,
    pub chest_sell_values: [u32; 5],
}

impl Default for RewardTuning {
    fn default() -> Self {
        Self {
            use_pending_rewards: true,
            fail_commit_ratio: FAIL_COMMIT_RATIO,
            chest_sell_values: CHEST_SELL_VALUES,
        }
    }
}

/// Full encounter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// RNG seed. Same seed and same command stream = same encounter.
    pub seed: u64,
    /// Where the player returns between waves.
    pub player_spawn_point: Vec2,
    pub area: AreaBounds,
    pub wave: WaveTuning,
    pub spawn: SpawnTuning,
    pub variants: VariantTuning,
    pub stats: StatScaling,
    pub elite: EliteTuning,
    pub rewards: RewardTuning,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            player_spawn_point: Vec2::ZERO,
            area: AreaBounds::default(),
            wave: WaveTuning::default(),
            spawn: SpawnTuning::default(),
            variants: VariantTuning::default(),
            stats: StatScaling::default(),
            elite: EliteTuning::default(),
            rewards: RewardTuning::default(),
        }
    }
}

impl EncounterConfig {
    /// Check every tunable. Returns the first fault found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wave.base_kill_count == 0 {
            return Err(ConfigError::ZeroKillTarget);
        }
        non_negative("gold_growth_per_wave", self.wave.gold_growth_per_wave)?;

        let spawn = &self.spawn;
        positive("spawn.base_interval", spawn.base_interval)?;
        positive("spawn.interval_floor", spawn.interval_floor)?;
        non_negative("spawn.interval_step", spawn.interval_step)?;
        non_negative("spawn.min_distance_from_player", spawn.min_distance_from_player)?;
        non_negative("spawn.cancel_distance", spawn.cancel_distance)?;
        non_negative("spawn.telegraph_delay", spawn.telegraph_delay)?;
        if spawn.max_sample_attempts == 0 {
            return Err(ConfigError::ZeroSampleBudget);
        }
        // A zero cap would never spawn, so the quota could never be met.
        if spawn.base_population == 0 {
            return Err(ConfigError::ZeroPopulation);
        }

        let variants = &self.variants;
        ratio("variants.tank_base_chance", variants.tank_base_chance)?;
        ratio("variants.elite_base_chance", variants.elite_base_chance)?;
        ratio("variants.max_variant_chance", variants.max_variant_chance)?;
        non_negative("variants.tank_chance_per_level", variants.tank_chance_per_level)?;
        non_negative("variants.level_multiplier_step", variants.level_multiplier_step)?;
        non_negative("variants.elite_chance_step", variants.elite_chance_step)?;

        let stats = &self.stats;
        for (field, value) in [
            ("stats.hp_wave_step", stats.hp_wave_step),
            ("stats.damage_wave_step", stats.damage_wave_step),
            ("stats.speed_wave_step", stats.speed_wave_step),
            ("stats.hp_cycle_step", stats.hp_cycle_step),
            ("stats.damage_cycle_step", stats.damage_cycle_step),
            ("stats.speed_cycle_step", stats.speed_cycle_step),
        ] {
            non_negative(field, value)?;
        }

        let elite = &self.elite;
        if elite.boss_pool.is_empty() {
            return Err(ConfigError::EmptyBossPool);
        }
        positive("elite.time_limit", elite.time_limit)?;
        for (field, value) in [
            ("elite.pre_elite_delay", elite.pre_elite_delay),
            ("elite.pre_upgrade_delay", elite.pre_upgrade_delay),
            ("elite.fail_toast_duration", elite.fail_toast_duration),
            ("elite.chest_spawn_delay", elite.chest_spawn_delay),
            ("elite.boss_spawn_distance", elite.boss_spawn_distance),
            ("elite.boss_spawn_side_jitter", elite.boss_spawn_side_jitter),
        ] {
            non_negative(field, value)?;
        }
        finite_vec("elite.player_center", elite.player_center)?;
        finite_vec("elite.boss_spawn_direction", elite.boss_spawn_direction)?;
        finite_vec("player_spawn_point", self.player_spawn_point)?;

        ratio("rewards.fail_commit_ratio", self.rewards.fail_commit_ratio)?;

        self.validate_area()
    }

    fn validate_area(&self) -> Result<(), ConfigError> {
        match &self.area {
            AreaBounds::Rect { min, max } => {
                finite_vec("area.min", *min)?;
                finite_vec("area.max", *max)?;
                if min.x >= max.x || min.y >= max.y {
                    return Err(ConfigError::DegenerateArea {
                        min: *min,
                        max: *max,
                    });
                }
            }
            AreaBounds::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(ConfigError::PolygonTooSmall {
                        vertices: vertices.len(),
                    });
                }
                for v in vertices {
                    finite_vec("area.vertices", *v)?;
                }
                let (min, max) = self.area.bounding_box();
                if min.x >= max.x || min.y >= max.y {
                    return Err(ConfigError::DegenerateArea { min, max });
                }
            }
        }
        Ok(())
    }

    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigLoadError> {
        let config: EncounterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Failure to turn JSON text into a valid config.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config rejected: {0}")]
    Invalid(#[from] ConfigError),
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field, value })
    }
}

fn finite_vec(field: &'static str, value: Vec2) -> Result<(), ConfigError> {
    finite(field, value.x)?;
    finite(field, value.y)
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn ratio(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RatioOutOfRange { field, value })
    }
}
