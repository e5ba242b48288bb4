//! Wave and boss-cycle difficulty scaling.
//!
//! Every function here is deterministic in its inputs: the model holds only
//! tuning constants copied from the config, never runtime state.

use std::num::NonZeroUsize;

use rand::Rng;

use wavebound_core::config::{EncounterConfig, SpawnTuning, StatScaling, VariantTuning, WaveTuning};
use wavebound_core::enums::EnemyVariant;
use wavebound_core::types::{BossSlot, StatMultipliers};

/// Maps (wave, boss cycle) to counts, pacing, chances and stat multipliers.
#[derive(Debug, Clone)]
pub struct ScalingModel {
    wave: WaveTuning,
    spawn: SpawnTuning,
    variants: VariantTuning,
    stats: StatScaling,
}

impl ScalingModel {
    pub fn new(
        wave: WaveTuning,
        spawn: SpawnTuning,
        variants: VariantTuning,
        stats: StatScaling,
    ) -> Self {
        Self {
            wave,
            spawn,
            variants,
            stats,
        }
    }

    pub fn from_config(config: &EncounterConfig) -> Self {
        Self::new(
            config.wave.clone(),
            config.spawn.clone(),
            config.variants.clone(),
            config.stats.clone(),
        )
    }

    /// Kills needed to clear `wave`: `base + (wave - 1) * increase`.
    pub fn target_kills(&self, wave: u32) -> u32 {
        self.wave.base_kill_count.saturating_add(
            waves_past_first(wave).saturating_mul(self.wave.kill_increase_per_wave),
        )
    }

    /// Seconds between spawn attempts, never below the configured floor.
    pub fn spawn_interval(&self, wave: u32) -> f32 {
        let raw = self.spawn.base_interval - waves_past_first(wave) as f32 * self.spawn.interval_step;
        raw.max(self.spawn.interval_floor)
    }

    /// Maximum concurrent live enemies on `wave`.
    pub fn population_cap(&self, wave: u32) -> u32 {
        self.spawn.base_population.saturating_add(
            waves_past_first(wave).saturating_mul(self.spawn.population_step),
        )
    }

    /// Gold multiplier: `1 + (wave - 1) * growth`.
    pub fn gold_multiplier(&self, wave: u32) -> f32 {
        1.0 + waves_past_first(wave) as f32 * self.wave.gold_growth_per_wave
    }

    /// Gold granted for a kill worth `base_gold` on `wave`. Negative bases pay nothing.
    pub fn kill_gold(&self, wave: u32, base_gold: i32) -> u32 {
        let base = base_gold.max(0) as f32;
        (base * self.gold_multiplier(wave)).round() as u32
    }

    /// Stat multipliers for ordinary enemies on `wave`.
    pub fn wave_stat_multipliers(&self, wave: u32) -> StatMultipliers {
        let w = waves_past_first(wave) as f32;
        StatMultipliers {
            hp: 1.0 + w * self.stats.hp_wave_step,
            damage: 1.0 + w * self.stats.damage_wave_step,
            speed: 1.0 + w * self.stats.speed_wave_step,
        }
    }

    /// Elite/boss multipliers. The cycle term multiplies the wave term, so each
    /// full boss rotation escalates on top of the wave count.
    pub fn elite_stat_multipliers(&self, wave: u32, cycle: u32) -> StatMultipliers {
        let per_wave = self.wave_stat_multipliers(wave);
        let c = cycle as f32;
        StatMultipliers {
            hp: per_wave.hp * (1.0 + c * self.stats.hp_cycle_step),
            damage: per_wave.damage * (1.0 + c * self.stats.damage_cycle_step),
            speed: per_wave.speed * (1.0 + c * self.stats.speed_cycle_step),
        }
    }

    /// Smoothed level multiplier: L1 = 1.0, L2 = 1.1, ...
    pub fn level_multiplier(&self, wave: u32) -> f32 {
        1.0 + waves_past_first(wave) as f32 * self.variants.level_multiplier_step
    }

    /// Chance an ordinary spawn is a tank.
    pub fn tank_chance(&self, wave: u32) -> f32 {
        let chance = self.variants.tank_base_chance
            + (self.level_multiplier(wave) - 1.0) * self.variants.tank_chance_per_level;
        self.clamp_chance(chance)
    }

    /// Chance an ordinary spawn is an elite. Zero before `elite_min_wave`.
    pub fn elite_chance(&self, wave: u32) -> f32 {
        if wave < self.variants.elite_min_wave {
            return 0.0;
        }
        let waves_in = (wave - self.variants.elite_min_wave) as f32;
        let chance = self.variants.elite_base_chance + waves_in * self.variants.elite_chance_step;
        self.clamp_chance(chance)
    }

    /// Roll an ordinary spawn's variant. Elite is tried first, then tank.
    pub fn roll_variant<R: Rng>(&self, wave: u32, rng: &mut R) -> EnemyVariant {
        if rng.gen::<f32>() < self.elite_chance(wave) {
            return EnemyVariant::Elite;
        }
        if rng.gen::<f32>() < self.tank_chance(wave) {
            return EnemyVariant::Tank;
        }
        EnemyVariant::Normal
    }

    /// Stat multipliers for an ordinary spawn of `variant`.
    pub fn variant_stat_multipliers(&self, wave: u32, variant: EnemyVariant, cycle: u32) -> StatMultipliers {
        match variant {
            EnemyVariant::Normal | EnemyVariant::Tank => self.wave_stat_multipliers(wave),
            EnemyVariant::Elite | EnemyVariant::Boss => self.elite_stat_multipliers(wave, cycle),
        }
    }

    fn clamp_chance(&self, chance: f32) -> f32 {
        chance.clamp(0.0, self.variants.max_variant_chance.clamp(0.0, 1.0))
    }
}

/// Boss rotation: `(wave - 1) mod pool` picks the boss,
/// `(wave - 1) / pool` counts completed rotations.
pub fn boss_rotation(wave: u32, pool_size: NonZeroUsize) -> BossSlot {
    let w = waves_past_first(wave) as usize;
    let pool = pool_size.get();
    BossSlot {
        boss_index: w % pool,
        cycle_index: (w / pool) as u32,
    }
}

/// Waves are 1-based; wave 0 is treated as wave 1.
fn waves_past_first(wave: u32) -> u32 {
    wave.saturating_sub(1)
}
