//! Default tuning parameters. Every value here can be overridden through
//! [`crate::config::EncounterConfig`].

/// Nominal presentation tick rate (Hz) used by headless drivers.
pub const TICK_RATE: u32 = 60;

/// Seconds per tick at the nominal rate.
pub const DT: f32 = 1.0 / TICK_RATE as f32;

// --- Kill-based waves ---

/// Kills required to clear wave 1.
pub const BASE_KILL_COUNT: u32 = 8;

/// Additional kills required per wave.
pub const KILL_INCREASE_PER_WAVE: u32 = 4;

/// Gold multiplier growth per wave (12% per wave).
pub const GOLD_GROWTH_PER_WAVE: f32 = 0.12;

// --- Spawn pacing ---

/// Seconds between spawn attempts on wave 1.
pub const BASE_SPAWN_INTERVAL: f32 = 1.0;

/// Interval reduction per wave.
pub const SPAWN_INTERVAL_STEP: f32 = 0.1;

/// Interval never drops below this, however aggressive the wave.
pub const SPAWN_INTERVAL_FLOOR: f32 = 0.2;

/// Concurrent enemy cap on wave 1.
pub const BASE_POPULATION: u32 = 50;

/// Additional concurrent enemies allowed per wave.
pub const POPULATION_STEP: u32 = 10;

/// Spawns are never placed closer than this to the player.
pub const MIN_DISTANCE_FROM_PLAYER: f32 = 3.0;

/// A telegraph is cancelled if the player comes this close.
pub const CANCEL_DISTANCE: f32 = 1.5;

/// Seconds a spawn marker is visible before the enemy materializes.
pub const TELEGRAPH_DELAY: f32 = 0.6;

/// Rejection-sampling retry budget per spawn attempt.
pub const MAX_SAMPLE_ATTEMPTS: u32 = 25;

// --- Variant tables ---

pub const TANK_BASE_CHANCE: f32 = 0.10;
pub const TANK_CHANCE_PER_LEVEL: f32 = 0.05;
/// Smoothed level multiplier: L1 = 1.0, L2 = 1.1, L3 = 1.2, ...
pub const LEVEL_MULTIPLIER_STEP: f32 = 0.10;
/// First wave on which ordinary elites can roll.
pub const ELITE_MIN_WAVE: u32 = 3;
pub const ELITE_BASE_CHANCE: f32 = 0.02;
pub const ELITE_CHANCE_STEP: f32 = 0.01;
/// Upper clamp for any variant roll, keeps spawns mixed.
pub const MAX_VARIANT_CHANCE: f32 = 0.6;

// --- Stat scaling ---

pub const HP_WAVE_STEP: f32 = 0.15;
pub const DAMAGE_WAVE_STEP: f32 = 0.08;
pub const SPEED_WAVE_STEP: f32 = 0.02;
pub const HP_CYCLE_STEP: f32 = 0.5;
pub const DAMAGE_CYCLE_STEP: f32 = 0.25;
pub const SPEED_CYCLE_STEP: f32 = 0.1;

// --- Elite phase ---

/// Seconds the player has to kill the elite.
pub const ELITE_TIME_LIMIT: f32 = 20.0;

/// Loot-grace window after the last combat kill.
pub const PRE_ELITE_DELAY: f32 = 0.8;

/// Grace window after the elite dies, before the chest phase.
pub const PRE_UPGRADE_DELAY: f32 = 1.0;

/// Failure toast: 0.18s in, 1.4s hold, 0.22s out.
pub const FAIL_TOAST_DURATION: f32 = 0.18 + 1.4 + 0.22;

/// Chest drop delay after entering the chest phase.
pub const CHEST_SPAWN_DELAY: f32 = 0.35;

pub const BOSS_SPAWN_DISTANCE: f32 = 6.0;
pub const BOSS_SPAWN_SIDE_JITTER: f32 = 1.2;

// --- Rewards ---

/// Share of pending rewards kept on failure.
pub const FAIL_COMMIT_RATIO: f32 = 0.5;

/// Gold paid for selling a chest reward, indexed by rarity.
pub const CHEST_SELL_VALUES: [u32; 5] = [10, 20, 40, 80, 160];

// --- Rarity table (luck-weighted) ---

/// Base weights: common, uncommon, rare, epic, legendary.
pub const RARITY_BASE_WEIGHTS: [f32; 5] = [100.0, 45.0, 18.0, 5.0, 1.0];

/// Weight multipliers at luck = 100.
pub const RARITY_MAX_LUCK_FACTORS: [f32; 5] = [0.55, 1.35, 1.80, 2.40, 3.00];
