//! Encounter snapshot: the visible state handed to presentation each tick.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::events::EncounterEvent;
use crate::types::{BossSlot, EncounterTime, EnemyHandle};

/// Complete encounter state produced after each tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncounterSnapshot {
    pub time: EncounterTime,
    pub phase: WavePhase,
    pub wave: WaveView,
    pub elite: Option<EliteView>,
    pub rewards: PendingView,
    pub spawner: SpawnerView,
    /// Delayed transition in progress, if any.
    pub transition: Option<TransitionView>,
    /// Upgrade picks left in the current intermission.
    pub remaining_upgrade_picks: u32,
    pub events: Vec<EncounterEvent>,
}

/// Kill-quota progress.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WaveView {
    pub level: u32,
    pub current_kills: u32,
    pub target_kills: u32,
    pub spawn_limit: u32,
    pub spawned_this_wave: u32,
}

/// Elite phase status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EliteView {
    pub time_remaining: f32,
    pub is_alive: bool,
    pub slot: BossSlot,
    /// Set once the boss telegraph has materialized.
    pub handle: Option<EnemyHandle>,
}

/// Uncommitted rewards.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PendingView {
    pub gold: u32,
    pub xp: u32,
}

/// Spawn scheduler status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SpawnerView {
    pub enabled: bool,
    pub population: u32,
    pub population_cap: u32,
    pub telegraphs_in_flight: u32,
    pub interval_secs: f32,
}

/// A pending delayed transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransitionView {
    pub kind: TransitionKind,
    pub remaining_secs: f32,
}
