//! Events emitted by the encounter for presentation collaborators.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{BossSlot, EnemyHandle, StatMultipliers, Vec2};

/// Lifecycle and field events, drained into each tick's snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EncounterEvent {
    /// A new combat wave began.
    WaveStarted { wave: u32, target_kills: u32 },
    /// The active phase changed.
    PhaseChanged { phase: WavePhase },
    /// Elite arena presentation on.
    EliteStarted { slot: BossSlot, time_limit: f32 },
    /// Elite arena presentation off (success or failure).
    EliteEnded { defeated: bool },
    /// The boss materialized; UI can bind its health bar.
    FinalEnemySpawned { handle: EnemyHandle },
    /// A spawn marker appeared.
    TelegraphStarted {
        position: Vec2,
        variant: EnemyVariant,
        delay: f32,
    },
    /// A unique spawn's marker moved because the player stood on it.
    TelegraphMoved { from: Vec2, to: Vec2 },
    /// A spawn marker was removed without spawning.
    TelegraphCancelled { position: Vec2 },
    /// An enemy instance was requested from the instantiation collaborator.
    EnemySpawned {
        handle: EnemyHandle,
        position: Vec2,
        variant: EnemyVariant,
        stats: StatMultipliers,
    },
    /// Cosmetic cleanup: orbs, telegraph markers, stray projectiles.
    ClearFieldRequested,
    /// Pending rewards were realized at `ratio`.
    RewardsCommitted { ratio: f32, gold: u32, xp: u32 },
    /// The wave cycle failed; `lost_ratio` of pending rewards was forfeited.
    FailureAnnounced { cause: FailureCause, lost_ratio: f32 },
    /// The reward chest dropped.
    ChestSpawned { position: Vec2, rarity: ChestRarity },
    /// The chest reward was kept; the inventory collaborator applies it.
    ChestRewardTaken { rarity: ChestRarity },
    /// The chest reward was sold for gold.
    ChestRewardSold { rarity: ChestRarity, gold: u32 },
    /// Upgrade picks available; three cards rolled at these rarities.
    UpgradeOffered {
        remaining: u32,
        rarities: [ChestRarity; 3],
    },
}
