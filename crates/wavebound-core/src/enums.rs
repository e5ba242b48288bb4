//! Enumeration types used throughout the encounter loop.

use serde::{Deserialize, Serialize};

/// Top-level phase of a wave cycle. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WavePhase {
    /// Kill-quota combat against periodically spawned enemies.
    #[default]
    Combat,
    /// Time-boxed fight against a single elite/boss.
    Elite,
    /// Reward chest dropped by the defeated elite.
    ChestReward,
    /// Spending pending upgrade points, one pick at a time.
    Upgrade,
    /// Shop intermission before the next wave.
    Shop,
}

impl WavePhase {
    /// Phases in which a player death fails the wave. Once the chest phase
    /// is reached the wave's rewards are already banked.
    pub fn is_live(self) -> bool {
        matches!(self, WavePhase::Combat | WavePhase::Elite)
    }
}

/// Enemy variant chosen at spawn time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyVariant {
    #[default]
    Normal,
    Tank,
    Elite,
    /// The unique end-of-wave encounter. Never rolled for ordinary spawns.
    Boss,
}

impl EnemyVariant {
    /// Unique spawns are re-sampled instead of cancelled when the player crowds them.
    pub fn is_unique(self) -> bool {
        self == EnemyVariant::Boss
    }
}

/// Rarity of a chest reward or upgrade card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChestRarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl ChestRarity {
    pub const ALL: [ChestRarity; 5] = [
        ChestRarity::Common,
        ChestRarity::Uncommon,
        ChestRarity::Rare,
        ChestRarity::Epic,
        ChestRarity::Legendary,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Delayed transitions the orchestrator can be waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Loot-grace window between the last combat kill and the elite.
    PreElite,
    /// Grace window between the elite's death and the chest.
    PreChest,
    /// Chest drop animation window.
    ChestSpawn,
    /// Failure toast window before the intermission.
    FailFlow,
}

/// Why a wave cycle ended without a chest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCause {
    EliteTimeout,
    PlayerDied,
}
