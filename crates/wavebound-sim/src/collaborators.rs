//! Narrow interfaces to the subsystems the encounter drives.
//!
//! The encounter never looks these up; they are handed to
//! [`crate::EncounterBuilder`] once at startup.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use wavebound_core::enums::{ChestRarity, EnemyVariant};
use wavebound_core::types::{EnemyHandle, StatMultipliers};

/// Everything the instantiation collaborator needs to materialize an enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnOrder {
    pub position: Vec2,
    pub variant: EnemyVariant,
    pub stats: StatMultipliers,
    /// Boss archetype name from the rotation pool; `None` for ordinary spawns.
    pub archetype: Option<String>,
}

/// The player-health / inventory side of the game.
pub trait PlayerHandle {
    fn position(&self) -> Vec2;
    fn teleport(&mut self, position: Vec2);
    fn heal_to_full(&mut self);
    /// Permanently grant gold (committed rewards, chest sales).
    fn add_gold(&mut self, amount: u32);
    /// Permanently grant XP.
    fn add_xp(&mut self, amount: u32);
    /// Level-up credits not yet spent on upgrades.
    fn pending_upgrade_points(&self) -> u32;
    fn consume_upgrade_point(&mut self);
    /// Luck stat (0..=100) used by rarity rolls.
    fn luck(&self) -> f32 {
        0.0
    }
}

/// Entity instantiation. Handles must be unique for the life of the encounter.
pub trait EnemyFactory {
    fn spawn_enemy(&mut self, order: &SpawnOrder) -> EnemyHandle;
    fn despawn_enemy(&mut self, handle: EnemyHandle);
}

/// Optional reward-chest presentation. Without one the chest phase is skipped.
pub trait RewardChest {
    fn spawn_chest(&mut self, position: Vec2, rarity: ChestRarity);
    fn remove_chest(&mut self);
}
