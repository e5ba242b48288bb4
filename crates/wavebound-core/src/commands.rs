//! Inbound notifications from collaborators to the encounter.
//!
//! Commands are queued and processed at the next tick boundary, before any
//! phase transition is evaluated.

use serde::{Deserialize, Serialize};

use crate::types::{EnemyHandle, Vec2};

/// Everything the combat, player and UI subsystems can report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EncounterCommand {
    // --- Combat ---
    /// An enemy died. `position` is where it died (used for the chest drop).
    EnemyKilled {
        handle: EnemyHandle,
        gold_value: i32,
        position: Vec2,
    },
    /// The player picked up an XP orb.
    XpCollected { amount: i32 },
    /// The player's health reached zero.
    PlayerDied,

    // --- Intermission UI ---
    /// The chest panel closed. `taken = false` sells the reward for gold.
    ChestResolved { taken: bool },
    /// One upgrade card was picked.
    UpgradeChosen,
    /// The shop's proceed button was pressed.
    ShopContinue,
}
