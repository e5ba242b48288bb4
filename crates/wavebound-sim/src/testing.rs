//! In-memory collaborators for tests and headless runs.
//!
//! They record every call so assertions can inspect what the encounter asked
//! the outside world to do.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;

use wavebound_core::enums::ChestRarity;
use wavebound_core::types::EnemyHandle;

use crate::collaborators::{EnemyFactory, PlayerHandle, RewardChest, SpawnOrder};

/// A player that stands wherever it was last teleported.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPlayer {
    pub position: Vec2,
    pub gold: u32,
    pub xp: u32,
    pub upgrade_points: u32,
    pub luck: f32,
    pub heals: u32,
    pub teleports: Vec<Vec2>,
}

impl ScriptedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upgrade_points(mut self, points: u32) -> Self {
        self.upgrade_points = points;
        self
    }
}

impl PlayerHandle for ScriptedPlayer {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn teleport(&mut self, position: Vec2) {
        self.position = position;
        self.teleports.push(position);
    }

    fn heal_to_full(&mut self) {
        self.heals += 1;
    }

    fn add_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    fn add_xp(&mut self, amount: u32) {
        self.xp = self.xp.saturating_add(amount);
    }

    fn pending_upgrade_points(&self) -> u32 {
        self.upgrade_points
    }

    fn consume_upgrade_point(&mut self) {
        self.upgrade_points = self.upgrade_points.saturating_sub(1);
    }

    fn luck(&self) -> f32 {
        self.luck
    }
}

/// Hands out sequential handles and keeps every order it received.
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    next_handle: u64,
    pub spawned: Vec<(EnemyHandle, SpawnOrder)>,
    pub despawned: Vec<EnemyHandle>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles spawned and not yet despawned by the encounter.
    pub fn alive(&self) -> Vec<EnemyHandle> {
        self.spawned
            .iter()
            .map(|(handle, _)| *handle)
            .filter(|handle| !self.despawned.contains(handle))
            .collect()
    }

    pub fn order(&self, handle: EnemyHandle) -> Option<&SpawnOrder> {
        self.spawned
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, order)| order)
    }
}

impl EnemyFactory for RecordingFactory {
    fn spawn_enemy(&mut self, order: &SpawnOrder) -> EnemyHandle {
        self.next_handle += 1;
        let handle = EnemyHandle(self.next_handle);
        self.spawned.push((handle, order.clone()));
        handle
    }

    fn despawn_enemy(&mut self, handle: EnemyHandle) {
        self.despawned.push(handle);
    }
}

/// What a [`RecordingChest`] was asked to do.
#[derive(Debug, Clone, Default)]
pub struct ChestLog {
    pub spawned: Vec<(Vec2, ChestRarity)>,
    pub removed: u32,
}

/// Chest collaborator whose log stays readable after it is boxed into the
/// encounter.
#[derive(Debug, Clone, Default)]
pub struct RecordingChest {
    log: Rc<RefCell<ChestLog>>,
}

impl RecordingChest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the call log.
    pub fn log(&self) -> Rc<RefCell<ChestLog>> {
        Rc::clone(&self.log)
    }
}

impl RewardChest for RecordingChest {
    fn spawn_chest(&mut self, position: Vec2, rarity: ChestRarity) {
        self.log.borrow_mut().spawned.push((position, rarity));
    }

    fn remove_chest(&mut self) {
        self.log.borrow_mut().removed += 1;
    }
}
