//! The encounter orchestrator.
//!
//! `Encounter` owns the wave state machine, the spawn scheduler and the reward
//! ledger. Collaborators report what happened through queued
//! `EncounterCommand`s; each `tick` drains the queue, advances every timer and
//! returns an `EncounterSnapshot` with the events produced along the way.
//!
//! Phase order per wave: Combat, Elite, ChestReward, Upgrade (once per pick),
//! Shop. Failure (elite timeout or player death) skips straight to the
//! intermission after a partial reward commit.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use wavebound_balance::ledger::RewardLedger;
use wavebound_balance::rarity::{roll_card_rarities, roll_rarity};
use wavebound_balance::scaling::{boss_rotation, ScalingModel};
use wavebound_core::commands::EncounterCommand;
use wavebound_core::config::{ConfigError, EncounterConfig};
use wavebound_core::enums::{ChestRarity, EnemyVariant, FailureCause, TransitionKind, WavePhase};
use wavebound_core::events::EncounterEvent;
use wavebound_core::state::{EliteView, EncounterSnapshot, PendingView, WaveView};
use wavebound_core::types::{BossSlot, EncounterTime, EnemyHandle};

use crate::collaborators::{EnemyFactory, PlayerHandle, RewardChest, SpawnOrder};
use crate::spawner::{SpawnScheduler, SpawnSettings};
use crate::transition::{CompletedTransition, PendingTransition};

/// Why an encounter could not be built.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),
}

/// Kill-quota progress for the current wave.
#[derive(Debug, Clone, Copy)]
struct WaveContext {
    level: u32,
    target_kills: u32,
    current_kills: u32,
}

/// Exists only while the phase is Elite.
#[derive(Debug, Clone, Copy)]
struct EliteContext {
    time_remaining: f32,
    is_alive: bool,
    slot: BossSlot,
    handle: Option<EnemyHandle>,
    /// The countdown starts on the tick after this one.
    entered_tick: u64,
}

/// At most one chest per wave cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ChestState {
    #[default]
    Idle,
    Scheduled,
    Active(ChestRarity),
    Resolved,
}

/// Collects collaborators and configuration, then starts wave 1.
pub struct EncounterBuilder<P, F> {
    config: EncounterConfig,
    player: Option<P>,
    factory: Option<F>,
    chest: Option<Box<dyn RewardChest>>,
}

impl<P: PlayerHandle, F: EnemyFactory> EncounterBuilder<P, F> {
    pub fn new(config: EncounterConfig) -> Self {
        Self {
            config,
            player: None,
            factory: None,
            chest: None,
        }
    }

    pub fn player(mut self, player: P) -> Self {
        self.player = Some(player);
        self
    }

    pub fn enemy_factory(mut self, factory: F) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Optional. Without a chest the ChestReward phase is passed through.
    pub fn reward_chest(mut self, chest: impl RewardChest + 'static) -> Self {
        self.chest = Some(Box::new(chest));
        self
    }

    pub fn build(self) -> Result<Encounter<P, F>, BuildError> {
        self.config.validate()?;
        let player = self.player.ok_or(BuildError::MissingCollaborator("player"))?;
        let factory = self
            .factory
            .ok_or(BuildError::MissingCollaborator("enemy factory"))?;
        let boss_pool_size =
            NonZeroUsize::new(self.config.elite.boss_pool.len()).ok_or(ConfigError::EmptyBossPool)?;

        let scaling = ScalingModel::from_config(&self.config);
        let spawner = SpawnScheduler::new(SpawnSettings::from(&self.config.spawn), scaling.clone());
        if self.chest.is_none() {
            log::info!("no reward chest collaborator; chest phase will be skipped");
        }

        let mut encounter = Encounter {
            rng: ChaCha8Rng::seed_from_u64(self.config.seed),
            config: self.config,
            scaling,
            boss_pool_size,
            player,
            factory,
            chest: self.chest,
            spawner,
            ledger: RewardLedger::new(),
            time: EncounterTime::default(),
            phase: WavePhase::Combat,
            wave: WaveContext {
                level: 1,
                target_kills: 0,
                current_kills: 0,
            },
            elite: None,
            pending: PendingTransition::None,
            remaining_upgrade_picks: 0,
            chest_state: ChestState::Idle,
            last_elite_death: None,
            command_queue: VecDeque::new(),
            events: Vec::new(),
        };
        let spawn_point = encounter.config.player_spawn_point;
        encounter.player.teleport(spawn_point);
        encounter.start_wave(1);
        Ok(encounter)
    }
}

/// The wave-survival encounter state machine.
pub struct Encounter<P, F> {
    config: EncounterConfig,
    scaling: ScalingModel,
    boss_pool_size: NonZeroUsize,
    player: P,
    factory: F,
    chest: Option<Box<dyn RewardChest>>,
    spawner: SpawnScheduler,
    ledger: RewardLedger,
    rng: ChaCha8Rng,
    time: EncounterTime,
    phase: WavePhase,
    wave: WaveContext,
    elite: Option<EliteContext>,
    pending: PendingTransition,
    remaining_upgrade_picks: u32,
    chest_state: ChestState,
    last_elite_death: Option<Vec2>,
    command_queue: VecDeque<EncounterCommand>,
    events: Vec<EncounterEvent>,
}

impl<P: PlayerHandle, F: EnemyFactory> Encounter<P, F> {
    /// Queue a collaborator report for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: EncounterCommand) {
        self.command_queue.push_back(command);
    }

    /// Queue multiple commands.
    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = EncounterCommand>) {
        self.command_queue.extend(commands);
    }

    /// Advance the encounter by `dt` seconds and return the resulting snapshot.
    ///
    /// Commands are applied first so that a kill completing the quota is counted
    /// before any transition condition is looked at.
    pub fn tick(&mut self, dt: f32) -> EncounterSnapshot {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        self.process_commands();
        self.run_spawner(dt);
        if let Some(done) = self.pending.advance(dt) {
            self.complete_transition(done);
        }
        self.check_phase_conditions(dt);
        self.time.advance(dt);

        self.snapshot()
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    pub fn wave_level(&self) -> u32 {
        self.wave.level
    }

    pub fn time(&self) -> EncounterTime {
        self.time
    }

    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn spawner(&self) -> &SpawnScheduler {
        &self.spawner
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    /// Handle of the boss once its telegraph has materialized.
    pub fn elite_handle(&self) -> Option<EnemyHandle> {
        self.elite.and_then(|elite| elite.handle)
    }

    pub fn is_transition_pending(&self) -> bool {
        self.pending.is_locked()
    }

    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: EncounterCommand) {
        match command {
            EncounterCommand::EnemyKilled {
                handle,
                gold_value,
                position,
            } => self.on_enemy_killed(handle, gold_value, position),
            EncounterCommand::XpCollected { amount } => {
                if self.config.rewards.use_pending_rewards {
                    self.ledger.accrue_xp(amount);
                } else if amount > 0 {
                    self.player.add_xp(amount as u32);
                }
            }
            EncounterCommand::PlayerDied => self.on_player_died(),
            EncounterCommand::ChestResolved { taken } => self.on_chest_resolved(taken),
            EncounterCommand::UpgradeChosen => {
                if self.phase != WavePhase::Upgrade {
                    log::warn!("upgrade chosen during {:?}; ignored", self.phase);
                    return;
                }
                self.remaining_upgrade_picks = self.remaining_upgrade_picks.saturating_sub(1);
                self.player.consume_upgrade_point();
                if self.remaining_upgrade_picks > 0 {
                    self.offer_upgrade();
                } else {
                    self.set_phase(WavePhase::Shop);
                }
            }
            EncounterCommand::ShopContinue => {
                if self.phase != WavePhase::Shop {
                    log::warn!("shop continue during {:?}; ignored", self.phase);
                    return;
                }
                self.events.push(EncounterEvent::ClearFieldRequested);
                let spawn_point = self.config.player_spawn_point;
                self.player.teleport(spawn_point);
                self.start_wave(self.wave.level + 1);
            }
        }
    }

    fn on_enemy_killed(&mut self, handle: EnemyHandle, gold_value: i32, position: Vec2) {
        if self.spawner.on_enemy_removed(handle).is_none() {
            log::debug!("kill reported for untracked handle {:?}", handle);
        }

        let gold = self.scaling.kill_gold(self.wave.level, gold_value);
        self.accrue_gold(gold);

        match self.phase {
            WavePhase::Combat => {
                if self.wave.current_kills < self.wave.target_kills {
                    self.wave.current_kills += 1;
                }
                debug_assert!(self.wave.current_kills <= self.wave.target_kills);
            }
            WavePhase::Elite => {
                if let Some(elite) = self.elite.as_mut() {
                    if elite.is_alive && elite.handle == Some(handle) {
                        elite.is_alive = false;
                        self.last_elite_death = Some(position);
                        log::info!("elite {:?} defeated at {}", handle, position);
                    }
                }
            }
            _ => {}
        }
    }

    fn on_player_died(&mut self) {
        if !self.phase.is_live() {
            log::warn!("player death during {:?}; ignored", self.phase);
            return;
        }
        if self.pending.kind() == Some(TransitionKind::FailFlow) {
            log::debug!("player death while failure already pending; ignored");
            return;
        }
        if let Some(kind) = self.pending.cancel() {
            log::debug!("player death cancelled pending {:?}", kind);
        }
        self.fail(FailureCause::PlayerDied);
    }

    fn on_chest_resolved(&mut self, taken: bool) {
        let ChestState::Active(rarity) = self.chest_state else {
            log::warn!(
                "chest resolved during {:?} with no chest on the field; ignored",
                self.phase
            );
            return;
        };
        if self.phase != WavePhase::ChestReward {
            log::warn!("chest resolved during {:?}; ignored", self.phase);
            return;
        }

        if taken {
            self.events.push(EncounterEvent::ChestRewardTaken { rarity });
        } else {
            let gold = self.config.rewards.chest_sell_values[rarity.index()];
            self.player.add_gold(gold);
            self.events.push(EncounterEvent::ChestRewardSold { rarity, gold });
        }
        self.remove_chest();
        self.go_to_intermission();
    }

    fn accrue_gold(&mut self, gold: u32) {
        if gold == 0 {
            return;
        }
        if self.config.rewards.use_pending_rewards {
            self.ledger.accrue_gold(i32::try_from(gold).unwrap_or(i32::MAX));
        } else {
            self.player.add_gold(gold);
        }
    }

    fn run_spawner(&mut self, dt: f32) {
        let player = self.player.position();
        let completed = self.spawner.tick(
            dt,
            player,
            &self.config.area,
            &mut self.rng,
            &mut self.factory,
            &mut self.events,
        );
        for spawn in completed {
            if spawn.variant != EnemyVariant::Boss {
                continue;
            }
            if let Some(elite) = self.elite.as_mut() {
                elite.handle = Some(spawn.handle);
            }
            log::info!("boss {:?} spawned at {}", spawn.handle, spawn.position);
            self.events
                .push(EncounterEvent::FinalEnemySpawned { handle: spawn.handle });
        }
    }

    fn complete_transition(&mut self, done: CompletedTransition) {
        if self.phase != done.origin {
            log::debug!(
                "{:?} completed after phase moved from {:?} to {:?}; dropped",
                done.kind,
                done.origin,
                self.phase
            );
            return;
        }
        match done.kind {
            TransitionKind::PreElite => self.start_elite(),
            TransitionKind::PreChest => self.enter_chest_reward(),
            TransitionKind::ChestSpawn => self.spawn_chest(),
            TransitionKind::FailFlow => self.go_to_intermission(),
        }
    }

    /// Trigger checks. Skipped entirely while a transition holds the lock.
    fn check_phase_conditions(&mut self, dt: f32) {
        if self.pending.is_locked() {
            return;
        }
        match self.phase {
            WavePhase::Combat => {
                if self.wave.current_kills >= self.wave.target_kills
                    && self.spawner.quota_exhausted()
                {
                    log::debug!("kill quota met on wave {}", self.wave.level);
                    self.pending.begin(
                        TransitionKind::PreElite,
                        self.config.elite.pre_elite_delay,
                        WavePhase::Combat,
                    );
                }
            }
            WavePhase::Elite => {
                let Some(elite) = self.elite.as_mut() else {
                    return;
                };
                if !elite.is_alive {
                    self.pending.begin(
                        TransitionKind::PreChest,
                        self.config.elite.pre_upgrade_delay,
                        WavePhase::Elite,
                    );
                    return;
                }
                if elite.entered_tick == self.time.tick {
                    return;
                }
                elite.time_remaining = (elite.time_remaining - dt).max(0.0);
                if elite.time_remaining <= 0.0 {
                    self.fail(FailureCause::EliteTimeout);
                }
            }
            WavePhase::ChestReward | WavePhase::Upgrade | WavePhase::Shop => {}
        }
    }

    fn set_phase(&mut self, phase: WavePhase) {
        self.pending.cancel();
        if self.phase == phase {
            return;
        }
        log::info!("phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.events.push(EncounterEvent::PhaseChanged { phase });
    }

    fn start_wave(&mut self, level: u32) {
        self.ledger.clear();
        self.elite = None;
        self.chest_state = ChestState::Idle;
        self.last_elite_death = None;
        self.remaining_upgrade_picks = 0;

        let target_kills = self.scaling.target_kills(level);
        self.wave = WaveContext {
            level,
            target_kills,
            current_kills: 0,
        };

        let interval = self.scaling.spawn_interval(level);
        let cap = self.scaling.population_cap(level);
        let cycle = boss_rotation(level, self.boss_pool_size).cycle_index;
        self.spawner.set_wave(level, cycle);
        self.spawner.configure(interval, cap, target_kills);
        self.spawner.enable();
        self.player.heal_to_full();
        self.set_phase(WavePhase::Combat);

        log::info!(
            "wave {} started: target {} kills, interval {:.2}s, cap {}",
            level,
            target_kills,
            interval,
            cap
        );
        self.events.push(EncounterEvent::WaveStarted {
            wave: level,
            target_kills,
        });
    }

    fn start_elite(&mut self) {
        self.events.push(EncounterEvent::ClearFieldRequested);
        self.set_phase(WavePhase::Elite);
        self.spawner.disable(&mut self.events);
        self.spawner.clear_live_enemies(&mut self.factory);

        let level = self.wave.level;
        let slot = boss_rotation(level, self.boss_pool_size);
        let center = self.config.elite.player_center;
        self.player.teleport(center);

        let position = self.boss_spawn_point(center);
        let archetype = self.config.elite.boss_pool.get(slot.boss_index).cloned();
        let stats = self.scaling.elite_stat_multipliers(level, slot.cycle_index);
        log::info!(
            "elite phase: boss {:?} (cycle {}) telegraphed at {}",
            archetype,
            slot.cycle_index,
            position
        );
        self.spawner.try_spawn_at(
            SpawnOrder {
                position,
                variant: EnemyVariant::Boss,
                stats,
                archetype,
            },
            &mut self.events,
        );

        let time_limit = self.config.elite.time_limit;
        self.elite = Some(EliteContext {
            time_remaining: time_limit,
            is_alive: true,
            slot,
            handle: None,
            entered_tick: self.time.tick,
        });
        self.events
            .push(EncounterEvent::EliteStarted { slot, time_limit });
    }

    /// Offset from `origin` along the spawn direction, with sideways jitter.
    fn boss_spawn_point(&mut self, origin: Vec2) -> Vec2 {
        let elite = &self.config.elite;
        let direction = elite.boss_spawn_direction.normalize_or(Vec2::Y);
        let jitter = elite.boss_spawn_side_jitter;
        let side = self.rng.gen_range(-jitter..=jitter);
        origin + direction * elite.boss_spawn_distance + direction.perp() * side
    }

    fn enter_chest_reward(&mut self) {
        self.commit_rewards(1.0);
        if self.elite.take().is_some() {
            self.events.push(EncounterEvent::EliteEnded { defeated: true });
        }
        self.set_phase(WavePhase::ChestReward);

        if self.chest.is_none() {
            self.go_to_intermission();
            return;
        }
        if self.chest_state != ChestState::Idle {
            log::debug!("chest already {:?} this cycle", self.chest_state);
            return;
        }
        self.chest_state = ChestState::Scheduled;
        self.pending.begin(
            TransitionKind::ChestSpawn,
            self.config.elite.chest_spawn_delay,
            WavePhase::ChestReward,
        );
    }

    fn spawn_chest(&mut self) {
        if self.chest_state != ChestState::Scheduled {
            return;
        }
        let rarity = roll_rarity(self.player.luck(), &mut self.rng);
        let position = self
            .last_elite_death
            .unwrap_or(self.config.elite.player_center);
        if let Some(chest) = self.chest.as_mut() {
            chest.spawn_chest(position, rarity);
        }
        self.chest_state = ChestState::Active(rarity);
        log::info!("{:?} chest spawned at {}", rarity, position);
        self.events
            .push(EncounterEvent::ChestSpawned { position, rarity });
    }

    fn remove_chest(&mut self) {
        if let ChestState::Active(_) = self.chest_state {
            if let Some(chest) = self.chest.as_mut() {
                chest.remove_chest();
            }
        }
        if self.chest_state != ChestState::Idle {
            self.chest_state = ChestState::Resolved;
        }
    }

    fn commit_rewards(&mut self, ratio: f32) {
        let payout = self.ledger.commit(ratio);
        if payout.gold > 0 {
            self.player.add_gold(payout.gold);
        }
        if payout.xp > 0 {
            self.player.add_xp(payout.xp);
        }
        log::info!(
            "rewards committed at {:.2}: {} gold, {} xp",
            ratio,
            payout.gold,
            payout.xp
        );
        self.events.push(EncounterEvent::RewardsCommitted {
            ratio,
            gold: payout.gold,
            xp: payout.xp,
        });
    }

    /// Shared failure path for elite timeout and player death.
    fn fail(&mut self, cause: FailureCause) {
        let origin = self.phase;
        let ratio = self.config.rewards.fail_commit_ratio;
        self.commit_rewards(ratio);

        if self.elite.take().is_some() {
            self.events.push(EncounterEvent::EliteEnded { defeated: false });
        }
        self.spawner.disable(&mut self.events);
        self.spawner.clear_live_enemies(&mut self.factory);
        self.remove_chest();
        self.events.push(EncounterEvent::ClearFieldRequested);

        let lost_ratio = 1.0 - ratio;
        log::info!(
            "wave {} failed ({:?}); {:.0}% of pending rewards lost",
            self.wave.level,
            cause,
            lost_ratio * 100.0
        );
        self.events
            .push(EncounterEvent::FailureAnnounced { cause, lost_ratio });
        self.pending.begin(
            TransitionKind::FailFlow,
            self.config.elite.fail_toast_duration,
            origin,
        );
    }

    fn go_to_intermission(&mut self) {
        self.elite = None;
        let picks = self.player.pending_upgrade_points();
        self.remaining_upgrade_picks = picks;
        if picks > 0 {
            self.set_phase(WavePhase::Upgrade);
            self.offer_upgrade();
        } else {
            self.set_phase(WavePhase::Shop);
        }
    }

    fn offer_upgrade(&mut self) {
        let rarities = roll_card_rarities(self.player.luck(), &mut self.rng);
        self.events.push(EncounterEvent::UpgradeOffered {
            remaining: self.remaining_upgrade_picks,
            rarities,
        });
    }

    fn snapshot(&mut self) -> EncounterSnapshot {
        let spawned_this_wave = self.spawner.spawned_this_wave();
        debug_assert!(spawned_this_wave <= self.wave.target_kills);
        EncounterSnapshot {
            time: self.time,
            phase: self.phase,
            wave: WaveView {
                level: self.wave.level,
                current_kills: self.wave.current_kills,
                target_kills: self.wave.target_kills,
                spawn_limit: self.wave.target_kills,
                spawned_this_wave,
            },
            elite: self.elite.map(|elite| EliteView {
                time_remaining: elite.time_remaining,
                is_alive: elite.is_alive,
                slot: elite.slot,
                handle: elite.handle,
            }),
            rewards: PendingView {
                gold: self.ledger.pending_gold(),
                xp: self.ledger.pending_xp(),
            },
            spawner: self.spawner.view(),
            transition: self.pending.view(),
            remaining_upgrade_picks: self.remaining_upgrade_picks,
            events: std::mem::take(&mut self.events),
        }
    }
}
