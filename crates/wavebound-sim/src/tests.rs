//! Tests for the spawn scheduler, transition timer and encounter state machine.

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use wavebound_balance::ScalingModel;
use wavebound_core::commands::EncounterCommand;
use wavebound_core::config::{ConfigError, EncounterConfig};
use wavebound_core::constants::{CHEST_SELL_VALUES, DT};
use wavebound_core::enums::*;
use wavebound_core::events::EncounterEvent;
use wavebound_core::state::EncounterSnapshot;
use wavebound_core::types::{AreaBounds, EnemyHandle, StatMultipliers};

use crate::collaborators::SpawnOrder;
use crate::encounter::{BuildError, Encounter, EncounterBuilder};
use crate::spawner::sampling::sample_spawn_point;
use crate::spawner::{SpawnScheduler, SpawnSettings};
use crate::testing::{RecordingChest, RecordingFactory, ScriptedPlayer};
use crate::transition::PendingTransition;

type TestEncounter = Encounter<ScriptedPlayer, RecordingFactory>;

fn build(config: EncounterConfig, player: ScriptedPlayer) -> TestEncounter {
    EncounterBuilder::new(config)
        .player(player)
        .enemy_factory(RecordingFactory::new())
        .build()
        .unwrap()
}

fn build_with_chest(config: EncounterConfig, player: ScriptedPlayer) -> (TestEncounter, RecordingChest) {
    let chest = RecordingChest::new();
    let encounter = EncounterBuilder::new(config)
        .player(player)
        .enemy_factory(RecordingFactory::new())
        .reward_chest(chest.clone())
        .build()
        .unwrap();
    (encounter, chest)
}

fn killed(handle: EnemyHandle, gold_value: i32) -> EncounterCommand {
    EncounterCommand::EnemyKilled {
        handle,
        gold_value,
        position: Vec2::new(1.0, 2.0),
    }
}

/// Drives an encounter and keeps every event it produced.
struct Harness {
    encounter: TestEncounter,
    killed: Vec<EnemyHandle>,
    events: Vec<EncounterEvent>,
    chest_on_field: bool,
}

impl Harness {
    fn new(encounter: TestEncounter) -> Self {
        Self {
            encounter,
            killed: Vec::new(),
            events: Vec::new(),
            chest_on_field: false,
        }
    }

    fn step(&mut self) -> EncounterSnapshot {
        let snap = self.encounter.tick(DT);
        for event in &snap.events {
            match event {
                EncounterEvent::ChestSpawned { .. } => self.chest_on_field = true,
                EncounterEvent::ChestRewardTaken { .. } | EncounterEvent::ChestRewardSold { .. } => {
                    self.chest_on_field = false
                }
                _ => {}
            }
        }
        self.events.extend(snap.events.iter().cloned());
        snap
    }

    /// Report a kill for every ordinary enemy still alive.
    fn kill_ordinary(&mut self, gold_value: i32) {
        let factory = self.encounter.factory();
        let targets: Vec<EnemyHandle> = factory
            .spawned
            .iter()
            .filter(|(_, order)| order.variant != EnemyVariant::Boss)
            .map(|(handle, _)| *handle)
            .filter(|h| !factory.despawned.contains(h) && !self.killed.contains(h))
            .collect();
        for handle in targets {
            self.killed.push(handle);
            self.encounter.queue_command(killed(handle, gold_value));
        }
    }

    fn kill_boss(&mut self, position: Vec2) -> bool {
        let Some(handle) = self.encounter.elite_handle() else {
            return false;
        };
        if self.killed.contains(&handle) {
            return false;
        }
        self.killed.push(handle);
        self.encounter.queue_command(EncounterCommand::EnemyKilled {
            handle,
            gold_value: 0,
            position,
        });
        true
    }

    /// Play every phase the way a competent player would.
    fn autopilot(&mut self) {
        match self.encounter.phase() {
            WavePhase::Combat => self.kill_ordinary(3),
            WavePhase::Elite => {
                self.kill_boss(Vec2::new(0.5, 4.0));
            }
            WavePhase::ChestReward => {
                if self.chest_on_field {
                    self.encounter
                        .queue_command(EncounterCommand::ChestResolved { taken: true });
                }
            }
            WavePhase::Upgrade => self.encounter.queue_command(EncounterCommand::UpgradeChosen),
            WavePhase::Shop => self.encounter.queue_command(EncounterCommand::ShopContinue),
        }
    }

    /// Step (optionally killing ordinary enemies first) until `done` holds.
    fn run_until(
        &mut self,
        limit: usize,
        kill: bool,
        mut done: impl FnMut(&EncounterSnapshot) -> bool,
    ) -> EncounterSnapshot {
        for _ in 0..limit {
            if kill {
                self.kill_ordinary(0);
            }
            let snap = self.step();
            if done(&snap) {
                return snap;
            }
        }
        panic!("condition not reached within {limit} ticks");
    }

    fn count(&self, pred: impl Fn(&EncounterEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

fn test_scheduler(settings: SpawnSettings) -> SpawnScheduler {
    SpawnScheduler::new(settings, ScalingModel::from_config(&EncounterConfig::default()))
}

fn default_settings() -> SpawnSettings {
    SpawnSettings::from(&EncounterConfig::default().spawn)
}

fn ordinary_order(position: Vec2) -> SpawnOrder {
    SpawnOrder {
        position,
        variant: EnemyVariant::Normal,
        stats: StatMultipliers::IDENTITY,
        archetype: None,
    }
}

// ---- Spawn point sampling ----

#[test]
fn test_sampling_never_too_close_rect() {
    let area = AreaBounds::default();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut found = 0;
    for i in 0..1000 {
        let player = Vec2::new((i % 20) as f32 - 10.0, (i % 14) as f32 - 7.0);
        if let Some(point) = sample_spawn_point(&area, player, 3.0, 25, &mut rng) {
            found += 1;
            assert!(area.contains(point), "{point} outside area");
            assert!(point.distance(player) >= 3.0, "{point} too close to {player}");
        }
    }
    assert!(found > 900, "sampler should almost always succeed, got {found}");
}

#[test]
fn test_sampling_concave_polygon() {
    // U shape: the notch x in (2, 4), y in (2, 6) is outside the area.
    let area = AreaBounds::Polygon {
        vertices: vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(6.0, 0.0),
            Vec2::new(6.0, 6.0),
            Vec2::new(4.0, 6.0),
            Vec2::new(4.0, 2.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(2.0, 6.0),
            Vec2::new(0.0, 6.0),
        ],
    };
    let player = Vec2::new(3.0, 4.0);
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    for _ in 0..1000 {
        let Some(point) = sample_spawn_point(&area, player, 1.5, 25, &mut rng) else {
            continue;
        };
        let in_notch = point.x > 2.0 && point.x < 4.0 && point.y > 2.0;
        assert!(!in_notch, "{point} landed in the notch");
        assert!(point.distance(player) >= 1.5);
    }
}

#[test]
fn test_sampling_gives_up_without_valid_points() {
    let tiny = AreaBounds::Rect {
        min: Vec2::ZERO,
        max: Vec2::ONE,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    assert_eq!(sample_spawn_point(&tiny, Vec2::splat(0.5), 10.0, 25, &mut rng), None);

    let degenerate = AreaBounds::Rect {
        min: Vec2::ONE,
        max: Vec2::ONE,
    };
    assert_eq!(sample_spawn_point(&degenerate, Vec2::ZERO, 0.0, 25, &mut rng), None);
}

// ---- Spawn scheduler ----

#[test]
fn test_scheduler_respects_cap_and_quota() {
    let mut scheduler = test_scheduler(default_settings());
    scheduler.configure(0.05, 3, 10);
    scheduler.set_wave(1, 0);
    scheduler.enable();

    let area = AreaBounds::default();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut factory = RecordingFactory::new();
    let mut events = Vec::new();
    let mut removed = Vec::new();

    for tick in 0..3000 {
        scheduler.tick(DT, Vec2::ZERO, &area, &mut rng, &mut factory, &mut events);
        assert!(scheduler.population() + scheduler.telegraphs_in_flight() <= 3);
        assert!(scheduler.spawned_this_wave() <= 10);

        if tick % 90 == 0 {
            let next = factory
                .spawned
                .iter()
                .map(|(h, _)| *h)
                .find(|h| !removed.contains(h));
            if let Some(handle) = next {
                assert!(scheduler.on_enemy_removed(handle).is_some());
                removed.push(handle);
            }
        }
    }
    assert_eq!(scheduler.spawned_this_wave(), 10);
    assert!(scheduler.quota_exhausted());
    assert_eq!(factory.spawned.len(), 10);
}

#[test]
fn test_interval_clamped_to_floor() {
    let mut scheduler = test_scheduler(default_settings());
    scheduler.configure(0.01, 50, 8);
    assert_eq!(scheduler.view().interval_secs, 0.2);
}

#[test]
fn test_disable_cancels_in_flight_telegraphs() {
    let mut settings = default_settings();
    settings.telegraph_delay = 5.0;
    let mut scheduler = test_scheduler(settings);
    scheduler.configure(0.2, 50, 20);
    scheduler.set_wave(1, 0);
    scheduler.enable();

    let area = AreaBounds::default();
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let mut factory = RecordingFactory::new();
    let mut events = Vec::new();

    while scheduler.telegraphs_in_flight() < 3 {
        scheduler.tick(DT, Vec2::ZERO, &area, &mut rng, &mut factory, &mut events);
    }
    assert_eq!(scheduler.telegraphs_in_flight(), 3);

    events.clear();
    scheduler.disable(&mut events);
    let cancelled = events
        .iter()
        .filter(|e| matches!(e, EncounterEvent::TelegraphCancelled { .. }))
        .count();
    assert_eq!(cancelled, 3);

    for _ in 0..600 {
        scheduler.tick(DT, Vec2::ZERO, &area, &mut rng, &mut factory, &mut events);
    }
    assert!(factory.spawned.is_empty(), "no telegraph may fire after disable");
    assert_eq!(scheduler.telegraphs_in_flight(), 0);
}

#[test]
fn test_ordinary_telegraph_cancelled_by_proximity() {
    let mut scheduler = test_scheduler(default_settings());
    let area = AreaBounds::default();
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let mut factory = RecordingFactory::new();
    let mut events = Vec::new();

    let spot = Vec2::new(5.0, 0.0);
    scheduler.try_spawn_at(ordinary_order(spot), &mut events);
    scheduler.tick(DT, spot + Vec2::new(0.5, 0.0), &area, &mut rng, &mut factory, &mut events);

    assert!(events.contains(&EncounterEvent::TelegraphCancelled { position: spot }));
    assert_eq!(scheduler.telegraphs_in_flight(), 0);
    for _ in 0..120 {
        scheduler.tick(DT, Vec2::ZERO, &area, &mut rng, &mut factory, &mut events);
    }
    assert!(factory.spawned.is_empty());
}

#[test]
fn test_boss_telegraph_moves_instead_of_cancelling() {
    let mut scheduler = test_scheduler(default_settings());
    let area = AreaBounds::default();
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let mut factory = RecordingFactory::new();
    let mut events = Vec::new();

    let spot = Vec2::new(5.0, 0.0);
    scheduler.try_spawn_at(
        SpawnOrder {
            position: spot,
            variant: EnemyVariant::Boss,
            stats: StatMultipliers::IDENTITY,
            archetype: Some("Warden".into()),
        },
        &mut events,
    );

    let mut completed = Vec::new();
    for _ in 0..120 {
        completed.extend(scheduler.tick(DT, spot, &area, &mut rng, &mut factory, &mut events));
    }

    assert!(events
        .iter()
        .any(|e| matches!(e, EncounterEvent::TelegraphMoved { from, .. } if *from == spot)));
    assert!(!events
        .iter()
        .any(|e| matches!(e, EncounterEvent::TelegraphCancelled { .. })));
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].variant, EnemyVariant::Boss);
    assert!(completed[0].position.distance(spot) >= 1.5);
    assert_eq!(factory.spawned[0].1.archetype.as_deref(), Some("Warden"));
    // Unique spawns do not use up the ordinary quota.
    assert_eq!(scheduler.spawned_this_wave(), 0);
}

// ---- Transition timer ----

#[test]
fn test_pending_transition_locks_until_complete() {
    let mut pending = PendingTransition::default();
    assert!(!pending.is_locked());
    assert!(pending.begin(TransitionKind::PreElite, 0.5, WavePhase::Combat));
    assert!(!pending.begin(TransitionKind::PreElite, 0.5, WavePhase::Combat));
    assert!(pending.is_locked());

    assert_eq!(pending.advance(0.3), None);
    let done = pending.advance(0.3).unwrap();
    assert_eq!(done.kind, TransitionKind::PreElite);
    assert_eq!(done.origin, WavePhase::Combat);
    assert!(!pending.is_locked());
    assert_eq!(pending.advance(1.0), None);
}

#[test]
fn test_pending_transition_cancel() {
    let mut pending = PendingTransition::default();
    pending.begin(TransitionKind::FailFlow, 1.8, WavePhase::Elite);
    assert_eq!(pending.view().unwrap().kind, TransitionKind::FailFlow);
    assert_eq!(pending.cancel(), Some(TransitionKind::FailFlow));
    assert_eq!(pending.cancel(), None);
    assert!(pending.view().is_none());
}

// ---- Building ----

#[test]
fn test_build_requires_player_and_factory() {
    let no_player = EncounterBuilder::<ScriptedPlayer, RecordingFactory>::new(EncounterConfig::default())
        .enemy_factory(RecordingFactory::new())
        .build();
    assert!(matches!(
        no_player.err(),
        Some(BuildError::MissingCollaborator("player"))
    ));

    let no_factory = EncounterBuilder::<ScriptedPlayer, RecordingFactory>::new(EncounterConfig::default())
        .player(ScriptedPlayer::new())
        .build();
    assert!(matches!(
        no_factory.err(),
        Some(BuildError::MissingCollaborator("enemy factory"))
    ));
}

#[test]
fn test_build_rejects_empty_boss_pool() {
    let mut config = EncounterConfig::default();
    config.elite.boss_pool.clear();
    let result = EncounterBuilder::new(config)
        .player(ScriptedPlayer::new())
        .enemy_factory(RecordingFactory::new())
        .build();
    assert!(matches!(
        result.err(),
        Some(BuildError::Config(ConfigError::EmptyBossPool))
    ));
}

#[test]
fn test_build_starts_wave_one() {
    let mut config = EncounterConfig::default();
    config.player_spawn_point = Vec2::new(-4.0, 1.0);
    let mut encounter = build(config, ScriptedPlayer::new());
    let snap = encounter.tick(DT);

    assert_eq!(snap.phase, WavePhase::Combat);
    assert_eq!(snap.wave.level, 1);
    assert_eq!(snap.wave.target_kills, 8);
    assert_eq!(snap.wave.spawn_limit, 8);
    assert!(snap.spawner.enabled);
    assert_eq!(snap.spawner.population_cap, 50);
    assert!(snap.events.contains(&EncounterEvent::WaveStarted {
        wave: 1,
        target_kills: 8
    }));
    assert_eq!(encounter.player().position, Vec2::new(-4.0, 1.0));
    assert_eq!(encounter.player().heals, 1);
}

// ---- Determinism ----

#[test]
fn test_determinism_same_seed() {
    let mut a = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new().with_upgrade_points(1)));
    let mut b = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new().with_upgrade_points(1)));

    for _ in 0..3000 {
        a.autopilot();
        b.autopilot();
        let json_a = serde_json::to_string(&a.step()).unwrap();
        let json_b = serde_json::to_string(&b.step()).unwrap();
        assert_eq!(json_a, json_b, "snapshots diverged with same seed");
    }
}

#[test]
fn test_determinism_different_seeds() {
    let mut config_b = EncounterConfig::default();
    config_b.seed = 4242;
    let mut a = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));
    let mut b = Harness::new(build(config_b, ScriptedPlayer::new()));

    let mut diverged = false;
    for _ in 0..600 {
        let json_a = serde_json::to_string(&a.step()).unwrap();
        let json_b = serde_json::to_string(&b.step()).unwrap();
        if json_a != json_b {
            diverged = true;
            break;
        }
    }
    assert!(diverged, "different seeds should place spawns differently");
}

// ---- Combat ----

#[test]
fn test_spawned_enemies_carry_wave_stats() {
    let mut h = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));
    h.run_until(2000, false, |s| s.wave.spawned_this_wave >= 1);
    let (_, order) = &h.encounter.factory().spawned[0];
    assert_ne!(order.variant, EnemyVariant::Boss);
    assert!(order.archetype.is_none());
    assert!(order.position.distance(Vec2::ZERO) >= 3.0);
}

#[test]
fn test_quota_reached_transitions_once() {
    let mut h = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));

    // Let the whole quota spawn without killing anything.
    h.run_until(3000, false, |s| {
        s.wave.spawned_this_wave == 8 && s.spawner.telegraphs_in_flight == 0
    });
    let handles: Vec<EnemyHandle> = h.encounter.factory().spawned.iter().map(|(h, _)| *h).collect();
    assert_eq!(handles.len(), 8);

    h.encounter
        .queue_commands(handles[..7].iter().map(|&handle| killed(handle, 1)));
    let snap = h.step();
    assert_eq!(snap.wave.current_kills, 7);
    assert_eq!(snap.phase, WavePhase::Combat);
    assert!(snap.transition.is_none());

    // Ten reports arrive while one kill short.
    h.encounter.queue_command(killed(handles[7], 1));
    h.encounter
        .queue_commands((0..9).map(|i| killed(EnemyHandle(10_000 + i), 1)));
    let snap = h.step();
    assert_eq!(snap.wave.current_kills, 8);
    assert_eq!(snap.transition.map(|t| t.kind), Some(TransitionKind::PreElite));

    for i in 0..200 {
        h.encounter.queue_command(killed(EnemyHandle(20_000 + i), 1));
        h.step();
    }
    assert_eq!(
        h.count(|e| *e == EncounterEvent::PhaseChanged { phase: WavePhase::Elite }),
        1
    );
    assert_eq!(
        h.count(|e| matches!(e, EncounterEvent::EliteStarted { .. })),
        1
    );
}

#[test]
fn test_kills_past_target_still_pay_gold() {
    let mut h = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));
    h.encounter
        .queue_commands((0..12).map(|i| killed(EnemyHandle(900 + i), 10)));
    let snap = h.step();
    assert_eq!(snap.wave.current_kills, 8);
    assert_eq!(snap.rewards.gold, 120);
    // Quota not spawned yet, so no transition.
    assert!(snap.transition.is_none());
}

#[test]
fn test_xp_is_banked() {
    let mut h = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));
    h.encounter.queue_commands([
        EncounterCommand::XpCollected { amount: 4 },
        EncounterCommand::XpCollected { amount: -3 },
        EncounterCommand::XpCollected { amount: 2 },
    ]);
    let snap = h.step();
    assert_eq!(snap.rewards.xp, 6);
    assert_eq!(h.encounter.player().xp, 0);
}

#[test]
fn test_direct_rewards_bypass_ledger() {
    let mut config = EncounterConfig::default();
    config.rewards.use_pending_rewards = false;
    let mut h = Harness::new(build(config, ScriptedPlayer::new()));
    h.encounter.queue_commands([
        killed(EnemyHandle(77), 10),
        EncounterCommand::XpCollected { amount: 5 },
    ]);
    let snap = h.step();
    assert_eq!(snap.rewards.gold, 0);
    assert_eq!(snap.rewards.xp, 0);
    assert_eq!(h.encounter.player().gold, 10);
    assert_eq!(h.encounter.player().xp, 5);
}

// ---- Elite phase ----

#[test]
fn test_elite_start_clears_field_and_places_boss() {
    let mut config = EncounterConfig::default();
    config.elite.player_center = Vec2::new(2.0, 1.0);
    let mut h = Harness::new(build(config, ScriptedPlayer::new()));

    h.run_until(3000, false, |s| {
        s.wave.spawned_this_wave == 8 && s.spawner.telegraphs_in_flight == 0
    });
    let ordinary: Vec<EnemyHandle> = h.encounter.factory().spawned.iter().map(|(h, _)| *h).collect();
    h.encounter
        .queue_commands((0..8).map(|i| killed(EnemyHandle(500 + i), 0)));
    let snap = h.run_until(200, false, |s| s.phase == WavePhase::Elite);

    assert!(!snap.spawner.enabled);
    assert_eq!(snap.spawner.population, 0);
    for handle in &ordinary {
        assert!(h.encounter.factory().despawned.contains(handle));
    }
    assert_eq!(h.encounter.player().position, Vec2::new(2.0, 1.0));
    assert!(h.count(|e| *e == EncounterEvent::ClearFieldRequested) >= 1);

    let elite = snap.elite.unwrap();
    assert!(elite.is_alive);
    assert_eq!(elite.slot.boss_index, 0);
    assert_eq!(elite.slot.cycle_index, 0);

    let snap = h.run_until(120, false, |s| s.elite.and_then(|e| e.handle).is_some());
    let boss = snap.elite.unwrap().handle.unwrap();
    assert!(snap
        .events
        .contains(&EncounterEvent::FinalEnemySpawned { handle: boss }));
    let order = h.encounter.factory().order(boss).unwrap();
    assert_eq!(order.variant, EnemyVariant::Boss);
    assert_eq!(order.archetype.as_deref(), Some("Chaser"));
    assert_eq!(order.stats, StatMultipliers::IDENTITY);
    // Six units along +y from the arena center, jittered sideways.
    assert!((order.position.y - 7.0).abs() < 1e-4);
    assert!((order.position.x - 2.0).abs() <= 1.2 + 1e-4);
}

#[test]
fn test_zero_boss_direction_falls_back_to_up() {
    let mut config = EncounterConfig::default();
    config.elite.boss_spawn_direction = Vec2::ZERO;
    let mut h = Harness::new(build(config, ScriptedPlayer::new()));

    let snap = h.run_until(5000, true, |s| s.elite.and_then(|e| e.handle).is_some());
    let boss = snap.elite.unwrap().handle.unwrap();
    let order = h.encounter.factory().order(boss).unwrap();
    assert!((order.position.y - 6.0).abs() < 1e-4, "boss at {}", order.position);
    assert!(order.position.x.abs() <= 1.2 + 1e-4);
    assert_eq!(
        h.count(|e| matches!(e, EncounterEvent::TelegraphMoved { .. })),
        0
    );
}

#[test]
fn test_elite_timer_starts_full() {
    let mut h = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));
    let snap = h.run_until(5000, true, |s| s.phase == WavePhase::Elite);
    assert_eq!(snap.elite.unwrap().time_remaining, 20.0);

    let snap = h.step();
    assert!((snap.elite.unwrap().time_remaining - (20.0 - DT)).abs() < 1e-5);
}

#[test]
fn test_stray_kills_do_not_clear_elite() {
    let mut h = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));
    h.run_until(5000, true, |s| s.elite.and_then(|e| e.handle).is_some());

    h.encounter.queue_command(killed(EnemyHandle(123_456), 0));
    let snap = h.step();
    assert!(snap.elite.unwrap().is_alive);
    assert_eq!(snap.phase, WavePhase::Elite);
}

#[test]
fn test_elite_timeout_commits_failure_ratio() {
    let mut h = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));
    // 100 pending gold banked during combat.
    h.encounter.queue_command(killed(EnemyHandle(999), 100));
    let snap = h.step();
    assert_eq!(snap.rewards.gold, 100);

    h.run_until(5000, true, |s| s.phase == WavePhase::Elite);
    // Never kill the boss.
    let snap = h.run_until(2000, false, |s| {
        s.events
            .iter()
            .any(|e| matches!(e, EncounterEvent::FailureAnnounced { .. }))
    });
    assert!(snap.events.contains(&EncounterEvent::FailureAnnounced {
        cause: FailureCause::EliteTimeout,
        lost_ratio: 0.5
    }));
    assert!(snap.events.contains(&EncounterEvent::RewardsCommitted {
        ratio: 0.5,
        gold: 50,
        xp: 0
    }));
    assert!(snap.events.contains(&EncounterEvent::EliteEnded { defeated: false }));
    assert_eq!(snap.rewards.gold, 0);
    assert_eq!(h.encounter.player().gold, 50);
    assert_eq!(snap.transition.map(|t| t.kind), Some(TransitionKind::FailFlow));
    // The boss was removed with the field.
    let boss = h
        .encounter
        .factory()
        .spawned
        .iter()
        .find(|(_, o)| o.variant == EnemyVariant::Boss)
        .map(|(h, _)| *h)
        .unwrap();
    assert!(h.encounter.factory().despawned.contains(&boss));

    // The toast holds the lock, then the shop opens.
    let snap = h.step();
    assert_eq!(snap.phase, WavePhase::Elite);
    let snap = h.run_until(200, false, |s| s.phase == WavePhase::Shop);
    assert!(snap.elite.is_none());

    h.encounter.queue_command(EncounterCommand::ShopContinue);
    let snap = h.step();
    assert_eq!(snap.phase, WavePhase::Combat);
    assert_eq!(snap.wave.level, 2);
    assert_eq!(snap.rewards.gold, 0);
    assert_eq!(h.encounter.player().gold, 50);
}

// ---- Player death ----

#[test]
fn test_death_cancels_pre_elite_delay() {
    let mut h = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));
    h.run_until(5000, true, |s| {
        s.transition.map(|t| t.kind) == Some(TransitionKind::PreElite)
    });

    h.encounter.queue_command(EncounterCommand::PlayerDied);
    let snap = h.step();
    assert_eq!(snap.transition.map(|t| t.kind), Some(TransitionKind::FailFlow));
    assert!(snap.events.contains(&EncounterEvent::FailureAnnounced {
        cause: FailureCause::PlayerDied,
        lost_ratio: 0.5
    }));

    // A second death during the toast is a no-op.
    h.encounter.queue_command(EncounterCommand::PlayerDied);
    h.run_until(300, false, |s| s.phase == WavePhase::Shop);
    assert_eq!(
        h.count(|e| matches!(e, EncounterEvent::FailureAnnounced { .. })),
        1
    );
    assert_eq!(
        h.count(|e| matches!(e, EncounterEvent::EliteStarted { .. })),
        0
    );
}

#[test]
fn test_death_in_combat_clears_field() {
    let mut h = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));
    h.run_until(3000, false, |s| s.spawner.population >= 2);
    h.encounter.queue_command(EncounterCommand::PlayerDied);
    let snap = h.step();
    assert!(!snap.spawner.enabled);
    assert_eq!(snap.spawner.population, 0);
    assert_eq!(snap.spawner.telegraphs_in_flight, 0);
    assert_eq!(h.encounter.factory().alive(), Vec::<EnemyHandle>::new());
}

#[test]
fn test_death_in_shop_is_ignored() {
    let mut h = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));
    h.encounter.queue_command(EncounterCommand::PlayerDied);
    h.run_until(300, false, |s| s.phase == WavePhase::Shop);

    h.encounter.queue_command(EncounterCommand::PlayerDied);
    let snap = h.step();
    assert_eq!(snap.phase, WavePhase::Shop);
    assert!(snap.transition.is_none());
    assert_eq!(
        h.count(|e| matches!(e, EncounterEvent::FailureAnnounced { .. })),
        1
    );
}

#[test]
fn test_death_in_chest_phase_keeps_chest() {
    let (encounter, chest) = build_with_chest(EncounterConfig::default(), ScriptedPlayer::new());
    let log = chest.log();
    let mut h = Harness::new(encounter);
    h.run_until(5000, true, |s| s.elite.and_then(|e| e.handle).is_some());
    assert!(h.kill_boss(Vec2::new(1.0, 5.0)));
    h.run_until(200, false, |s| s.phase == WavePhase::ChestReward);

    h.encounter.queue_command(EncounterCommand::PlayerDied);
    let snap = h.step();
    assert_eq!(snap.phase, WavePhase::ChestReward);
    assert_eq!(snap.transition.map(|t| t.kind), Some(TransitionKind::ChestSpawn));

    h.run_until(100, false, |s| {
        s.events
            .iter()
            .any(|e| matches!(e, EncounterEvent::ChestSpawned { .. }))
    });
    h.encounter.queue_command(EncounterCommand::PlayerDied);
    let snap = h.step();
    assert_eq!(snap.phase, WavePhase::ChestReward);
    assert_eq!(log.borrow().spawned.len(), 1);
    assert_eq!(log.borrow().removed, 0);
    assert_eq!(
        h.count(|e| matches!(e, EncounterEvent::FailureAnnounced { .. })),
        0
    );
    assert_eq!(
        h.count(|e| matches!(e, EncounterEvent::RewardsCommitted { .. })),
        1
    );
}

// ---- Chest, upgrades, shop ----

#[test]
fn test_full_cycle_with_chest_and_upgrades() {
    let (encounter, chest) =
        build_with_chest(EncounterConfig::default(), ScriptedPlayer::new().with_upgrade_points(2));
    let log = chest.log();
    let mut h = Harness::new(encounter);

    // Combat with 5 base gold per kill: 8 kills bank 40.
    for _ in 0..5000 {
        h.kill_ordinary(5);
        if h.step().phase == WavePhase::Elite {
            break;
        }
    }
    assert_eq!(h.encounter.phase(), WavePhase::Elite);
    assert_eq!(h.encounter.ledger().pending_gold(), 40);

    h.run_until(200, false, |s| s.elite.and_then(|e| e.handle).is_some());
    let death = Vec2::new(2.0, 3.0);
    assert!(h.kill_boss(death));
    let snap = h.step();
    assert!(!snap.elite.unwrap().is_alive);
    assert_eq!(snap.transition.map(|t| t.kind), Some(TransitionKind::PreChest));

    let snap = h.run_until(200, false, |s| s.phase == WavePhase::ChestReward);
    assert!(snap.events.contains(&EncounterEvent::RewardsCommitted {
        ratio: 1.0,
        gold: 40,
        xp: 0
    }));
    assert!(snap.events.contains(&EncounterEvent::EliteEnded { defeated: true }));
    assert_eq!(h.encounter.player().gold, 40);

    let snap = h.run_until(100, false, |s| {
        s.events
            .iter()
            .any(|e| matches!(e, EncounterEvent::ChestSpawned { .. }))
    });
    let rarity = log.borrow().spawned[0].1;
    assert_eq!(log.borrow().spawned, vec![(death, rarity)]);
    assert!(snap
        .events
        .contains(&EncounterEvent::ChestSpawned { position: death, rarity }));

    // Sell it.
    h.encounter
        .queue_command(EncounterCommand::ChestResolved { taken: false });
    let snap = h.step();
    let sell = CHEST_SELL_VALUES[rarity.index()];
    assert!(snap
        .events
        .contains(&EncounterEvent::ChestRewardSold { rarity, gold: sell }));
    assert_eq!(h.encounter.player().gold, 40 + sell);
    assert_eq!(log.borrow().removed, 1);
    assert_eq!(snap.phase, WavePhase::Upgrade);
    assert_eq!(snap.remaining_upgrade_picks, 2);
    assert!(snap
        .events
        .iter()
        .any(|e| matches!(e, EncounterEvent::UpgradeOffered { remaining: 2, .. })));

    h.encounter.queue_command(EncounterCommand::UpgradeChosen);
    let snap = h.step();
    assert_eq!(snap.phase, WavePhase::Upgrade);
    assert!(snap
        .events
        .iter()
        .any(|e| matches!(e, EncounterEvent::UpgradeOffered { remaining: 1, .. })));

    h.encounter.queue_command(EncounterCommand::UpgradeChosen);
    let snap = h.step();
    assert_eq!(snap.phase, WavePhase::Shop);
    assert_eq!(h.encounter.player().upgrade_points, 0);

    h.encounter.queue_command(EncounterCommand::ShopContinue);
    let snap = h.step();
    assert_eq!(snap.phase, WavePhase::Combat);
    assert!(snap.events.contains(&EncounterEvent::WaveStarted {
        wave: 2,
        target_kills: 12
    }));
    assert_eq!(snap.wave.current_kills, 0);
    assert_eq!(snap.rewards.gold, 0);
    assert_eq!(h.encounter.player().heals, 2);

    // Only one chest for the whole cycle.
    assert_eq!(
        h.count(|e| matches!(e, EncounterEvent::ChestSpawned { .. })),
        1
    );
}

#[test]
fn test_taking_chest_emits_reward() {
    let (encounter, chest) = build_with_chest(EncounterConfig::default(), ScriptedPlayer::new());
    let log = chest.log();
    let mut h = Harness::new(encounter);
    for _ in 0..8000 {
        h.autopilot();
        h.step();
        if h.encounter.phase() == WavePhase::Shop {
            break;
        }
    }
    assert_eq!(h.encounter.phase(), WavePhase::Shop);

    let rarity = log.borrow().spawned[0].1;
    assert_eq!(
        h.count(|e| *e == EncounterEvent::ChestRewardTaken { rarity }),
        1
    );
    // Eight kills at 3 gold, nothing from the chest itself.
    assert_eq!(h.encounter.player().gold, 24);
}

#[test]
fn test_chest_resolution_outside_chest_phase_ignored() {
    let (encounter, chest) = build_with_chest(EncounterConfig::default(), ScriptedPlayer::new());
    let log = chest.log();
    let mut h = Harness::new(encounter);
    h.encounter
        .queue_command(EncounterCommand::ChestResolved { taken: false });
    let snap = h.step();
    assert_eq!(snap.phase, WavePhase::Combat);
    assert_eq!(h.encounter.player().gold, 0);
    assert_eq!(log.borrow().removed, 0);
}

#[test]
fn test_without_chest_collaborator_skips_to_intermission() {
    let mut h = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));
    for _ in 0..8000 {
        h.autopilot();
        h.step();
        if h.encounter.phase() == WavePhase::Shop {
            break;
        }
    }
    assert_eq!(h.encounter.phase(), WavePhase::Shop);
    assert_eq!(
        h.count(|e| *e == EncounterEvent::PhaseChanged { phase: WavePhase::ChestReward }),
        1
    );
    assert_eq!(
        h.count(|e| matches!(e, EncounterEvent::ChestSpawned { .. })),
        0
    );
    assert!(h
        .events
        .contains(&EncounterEvent::EliteEnded { defeated: true }));
}

#[test]
fn test_autopilot_reaches_wave_three() {
    let mut h = Harness::new(build(EncounterConfig::default(), ScriptedPlayer::new()));
    for _ in 0..20_000 {
        h.autopilot();
        h.step();
        if h.encounter.wave_level() == 3 {
            break;
        }
    }
    assert!(h.events.contains(&EncounterEvent::WaveStarted {
        wave: 3,
        target_kills: 16
    }));

    let bosses: Vec<Option<String>> = h
        .encounter
        .factory()
        .spawned
        .iter()
        .filter(|(_, order)| order.variant == EnemyVariant::Boss)
        .map(|(_, order)| order.archetype.clone())
        .collect();
    assert_eq!(
        bosses,
        vec![Some("Chaser".to_string()), Some("PatrolShooter".to_string())]
    );
}
