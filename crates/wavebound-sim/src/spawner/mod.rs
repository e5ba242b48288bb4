//! Spawn scheduler.
//!
//! Paces ordinary spawns with an interval accumulator, places them with
//! rejection sampling, and runs every spawn through a telegraph countdown
//! before asking the [`EnemyFactory`] for an instance. Telegraphs and live
//! enemies are tracked as entities in a private hecs `World`.

pub mod sampling;
pub mod telegraph;

use glam::Vec2;
use hecs::World;
use rand::Rng;

use wavebound_balance::ScalingModel;
use wavebound_core::config::SpawnTuning;
use wavebound_core::enums::EnemyVariant;
use wavebound_core::events::EncounterEvent;
use wavebound_core::state::SpawnerView;
use wavebound_core::types::{AreaBounds, EnemyHandle};

use crate::collaborators::{EnemyFactory, SpawnOrder};
use sampling::sample_spawn_point;
use telegraph::{CountdownRules, LiveEnemy, Telegraph};

/// Placement settings that stay fixed for the whole encounter.
#[derive(Debug, Clone, Copy)]
pub struct SpawnSettings {
    pub min_distance: f32,
    pub cancel_distance: f32,
    pub telegraph_delay: f32,
    pub max_sample_attempts: u32,
    pub interval_floor: f32,
}

impl From<&SpawnTuning> for SpawnSettings {
    fn from(tuning: &SpawnTuning) -> Self {
        Self {
            min_distance: tuning.min_distance_from_player,
            cancel_distance: tuning.cancel_distance,
            telegraph_delay: tuning.telegraph_delay,
            max_sample_attempts: tuning.max_sample_attempts,
            interval_floor: tuning.interval_floor,
        }
    }
}

/// A telegraph that finished and produced an enemy this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnCompleted {
    pub handle: EnemyHandle,
    pub variant: EnemyVariant,
    pub position: Vec2,
}

pub struct SpawnScheduler {
    settings: SpawnSettings,
    scaling: ScalingModel,
    wave: u32,
    cycle: u32,
    interval_secs: f32,
    population_cap: u32,
    spawn_quota: u32,
    spawned_this_wave: u32,
    enabled: bool,
    accumulator: f32,
    field: World,
}

impl SpawnScheduler {
    /// A disabled scheduler with no quota. Call [`configure`](Self::configure)
    /// and [`enable`](Self::enable) when a wave starts.
    pub fn new(settings: SpawnSettings, scaling: ScalingModel) -> Self {
        Self {
            interval_secs: settings.interval_floor,
            settings,
            scaling,
            wave: 1,
            cycle: 0,
            population_cap: 0,
            spawn_quota: 0,
            spawned_this_wave: 0,
            enabled: false,
            accumulator: 0.0,
            field: World::new(),
        }
    }

    /// Set the wave-scaled limits. The interval never drops below the floor.
    pub fn configure(&mut self, interval_secs: f32, population_cap: u32, spawn_quota: u32) {
        self.interval_secs = interval_secs.max(self.settings.interval_floor);
        self.population_cap = population_cap;
        self.spawn_quota = spawn_quota;
    }

    /// Switch variant tables to `wave` and reset the per-wave counters.
    pub fn set_wave(&mut self, wave: u32, cycle: u32) {
        self.wave = wave;
        self.cycle = cycle;
        self.spawned_this_wave = 0;
        self.accumulator = 0.0;
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stop periodic spawning and cancel every telegraph in flight, including
    /// unique ones. Nothing queued before this call will materialize.
    pub fn disable(&mut self, events: &mut Vec<EncounterEvent>) {
        self.enabled = false;
        self.accumulator = 0.0;

        let in_flight: Vec<(hecs::Entity, Vec2)> = self
            .field
            .query::<&Telegraph>()
            .iter()
            .map(|(entity, t)| (entity, t.order.position))
            .collect();
        if !in_flight.is_empty() {
            log::debug!("spawner disabled; cancelling {} telegraphs", in_flight.len());
        }
        for (entity, position) in in_flight {
            let _ = self.field.despawn(entity);
            events.push(EncounterEvent::TelegraphCancelled { position });
        }
    }

    /// Start a telegraph for a one-off spawn, regardless of the enabled flag.
    pub fn try_spawn_at(&mut self, order: SpawnOrder, events: &mut Vec<EncounterEvent>) {
        self.start_telegraph(order, events);
    }

    /// Advance telegraphs, materialize the finished ones, then run periodic
    /// spawning if enabled.
    pub fn tick<R: Rng>(
        &mut self,
        dt: f32,
        player: Vec2,
        area: &AreaBounds,
        rng: &mut R,
        factory: &mut dyn EnemyFactory,
        events: &mut Vec<EncounterEvent>,
    ) -> Vec<SpawnCompleted> {
        let rules = CountdownRules {
            cancel_distance: self.settings.cancel_distance,
            resample_distance: self.settings.min_distance.max(self.settings.cancel_distance),
            max_attempts: self.settings.max_sample_attempts,
        };
        let ready = telegraph::advance(&mut self.field, dt, player, area, rules, rng, events);

        let mut completed = Vec::with_capacity(ready.len());
        for entity in ready {
            let Ok(telegraph) = self.field.remove_one::<Telegraph>(entity) else {
                continue;
            };
            let _ = self.field.despawn(entity);
            completed.push(self.materialize(telegraph.order, factory, events));
        }

        if self.enabled {
            self.run_periodic(dt, player, area, rng, events);
        }

        debug_assert!(self.spawned_this_wave <= self.spawn_quota, "spawn quota exceeded");
        completed
    }

    /// Forget a live enemy that left the field (killed or despawned elsewhere).
    /// Returns its variant, or `None` for handles this scheduler never spawned.
    pub fn on_enemy_removed(&mut self, handle: EnemyHandle) -> Option<EnemyVariant> {
        let found = self
            .field
            .query::<&LiveEnemy>()
            .iter()
            .find(|(_, live)| live.handle == handle)
            .map(|(entity, live)| (entity, live.variant));
        let (entity, variant) = found?;
        let _ = self.field.despawn(entity);
        Some(variant)
    }

    /// Despawn every live enemy through the factory.
    pub fn clear_live_enemies(&mut self, factory: &mut dyn EnemyFactory) {
        let live: Vec<(hecs::Entity, EnemyHandle)> = self
            .field
            .query::<&LiveEnemy>()
            .iter()
            .map(|(entity, live)| (entity, live.handle))
            .collect();
        if !live.is_empty() {
            log::debug!("clearing {} live enemies", live.len());
        }
        for (entity, handle) in live {
            factory.despawn_enemy(handle);
            let _ = self.field.despawn(entity);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Live enemies currently on the field.
    pub fn population(&self) -> u32 {
        self.field.query::<&LiveEnemy>().iter().count() as u32
    }

    pub fn telegraphs_in_flight(&self) -> u32 {
        self.field.query::<&Telegraph>().iter().count() as u32
    }

    pub fn spawned_this_wave(&self) -> u32 {
        self.spawned_this_wave
    }

    pub fn spawn_quota(&self) -> u32 {
        self.spawn_quota
    }

    pub fn quota_exhausted(&self) -> bool {
        self.spawned_this_wave >= self.spawn_quota
    }

    pub fn view(&self) -> SpawnerView {
        SpawnerView {
            enabled: self.enabled,
            population: self.population(),
            population_cap: self.population_cap,
            telegraphs_in_flight: self.telegraphs_in_flight(),
            interval_secs: self.interval_secs,
        }
    }

    /// Ordinary telegraphs already hold a slot against the cap and the quota.
    fn ordinary_in_flight(&self) -> u32 {
        self.field
            .query::<&Telegraph>()
            .iter()
            .filter(|(_, t)| !t.order.variant.is_unique())
            .count() as u32
    }

    fn run_periodic<R: Rng>(
        &mut self,
        dt: f32,
        player: Vec2,
        area: &AreaBounds,
        rng: &mut R,
        events: &mut Vec<EncounterEvent>,
    ) {
        self.accumulator = (self.accumulator + dt).min(self.interval_secs);
        if self.accumulator < self.interval_secs {
            return;
        }

        let reserved = self.ordinary_in_flight();
        if self.population() + reserved >= self.population_cap {
            return;
        }
        if self.spawned_this_wave + reserved >= self.spawn_quota {
            return;
        }

        let Some(position) = sample_spawn_point(
            area,
            player,
            self.settings.min_distance,
            self.settings.max_sample_attempts,
            rng,
        ) else {
            log::debug!(
                "no spawn point after {} attempts; retrying next tick",
                self.settings.max_sample_attempts
            );
            return;
        };

        self.accumulator = 0.0;
        let variant = self.scaling.roll_variant(self.wave, rng);
        let stats = self.scaling.variant_stat_multipliers(self.wave, variant, self.cycle);
        self.start_telegraph(
            SpawnOrder {
                position,
                variant,
                stats,
                archetype: None,
            },
            events,
        );
    }

    fn start_telegraph(&mut self, order: SpawnOrder, events: &mut Vec<EncounterEvent>) {
        let delay = self.settings.telegraph_delay;
        log::debug!("telegraph started: {:?} at {}", order.variant, order.position);
        events.push(EncounterEvent::TelegraphStarted {
            position: order.position,
            variant: order.variant,
            delay,
        });
        self.field.spawn((Telegraph {
            order,
            remaining: delay,
        },));
    }

    fn materialize(
        &mut self,
        order: SpawnOrder,
        factory: &mut dyn EnemyFactory,
        events: &mut Vec<EncounterEvent>,
    ) -> SpawnCompleted {
        let handle = factory.spawn_enemy(&order);
        if !order.variant.is_unique() {
            self.spawned_this_wave += 1;
        }
        self.field.spawn((LiveEnemy {
            handle,
            variant: order.variant,
        },));
        debug_assert!(
            order.variant.is_unique() || self.population() <= self.population_cap,
            "population cap exceeded"
        );

        events.push(EncounterEvent::EnemySpawned {
            handle,
            position: order.position,
            variant: order.variant,
            stats: order.stats,
        });
        SpawnCompleted {
            handle,
            variant: order.variant,
            position: order.position,
        }
    }
}
