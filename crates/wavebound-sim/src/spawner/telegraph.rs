//! Telegraph countdowns: the warning window before an enemy materializes.

use glam::Vec2;
use hecs::{Entity, World};
use rand::Rng;

use wavebound_core::enums::EnemyVariant;
use wavebound_core::events::EncounterEvent;
use wavebound_core::types::{AreaBounds, EnemyHandle};

use crate::collaborators::SpawnOrder;
use crate::spawner::sampling::sample_spawn_point;

/// Spawn marker counting down to materialization.
#[derive(Debug, Clone)]
pub struct Telegraph {
    pub order: SpawnOrder,
    pub remaining: f32,
}

/// An enemy the scheduler spawned and still counts toward the population.
#[derive(Debug, Clone, Copy)]
pub struct LiveEnemy {
    pub handle: EnemyHandle,
    pub variant: EnemyVariant,
}

/// Distances and budgets that govern a countdown.
#[derive(Debug, Clone, Copy)]
pub struct CountdownRules {
    /// The player coming this close aborts (or moves) the spawn.
    pub cancel_distance: f32,
    /// Minimum player distance for a re-sampled unique spawn point.
    pub resample_distance: f32,
    pub max_attempts: u32,
}

/// Count every telegraph down by `dt` and check the player's proximity.
///
/// Ordinary spawns the player walks onto are removed. Unique spawns are never
/// abandoned: their point is re-sampled and the countdown continues. A unique
/// spawn that completes while crowded and cannot be moved waits at zero and
/// tries again next tick. Returns the telegraphs that are ready to materialize.
pub fn advance<R: Rng>(
    world: &mut World,
    dt: f32,
    player: Vec2,
    area: &AreaBounds,
    rules: CountdownRules,
    rng: &mut R,
    events: &mut Vec<EncounterEvent>,
) -> Vec<Entity> {
    let mut ready = Vec::new();
    let mut cancelled = Vec::new();
    let cancel_sq = rules.cancel_distance * rules.cancel_distance;

    for (entity, telegraph) in world.query_mut::<&mut Telegraph>() {
        telegraph.remaining = (telegraph.remaining - dt).max(0.0);
        let crowded = telegraph.order.position.distance_squared(player) < cancel_sq;

        if !crowded {
            if telegraph.remaining <= 0.0 {
                ready.push(entity);
            }
            continue;
        }

        if !telegraph.order.variant.is_unique() {
            log::debug!(
                "telegraph at {} cancelled: player within {:.2}",
                telegraph.order.position,
                rules.cancel_distance
            );
            events.push(EncounterEvent::TelegraphCancelled {
                position: telegraph.order.position,
            });
            cancelled.push(entity);
            continue;
        }

        match sample_spawn_point(area, player, rules.resample_distance, rules.max_attempts, rng) {
            Some(moved) => {
                log::debug!(
                    "{:?} telegraph moved from {} to {}",
                    telegraph.order.variant,
                    telegraph.order.position,
                    moved
                );
                events.push(EncounterEvent::TelegraphMoved {
                    from: telegraph.order.position,
                    to: moved,
                });
                telegraph.order.position = moved;
                if telegraph.remaining <= 0.0 {
                    ready.push(entity);
                }
            }
            None => {
                log::debug!(
                    "{:?} telegraph crowded and no alternative point found; holding",
                    telegraph.order.variant
                );
            }
        }
    }

    for entity in cancelled {
        let _ = world.despawn(entity);
    }
    ready
}
