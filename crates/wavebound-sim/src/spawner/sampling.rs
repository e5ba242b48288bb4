//! Rejection sampling of spawn points.

use glam::Vec2;
use rand::Rng;

use wavebound_core::types::AreaBounds;

/// Draw uniform points in the area's bounding box until one lies inside the
/// area and at least `min_distance` from the player, or the budget runs out.
///
/// Running out is not an error: the caller skips this attempt and retries
/// on a later tick.
pub fn sample_spawn_point<R: Rng>(
    area: &AreaBounds,
    player: Vec2,
    min_distance: f32,
    max_attempts: u32,
    rng: &mut R,
) -> Option<Vec2> {
    let (min, max) = area.bounding_box();
    if !(min.x < max.x && min.y < max.y) {
        return None;
    }
    let min_distance_sq = min_distance * min_distance;

    for _ in 0..max_attempts {
        let candidate = Vec2::new(rng.gen_range(min.x..max.x), rng.gen_range(min.y..max.y));
        if !area.contains(candidate) {
            continue;
        }
        if candidate.distance_squared(player) < min_distance_sq {
            continue;
        }
        return Some(candidate);
    }
    None
}
