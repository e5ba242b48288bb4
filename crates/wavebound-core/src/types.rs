//! Fundamental geometric and simulation types.

use serde::{Deserialize, Serialize};

pub use glam::Vec2;

/// Opaque handle to an enemy instance, minted by the instantiation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyHandle(pub u64);

/// Multipliers applied to an enemy archetype's base stats at instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatMultipliers {
    pub hp: f32,
    pub damage: f32,
    pub speed: f32,
}

impl Default for StatMultipliers {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl StatMultipliers {
    pub const IDENTITY: Self = Self {
        hp: 1.0,
        damage: 1.0,
        speed: 1.0,
    };
}

/// Where in the boss rotation a wave falls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossSlot {
    /// Index into the boss pool.
    pub boss_index: usize,
    /// Number of full passes through the pool before this wave.
    pub cycle_index: u32,
}

/// Playable area enemies may spawn in.
///
/// Polygons may be concave; containment uses the even-odd rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AreaBounds {
    Rect { min: Vec2, max: Vec2 },
    Polygon { vertices: Vec<Vec2> },
}

impl Default for AreaBounds {
    fn default() -> Self {
        AreaBounds::Rect {
            min: Vec2::new(-12.0, -8.0),
            max: Vec2::new(12.0, 8.0),
        }
    }
}

impl AreaBounds {
    /// Axis-aligned box enclosing the area, as (min, max).
    pub fn bounding_box(&self) -> (Vec2, Vec2) {
        match self {
            AreaBounds::Rect { min, max } => (*min, *max),
            AreaBounds::Polygon { vertices } => {
                let mut min = Vec2::splat(f32::INFINITY);
                let mut max = Vec2::splat(f32::NEG_INFINITY);
                for v in vertices {
                    min = min.min(*v);
                    max = max.max(*v);
                }
                (min, max)
            }
        }
    }

    /// Whether `point` lies inside the area.
    pub fn contains(&self, point: Vec2) -> bool {
        match self {
            AreaBounds::Rect { min, max } => {
                point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
            }
            AreaBounds::Polygon { vertices } => polygon_contains(vertices, point),
        }
    }
}

/// Even-odd ray cast. Works for concave, non-self-intersecting polygons.
fn polygon_contains(vertices: &[Vec2], point: Vec2) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let a = vertices[i];
        let b = vertices[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Encounter clock. Unlike a fixed-rate sim, ticks carry a caller-supplied dt.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EncounterTime {
    /// Current tick number (increments by 1 each tick).
    pub tick: u64,
    /// Elapsed encounter time in seconds.
    pub elapsed_secs: f64,
}

impl EncounterTime {
    /// Advance by one tick of `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.tick += 1;
        self.elapsed_secs += f64::from(dt);
    }
}
