//! Luck-weighted rarity table for chest rewards and upgrade cards.

use rand::Rng;

use wavebound_core::constants::{RARITY_BASE_WEIGHTS, RARITY_MAX_LUCK_FACTORS};
use wavebound_core::enums::ChestRarity;

/// Weights for each rarity at `luck` (0..=100). Luck shifts weight from common
/// toward the rarer tiers; out-of-range luck is clamped.
pub fn rarity_weights(luck: f32) -> [f32; 5] {
    let t = if luck.is_nan() { 0.0 } else { (luck / 100.0).clamp(0.0, 1.0) };
    let mut weights = RARITY_BASE_WEIGHTS;
    for (w, max_factor) in weights.iter_mut().zip(RARITY_MAX_LUCK_FACTORS) {
        *w *= lerp(1.0, max_factor, t);
    }
    weights
}

/// Draw one rarity from the luck-weighted table.
pub fn roll_rarity<R: Rng>(luck: f32, rng: &mut R) -> ChestRarity {
    let weights = rarity_weights(luck);
    let total: f32 = weights.iter().sum();
    let mut roll = rng.gen::<f32>() * total;
    for (rarity, weight) in ChestRarity::ALL.into_iter().zip(weights) {
        roll -= weight;
        if roll < 0.0 {
            return rarity;
        }
    }
    ChestRarity::Legendary
}

/// Three independent rolls, one per upgrade card.
pub fn roll_card_rarities<R: Rng>(luck: f32, rng: &mut R) -> [ChestRarity; 3] {
    [
        roll_rarity(luck, rng),
        roll_rarity(luck, rng),
        roll_rarity(luck, rng),
    ]
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
