//! Encounter runtime for WAVEBOUND.
//!
//! Owns the wave state machine, the spawn scheduler and its hecs field
//! registry, and produces `EncounterSnapshot`s for presentation. Completely
//! headless: collaborators are injected as traits, enabling deterministic
//! testing.

pub mod collaborators;
pub mod encounter;
pub mod spawner;
pub mod testing;
pub mod transition;

pub use encounter::{BuildError, Encounter, EncounterBuilder};
pub use spawner::SpawnScheduler;
pub use wavebound_core as core;

#[cfg(test)]
mod tests;
