//! Balance math for WAVEBOUND.
//!
//! Pure difficulty scaling, boss rotation, variant and rarity tables,
//! and the pending-reward ledger. No ECS or runtime dependency.

pub mod ledger;
pub mod rarity;
pub mod scaling;

pub use ledger::RewardLedger;
pub use scaling::ScalingModel;
pub use wavebound_core as core;
