//! Core types and definitions for the WAVEBOUND encounter loop.
//!
//! This crate defines the vocabulary shared across all other crates:
//! geometry, commands, events, snapshots, configuration and constants.
//! It has no dependency on any runtime or presentation framework.

pub mod commands;
pub mod config;
pub mod constants;
pub mod enums;
pub mod events;
pub mod state;
pub mod types;
