//! Delayed phase transitions as resumable countdown state.
//!
//! A pending transition doubles as the re-entrancy lock: while one is
//! waiting, the conditions that would start another are not re-evaluated.

use wavebound_core::enums::{TransitionKind, WavePhase};
use wavebound_core::state::TransitionView;

/// `None | WaitingFor(kind, remaining)`, consumed by the encounter tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum PendingTransition {
    #[default]
    None,
    WaitingFor {
        kind: TransitionKind,
        remaining: f32,
        /// Phase the transition was started from; completion is aborted if it changed.
        origin: WavePhase,
    },
}

/// A countdown that reached zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedTransition {
    pub kind: TransitionKind,
    pub origin: WavePhase,
}

impl PendingTransition {
    pub fn is_locked(&self) -> bool {
        matches!(self, PendingTransition::WaitingFor { .. })
    }

    pub fn kind(&self) -> Option<TransitionKind> {
        match self {
            PendingTransition::None => None,
            PendingTransition::WaitingFor { kind, .. } => Some(*kind),
        }
    }

    /// Start a countdown. Returns false (and changes nothing) if one is already waiting.
    pub fn begin(&mut self, kind: TransitionKind, delay: f32, origin: WavePhase) -> bool {
        if self.is_locked() {
            return false;
        }
        *self = PendingTransition::WaitingFor {
            kind,
            remaining: delay.max(0.0),
            origin,
        };
        true
    }

    /// Drop the waiting transition, if any, and release the lock.
    pub fn cancel(&mut self) -> Option<TransitionKind> {
        let kind = self.kind();
        *self = PendingTransition::None;
        kind
    }

    /// Count down by `dt`. On completion the lock is released and the
    /// transition is returned for the caller to carry out.
    pub fn advance(&mut self, dt: f32) -> Option<CompletedTransition> {
        let PendingTransition::WaitingFor {
            kind,
            remaining,
            origin,
        } = self
        else {
            return None;
        };
        *remaining -= dt;
        if *remaining > 0.0 {
            return None;
        }
        let done = CompletedTransition {
            kind: *kind,
            origin: *origin,
        };
        *self = PendingTransition::None;
        Some(done)
    }

    pub fn view(&self) -> Option<TransitionView> {
        match self {
            PendingTransition::None => None,
            PendingTransition::WaitingFor {
                kind, remaining, ..
            } => Some(TransitionView {
                kind: *kind,
                remaining_secs: remaining.max(0.0),
            }),
        }
    }
}
