//! Pending-reward ledger.
//!
//! Gold and XP earned during Combat/Elite are banked here and only realized at
//! a commit point: fully on a successful chest, partially on failure. A commit
//! always empties the ledger, so nothing carries into the next wave.

/// Rewards released by a commit, to be granted to the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Payout {
    pub gold: u32,
    pub xp: u32,
}

impl Payout {
    pub fn is_empty(&self) -> bool {
        self.gold == 0 && self.xp == 0
    }
}

/// Uncommitted gold and XP for the current wave cycle.
#[derive(Debug, Clone, Default)]
pub struct RewardLedger {
    gold: u32,
    xp: u32,
}

impl RewardLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bank `amount` gold. Zero and negative amounts are ignored.
    pub fn accrue_gold(&mut self, amount: i32) {
        if amount <= 0 {
            return;
        }
        self.gold = self.gold.saturating_add(amount as u32);
    }

    /// Bank `amount` XP. Zero and negative amounts are ignored.
    pub fn accrue_xp(&mut self, amount: i32) {
        if amount <= 0 {
            return;
        }
        self.xp = self.xp.saturating_add(amount as u32);
    }

    /// Release `round(pending * ratio)` of each resource and zero the ledger.
    ///
    /// `ratio` is clamped to `[0, 1]`; NaN counts as 0. The forfeited remainder
    /// is discarded even when the ratio is 0.
    pub fn commit(&mut self, ratio: f32) -> Payout {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        let payout = Payout {
            gold: scale(self.gold, ratio),
            xp: scale(self.xp, ratio),
        };
        self.clear();
        payout
    }

    /// Drop everything pending without paying out.
    pub fn clear(&mut self) {
        self.gold = 0;
        self.xp = 0;
    }

    pub fn pending_gold(&self) -> u32 {
        self.gold
    }

    pub fn pending_xp(&self) -> u32 {
        self.xp
    }

    pub fn is_empty(&self) -> bool {
        self.gold == 0 && self.xp == 0
    }
}

fn scale(amount: u32, ratio: f32) -> u32 {
    (f64::from(amount) * f64::from(ratio)).round() as u32
}
