//! Hint unlock ladder for one level session.
//!
//! The tier never decreases within a session, is idempotent at the ceiling,
//! and the ceiling is content-defined: a level with one authored hint caps
//! at tier 1 no matter how many attempts fail.

/// Hard cap on authored hint tiers.
pub const MAX_TIERS: usize = 3;

/// Outcome of an explicit hint request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintUnlock {
    /// A new tier was unlocked (1-based).
    Unlocked(usize),
    /// Every authored hint is already visible.
    AllUnlocked,
    /// The level has no authored hints at all.
    NoneAuthored,
}

/// Tier counter scoped to one level-attempt session. Not persisted.
#[derive(Debug, Clone)]
pub struct HintLadder {
    tier: usize,
    ceiling: usize,
}

impl HintLadder {
    /// `authored` is the number of hint texts the level ships (0-3).
    pub fn new(authored: usize) -> Self {
        Self {
            tier: 0,
            ceiling: authored.min(MAX_TIERS),
        }
    }

    /// Currently unlocked tier, 0 meaning "no hint shown yet".
    pub fn tier(&self) -> usize {
        self.tier
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Explicit player request: unlock the next tier if one exists.
    pub fn request(&mut self) -> HintUnlock {
        if self.ceiling == 0 {
            return HintUnlock::NoneAuthored;
        }
        if self.tier >= self.ceiling {
            return HintUnlock::AllUnlocked;
        }
        self.tier += 1;
        HintUnlock::Unlocked(self.tier)
    }

    /// A failed validation attempt implicitly unlocks the next hint,
    /// whether or not the player asked.
    pub fn on_failure(&mut self) {
        self.tier = (self.tier + 1).min(self.ceiling);
    }

    /// Back to zero at the start of a new level session.
    pub fn reset(&mut self) {
        self.tier = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_walks_tiers_in_order() {
        let mut ladder = HintLadder::new(3);
        assert_eq!(ladder.request(), HintUnlock::Unlocked(1));
        assert_eq!(ladder.request(), HintUnlock::Unlocked(2));
        assert_eq!(ladder.request(), HintUnlock::Unlocked(3));
        assert_eq!(ladder.request(), HintUnlock::AllUnlocked);
        assert_eq!(ladder.tier(), 3);
    }

    #[test]
    fn test_failures_never_exceed_authored_count() {
        let mut ladder = HintLadder::new(1);
        for _ in 0..10 {
            ladder.on_failure();
        }
        assert_eq!(ladder.tier(), 1);
    }

    #[test]
    fn test_tier_is_non_decreasing_under_any_mix() {
        let mut ladder = HintLadder::new(2);
        let mut last = 0;
        ladder.on_failure();
        assert!(ladder.tier() >= last);
        last = ladder.tier();
        let _ = ladder.request();
        assert!(ladder.tier() >= last);
        last = ladder.tier();
        ladder.on_failure();
        assert!(ladder.tier() >= last);
        assert_eq!(ladder.tier(), 2);
    }

    #[test]
    fn test_no_authored_hints() {
        let mut ladder = HintLadder::new(0);
        assert_eq!(ladder.request(), HintUnlock::NoneAuthored);
        ladder.on_failure();
        assert_eq!(ladder.tier(), 0);
    }

    #[test]
    fn test_ceiling_clamped_to_three() {
        let ladder = HintLadder::new(7);
        assert_eq!(ladder.ceiling(), 3);
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let mut ladder = HintLadder::new(3);
        ladder.on_failure();
        ladder.on_failure();
        ladder.reset();
        assert_eq!(ladder.tier(), 0);
        assert_eq!(ladder.request(), HintUnlock::Unlocked(1));
    }
}
