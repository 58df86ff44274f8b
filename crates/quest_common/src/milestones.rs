//! Campaign milestones keyed on completed-level count.
//!
//! Stateless by design: a milestone fires when the completed count crosses
//! its threshold, detected by comparing the counts before and after a
//! completion. Nothing is recorded, so the ledger stays correct even when
//! the progress file was produced or edited out of band.

use serde::Serialize;

/// Total number of levels in the campaign.
pub const TOTAL_LEVELS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub id: &'static str,
    pub threshold: usize,
    pub title: &'static str,
}

/// Fixed ascending milestone table.
pub const MILESTONES: &[Milestone] = &[
    Milestone {
        id: "world_complete",
        threshold: 10,
        title: "First world cleared!",
    },
    Milestone {
        id: "halfway",
        threshold: 25,
        title: "Halfway through the campaign!",
    },
    Milestone {
        id: "final_boss",
        threshold: 49,
        title: "One level to go - final boss ahead!",
    },
    Milestone {
        id: "game_complete",
        threshold: 50,
        title: "Campaign complete!",
    },
];

/// Milestones whose thresholds were crossed going from `before` to `after`
/// completed levels. Each crossing fires exactly once.
pub fn crossed(before: usize, after: usize) -> Vec<Milestone> {
    MILESTONES
        .iter()
        .filter(|m| before < m.threshold && after >= m.threshold)
        .copied()
        .collect()
}
