//! Quest Common - shared types and state machines for KubeQuest.
//!
//! Pure data and small state machines only: the durable player record,
//! mission metadata, the hint unlock ladder, and the milestone ledger.
//! Anything that talks to the terminal or spawns processes lives in the
//! `kquest` binary crate.

pub mod error;
pub mod fsutil;
pub mod hints;
pub mod milestones;
pub mod mission;
pub mod progress;

pub use error::QuestError;
pub use hints::{HintLadder, HintUnlock};
pub use milestones::{crossed, Milestone};
pub use mission::{Difficulty, Mission};
pub use progress::{LoadReport, PlayerProgress, ProgressStore};
