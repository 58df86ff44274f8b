//! Durable player progress record and its store.
//!
//! One JSON record per installation, read once at startup and rewritten
//! atomically after every mutation. Loading never fails fatally: a missing
//! file yields a default record, and a corrupt file is set aside and
//! replaced with a default record - with a report the caller is expected to
//! surface to the player rather than swallow.

use crate::error::QuestError;
use crate::fsutil::atomic_write_str;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Sentinel player name meaning "not yet configured".
pub const UNNAMED_PLAYER: &str = "Padawan";

/// Player progress - the single durable record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProgress {
    /// Total experience earned. Never decreases except on explicit reset.
    pub total_xp: u64,
    /// Completed level identifiers, duplicate-free.
    pub completed_levels: Vec<String>,
    /// World of the in-progress position.
    #[serde(default)]
    pub current_world: Option<String>,
    /// Level of the in-progress position.
    #[serde(default)]
    pub current_level: Option<String>,
    /// Display name; `UNNAMED_PLAYER` until first-run setup.
    pub player_name: String,
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self {
            total_xp: 0,
            completed_levels: Vec::new(),
            current_world: None,
            current_level: None,
            player_name: UNNAMED_PLAYER.to_string(),
        }
    }
}

impl PlayerProgress {
    pub fn is_completed(&self, level_id: &str) -> bool {
        self.completed_levels.iter().any(|l| l == level_id)
    }

    /// Append a level to the completed set if absent.
    /// Returns true when the level was newly recorded - the caller must only
    /// credit XP in that case.
    pub fn mark_completed(&mut self, level_id: &str) -> bool {
        if self.is_completed(level_id) {
            return false;
        }
        self.completed_levels.push(level_id.to_string());
        true
    }

    pub fn set_position(&mut self, world_id: &str, level_id: &str) {
        self.current_world = Some(world_id.to_string());
        self.current_level = Some(level_id.to_string());
    }

    pub fn has_any_progress(&self) -> bool {
        !self.completed_levels.is_empty() || self.current_level.is_some()
    }

    /// Restart from scratch, keeping only the player's name.
    pub fn reset(&mut self) {
        let name = std::mem::take(&mut self.player_name);
        *self = PlayerProgress {
            player_name: name,
            ..PlayerProgress::default()
        };
    }
}

/// How the record on disk was obtained at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadReport {
    /// No file existed; a fresh default record was constructed.
    Fresh,
    /// The record was read back intact.
    Loaded,
    /// The file existed but could not be parsed. A default record replaced
    /// it and the unreadable original was set aside.
    RecoveredCorrupt { detail: String },
}

/// Sole owner of the backing storage for `PlayerProgress`.
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store rooted in a directory, using the conventional file name.
    /// Handy for tests with a temp dir.
    pub fn with_root(root: &Path) -> Self {
        Self::new(root.join("progress.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record. Never fails: missing or unreadable storage yields a
    /// default record, with the outcome described in the `LoadReport`.
    pub fn load(&self) -> (PlayerProgress, LoadReport) {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return (PlayerProgress::default(), LoadReport::Fresh);
            }
            Err(e) => {
                warn!("progress file unreadable: {}", e);
                self.quarantine_corrupt();
                return (
                    PlayerProgress::default(),
                    LoadReport::RecoveredCorrupt {
                        detail: e.to_string(),
                    },
                );
            }
        };

        match serde_json::from_str::<PlayerProgress>(&content) {
            Ok(progress) => (progress, LoadReport::Loaded),
            Err(e) => {
                warn!("progress file corrupt, replacing with defaults: {}", e);
                self.quarantine_corrupt();
                (
                    PlayerProgress::default(),
                    LoadReport::RecoveredCorrupt {
                        detail: e.to_string(),
                    },
                )
            }
        }
    }

    /// Persist the record atomically. The previous record stays readable
    /// until the replacement is fully on disk.
    pub fn save(&self, progress: &PlayerProgress) -> Result<(), QuestError> {
        let content = serde_json::to_string_pretty(progress)?;
        atomic_write_str(&self.path, &content)
            .map_err(|e| QuestError::Store(format!("write {}: {}", self.path.display(), e)))
    }

    /// Set an unreadable record aside instead of destroying history.
    fn quarantine_corrupt(&self) {
        let aside = self.path.with_extension("json.corrupt");
        let _ = std::fs::rename(&self.path, &aside);
    }
}
