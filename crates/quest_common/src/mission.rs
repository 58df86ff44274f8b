//! Mission metadata, read-only to the engine.
//!
//! Parsed from a level's `mission.yaml` by the content catalog. The engine
//! only displays these fields and credits `xp` on success.

use serde::{Deserialize, Serialize};

/// Difficulty band of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
            Self::Expert => write!(f, "expert"),
        }
    }
}

impl Difficulty {
    /// Lightning-bolt scale used in the briefing header.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Beginner => "*",
            Self::Intermediate => "**",
            Self::Advanced => "***",
            Self::Expert => "!!!",
        }
    }
}

/// Per-level metadata document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub name: String,
    pub description: String,
    pub objective: String,
    /// XP awarded on first completion.
    pub xp: u64,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Rough time estimate, free text ("10 min").
    #[serde(default)]
    pub expected_time: Option<String>,
    /// Concept tags shown in the briefing.
    #[serde(default)]
    pub concepts: Vec<String>,
}
