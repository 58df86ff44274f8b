//! Game configuration.
//!
//! Loaded from an optional TOML file, with defaults for every field and
//! clamps on the timeout knobs. A missing file is not an error. The safety
//! guard can additionally be switched off with `KQUEST_SAFETY=off`, matching
//! the long-standing environment toggle.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "kquest.toml";

/// Environment toggle for the safety guard.
pub const SAFETY_ENV: &str = "KQUEST_SAFETY";

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub game: GameSection,
    pub validation: ValidationSection,
}

#[derive(Debug, Clone)]
pub struct GameSection {
    /// Namespace the broken resources are deployed into.
    pub namespace: String,
    /// kubectl binary to invoke.
    pub kubectl_bin: String,
    /// Root directory holding the world/level content tree.
    pub worlds_dir: PathBuf,
    /// Path of the durable progress record.
    pub progress_file: PathBuf,
    /// Whether the safety guard capability is active.
    pub safety_guard: bool,
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            namespace: "kquest".to_string(),
            kubectl_bin: "kubectl".to_string(),
            worlds_dir: PathBuf::from("worlds"),
            progress_file: PathBuf::from("progress.json"),
            safety_guard: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationSection {
    /// Upper bound on a level's validation script.
    pub timeout_secs: u64,
    /// Upper bound on each setup command (namespace reset, apply, setup.sh).
    pub setup_timeout_secs: u64,
    /// Upper bound on each status-check listing.
    pub status_timeout_secs: u64,
    /// Total duration of the `check` action's monitoring loop.
    pub check_seconds: u64,
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            setup_timeout_secs: 30,
            status_timeout_secs: 3,
            check_seconds: 10,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    game: RawGameSection,
    #[serde(default)]
    validation: RawValidationSection,
}

#[derive(Debug, Deserialize, Default)]
struct RawGameSection {
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    kubectl_bin: Option<String>,
    #[serde(default)]
    worlds_dir: Option<PathBuf>,
    #[serde(default)]
    progress_file: Option<PathBuf>,
    #[serde(default)]
    safety_guard: Option<bool>,
}

impl From<RawGameSection> for GameSection {
    fn from(raw: RawGameSection) -> Self {
        let defaults = GameSection::default();
        Self {
            namespace: raw.namespace.unwrap_or(defaults.namespace),
            kubectl_bin: raw.kubectl_bin.unwrap_or(defaults.kubectl_bin),
            worlds_dir: raw.worlds_dir.unwrap_or(defaults.worlds_dir),
            progress_file: raw.progress_file.unwrap_or(defaults.progress_file),
            safety_guard: raw.safety_guard.unwrap_or(defaults.safety_guard),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawValidationSection {
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    setup_timeout_secs: Option<u64>,
    #[serde(default)]
    status_timeout_secs: Option<u64>,
    #[serde(default)]
    check_seconds: Option<u64>,
}

impl From<RawValidationSection> for ValidationSection {
    fn from(raw: RawValidationSection) -> Self {
        let defaults = ValidationSection::default();
        Self {
            timeout_secs: raw.timeout_secs.unwrap_or(defaults.timeout_secs).max(10),
            setup_timeout_secs: raw
                .setup_timeout_secs
                .unwrap_or(defaults.setup_timeout_secs)
                .max(5),
            status_timeout_secs: raw
                .status_timeout_secs
                .unwrap_or(defaults.status_timeout_secs)
                .max(1),
            check_seconds: raw
                .check_seconds
                .unwrap_or(defaults.check_seconds)
                .clamp(1, 60),
        }
    }
}

/// Load configuration from `path`, or defaults when the file is absent.
pub fn load(path: &Path) -> Result<GameConfig> {
    let mut config = if path.exists() {
        let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let file_cfg: RawConfig =
            toml::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
        GameConfig {
            game: file_cfg.game.into(),
            validation: file_cfg.validation.into(),
        }
    } else {
        GameConfig {
            game: GameSection::default(),
            validation: ValidationSection::default(),
        }
    };

    if let Ok(value) = std::env::var(SAFETY_ENV) {
        config.game.safety_guard = !value.eq_ignore_ascii_case("off");
    }

    Ok(config)
}
