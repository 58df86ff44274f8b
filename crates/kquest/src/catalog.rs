//! Content catalog boundary.
//!
//! The engine treats level content as opaque text: it enumerates worlds and
//! levels, parses one metadata document per level, and reads hint/debrief/
//! solution files when they exist. `FsCatalog` is the production
//! implementation over a worlds directory; `MemoryCatalog` backs tests
//! without touching the filesystem.

use quest_common::{Mission, QuestError};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Handle to one level's content directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelRef {
    pub world_id: String,
    pub level_id: String,
    /// Working directory for the level's scripts and resource files.
    pub dir: PathBuf,
}

/// Optional per-level documents the engine can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFile {
    Debrief,
    Solution,
    Guide,
}

impl ContentFile {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Debrief => "debrief.md",
            Self::Solution => "solution.yaml",
            Self::Guide => "guide.md",
        }
    }

    /// What to call the document when telling the player it is missing.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Debrief => "debrief",
            Self::Solution => "solution file",
            Self::Guide => "guide",
        }
    }
}

/// Read side of the content tree. Everything the engine knows about worlds
/// and levels comes through here, so tests can substitute an in-memory
/// implementation.
pub trait ContentCatalog: Send + Sync {
    /// World identifiers in play order.
    fn worlds(&self) -> Result<Vec<String>, QuestError>;

    /// Levels of a world in natural order.
    fn levels(&self, world_id: &str) -> Result<Vec<LevelRef>, QuestError>;

    /// Parse the level's metadata document.
    fn mission(&self, level: &LevelRef) -> Result<Mission, QuestError>;

    /// Number of authored hint tiers (0-3).
    fn hint_count(&self, level: &LevelRef) -> usize;

    /// Text of one authored hint tier (1-based), if present.
    fn hint(&self, level: &LevelRef, tier: usize) -> Option<String>;

    /// An optional document's text, if authored.
    fn optional_text(&self, level: &LevelRef, file: ContentFile) -> Option<String>;
}

// ============================================================================
// Natural ordering
// ============================================================================

/// Segment of an identifier split at digit boundaries. Runs of digits
/// compare numerically, so `level-2` sorts before `level-10`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NaturalSeg {
    Num(u64),
    Text(String),
}

/// Sort key for numeric-aware identifier ordering.
pub fn natural_key(name: &str) -> impl Ord {
    let mut segments: Vec<NaturalSeg> = Vec::new();
    let mut chars = name.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut value: u64 = 0;
            while let Some(&d) = chars.peek() {
                if let Some(digit) = d.to_digit(10) {
                    value = value.saturating_mul(10).saturating_add(digit as u64);
                    chars.next();
                } else {
                    break;
                }
            }
            segments.push(NaturalSeg::Num(value));
        } else {
            let mut text = String::new();
            while let Some(&t) = chars.peek() {
                if t.is_ascii_digit() {
                    break;
                }
                text.push(t);
                chars.next();
            }
            segments.push(NaturalSeg::Text(text));
        }
    }
    segments
}

/// Compare two identifiers with numeric awareness.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

// ============================================================================
// Filesystem catalog
// ============================================================================

/// Catalog over a `worlds/` directory tree:
/// `<root>/<world>/<level>/mission.yaml` plus the level's scripts and
/// optional documents alongside it.
pub struct FsCatalog {
    root: PathBuf,
}

impl FsCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn subdirs_sorted(dir: &Path) -> Result<Vec<String>, QuestError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)
            .map_err(|e| QuestError::Content(format!("read {}: {}", dir.display(), e)))?
        {
            let entry = entry.map_err(QuestError::Io)?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort_by(|a, b| natural_cmp(a, b));
        Ok(names)
    }
}

impl ContentCatalog for FsCatalog {
    fn worlds(&self) -> Result<Vec<String>, QuestError> {
        Self::subdirs_sorted(&self.root)
    }

    fn levels(&self, world_id: &str) -> Result<Vec<LevelRef>, QuestError> {
        let world_dir = self.root.join(world_id);
        if !world_dir.is_dir() {
            return Err(QuestError::WorldNotFound(world_id.to_string()));
        }
        let mut levels = Vec::new();
        for name in Self::subdirs_sorted(&world_dir)? {
            let dir = world_dir.join(&name);
            // Only directories carrying a metadata document count as levels.
            if dir.join("mission.yaml").is_file() {
                levels.push(LevelRef {
                    world_id: world_id.to_string(),
                    level_id: name,
                    dir,
                });
            } else {
                warn!("skipping {}: no mission.yaml", dir.display());
            }
        }
        Ok(levels)
    }

    fn mission(&self, level: &LevelRef) -> Result<Mission, QuestError> {
        let path = level.dir.join("mission.yaml");
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| QuestError::Content(format!("read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&raw)
            .map_err(|e| QuestError::Content(format!("parse {}: {}", path.display(), e)))
    }

    fn hint_count(&self, level: &LevelRef) -> usize {
        (1..=quest_common::hints::MAX_TIERS)
            .take_while(|tier| level.dir.join(format!("hint-{}.txt", tier)).is_file())
            .count()
    }

    fn hint(&self, level: &LevelRef, tier: usize) -> Option<String> {
        let path = level.dir.join(format!("hint-{}.txt", tier));
        std::fs::read_to_string(path)
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn optional_text(&self, level: &LevelRef, file: ContentFile) -> Option<String> {
        std::fs::read_to_string(level.dir.join(file.file_name())).ok()
    }
}

// ============================================================================
// In-memory catalog (testing)
// ============================================================================

/// Authored level for `MemoryCatalog`.
#[derive(Debug, Clone)]
pub struct MemoryLevel {
    pub mission: Mission,
    pub hints: Vec<String>,
    pub debrief: Option<String>,
    pub solution: Option<String>,
    pub guide: Option<String>,
}

impl MemoryLevel {
    pub fn with_mission(name: &str, xp: u64) -> Self {
        Self {
            mission: Mission {
                name: name.to_string(),
                description: format!("{} description", name),
                objective: format!("{} objective", name),
                xp,
                difficulty: Default::default(),
                expected_time: None,
                concepts: Vec::new(),
            },
            hints: Vec::new(),
            debrief: None,
            solution: None,
            guide: None,
        }
    }

    pub fn hints(mut self, hints: &[&str]) -> Self {
        self.hints = hints.iter().map(|h| h.to_string()).collect();
        self
    }
}

/// Deterministic catalog for tests: worlds and levels are registered in
/// code, in the order they should play.
#[derive(Default)]
pub struct MemoryCatalog {
    worlds: Vec<String>,
    levels: BTreeMap<String, Vec<(String, MemoryLevel)>>,
    broken: std::collections::BTreeSet<String>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_level(&mut self, world_id: &str, level_id: &str, level: MemoryLevel) {
        if !self.worlds.iter().any(|w| w == world_id) {
            self.worlds.push(world_id.to_string());
        }
        self.levels
            .entry(world_id.to_string())
            .or_default()
            .push((level_id.to_string(), level));
    }

    /// Register a level whose metadata document fails to parse.
    pub fn add_broken_level(&mut self, world_id: &str, level_id: &str) {
        self.add_level(world_id, level_id, MemoryLevel::with_mission(level_id, 0));
        self.broken.insert(format!("{}/{}", world_id, level_id));
    }

    fn find(&self, level: &LevelRef) -> Option<&MemoryLevel> {
        self.levels
            .get(&level.world_id)?
            .iter()
            .find(|(id, _)| *id == level.level_id)
            .map(|(_, l)| l)
    }
}

impl ContentCatalog for MemoryCatalog {
    fn worlds(&self) -> Result<Vec<String>, QuestError> {
        Ok(self.worlds.clone())
    }

    fn levels(&self, world_id: &str) -> Result<Vec<LevelRef>, QuestError> {
        let levels = self
            .levels
            .get(world_id)
            .ok_or_else(|| QuestError::WorldNotFound(world_id.to_string()))?;
        let mut refs: Vec<LevelRef> = levels
            .iter()
            .map(|(id, _)| LevelRef {
                world_id: world_id.to_string(),
                level_id: id.clone(),
                dir: PathBuf::from(format!("/memory/{}/{}", world_id, id)),
            })
            .collect();
        refs.sort_by(|a, b| natural_cmp(&a.level_id, &b.level_id));
        Ok(refs)
    }

    fn mission(&self, level: &LevelRef) -> Result<Mission, QuestError> {
        if self
            .broken
            .contains(&format!("{}/{}", level.world_id, level.level_id))
        {
            return Err(QuestError::Content(format!(
                "parse mission.yaml for {}: scripted failure",
                level.level_id
            )));
        }
        self.find(level)
            .map(|l| l.mission.clone())
            .ok_or_else(|| QuestError::Content(format!("no such level: {}", level.level_id)))
    }

    fn hint_count(&self, level: &LevelRef) -> usize {
        self.find(level).map(|l| l.hints.len()).unwrap_or(0)
    }

    fn hint(&self, level: &LevelRef, tier: usize) -> Option<String> {
        self.find(level)?.hints.get(tier.checked_sub(1)?).cloned()
    }

    fn optional_text(&self, level: &LevelRef, file: ContentFile) -> Option<String> {
        let l = self.find(level)?;
        match file {
            ContentFile::Debrief => l.debrief.clone(),
            ContentFile::Solution => l.solution.clone(),
            ContentFile::Guide => l.guide.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_level(root: &Path, world: &str, level: &str, xp: u64) {
        let dir = root.join(world).join(level);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("mission.yaml"),
            format!(
                "name: {level}\ndescription: d\nobjective: o\nxp: {xp}\n"
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_natural_ordering() {
        let mut ids = vec!["level-2-x", "level-10-y", "level-1-z"];
        ids.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(ids, vec!["level-1-z", "level-2-x", "level-10-y"]);
    }

    #[test]
    fn test_levels_enumerated_in_natural_order() {
        let temp = TempDir::new().unwrap();
        write_level(temp.path(), "world-1-basics", "level-10-ingress", 100);
        write_level(temp.path(), "world-1-basics", "level-2-deployments", 100);
        write_level(temp.path(), "world-1-basics", "level-1-pods", 100);

        let catalog = FsCatalog::new(temp.path());
        let levels = catalog.levels("world-1-basics").unwrap();
        let ids: Vec<_> = levels.iter().map(|l| l.level_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["level-1-pods", "level-2-deployments", "level-10-ingress"]
        );
    }

    #[test]
    fn test_dirs_without_mission_are_skipped() {
        let temp = TempDir::new().unwrap();
        write_level(temp.path(), "world-1-basics", "level-1-pods", 100);
        std::fs::create_dir_all(temp.path().join("world-1-basics/notes")).unwrap();

        let catalog = FsCatalog::new(temp.path());
        let levels = catalog.levels("world-1-basics").unwrap();
        assert_eq!(levels.len(), 1);
    }

    #[test]
    fn test_missing_world_is_an_error() {
        let temp = TempDir::new().unwrap();
        let catalog = FsCatalog::new(temp.path());
        assert!(matches!(
            catalog.levels("world-9-void"),
            Err(QuestError::WorldNotFound(_))
        ));
    }

    #[test]
    fn test_malformed_mission_is_content_error() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("world-1-basics/level-1-pods");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("mission.yaml"), "name: [unterminated").unwrap();

        let catalog = FsCatalog::new(temp.path());
        let level = &catalog.levels("world-1-basics").unwrap()[0];
        assert!(matches!(
            catalog.mission(level),
            Err(QuestError::Content(_))
        ));
    }

    #[test]
    fn test_hint_count_stops_at_first_gap() {
        let temp = TempDir::new().unwrap();
        write_level(temp.path(), "world-1-basics", "level-1-pods", 100);
        let dir = temp.path().join("world-1-basics/level-1-pods");
        std::fs::write(dir.join("hint-1.txt"), "check the pod status\n").unwrap();
        std::fs::write(dir.join("hint-3.txt"), "orphaned tier\n").unwrap();

        let catalog = FsCatalog::new(temp.path());
        let level = &catalog.levels("world-1-basics").unwrap()[0];
        assert_eq!(catalog.hint_count(level), 1);
        assert_eq!(
            catalog.hint(level, 1).as_deref(),
            Some("check the pod status")
        );
    }

    #[test]
    fn test_optional_text_absent_is_none() {
        let temp = TempDir::new().unwrap();
        write_level(temp.path(), "world-1-basics", "level-1-pods", 100);
        let catalog = FsCatalog::new(temp.path());
        let level = &catalog.levels("world-1-basics").unwrap()[0];
        assert!(catalog.optional_text(level, ContentFile::Debrief).is_none());
    }
}
