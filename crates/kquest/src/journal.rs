//! Attempt journal.
//!
//! One JSON line per validation attempt, appended under the player's state
//! directory. Purely observational: debriefs and future telemetry read it,
//! the engine never does, and a write failure must not disturb a session -
//! entries are dropped silently when the journal is unwritable.

use crate::orchestrator::ValidationResult;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

/// Journal line for one validation attempt.
#[derive(Debug, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// ISO 8601 timestamp.
    pub ts: String,
    /// Session ID, one per level session.
    pub session_id: String,
    pub world_id: String,
    pub level_id: String,
    /// 1-based attempt number within the session.
    pub attempt: u32,
    pub passed: bool,
    pub exit_code: i32,
    pub status: String,
    pub duration_ms: u64,
}

pub struct Journal {
    path: Option<PathBuf>,
    session_id: String,
}

impl Journal {
    /// Journal at the discovered path, with a fresh session ID.
    pub fn open() -> Self {
        Self {
            path: discover_journal_path(),
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Journal at an explicit path (tests).
    pub fn at(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Disabled journal: records go nowhere.
    pub fn disabled() -> Self {
        Self {
            path: None,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Start a new session ID (called per level session).
    pub fn new_session(&mut self) {
        self.session_id = Uuid::new_v4().to_string();
    }

    /// Append one attempt. Failures are deliberately swallowed.
    pub fn record(&self, world_id: &str, level_id: &str, attempt: u32, result: &ValidationResult) {
        let Some(path) = &self.path else {
            return;
        };
        let record = AttemptRecord {
            ts: chrono::Utc::now().to_rfc3339(),
            session_id: self.session_id.clone(),
            world_id: world_id.to_string(),
            level_id: level_id.to_string(),
            attempt,
            passed: result.passed,
            exit_code: result.exit_code,
            status: result.status.as_str().to_string(),
            duration_ms: result.duration_ms,
        };
        let Ok(json) = serde_json::to_string(&record) else {
            return;
        };
        let _ = append_line(path, &json);
    }
}

fn append_line(path: &PathBuf, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// Journal path fallback chain:
/// 1. `$KQUEST_JOURNAL` (explicit override)
/// 2. `$XDG_STATE_HOME/kquest/attempts.jsonl`
/// 3. `~/.local/state/kquest/attempts.jsonl`
fn discover_journal_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KQUEST_JOURNAL") {
        return Some(PathBuf::from(path));
    }
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg_state).join("kquest/attempts.jsonl"));
    }
    dirs::home_dir().map(|home| home.join(".local/state/kquest/attempts.jsonl"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::CommandStatus;
    use tempfile::TempDir;

    fn fake_result(passed: bool) -> ValidationResult {
        ValidationResult {
            passed,
            output: String::new(),
            status: if passed {
                CommandStatus::Success
            } else {
                CommandStatus::NonZeroExit
            },
            exit_code: if passed { 0 } else { 1 },
            duration_ms: 42,
        }
    }

    #[test]
    fn test_records_append_as_jsonl() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state/attempts.jsonl");
        let journal = Journal::at(path.clone());

        journal.record("world-1-basics", "level-1-pods", 1, &fake_result(false));
        journal.record("world-1-basics", "level-1-pods", 2, &fake_result(true));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AttemptRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.attempt, 1);
        assert!(!first.passed);
        let second: AttemptRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.session_id, first.session_id);
        assert!(second.passed);
    }

    #[test]
    fn test_disabled_journal_is_silent() {
        let journal = Journal::disabled();
        journal.record("w", "l", 1, &fake_result(true));
    }

    #[test]
    fn test_new_session_changes_id() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("attempts.jsonl");
        let mut journal = Journal::at(path.clone());

        journal.record("w", "l1", 1, &fake_result(true));
        journal.new_session();
        journal.record("w", "l2", 1, &fake_result(true));

        let content = std::fs::read_to_string(&path).unwrap();
        let ids: Vec<String> = content
            .lines()
            .map(|l| serde_json::from_str::<AttemptRecord>(l).unwrap().session_id)
            .collect();
        assert_ne!(ids[0], ids[1]);
    }
}
