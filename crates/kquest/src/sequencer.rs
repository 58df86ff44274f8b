//! World and campaign sequencing.
//!
//! Iterates naturally-ordered levels within each world and worlds within
//! the campaign, resuming from the persisted position. The position is
//! saved before every session starts, so a crash mid-level resumes at that
//! level rather than the one before it.

use crate::catalog::{ContentCatalog, LevelRef};
use crate::journal::Journal;
use crate::orchestrator::{CommandRunner, Orchestrator};
use crate::session::{Prompter, SessionOutcome};
use crate::ui;
use quest_common::{PlayerProgress, ProgressStore, QuestError};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Everything one campaign run needs, injected explicitly so tests can
/// substitute an in-memory catalog, a scripted runner, and a scripted
/// prompter.
pub struct Campaign<C: ContentCatalog, R: CommandRunner, P: Prompter> {
    pub catalog: C,
    pub orchestrator: Orchestrator<R>,
    pub store: ProgressStore,
    /// Shared with the interrupt watcher, which saves it on ctrl-c.
    pub progress: Arc<Mutex<PlayerProgress>>,
    pub journal: Journal,
    pub prompter: P,
    /// Checked by long-running polls; set by the interrupt watcher.
    pub cancel: Arc<AtomicBool>,
    /// Duration of the `check` action's monitoring loop.
    pub check_seconds: u64,
}

/// How a whole campaign run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignEnd {
    /// Every world was played through.
    Finished,
    /// The player declined to continue; state is saved.
    Stopped,
    /// The player quit; the process should exit 0 after this.
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorldEnd {
    Completed,
    Stopped,
    Quit,
}

/// Resume index inside one world's naturally-ordered level list:
/// - stored level found and already completed: the next index;
/// - found and not completed: that index;
/// - not found (stale, renamed, or another world's level): index 0.
pub fn resume_index(levels: &[LevelRef], progress: &PlayerProgress) -> usize {
    let Some(current) = progress.current_level.as_deref() else {
        return 0;
    };
    match levels.iter().position(|l| l.level_id == current) {
        Some(index) if progress.is_completed(current) => index + 1,
        Some(index) => index,
        None => 0,
    }
}

impl<C: ContentCatalog, R: CommandRunner, P: Prompter> Campaign<C, R, P> {
    /// Play worlds in catalog order, starting from the persisted world.
    pub async fn run_campaign(&mut self) -> Result<CampaignEnd, QuestError> {
        let worlds = self.catalog.worlds()?;

        let start = {
            let progress = self.progress.lock().unwrap();
            progress
                .current_world
                .as_deref()
                .and_then(|current| worlds.iter().position(|w| w == current))
                .unwrap_or(0)
        };

        for world_id in &worlds[start..] {
            match self.run_world(world_id).await? {
                WorldEnd::Completed => continue,
                WorldEnd::Stopped => return Ok(CampaignEnd::Stopped),
                WorldEnd::Quit => return Ok(CampaignEnd::Quit),
            }
        }
        Ok(CampaignEnd::Finished)
    }

    async fn run_world(&mut self, world_id: &str) -> Result<WorldEnd, QuestError> {
        let levels = self.catalog.levels(world_id)?;
        let start = {
            let progress = self.progress.lock().unwrap();
            resume_index(&levels, &progress)
        };
        info!(
            "entering {} at level index {}/{}",
            world_id,
            start,
            levels.len()
        );

        for level in &levels[start..] {
            // Persist the position first: a crash mid-level must resume
            // here, not at the previous level.
            self.progress
                .lock()
                .unwrap()
                .set_position(world_id, &level.level_id);
            self.store.save(&self.progress.lock().unwrap().clone())?;

            match self.play_level(level).await {
                Ok(SessionOutcome::Passed { proceed: true }) | Ok(SessionOutcome::Skipped) => {}
                Ok(SessionOutcome::Passed { proceed: false }) | Ok(SessionOutcome::Stopped) => {
                    return Ok(WorldEnd::Stopped);
                }
                Ok(SessionOutcome::Quit) => return Ok(WorldEnd::Quit),
                // Unreadable content degrades to skipping that level.
                Err(QuestError::Content(detail)) => {
                    warn!("skipping {}: {}", level.level_id, detail);
                    ui::skipped_unreadable_level(&level.level_id, &detail);
                }
                Err(e) => return Err(e),
            }
        }

        let total_xp = self.progress.lock().unwrap().total_xp;
        ui::world_complete(total_xp);
        Ok(WorldEnd::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MemoryCatalog, MemoryLevel};
    use crate::orchestrator::{outcome_ok, OrchestratorConfig, ScriptedRunner};
    use crate::session::Action;
    use crate::ui::ScriptedPrompter;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn level_ref(world: &str, level: &str) -> LevelRef {
        LevelRef {
            world_id: world.to_string(),
            level_id: level.to_string(),
            dir: PathBuf::from(format!("/memory/{}/{}", world, level)),
        }
    }

    fn ten_level_world() -> Vec<LevelRef> {
        (1..=10)
            .map(|n| level_ref("world-1-basics", &format!("level-{}", n)))
            .collect()
    }

    #[test]
    fn test_resume_after_completed_level_is_next_index() {
        let levels = ten_level_world();
        let mut progress = PlayerProgress::default();
        progress.set_position("world-1-basics", "level-7");
        progress.mark_completed("level-7");

        assert_eq!(resume_index(&levels, &progress), 7);
        assert_eq!(levels[7].level_id, "level-8");
    }

    #[test]
    fn test_resume_at_uncompleted_level() {
        let levels = ten_level_world();
        let mut progress = PlayerProgress::default();
        progress.set_position("world-1-basics", "level-7");

        assert_eq!(resume_index(&levels, &progress), 6);
        assert_eq!(levels[6].level_id, "level-7");
    }

    #[test]
    fn test_stale_level_resumes_at_world_start() {
        let levels = ten_level_world();
        let mut progress = PlayerProgress::default();
        progress.set_position("world-1-basics", "level-renamed-away");

        assert_eq!(resume_index(&levels, &progress), 0);
    }

    #[test]
    fn test_no_position_resumes_at_start() {
        let levels = ten_level_world();
        assert_eq!(resume_index(&levels, &PlayerProgress::default()), 0);
    }

    #[test]
    fn test_resume_past_last_level_exhausts_world() {
        let levels = ten_level_world();
        let mut progress = PlayerProgress::default();
        progress.set_position("world-1-basics", "level-10");
        progress.mark_completed("level-10");

        assert_eq!(resume_index(&levels, &progress), 10);
    }

    // ------------------------------------------------------------------
    // Campaign runs over fakes
    // ------------------------------------------------------------------

    fn two_world_catalog() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        catalog.add_level(
            "world-1-basics",
            "level-1-pods",
            MemoryLevel::with_mission("Pods", 100),
        );
        catalog.add_level(
            "world-1-basics",
            "level-2-deployments",
            MemoryLevel::with_mission("Deployments", 150),
        );
        catalog.add_level(
            "world-2-networking",
            "level-1-services",
            MemoryLevel::with_mission("Services", 200),
        );
        catalog
    }

    fn campaign_over(
        temp: &TempDir,
        catalog: MemoryCatalog,
        runner: ScriptedRunner,
        prompter: ScriptedPrompter,
    ) -> Campaign<MemoryCatalog, ScriptedRunner, ScriptedPrompter> {
        Campaign {
            catalog,
            orchestrator: Orchestrator::new(
                runner,
                OrchestratorConfig {
                    namespace: "kquest".to_string(),
                    kubectl_bin: "kubectl".to_string(),
                    setup_timeout: Duration::from_secs(5),
                    validation_timeout: Duration::from_secs(5),
                    status_timeout: Duration::from_secs(1),
                },
            ),
            store: ProgressStore::with_root(temp.path()),
            progress: Arc::new(Mutex::new(PlayerProgress::default())),
            journal: Journal::disabled(),
            prompter,
            cancel: Arc::new(AtomicBool::new(false)),
            check_seconds: 1,
        }
    }

    #[tokio::test]
    async fn test_campaign_plays_all_worlds_through() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on("validate.sh", outcome_ok("ok"));
        let prompter = ScriptedPrompter::new(
            &[Action::Validate, Action::Validate, Action::Validate],
            &[],
        );
        let mut campaign = campaign_over(&temp, two_world_catalog(), runner, prompter);

        let end = campaign.run_campaign().await.unwrap();
        assert_eq!(end, CampaignEnd::Finished);

        let progress = campaign.progress.lock().unwrap();
        assert_eq!(progress.completed_levels.len(), 3);
        assert_eq!(progress.total_xp, 450);
    }

    #[tokio::test]
    async fn test_quit_stops_campaign_and_persists_position() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on("validate.sh", outcome_ok("ok"));
        // Pass level 1, quit inside level 2.
        let prompter = ScriptedPrompter::new(&[Action::Validate, Action::Quit], &[]);
        let mut campaign = campaign_over(&temp, two_world_catalog(), runner, prompter);

        let end = campaign.run_campaign().await.unwrap();
        assert_eq!(end, CampaignEnd::Quit);

        let (saved, _) = campaign.store.load();
        assert_eq!(saved.current_world.as_deref(), Some("world-1-basics"));
        assert_eq!(saved.current_level.as_deref(), Some("level-2-deployments"));
        assert!(saved.is_completed("level-1-pods"));
        assert!(!saved.is_completed("level-2-deployments"));
    }

    #[tokio::test]
    async fn test_decline_to_continue_stops_after_current_world() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on("validate.sh", outcome_ok("ok"));
        // Pass level 1 but decline the next challenge.
        let prompter = ScriptedPrompter::new(&[Action::Validate], &[false]);
        let mut campaign = campaign_over(&temp, two_world_catalog(), runner, prompter);

        let end = campaign.run_campaign().await.unwrap();
        assert_eq!(end, CampaignEnd::Stopped);

        let progress = campaign.progress.lock().unwrap();
        // The decline is still a successful resolution of the level.
        assert!(progress.is_completed("level-1-pods"));
        assert_eq!(progress.completed_levels.len(), 1);
    }

    #[tokio::test]
    async fn test_campaign_resumes_from_persisted_world() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on("validate.sh", outcome_ok("ok"));
        let prompter = ScriptedPrompter::new(&[Action::Validate], &[]);
        let mut campaign = campaign_over(&temp, two_world_catalog(), runner, prompter);
        {
            let mut progress = campaign.progress.lock().unwrap();
            progress.mark_completed("level-1-pods");
            progress.mark_completed("level-2-deployments");
            progress.set_position("world-2-networking", "level-1-services");
        }

        let end = campaign.run_campaign().await.unwrap();
        assert_eq!(end, CampaignEnd::Finished);
        assert!(campaign
            .progress
            .lock()
            .unwrap()
            .is_completed("level-1-services"));
    }

    #[tokio::test]
    async fn test_unreadable_level_is_skipped_not_fatal() {
        let temp = TempDir::new().unwrap();
        let mut catalog = MemoryCatalog::new();
        catalog.add_broken_level("world-1-basics", "level-1-mangled");
        catalog.add_level(
            "world-1-basics",
            "level-2-deployments",
            MemoryLevel::with_mission("Deployments", 150),
        );
        let runner = ScriptedRunner::new().on("validate.sh", outcome_ok("ok"));
        let prompter = ScriptedPrompter::new(&[Action::Validate], &[]);
        let mut campaign = campaign_over(&temp, catalog, runner, prompter);

        let end = campaign.run_campaign().await.unwrap();
        assert_eq!(end, CampaignEnd::Finished);

        let progress = campaign.progress.lock().unwrap();
        assert!(progress.is_completed("level-2-deployments"));
        assert!(!progress.is_completed("level-1-mangled"));
    }
}
