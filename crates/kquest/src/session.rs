//! Level session controller.
//!
//! Drives one level from briefing to resolution:
//! Briefing -> Deploying -> Interacting -> Resolved. The interactive loop
//! accepts a closed action vocabulary decoded at the input boundary;
//! anything else never reaches the state machine. Display-only actions loop
//! back, `validate` is the only path to `Passed`, and XP crediting is
//! idempotent - a level already in the completed set is never credited
//! twice.

use crate::catalog::{ContentCatalog, ContentFile, LevelRef};
use crate::orchestrator::{CommandRunner, CommandStatus};
use crate::sequencer::Campaign;
use crate::ui;
use quest_common::hints::{HintLadder, HintUnlock};
use quest_common::milestones::crossed;
use quest_common::{Mission, QuestError};
use std::sync::atomic::Ordering;
use tracing::warn;

/// Closed vocabulary of the interactive loop. Unrecognized input is
/// rejected by the prompter before it gets here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Check,
    Guide,
    Hints,
    Solution,
    Validate,
    Skip,
    Quit,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Check,
        Action::Guide,
        Action::Hints,
        Action::Solution,
        Action::Validate,
        Action::Skip,
        Action::Quit,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Guide => "guide",
            Self::Hints => "hints",
            Self::Solution => "solution",
            Self::Validate => "validate",
            Self::Skip => "skip",
            Self::Quit => "quit",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Check => "watch the resource status",
            Self::Guide => "step-by-step instructions",
            Self::Hints => "unlock the next hint",
            Self::Solution => "view the solution file",
            Self::Validate => "test whether you fixed it",
            Self::Skip => "skip this level",
            Self::Quit => "exit the game",
        }
    }

    pub fn parse(input: &str) -> Option<Action> {
        let input = input.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.keyword().eq_ignore_ascii_case(input))
    }
}

/// Input seam of the session controller.
pub trait Prompter {
    fn action(&mut self) -> Action;
    fn confirm(&mut self, message: &str, default_yes: bool) -> bool;
    fn pause(&mut self);
}

/// How a level session resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Validation passed. `proceed` is false when the player declined to
    /// continue - still a success, not a failure.
    Passed { proceed: bool },
    /// Player skipped with confirmation: no XP, not marked complete, the
    /// sequencer may advance past the level.
    Skipped,
    /// Player chose to stop trying without quitting the process.
    Stopped,
    /// Player quit: the campaign terminates after persisting state.
    Quit,
}

impl<C: ContentCatalog, R: CommandRunner, P: Prompter> Campaign<C, R, P> {
    /// Play one level to resolution.
    ///
    /// A `Content` error from the catalog propagates so the sequencer can
    /// degrade (skip the unreadable level); external-process failures never
    /// surface as errors here.
    pub async fn play_level(&mut self, level: &LevelRef) -> Result<SessionOutcome, QuestError> {
        let mission = self.catalog.mission(level)?;
        self.journal.new_session();

        // Briefing: display only, no side effects.
        let total_xp = self.progress.lock().unwrap().total_xp;
        ui::briefing(&level.level_id, &mission, total_xp);

        // Deploying: setup failure is diagnostic content, never fatal.
        let spinner = ui::deploy_spinner();
        let report = self.orchestrator.run_setup(level).await;
        spinner.finish_and_clear();
        ui::deploy_warnings(&report.warnings);
        ui::mission_deployed();
        ui::terminal_instructions();

        let mut ladder = HintLadder::new(self.catalog.hint_count(level));
        let mut attempts: u32 = 0;

        // Interacting.
        loop {
            match self.prompter.action() {
                Action::Check => {
                    ui::monitoring_start(self.check_seconds);
                    self.orchestrator
                        .monitor(self.check_seconds, &self.cancel, ui::status_line)
                        .await;
                    if self.cancel.load(Ordering::Relaxed) {
                        self.persist_or_warn();
                        return Ok(SessionOutcome::Quit);
                    }
                }
                Action::Guide => self.show_optional(level, ContentFile::Guide),
                Action::Solution => self.show_optional(level, ContentFile::Solution),
                Action::Hints => self.show_next_hint(level, &mut ladder),
                Action::Validate => {
                    attempts += 1;
                    ui::attempt_header(attempts);
                    let result = self.orchestrator.run_validation(level).await;
                    self.journal
                        .record(&level.world_id, &level.level_id, attempts, &result);

                    if result.passed {
                        ui::validation_passed(&result.output);
                        return Ok(self.resolve_passed(level, &mission, attempts));
                    }

                    ui::validation_failed(&result.output, result.status == CommandStatus::Timeout);
                    // A failed attempt implicitly unlocks the next hint.
                    ladder.on_failure();
                    ui::show_encouragement(attempts);
                    if !self.prompter.confirm("Try again?", true) {
                        return Ok(SessionOutcome::Stopped);
                    }
                }
                Action::Skip => {
                    if self
                        .prompter
                        .confirm("Skip this level? (No XP will be awarded)", false)
                    {
                        return Ok(SessionOutcome::Skipped);
                    }
                }
                Action::Quit => {
                    self.persist_or_warn();
                    return Ok(SessionOutcome::Quit);
                }
            }
        }
    }

    /// Resolved{Passed}: idempotent credit, persist, milestones, debrief,
    /// then ask whether to proceed.
    fn resolve_passed(
        &mut self,
        level: &LevelRef,
        mission: &Mission,
        attempts: u32,
    ) -> SessionOutcome {
        let (before, after, newly_completed, total_xp) = {
            let mut progress = self.progress.lock().unwrap();
            let before = progress.completed_levels.len();
            let newly = progress.mark_completed(&level.level_id);
            if newly {
                progress.total_xp += mission.xp;
            }
            (before, progress.completed_levels.len(), newly, progress.total_xp)
        };
        self.persist_or_warn();

        ui::victory(mission.xp, !newly_completed, total_xp, attempts);
        for milestone in crossed(before, after) {
            ui::milestone(&milestone);
        }

        match self.catalog.optional_text(level, ContentFile::Debrief) {
            Some(text) => {
                ui::show_document("Mission Debrief", &text);
                self.prompter.pause();
            }
            None => ui::no_content(ContentFile::Debrief.label()),
        }

        let proceed = self.prompter.confirm("Ready for the next challenge?", true);
        SessionOutcome::Passed { proceed }
    }

    fn show_optional(&self, level: &LevelRef, file: ContentFile) {
        match self.catalog.optional_text(level, file) {
            Some(text) => ui::show_document(file.label(), &text),
            None => ui::no_content(file.label()),
        }
    }

    fn show_next_hint(&self, level: &LevelRef, ladder: &mut HintLadder) {
        match ladder.request() {
            HintUnlock::Unlocked(tier) => match self.catalog.hint(level, tier) {
                Some(text) => ui::show_hint(tier, &text),
                None => {
                    warn!("hint tier {} unlocked but unreadable", tier);
                    ui::no_content("hints");
                }
            },
            HintUnlock::AllUnlocked => {
                let unlocked: Vec<(usize, String)> = (1..=ladder.tier())
                    .filter_map(|tier| self.catalog.hint(level, tier).map(|t| (tier, t)))
                    .collect();
                ui::all_hints_unlocked(&unlocked);
            }
            HintUnlock::NoneAuthored => ui::no_content("hints"),
        }
    }

    /// Persist the current record. Inability to persist is reported to the
    /// player, never swallowed.
    pub(crate) fn persist_or_warn(&self) {
        let snapshot = self.progress.lock().unwrap().clone();
        if let Err(e) = self.store.save(&snapshot) {
            warn!("failed to persist progress: {}", e);
            eprintln!("warning: could not save progress: {}", e);
        }
    }
}
