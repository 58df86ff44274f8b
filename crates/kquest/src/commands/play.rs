//! The `play` command: top-level menu, interrupt handling, and the campaign
//! run itself.

use crate::catalog::{ContentCatalog, FsCatalog, LevelRef};
use crate::config::GameConfig;
use crate::journal::Journal;
use crate::orchestrator::{Orchestrator, OrchestratorConfig, ShellRunner};
use crate::safety::{NamespaceGuard, NoopSafety, SafetyPolicy};
use crate::sequencer::{Campaign, CampaignEnd};
use crate::session::{Prompter, SessionOutcome};
use crate::ui::{self, TerminalPrompter};
use anyhow::Result;
use owo_colors::OwoColorize;
use quest_common::progress::UNNAMED_PLAYER;
use quest_common::{LoadReport, PlayerProgress, ProgressStore, QuestError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

type LiveCampaign = Campaign<FsCatalog, ShellRunner, TerminalPrompter>;

pub async fn run(config: GameConfig) -> Result<()> {
    let store = ProgressStore::new(config.game.progress_file.clone());
    let (mut progress, report) = store.load();
    if let LoadReport::RecoveredCorrupt { detail } = &report {
        ui::warn_recovered_store(detail);
    }

    let mut prompter = TerminalPrompter::new();

    // First-run setup: the sentinel name means the player never introduced
    // themselves.
    if progress.player_name == UNNAMED_PLAYER {
        println!();
        let name = prompter.ask_line("Enter your name:", UNNAMED_PLAYER);
        progress.player_name = name;
        store.save(&progress)?;
        println!(
            "   {}",
            format!("Welcome, {}!", progress.player_name).green()
        );
    }

    ui::welcome(&progress, config.game.safety_guard);

    let has_progress = progress.has_any_progress();
    let mut choice = MenuChoice::Continue;
    if has_progress {
        choice = match resume_menu(&mut prompter, &progress) {
            Some(c) => c,
            None => {
                ui::goodbye();
                return Ok(());
            }
        };
        if choice == MenuChoice::Restart {
            progress.reset();
            store.save(&progress)?;
        }
    } else if !prompter.confirm("Ready to start your training?", true) {
        ui::goodbye();
        return Ok(());
    }

    let progress = Arc::new(Mutex::new(progress));
    let cancel = Arc::new(AtomicBool::new(false));
    spawn_interrupt_watcher(&config, progress.clone(), cancel.clone());

    let safety: Box<dyn SafetyPolicy> = if config.game.safety_guard {
        Box::new(NamespaceGuard::new(
            &config.game.namespace,
            &config.game.kubectl_bin,
        ))
    } else {
        Box::new(NoopSafety)
    };

    let mut campaign: LiveCampaign = Campaign {
        catalog: FsCatalog::new(config.game.worlds_dir.clone()),
        orchestrator: Orchestrator::with_safety(
            ShellRunner,
            OrchestratorConfig::from_game(&config),
            safety,
        ),
        store,
        progress,
        journal: Journal::open(),
        prompter,
        cancel,
        check_seconds: config.validation.check_seconds,
    };

    let end = match choice {
        MenuChoice::Specific => play_specific_levels(&mut campaign).await?,
        MenuChoice::Continue | MenuChoice::Restart => campaign.run_campaign().await?,
    };

    campaign.persist_or_warn();
    match end {
        CampaignEnd::Finished => {
            let progress = campaign.progress.lock().unwrap().clone();
            ui::campaign_complete(&progress);
        }
        CampaignEnd::Stopped | CampaignEnd::Quit => ui::goodbye(),
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    Continue,
    Specific,
    Restart,
}

/// Resume menu shown when there is progress to come back to. Returns None
/// for quit. Plain loop with validated-input retry.
fn resume_menu(prompter: &mut TerminalPrompter, progress: &PlayerProgress) -> Option<MenuChoice> {
    println!("{}", "   Choose an option:".cyan());
    println!("     {}  Continue from where you left off", "[1]".cyan());
    println!("     {}  Play a specific level", "[2]".cyan());
    println!("     {}  Start from the beginning", "[3]".cyan());
    println!("     {}  Quit", "[q]".cyan());
    println!();
    if let Some(level) = &progress.current_level {
        println!(
            "   {}",
            format!("Resume point: {}", level).dimmed()
        );
    }

    loop {
        let input = prompter.ask_line("Your choice:", "1");
        match input.as_str() {
            "1" => return Some(MenuChoice::Continue),
            "2" => return Some(MenuChoice::Specific),
            "3" => return Some(MenuChoice::Restart),
            "q" | "Q" => return None,
            other => {
                println!(
                    "   {}  '{}' is not an option, enter 1, 2, 3 or q",
                    "!".yellow(),
                    other
                );
            }
        }
    }
}

/// The "play a specific level" flow: a numbered list over every world,
/// loop-with-retry selection, then per-level play with the option to keep
/// picking or continue the campaign from there.
async fn play_specific_levels(campaign: &mut LiveCampaign) -> Result<CampaignEnd> {
    loop {
        let entries = collect_all_levels(&campaign.catalog)?;
        if entries.is_empty() {
            println!("   {}", "No levels found in the worlds directory.".yellow());
            return Ok(CampaignEnd::Stopped);
        }

        println!();
        println!("{}", "   Select a level to play".bright_cyan().bold());
        let mut last_world = "";
        for (i, level) in entries.iter().enumerate() {
            if level.world_id != last_world {
                println!();
                println!("   {}", level.world_id.bright_yellow());
                last_world = &level.world_id;
            }
            let marker = if campaign
                .progress
                .lock()
                .unwrap()
                .is_completed(&level.level_id)
            {
                "[x]".green().to_string()
            } else {
                "[ ]".dimmed().to_string()
            };
            println!("     {} {} {}", format!("[{:2}]", i + 1).cyan(), marker, level.level_id);
        }
        println!();

        let input = campaign.prompter.ask_line("Choose a level (or 'q'):", "q");
        if input.eq_ignore_ascii_case("q") {
            return Ok(CampaignEnd::Stopped);
        }
        let Some(index) = input
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|i| *i < entries.len())
        else {
            println!(
                "   {}  Enter a number between 1 and {}",
                "!".yellow(),
                entries.len()
            );
            continue;
        };
        let level = entries[index].clone();

        campaign
            .progress
            .lock()
            .unwrap()
            .set_position(&level.world_id, &level.level_id);
        campaign.persist_or_warn();

        match campaign.play_level(&level).await {
            Ok(SessionOutcome::Quit) => return Ok(CampaignEnd::Quit),
            Ok(_) => {}
            Err(QuestError::Content(detail)) => {
                warn!("skipping {}: {}", level.level_id, detail);
                ui::skipped_unreadable_level(&level.level_id, &detail);
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        println!("{}", "   What next?".cyan());
        println!("     {}  Play another level", "[1]".cyan());
        println!("     {}  Continue the campaign from here", "[2]".cyan());
        println!("     {}  Quit", "[q]".cyan());
        loop {
            let next = campaign.prompter.ask_line("Your choice:", "q");
            match next.as_str() {
                "1" => break,
                "2" => return campaign.run_campaign().await.map_err(Into::into),
                "q" | "Q" => return Ok(CampaignEnd::Stopped),
                other => {
                    println!(
                        "   {}  '{}' is not an option, enter 1, 2 or q",
                        "!".yellow(),
                        other
                    );
                }
            }
        }
    }
}

fn collect_all_levels(catalog: &FsCatalog) -> Result<Vec<LevelRef>> {
    let mut entries = Vec::new();
    for world_id in catalog.worlds()? {
        entries.extend(catalog.levels(&world_id)?);
    }
    Ok(entries)
}

/// One final save on any terminating signal; a deliberate or interrupted
/// exit is never an error, so the process still leaves with status 0.
fn spawn_interrupt_watcher(
    config: &GameConfig,
    progress: Arc<Mutex<PlayerProgress>>,
    cancel: Arc<AtomicBool>,
) {
    let store = ProgressStore::new(config.game.progress_file.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.store(true, Ordering::Relaxed);
            let snapshot = progress.lock().unwrap().clone();
            if let Err(e) = store.save(&snapshot) {
                eprintln!("warning: could not save progress on interrupt: {}", e);
            }
            eprintln!("\nGame interrupted. Progress saved!");
            std::process::exit(0);
        }
    });
}
