//! The `reset` command.
//!
//! Plain reset zeroes XP and completions but keeps the player's name and
//! record. `--hard` deletes the progress file and attempt journal outright,
//! so the next run is a first run.

use crate::config::GameConfig;
use crate::session::Prompter;
use crate::ui::TerminalPrompter;
use anyhow::Result;
use owo_colors::OwoColorize;
use quest_common::fsutil::safe_delete;
use quest_common::ProgressStore;

pub fn run(config: &GameConfig, hard: bool) -> Result<()> {
    let mut prompter = TerminalPrompter::new();
    let store = ProgressStore::new(config.game.progress_file.clone());
    let (mut progress, _) = store.load();

    println!();
    println!(
        "   {}  {} levels completed, {} XP",
        "Current:".cyan(),
        progress.completed_levels.len(),
        progress.total_xp
    );
    let question = if hard {
        "Delete the progress record and attempt journal entirely?"
    } else {
        "Erase your XP and completed levels?"
    };
    if !prompter.confirm(question, false) {
        println!("   {}", "Nothing was changed.".dimmed());
        return Ok(());
    }

    if hard {
        safe_delete(store.path())?;
        if let Ok(journal) = std::env::var("KQUEST_JOURNAL") {
            safe_delete(std::path::Path::new(&journal))?;
        }
        println!("   {}", "Progress record deleted.".green());
    } else {
        progress.reset();
        store.save(&progress)?;
        println!("   {}", "Progress reset. Your name was kept.".green());
    }
    Ok(())
}
