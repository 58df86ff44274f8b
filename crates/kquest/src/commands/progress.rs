//! The `progress` command: per-world completion report.

use crate::catalog::{ContentCatalog, FsCatalog};
use crate::config::GameConfig;
use crate::ui::completion_bar;
use anyhow::Result;
use owo_colors::OwoColorize;
use quest_common::milestones::TOTAL_LEVELS;
use quest_common::ProgressStore;

pub fn run(config: &GameConfig) -> Result<()> {
    let store = ProgressStore::new(config.game.progress_file.clone());
    let (progress, _) = store.load();
    let catalog = FsCatalog::new(config.game.worlds_dir.clone());

    println!();
    println!("{}", "  KubeQuest - Progress Tracker".bright_cyan().bold());
    println!(
        "   {}  {}",
        "Total XP:".cyan(),
        progress.total_xp.yellow()
    );
    println!(
        "   {}  {}/{}",
        "Levels completed:".cyan(),
        progress.completed_levels.len(),
        TOTAL_LEVELS
    );
    println!();

    let mut total_available = 0;
    for world_id in catalog.worlds()? {
        let levels = catalog.levels(&world_id)?;
        let completed = levels
            .iter()
            .filter(|l| progress.is_completed(&l.level_id))
            .count();
        total_available += levels.len();

        let marker = if levels.is_empty() {
            "..".to_string()
        } else if completed == levels.len() {
            "ok".green().to_string()
        } else {
            ">>".cyan().to_string()
        };
        println!("   {} {}", marker, world_id.bright_yellow());
        if levels.is_empty() {
            println!("      {}", "no levels authored yet".dimmed());
        } else {
            println!(
                "      {}  ({}/{})",
                completion_bar(completed, levels.len(), 40),
                completed,
                levels.len()
            );
        }
    }

    println!();
    println!(
        "   {}  {}/{} available levels completed",
        "Overall:".cyan(),
        progress.completed_levels.len(),
        total_available
    );
    println!();
    Ok(())
}
