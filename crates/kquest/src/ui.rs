//! Terminal presentation and the interactive prompt boundary.
//!
//! All player-visible text funnels through here: the welcome banner, mission
//! briefings, hint/debrief panels, victory and milestone celebrations, and
//! the validated-input prompt loops. The engine's state machines never read
//! stdin themselves - they go through the `Prompter` seam, so tests drive
//! them with `ScriptedPrompter`.

use crate::session::{Action, Prompter};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use quest_common::milestones::TOTAL_LEVELS;
use quest_common::{Milestone, Mission, PlayerProgress};
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Rotating supportive messages shown after a failed attempt. Validation
/// failure is the routine case, never phrased as a system error.
const ENCOURAGEMENTS: &[&str] = &[
    "Don't give up! You're learning!",
    "Every mistake teaches you something!",
    "Try the 'guide' option for step-by-step help!",
    "Use 'check' to see real-time status!",
];

pub fn encouragement(attempts: u32) -> &'static str {
    ENCOURAGEMENTS[attempts as usize % ENCOURAGEMENTS.len()]
}

pub fn show_encouragement(attempts: u32) {
    println!("   {}", encouragement(attempts).yellow());
    println!();
}

/// Level briefly shown then skipped because its content is unusable.
pub fn skipped_unreadable_level(level_id: &str, detail: &str) {
    println!();
    println!(
        "   {} {}",
        "~".yellow(),
        format!("Skipping {}: level content is unreadable", level_id).dimmed()
    );
    println!("   {}", detail.dimmed());
    println!();
}

/// Fixed-width completion bar: `[####......] 40%`.
pub fn completion_bar(completed: usize, total: usize, width: usize) -> String {
    let total = total.max(1);
    let filled = (completed.min(total) * width) / total;
    let pct = (completed.min(total) * 100) / total;
    format!(
        "[{}{}] {}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        pct
    )
}

// ============================================================================
// Banners and panels
// ============================================================================

/// Clear the terminal before a full-screen panel, as the game does between
/// scenes. Failure (not a TTY) is ignored.
pub fn clear_screen() {
    let _ = console::Term::stdout().clear_screen();
}

pub fn welcome(progress: &PlayerProgress, safety_on: bool) {
    clear_screen();
    println!();
    println!("{}", "  == K U B E Q U E S T ==".bright_cyan().bold());
    println!("{}", "  Kubernetes adventure game".dimmed());
    println!();
    println!(
        "   {}  {}",
        "Player:".cyan(),
        progress.player_name.bright_white().bold()
    );
    println!("   {}  {}", "Total XP:".cyan(), progress.total_xp.yellow());
    println!(
        "   {}  {}/{}",
        "Cleared:".cyan(),
        progress.completed_levels.len(),
        TOTAL_LEVELS
    );
    println!(
        "   {}  {}",
        "Progress:".cyan(),
        completion_bar(progress.completed_levels.len(), TOTAL_LEVELS, 20)
    );
    if let Some(level) = &progress.current_level {
        println!("   {}  {}", "Mission:".cyan(), level.bright_white());
    }
    let shields = if safety_on {
        "ACTIVE".green().to_string()
    } else {
        "DISABLED".red().to_string()
    };
    println!("   {}  {}", "Shields:".cyan(), shields);
    println!();
}

/// Shown when the progress file was unreadable and has been replaced,
/// with the original set aside.
pub fn warn_recovered_store(detail: &str) {
    println!();
    println!(
        "{}  {}",
        "!".yellow().bold(),
        "Your progress file could not be read and was replaced with a fresh one."
            .bright_white()
    );
    println!(
        "   {}",
        "The unreadable original was kept next to it with a .corrupt suffix.".dimmed()
    );
    println!("   {}", detail.dimmed());
    println!();
}

pub fn briefing(level_id: &str, mission: &Mission, total_xp: u64) {
    clear_screen();
    println!();
    println!(
        "{}",
        format!("  -- Level: {} --", level_id).bright_cyan().bold()
    );
    println!();
    println!("   {}  {}", "Mission:".cyan(), mission.name.bright_white().bold());
    println!("   {}", mission.description);
    println!();
    println!("   {}  {}", "Objective:".cyan(), mission.objective);
    println!("   {}  {} XP", "Reward:".cyan(), mission.xp.yellow());

    let mut meta = format!("{} {}", mission.difficulty.icon(), mission.difficulty);
    if let Some(time) = &mission.expected_time {
        meta.push_str(&format!("  |  ~{}", time));
    }
    if !mission.concepts.is_empty() {
        meta.push_str(&format!("  |  {}", mission.concepts.join(", ")));
    }
    println!("   {}  {}", "Intel:".cyan(), meta.dimmed());
    println!("   {}  {} XP so far", "Bank:".cyan(), total_xp);
    println!();
}

pub fn deploy_warnings(warnings: &[String]) {
    for warning in warnings {
        println!("   {} {}", "~".yellow(), format!("setup warning: {}", warning).dimmed());
    }
}

pub fn mission_deployed() {
    println!();
    println!(
        "{}  {}",
        "!".bright_red().bold(),
        "MISSION DEPLOYED WITH BUGS".bright_red().bold()
    );
    println!("   Something is broken in the cluster. Find it and fix it.");
    println!();
}

pub fn terminal_instructions() {
    println!("{}", "   OPEN A SECOND TERMINAL".bright_yellow().bold());
    println!("   1. Open a new terminal window or tab");
    println!("   2. Fix the issue with kubectl (edit, scale, patch, apply...)");
    println!("   3. Come back here and choose 'validate' or 'check'");
    println!();
}

/// Spinner shown while the environment is being reset and deployed.
pub fn deploy_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("   {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Deploying mission environment...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

pub fn show_hint(tier: usize, text: &str) {
    println!();
    println!("   {} {}", format!("Hint {}:", tier).bright_yellow().bold(), text);
    println!();
}

pub fn all_hints_unlocked(hints: &[(usize, String)]) {
    println!();
    println!("{}", "   All hints are already unlocked:".yellow());
    for (tier, text) in hints {
        println!("   {} {}", format!("Hint {}:", tier).bright_yellow(), text);
    }
    println!();
}

pub fn no_content(label: &str) {
    println!();
    println!(
        "   {} {}",
        "~".yellow(),
        format!("No {} available for this level", label).dimmed()
    );
    println!();
}

pub fn show_document(title: &str, text: &str) {
    println!();
    println!("{}", format!("   --- {} ---", title).bright_green().bold());
    for line in text.lines() {
        println!("   {}", line);
    }
    println!("{}", "   ---".bright_green());
    println!();
}

pub fn status_line(line: &str) {
    let now = chrono::Local::now().format("%H:%M:%S");
    println!("   {} {}", now.to_string().dimmed(), line.yellow());
}

pub fn monitoring_start(seconds: u64) {
    println!();
    println!(
        "   {}",
        format!("Watching resource status for {} seconds...", seconds).yellow()
    );
}

pub fn attempt_header(attempt: u32) {
    println!();
    println!("   {}", format!("ATTEMPT #{}", attempt).dimmed());
    println!("   {}", "Validating your solution...".yellow());
}

pub fn validation_passed(output: &str) {
    println!();
    println!("{}  {}", "+".bright_green().bold(), "MISSION COMPLETE".bright_green().bold());
    if !output.trim().is_empty() {
        for line in output.trim().lines() {
            println!("   {}", line.green());
        }
    }
    println!();
}

pub fn validation_failed(output: &str, timed_out: bool) {
    println!();
    let headline = if timed_out {
        "Validation timed out"
    } else {
        "Not quite there yet..."
    };
    println!("{}  {}", "-".red().bold(), headline.red().bold());
    if !output.trim().is_empty() {
        for line in output.trim().lines() {
            println!("   {}", line.red());
        }
    }
    println!();
}

pub fn victory(xp_earned: u64, already_complete: bool, total_xp: u64, attempts: u32) {
    if already_complete {
        println!(
            "   {}",
            "Level already cleared before - no additional XP.".dimmed()
        );
    } else {
        println!(
            "   {}",
            format!("+{} XP! Total: {} XP", xp_earned, total_xp)
                .bright_yellow()
                .bold()
        );
    }
    println!("   {}", format!("Cleared in {} attempt(s)", attempts).dimmed());
    println!();
}

pub fn milestone(m: &Milestone) {
    println!();
    println!(
        "{}  {}",
        "*".bright_magenta().bold(),
        format!("MILESTONE: {}", m.title).bright_magenta().bold()
    );
    println!(
        "   {}",
        format!("{} levels cleared", m.threshold).dimmed()
    );
    println!();
}

pub fn world_complete(total_xp: u64) {
    println!();
    println!("{}  {}", "*".bright_green().bold(), "WORLD COMPLETE!".bright_green().bold());
    println!("   {}", format!("Total XP: {}", total_xp).yellow());
    println!();
}

pub fn campaign_complete(progress: &PlayerProgress) {
    println!();
    println!(
        "{}  {}",
        "*".bright_green().bold(),
        "CAMPAIGN COMPLETE - you have cleared every mission!"
            .bright_green()
            .bold()
    );
    println!(
        "   {}",
        format!(
            "{} levels, {} XP. Go break something in production. (Don't.)",
            progress.completed_levels.len(),
            progress.total_xp
        )
        .dimmed()
    );
    println!();
}

pub fn goodbye() {
    println!();
    println!("{}", "Thanks for playing KubeQuest! Progress saved.".yellow());
    println!();
}

// ============================================================================
// Terminal prompter
// ============================================================================

/// Real stdin-backed prompter with validated-input retry loops. Invalid
/// input re-prompts in place; recursion never enters into it.
#[derive(Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }

    fn read_trimmed(&self) -> io::Result<String> {
        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    /// Free-form line with a prompt; empty input falls back to `default`.
    pub fn ask_line(&mut self, prompt: &str, default: &str) -> String {
        print!("   {}  ", prompt.bright_magenta());
        let _ = io::stdout().flush();
        match self.read_trimmed() {
            Ok(line) if !line.is_empty() => line,
            _ => default.to_string(),
        }
    }

    fn print_action_menu(&self) {
        println!("{}", "   ======================================".cyan());
        println!("{}", "   What would you like to do?".bright_cyan().bold());
        for action in Action::ALL {
            println!(
                "     {}  {}",
                format!("{:<9}", action.keyword()).cyan(),
                action.describe().dimmed()
            );
        }
        println!("{}", "   ======================================".cyan());
    }
}

impl Prompter for TerminalPrompter {
    fn action(&mut self) -> Action {
        self.print_action_menu();
        loop {
            print!("   {}  ", "Choose your action:".bright_magenta());
            let _ = io::stdout().flush();
            let input = match self.read_trimmed() {
                Ok(line) => line,
                // stdin closed: treat as a quit so state still gets saved.
                Err(_) => return Action::Quit,
            };
            if input.is_empty() {
                return Action::Check;
            }
            match Action::parse(&input) {
                Some(action) => return action,
                None => {
                    println!(
                        "   {}  Unknown action '{}'. Valid: {}",
                        "!".yellow(),
                        input,
                        Action::ALL
                            .iter()
                            .map(|a| a.keyword())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
            }
        }
    }

    fn confirm(&mut self, message: &str, default_yes: bool) -> bool {
        let suffix = if default_yes { "[Y/n]" } else { "[y/N]" };
        loop {
            print!("   {} {}  ", message.bright_magenta(), suffix.dimmed());
            let _ = io::stdout().flush();
            let input = match self.read_trimmed() {
                Ok(line) => line.to_lowercase(),
                Err(_) => return default_yes,
            };
            match input.as_str() {
                "y" | "yes" => return true,
                "n" | "no" => return false,
                "" => return default_yes,
                _ => {
                    println!("   {}  Please enter 'y' for yes or 'n' for no", "?".yellow());
                }
            }
        }
    }

    fn pause(&mut self) {
        print!("   {}", "Press ENTER to continue".dimmed());
        let _ = io::stdout().flush();
        let _ = self.read_trimmed();
    }
}

// ============================================================================
// Scripted prompter (testing)
// ============================================================================

/// Canned prompter: pops actions and confirm answers from queues. When a
/// queue runs dry it quits (actions) or takes the default (confirms), so a
/// test can never hang on input.
pub struct ScriptedPrompter {
    actions: std::collections::VecDeque<Action>,
    confirms: std::collections::VecDeque<bool>,
}

impl ScriptedPrompter {
    pub fn new(actions: &[Action], confirms: &[bool]) -> Self {
        Self {
            actions: actions.iter().copied().collect(),
            confirms: confirms.iter().copied().collect(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn action(&mut self) -> Action {
        self.actions.pop_front().unwrap_or(Action::Quit)
    }

    fn confirm(&mut self, _message: &str, default_yes: bool) -> bool {
        self.confirms.pop_front().unwrap_or(default_yes)
    }

    fn pause(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_bar_bounds() {
        assert_eq!(completion_bar(0, 50, 10), "[..........] 0%");
        assert_eq!(completion_bar(25, 50, 10), "[#####.....] 50%");
        assert_eq!(completion_bar(50, 50, 10), "[##########] 100%");
        // Out-of-band progress files can overshoot; the bar must not panic.
        assert_eq!(completion_bar(60, 50, 10), "[##########] 100%");
    }

    #[test]
    fn test_encouragement_rotates() {
        assert_ne!(encouragement(1), encouragement(2));
        assert_eq!(encouragement(1), encouragement(5));
    }

    #[test]
    fn test_scripted_prompter_drains_then_defaults() {
        let mut prompter = ScriptedPrompter::new(&[Action::Validate], &[true]);
        assert_eq!(prompter.action(), Action::Validate);
        assert_eq!(prompter.action(), Action::Quit);
        assert!(prompter.confirm("x", false));
        assert!(!prompter.confirm("x", false));
    }
}
