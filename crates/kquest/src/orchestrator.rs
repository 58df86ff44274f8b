//! External-process orchestration: environment setup, validation verdicts,
//! and status polling.
//!
//! Every invocation runs under an explicit timeout and comes back as a
//! result value - nothing in here returns `Err` for an external-process
//! failure, and a timeout is its own status rather than a masked failure.
//! All calls are serialized through one internal lock so at most one
//! external command is in flight against the shared namespace.

use crate::catalog::LevelRef;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};

/// Maximum captured output per stream (prevents a chatty script from
/// ballooning memory).
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Resource listings queried by the status poll, in priority order.
const STATUS_RESOURCE_TYPES: &[&str] = &[
    "pods",
    "deployments",
    "services",
    "ingress",
    "pvc",
    "configmaps",
];

/// Summaries shown per resource type.
const STATUS_PER_TYPE: usize = 2;
/// Total summaries after which the poll stops early.
const STATUS_TARGET: usize = 3;

// ============================================================================
// Command execution
// ============================================================================

/// One external command to run.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: None,
            timeout,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Rendering for logs and fakes: `program arg1 arg2`.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// How an external command concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Ran and exited 0.
    Success,
    /// Ran and exited non-zero.
    NonZeroExit,
    /// Did not finish inside the deadline.
    Timeout,
    /// Could not be started at all.
    LaunchFailed,
}

impl CommandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NonZeroExit => "non-zero exit",
            Self::Timeout => "timeout",
            Self::LaunchFailed => "launch failed",
        }
    }
}

/// Captured result of an external command.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub status: CommandStatus,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.status == CommandStatus::Success
    }

    /// stdout and stderr joined for player-facing display.
    pub fn combined_output(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            ("", "") => String::new(),
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }
}

/// Seam between the orchestrator and the operating system. Production uses
/// `ShellRunner`; tests use `ScriptedRunner` with canned outcomes.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: CommandSpec) -> CommandOutcome;
}

/// Runs real processes, blocking in a worker thread under a tokio timeout.
#[derive(Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, spec: CommandSpec) -> CommandOutcome {
        let start = Instant::now();
        let deadline = spec.timeout;
        let display_str = spec.display();

        let handle = tokio::task::spawn_blocking(move || execute_blocking(&spec));
        match timeout(deadline, handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!("command task error for {}: {}", display_str, e);
                CommandOutcome {
                    status: CommandStatus::LaunchFailed,
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: format!("task error: {}", e),
                    duration_ms: start.elapsed().as_millis() as u64,
                }
            }
            Err(_) => {
                warn!("command timeout after {:?}: {}", deadline, display_str);
                CommandOutcome {
                    status: CommandStatus::Timeout,
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: format!("timed out after {}s", deadline.as_secs()),
                    duration_ms: deadline.as_millis() as u64,
                }
            }
        }
    }
}

fn execute_blocking(spec: &CommandSpec) -> CommandOutcome {
    let start = Instant::now();
    let mut command = std::process::Command::new(&spec.program);
    command.args(&spec.args);
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }

    match command.output() {
        Ok(output) => {
            let exit_code = output.status.code().unwrap_or(-1);
            CommandOutcome {
                status: if output.status.success() {
                    CommandStatus::Success
                } else {
                    CommandStatus::NonZeroExit
                },
                exit_code,
                stdout: truncate_output(&output.stdout),
                stderr: truncate_output(&output.stderr),
                duration_ms: start.elapsed().as_millis() as u64,
            }
        }
        Err(e) => CommandOutcome {
            status: CommandStatus::LaunchFailed,
            exit_code: -1,
            stdout: String::new(),
            stderr: format!("failed to launch {}: {}", spec.program, e),
            duration_ms: start.elapsed().as_millis() as u64,
        },
    }
}

fn truncate_output(bytes: &[u8]) -> String {
    let slice = if bytes.len() > MAX_OUTPUT_BYTES {
        &bytes[..MAX_OUTPUT_BYTES]
    } else {
        bytes
    };
    String::from_utf8_lossy(slice).to_string()
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Timeouts and target namespace, owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub namespace: String,
    pub kubectl_bin: String,
    pub setup_timeout: Duration,
    pub validation_timeout: Duration,
    pub status_timeout: Duration,
}

impl OrchestratorConfig {
    pub fn from_game(config: &crate::config::GameConfig) -> Self {
        Self {
            namespace: config.game.namespace.clone(),
            kubectl_bin: config.game.kubectl_bin.clone(),
            setup_timeout: Duration::from_secs(config.validation.setup_timeout_secs),
            validation_timeout: Duration::from_secs(config.validation.timeout_secs),
            status_timeout: Duration::from_secs(config.validation.status_timeout_secs),
        }
    }
}

/// Outcome of the environment setup phase. Setup never aborts a session;
/// anything that went wrong is carried as warnings for display.
#[derive(Debug, Clone, Default)]
pub struct SetupReport {
    pub used_setup_script: bool,
    pub warnings: Vec<String>,
}

/// Verdict of a level's validation script.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub passed: bool,
    /// Script output, surfaced verbatim - the primary feedback channel.
    pub output: String,
    pub status: CommandStatus,
    pub exit_code: i32,
    pub duration_ms: u64,
}

pub struct Orchestrator<R: CommandRunner> {
    runner: R,
    config: OrchestratorConfig,
    safety: Box<dyn crate::safety::SafetyPolicy>,
    /// At most one external command in flight against the namespace.
    gate: tokio::sync::Mutex<()>,
}

impl<R: CommandRunner> Orchestrator<R> {
    /// Orchestrator with the default namespace guard.
    pub fn new(runner: R, config: OrchestratorConfig) -> Self {
        let safety = Box::new(crate::safety::NamespaceGuard::new(
            &config.namespace,
            &config.kubectl_bin,
        ));
        Self::with_safety(runner, config, safety)
    }

    /// Orchestrator with an explicit safety policy - the capability is a
    /// constructor choice, `NoopSafety` when the guard is switched off.
    pub fn with_safety(
        runner: R,
        config: OrchestratorConfig,
        safety: Box<dyn crate::safety::SafetyPolicy>,
    ) -> Self {
        Self {
            runner,
            config,
            safety,
            gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn run_gated(&self, spec: CommandSpec) -> CommandOutcome {
        if let Err(reason) = self.safety.permits(&spec) {
            warn!("safety guard blocked {}: {}", spec.display(), reason);
            return CommandOutcome {
                status: CommandStatus::LaunchFailed,
                exit_code: -1,
                stdout: String::new(),
                stderr: format!("blocked by safety guard: {}", reason),
                duration_ms: 0,
            };
        }
        let _guard = self.gate.lock().await;
        self.runner.run(spec).await
    }

    fn kubectl(&self, args: &[&str], timeout: Duration) -> CommandSpec {
        CommandSpec::new(&self.config.kubectl_bin, args, timeout)
    }

    /// Reset the shared namespace and deploy the level's broken resources.
    ///
    /// Idempotent: delete-if-exists then create, then either the level's
    /// setup script (when the level needs pre-built history) or its
    /// declarative broken resource file. Individual command failures are
    /// warnings, not errors - a half-broken environment may itself be the
    /// diagnostic content.
    pub async fn run_setup(&self, level: &LevelRef) -> SetupReport {
        let mut report = SetupReport::default();
        let ns = self.config.namespace.clone();

        let delete = self
            .run_gated(self.kubectl(
                &["delete", "namespace", ns.as_str(), "--ignore-not-found"],
                self.config.setup_timeout,
            ))
            .await;
        if !delete.success() {
            report.warnings.push(format!(
                "namespace delete: {} ({})",
                delete.status.as_str(),
                delete.combined_output()
            ));
        }

        let create = self
            .run_gated(
                self.kubectl(&["create", "namespace", ns.as_str()], self.config.setup_timeout),
            )
            .await;
        if !create.success() {
            report.warnings.push(format!(
                "namespace create: {} ({})",
                create.status.as_str(),
                create.combined_output()
            ));
        }

        let setup_script = level.dir.join("setup.sh");
        let outcome = if setup_script.is_file() {
            report.used_setup_script = true;
            info!("running setup script for {}", level.level_id);
            self.run_gated(
                CommandSpec::new("sh", &["setup.sh"], self.config.setup_timeout)
                    .in_dir(&level.dir),
            )
            .await
        } else {
            self.run_gated(
                self.kubectl(&["apply", "-f", "broken.yaml"], self.config.setup_timeout)
                    .in_dir(&level.dir),
            )
            .await
        };

        if !outcome.success() {
            warn!(
                "setup for {} finished with {}: {}",
                level.level_id,
                outcome.status.as_str(),
                outcome.stderr.trim()
            );
            report.warnings.push(format!(
                "deploy: {} ({})",
                outcome.status.as_str(),
                outcome.combined_output()
            ));
        }

        report
    }

    /// Run the level's validation script. Exit 0 is the only pass signal;
    /// everything else - non-zero exit, launch failure, timeout - is a fail
    /// with its own status and the captured output as explanation.
    pub async fn run_validation(&self, level: &LevelRef) -> ValidationResult {
        let outcome = self
            .run_gated(
                CommandSpec::new("sh", &["validate.sh"], self.config.validation_timeout)
                    .in_dir(&level.dir),
            )
            .await;

        let output = match outcome.status {
            CommandStatus::Timeout => format!(
                "Validation timed out after {}s. The check never finished - the environment may still be converging.",
                self.config.validation_timeout.as_secs()
            ),
            _ => outcome.combined_output(),
        };

        info!(
            "validation for {}: {} in {}ms",
            level.level_id,
            outcome.status.as_str(),
            outcome.duration_ms
        );

        ValidationResult {
            passed: outcome.success(),
            output,
            status: outcome.status,
            exit_code: outcome.exit_code,
            duration_ms: outcome.duration_ms,
        }
    }

    /// One status snapshot: a bounded sweep over resource-type listings,
    /// up to two summaries per type, stopping early at three total. Errors
    /// and timeouts yield a neutral line - this is observability, never a
    /// correctness gate.
    pub async fn snapshot_status(&self) -> String {
        let mut summaries: Vec<String> = Vec::new();

        for &resource_type in STATUS_RESOURCE_TYPES {
            if summaries.len() >= STATUS_TARGET {
                break;
            }
            let outcome = self
                .run_gated(self.kubectl(
                    &[
                        "get",
                        resource_type,
                        "-n",
                        self.config.namespace.as_str(),
                        "--no-headers",
                    ],
                    self.config.status_timeout,
                ))
                .await;

            if !outcome.success() {
                continue;
            }
            for line in outcome.stdout.lines().take(STATUS_PER_TYPE) {
                if let Some(summary) = summarize_listing_line(resource_type, line) {
                    summaries.push(summary);
                }
            }
        }

        if summaries.is_empty() {
            "checking...".to_string()
        } else {
            summaries.truncate(STATUS_TARGET);
            summaries.join(" | ")
        }
    }

    /// Fixed-interval, fixed-duration monitoring loop for the `check`
    /// action. The cancel flag is consulted every iteration so a quit or
    /// interrupt is honored promptly mid-poll.
    pub async fn monitor<F>(&self, seconds: u64, cancel: &AtomicBool, mut sink: F)
    where
        F: FnMut(&str),
    {
        for _ in 0..seconds {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            let line = self.snapshot_status().await;
            sink(&line);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

/// Turn one `--no-headers` listing line into a short human summary.
fn summarize_listing_line(resource_type: &str, line: &str) -> Option<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }
    let name = parts[0];
    let second = parts[1];
    let summary = match resource_type {
        "pods" => format!("Pod {}: {}", name, second),
        "deployments" => format!("Deploy {}: {}", name, second),
        "services" => format!("Svc {}: {}", name, second),
        "ingress" => format!("Ingress {}: {}", name, parts.get(2).unwrap_or(&"?")),
        "pvc" => format!("PVC {}: {}", name, second),
        "configmaps" => format!("CM {}", name),
        other => format!("{} {}: {}", other, name, second),
    };
    Some(summary)
}

// ============================================================================
// Scripted runner (testing)
// ============================================================================

struct ScriptedRule {
    needle: String,
    outcome: CommandOutcome,
    once: bool,
}

/// Canned command runner: matches each invocation against registered rules
/// in order, falling back to a default outcome. One-shot rules are consumed
/// on first match, so a test can script "fail once, then pass". Records
/// every spec it saw for assertions.
pub struct ScriptedRunner {
    rules: std::sync::Mutex<Vec<ScriptedRule>>,
    default: CommandOutcome,
    seen: std::sync::Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            rules: std::sync::Mutex::new(Vec::new()),
            default: outcome_ok(""),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Respond with `outcome` for any command whose display contains
    /// `needle`.
    pub fn on(self, needle: &str, outcome: CommandOutcome) -> Self {
        self.rules.lock().unwrap().push(ScriptedRule {
            needle: needle.to_string(),
            outcome,
            once: false,
        });
        self
    }

    /// Like `on`, but the rule is consumed by its first match.
    pub fn on_once(self, needle: &str, outcome: CommandOutcome) -> Self {
        self.rules.lock().unwrap().push(ScriptedRule {
            needle: needle.to_string(),
            outcome,
            once: true,
        });
        self
    }

    pub fn default_outcome(mut self, outcome: CommandOutcome) -> Self {
        self.default = outcome;
        self
    }

    pub fn commands_seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: CommandSpec) -> CommandOutcome {
        let display = spec.display();
        self.seen.lock().unwrap().push(display.clone());
        let mut rules = self.rules.lock().unwrap();
        if let Some(pos) = rules.iter().position(|r| display.contains(r.needle.as_str())) {
            let outcome = rules[pos].outcome.clone();
            if rules[pos].once {
                rules.remove(pos);
            }
            return outcome;
        }
        self.default.clone()
    }
}

/// Successful outcome with the given stdout.
pub fn outcome_ok(stdout: &str) -> CommandOutcome {
    CommandOutcome {
        status: CommandStatus::Success,
        exit_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
        duration_ms: 1,
    }
}

/// Non-zero exit with the given combined output.
pub fn outcome_fail(exit_code: i32, output: &str) -> CommandOutcome {
    CommandOutcome {
        status: CommandStatus::NonZeroExit,
        exit_code,
        stdout: output.to_string(),
        stderr: String::new(),
        duration_ms: 1,
    }
}

/// Timeout outcome.
pub fn outcome_timeout() -> CommandOutcome {
    CommandOutcome {
        status: CommandStatus::Timeout,
        exit_code: -1,
        stdout: String::new(),
        stderr: "timed out".to_string(),
        duration_ms: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config() -> OrchestratorConfig {
        OrchestratorConfig {
            namespace: "kquest".to_string(),
            kubectl_bin: "kubectl".to_string(),
            setup_timeout: Duration::from_secs(5),
            validation_timeout: Duration::from_secs(5),
            status_timeout: Duration::from_secs(1),
        }
    }

    fn level() -> LevelRef {
        LevelRef {
            world_id: "world-1-basics".to_string(),
            level_id: "level-1-pods".to_string(),
            dir: PathBuf::from("/nonexistent/level-1-pods"),
        }
    }

    #[tokio::test]
    async fn test_validation_pass_on_exit_zero() {
        let runner = ScriptedRunner::new().on("validate.sh", outcome_ok("All checks passed"));
        let orch = Orchestrator::new(runner, test_config());

        let result = orch.run_validation(&level()).await;
        assert!(result.passed);
        assert_eq!(result.status, CommandStatus::Success);
        assert_eq!(result.output, "All checks passed");
    }

    #[tokio::test]
    async fn test_validation_fail_on_nonzero_exit() {
        let runner =
            ScriptedRunner::new().on("validate.sh", outcome_fail(1, "pod is still CrashLooping"));
        let orch = Orchestrator::new(runner, test_config());

        let result = orch.run_validation(&level()).await;
        assert!(!result.passed);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("CrashLooping"));
    }

    #[tokio::test]
    async fn test_validation_timeout_is_distinct_status() {
        let runner = ScriptedRunner::new().on("validate.sh", outcome_timeout());
        let orch = Orchestrator::new(runner, test_config());

        let result = orch.run_validation(&level()).await;
        assert!(!result.passed);
        assert_eq!(result.status, CommandStatus::Timeout);
        assert!(result.output.contains("timed out"));
    }

    #[tokio::test]
    async fn test_setup_resets_namespace_then_applies() {
        let runner = ScriptedRunner::new();
        let orch = Orchestrator::new(runner, test_config());

        let report = orch.run_setup(&level()).await;
        assert!(!report.used_setup_script);
        assert!(report.warnings.is_empty());

        let seen = orch.runner.commands_seen();
        assert!(seen[0].contains("delete namespace kquest"));
        assert!(seen[1].contains("create namespace kquest"));
        assert!(seen[2].contains("apply -f broken.yaml"));
    }

    #[tokio::test]
    async fn test_setup_failure_is_warning_not_error() {
        let runner = ScriptedRunner::new()
            .on("apply", outcome_fail(1, "error validating broken.yaml"));
        let orch = Orchestrator::new(runner, test_config());

        let report = orch.run_setup(&level()).await;
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("error validating"));
    }

    #[tokio::test]
    async fn test_snapshot_stops_early_at_target() {
        let runner = ScriptedRunner::new()
            .on(
                "get pods",
                outcome_ok("web-1 Running 0 5m\nweb-2 Pending 0 5m\nweb-3 Running 0 5m"),
            )
            .on("get deployments", outcome_ok("web 2/2 2 2 5m"));
        let orch = Orchestrator::new(runner, test_config());

        let line = orch.snapshot_status().await;
        assert_eq!(line, "Pod web-1: Running | Pod web-2: Pending | Deploy web: 2/2");

        // Early stop: services/ingress/pvc/configmaps never queried.
        let seen = orch.runner.commands_seen();
        assert!(!seen.iter().any(|c| c.contains("get services")));
    }

    #[tokio::test]
    async fn test_blocked_command_never_reaches_runner() {
        let runner = ScriptedRunner::new();
        let guard = Box::new(crate::safety::NamespaceGuard::new("elsewhere", "kubectl"));
        let orch = Orchestrator::with_safety(runner, test_config(), guard);

        let report = orch.run_setup(&level()).await;
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("blocked by safety guard")));
        // The vetoed namespace delete was never executed.
        assert!(!orch
            .runner
            .commands_seen()
            .iter()
            .any(|c| c.contains("delete namespace")));
    }

    #[tokio::test]
    async fn test_snapshot_errors_yield_neutral_line() {
        let runner = ScriptedRunner::new().default_outcome(outcome_timeout());
        let orch = Orchestrator::new(runner, test_config());

        assert_eq!(orch.snapshot_status().await, "checking...");
    }

    #[tokio::test]
    async fn test_monitor_honors_cancel_flag() {
        let runner = ScriptedRunner::new();
        let orch = Orchestrator::new(runner, test_config());

        let cancel = AtomicBool::new(true);
        let mut lines = 0;
        orch.monitor(10, &cancel, |_| lines += 1).await;
        assert_eq!(lines, 0);
    }

    #[tokio::test]
    async fn test_shell_runner_reports_launch_failure() {
        let runner = ShellRunner;
        let spec = CommandSpec::new(
            "definitely-not-a-real-binary-kq",
            &[],
            Duration::from_secs(2),
        );
        let outcome = runner.run(spec).await;
        assert_eq!(outcome.status, CommandStatus::LaunchFailed);
        assert_eq!(outcome.exit_code, -1);
    }

    #[tokio::test]
    async fn test_shell_runner_captures_exit_code() {
        let runner = ShellRunner;
        let spec = CommandSpec::new("sh", &["-c", "echo broken >&2; exit 3"], Duration::from_secs(5));
        let outcome = runner.run(spec).await;
        assert_eq!(outcome.status, CommandStatus::NonZeroExit);
        assert_eq!(outcome.exit_code, 3);
        assert!(outcome.stderr.contains("broken"));
    }

    #[tokio::test]
    async fn test_shell_runner_times_out() {
        let runner = ShellRunner;
        let spec = CommandSpec::new("sh", &["-c", "sleep 5"], Duration::from_millis(100));
        let outcome = runner.run(spec).await;
        assert_eq!(outcome.status, CommandStatus::Timeout);
    }
}
