//! Safety guard capability.
//!
//! Whether the guard is present is a constructor choice made from the
//! configuration flag, not a runtime import probe: production wires in
//! `NamespaceGuard`, switching the guard off wires in `NoopSafety`. The
//! guard vetoes engine-issued commands before they launch - destructive
//! kubectl verbs may only touch the game's own namespace.

use crate::orchestrator::CommandSpec;

/// Namespaces engine-issued commands must never delete, even if the game
/// was misconfigured to use one of them.
const PROTECTED_NAMESPACES: &[&str] = &[
    "kube-system",
    "kube-public",
    "kube-node-lease",
    "default",
];

pub trait SafetyPolicy: Send + Sync {
    /// Veto a command before launch. `Err` carries the reason surfaced to
    /// the player.
    fn permits(&self, spec: &CommandSpec) -> Result<(), String>;

    /// Whether the guard is active, for the welcome banner.
    fn active(&self) -> bool;
}

/// Allows everything. Wired in when the guard is switched off.
pub struct NoopSafety;

impl SafetyPolicy for NoopSafety {
    fn permits(&self, _spec: &CommandSpec) -> Result<(), String> {
        Ok(())
    }

    fn active(&self) -> bool {
        false
    }
}

/// Confines destructive kubectl verbs to the game namespace. Level scripts
/// run under `sh` and are the level author's responsibility; only the
/// commands the engine itself issues pass through here.
pub struct NamespaceGuard {
    namespace: String,
    kubectl_bin: String,
}

impl NamespaceGuard {
    pub fn new(namespace: &str, kubectl_bin: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            kubectl_bin: kubectl_bin.to_string(),
        }
    }
}

impl SafetyPolicy for NamespaceGuard {
    fn permits(&self, spec: &CommandSpec) -> Result<(), String> {
        if spec.program != self.kubectl_bin {
            return Ok(());
        }
        if spec.args.first().map(String::as_str) != Some("delete") {
            return Ok(());
        }

        if spec.args.get(1).map(String::as_str) == Some("namespace") {
            let target = spec.args.get(2).map(String::as_str).unwrap_or("");
            if PROTECTED_NAMESPACES.contains(&target) {
                return Err(format!("refusing to delete protected namespace '{}'", target));
            }
            if target != self.namespace {
                return Err(format!(
                    "refusing to delete namespace '{}' (game namespace is '{}')",
                    target, self.namespace
                ));
            }
            return Ok(());
        }

        // Any other delete must be scoped to the game namespace.
        let scoped = spec
            .args
            .iter()
            .position(|a| a == "-n" || a == "--namespace")
            .and_then(|i| spec.args.get(i + 1))
            .map(|ns| ns == &self.namespace)
            .unwrap_or(false);
        if scoped {
            Ok(())
        } else {
            Err(format!(
                "delete outside the '{}' namespace is not allowed",
                self.namespace
            ))
        }
    }

    fn active(&self) -> bool {
        true
    }
}
