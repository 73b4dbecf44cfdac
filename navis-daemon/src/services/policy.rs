//! Approval policies and auto-approval heuristics.
//!
//! Policies are defined at process start and queried by approval type;
//! anything unrecognized falls back to the conservative default.

use regex::Regex;
use std::time::Duration;

use crate::models::ApprovalType;

/// Policy for types with no payload heuristics.
#[derive(Debug, Clone)]
pub struct BasicPolicy {
    pub auto_approve: bool,
    pub timeout: Duration,
}

/// Terminal commands: a dangerous substring rejects outright, even when the
/// command also matches a safe prefix; otherwise only a safe prefix accepts.
#[derive(Debug, Clone)]
pub struct TerminalCommandPolicy {
    pub auto_approve: bool,
    pub timeout: Duration,
    pub safe_prefixes: Vec<String>,
    pub dangerous_substrings: Vec<String>,
}

/// File operations: dangerous path patterns reject, safe patterns accept,
/// a path matching neither is not auto-approved.
#[derive(Debug, Clone)]
pub struct FileOperationPolicy {
    pub auto_approve: bool,
    pub timeout: Duration,
    pub safe_patterns: Vec<Regex>,
    pub dangerous_patterns: Vec<Regex>,
}

/// Per-type policy configuration, one strongly-typed field per known
/// approval type rather than a string-keyed map.
#[derive(Debug, Clone)]
pub struct PolicySet {
    pub pairing: BasicPolicy,
    pub terminal_command: TerminalCommandPolicy,
    pub file_operation: FileOperationPolicy,
    pub network_operation: BasicPolicy,
    pub project_mutation: BasicPolicy,
    pub fallback: BasicPolicy,
}

impl Default for PolicySet {
    fn default() -> Self {
        let compile = |patterns: &[&str]| {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("static policy pattern must compile"))
                .collect()
        };

        Self {
            pairing: BasicPolicy {
                auto_approve: false,
                timeout: Duration::from_secs(300),
            },
            terminal_command: TerminalCommandPolicy {
                auto_approve: true,
                timeout: Duration::from_secs(120),
                safe_prefixes: [
                    "git status",
                    "git diff",
                    "git log",
                    "git branch",
                    "ls",
                    "pwd",
                    "cat ",
                    "echo ",
                    "npm test",
                    "cargo check",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                dangerous_substrings: [
                    "rm -rf", "sudo", "mkfs", "dd if=", "shutdown", "reboot", "&&", "||", ";",
                    "|", "`", "$(", ">",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            },
            file_operation: FileOperationPolicy {
                auto_approve: true,
                timeout: Duration::from_secs(120),
                safe_patterns: compile(&[r"\.(md|txt|log|json)$"]),
                dangerous_patterns: compile(&[
                    r"^/etc/",
                    r"^/usr/",
                    r"^/var/",
                    r"^/boot/",
                    r"(^|/)\.ssh(/|$)",
                    r"(^|/)\.env$",
                    r"(^|/)id_rsa",
                ]),
            },
            network_operation: BasicPolicy {
                auto_approve: false,
                timeout: Duration::from_secs(300),
            },
            project_mutation: BasicPolicy {
                auto_approve: false,
                timeout: Duration::from_secs(300),
            },
            fallback: BasicPolicy {
                auto_approve: false,
                timeout: Duration::from_secs(300),
            },
        }
    }
}

impl PolicySet {
    pub fn timeout_for(&self, kind: &ApprovalType) -> Duration {
        match kind {
            ApprovalType::Pairing => self.pairing.timeout,
            ApprovalType::TerminalCommand => self.terminal_command.timeout,
            ApprovalType::FileOperation => self.file_operation.timeout,
            ApprovalType::NetworkOperation => self.network_operation.timeout,
            ApprovalType::ProjectMutation => self.project_mutation.timeout,
            ApprovalType::Other(_) => self.fallback.timeout,
        }
    }

    /// Whether the payload qualifies for a policy-driven bypass of human
    /// review. Types without heuristics are never auto-approved.
    pub fn evaluate_auto_approval(&self, kind: &ApprovalType, payload: &serde_json::Value) -> bool {
        match kind {
            ApprovalType::TerminalCommand => {
                self.terminal_command.auto_approve && self.command_is_safe(payload)
            }
            ApprovalType::FileOperation => {
                self.file_operation.auto_approve && self.path_is_safe(payload)
            }
            _ => false,
        }
    }

    fn command_is_safe(&self, payload: &serde_json::Value) -> bool {
        let Some(command) = payload.get("command").and_then(|c| c.as_str()) else {
            return false;
        };
        let command = command.trim().to_lowercase();

        // dangerous dominates safe
        if self
            .terminal_command
            .dangerous_substrings
            .iter()
            .any(|needle| command.contains(needle.as_str()))
        {
            return false;
        }

        self.terminal_command
            .safe_prefixes
            .iter()
            .any(|prefix| command.starts_with(prefix.as_str()))
    }

    fn path_is_safe(&self, payload: &serde_json::Value) -> bool {
        let Some(path) = payload.get("path").and_then(|p| p.as_str()) else {
            return false;
        };

        if self
            .file_operation
            .dangerous_patterns
            .iter()
            .any(|pattern| pattern.is_match(path))
        {
            return false;
        }

        self.file_operation
            .safe_patterns
            .iter()
            .any(|pattern| pattern.is_match(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_command_auto_approved() {
        let policies = PolicySet::default();
        assert!(policies.evaluate_auto_approval(
            &ApprovalType::TerminalCommand,
            &json!({"command": "git status"})
        ));
    }

    #[test]
    fn test_dangerous_substring_dominates_safe_prefix() {
        let policies = PolicySet::default();
        assert!(!policies.evaluate_auto_approval(
            &ApprovalType::TerminalCommand,
            &json!({"command": "git status && rm -rf /"})
        ));
    }

    #[test]
    fn test_command_is_trimmed_and_lowercased() {
        let policies = PolicySet::default();
        assert!(policies.evaluate_auto_approval(
            &ApprovalType::TerminalCommand,
            &json!({"command": "  GIT STATUS  "})
        ));
    }

    #[test]
    fn test_unlisted_command_not_auto_approved() {
        let policies = PolicySet::default();
        assert!(!policies.evaluate_auto_approval(
            &ApprovalType::TerminalCommand,
            &json!({"command": "make deploy"})
        ));
    }

    #[test]
    fn test_missing_command_field_not_auto_approved() {
        let policies = PolicySet::default();
        assert!(!policies
            .evaluate_auto_approval(&ApprovalType::TerminalCommand, &json!({"other": true})));
    }

    #[test]
    fn test_etc_passwd_never_auto_approved() {
        let mut policies = PolicySet::default();
        // even an absurdly permissive safe pattern cannot rescue /etc
        policies.file_operation.safe_patterns = vec![Regex::new(".*").unwrap()];
        assert!(!policies.evaluate_auto_approval(
            &ApprovalType::FileOperation,
            &json!({"path": "/etc/passwd"})
        ));
    }

    #[test]
    fn test_safe_path_auto_approved() {
        let policies = PolicySet::default();
        assert!(policies.evaluate_auto_approval(
            &ApprovalType::FileOperation,
            &json!({"path": "/home/dev/notes.md"})
        ));
    }

    #[test]
    fn test_unmatched_path_not_auto_approved() {
        let policies = PolicySet::default();
        assert!(!policies.evaluate_auto_approval(
            &ApprovalType::FileOperation,
            &json!({"path": "/home/dev/binary.bin"})
        ));
    }

    #[test]
    fn test_other_types_never_auto_approved() {
        let policies = PolicySet::default();
        for kind in [
            ApprovalType::Pairing,
            ApprovalType::NetworkOperation,
            ApprovalType::ProjectMutation,
            ApprovalType::Other("repo_sync".to_string()),
        ] {
            assert!(!policies.evaluate_auto_approval(&kind, &json!({"command": "git status"})));
        }
    }
}
