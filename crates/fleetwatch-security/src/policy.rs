//! Task command safety policy.
//!
//! Decides whether a shell command may run on a managed server. Two modes:
//! denylist (block known-dangerous patterns, allow the rest) and allowlist
//! (only explicitly approved command prefixes run). The policy is an
//! ordered list of compiled case-insensitive regexes scanned first-match-wins.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use fleetwatch_core::config::policy::{PolicyConfig, PolicyMode};
use fleetwatch_core::error::AppError;
use fleetwatch_core::result::AppResult;

/// Dangerous patterns blocked in denylist mode.
const DEFAULT_DENY_PATTERNS: &[&str] = &[
    // Filesystem destruction
    r"rm\s+(-[a-zA-Z]*[rf][a-zA-Z]*\s+)+/(\s|$|\*)",
    r"\bmkfs(\.\w+)?\b",
    r">\s*/dev/(sd|nvme|vd|hd)",
    r"\bdd\b.*\bof=/dev/(sd|nvme|vd|hd)",
    // Power control
    r"\bshutdown\b",
    r"\breboot\b",
    r"\bhalt\b",
    r"\bpoweroff\b",
    r"\binit\s+[06]\b",
    // Privilege and user manipulation
    r"\busermod\b",
    r"\buserdel\b",
    r"\bpasswd\b",
    r"\bchmod\s+(-[a-zA-Z]+\s+)*777\s+/",
    r"\bchown\s+(-[a-zA-Z]+\s+)*\S+\s+/(\s|$)",
    r"\bvisudo\b",
    // Disruptive package removal
    r"\b(apt|apt-get|yum|dnf|zypper)\s+(remove|purge|autoremove)\b",
    r"\brpm\s+-e\b",
    // Kernel and bootloader manipulation
    r"\bgrub-(install|mkconfig)\b",
    r"\bupdate-grub\b",
    r"\bmodprobe\s+-r\b",
    r"\binsmod\b",
    r"\brmmod\b",
    // Network disruption
    r"\bifconfig\s+\S+\s+down\b",
    r"\bip\s+link\s+set\s+\S+\s+down\b",
    r"\biptables\s+(-F\b|--flush\b)",
    r"\bnft\s+flush\s+ruleset\b",
    // Fork bomb
    r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
];

/// Read-only diagnostic command prefixes accepted in allowlist mode.
const DEFAULT_ALLOW_PATTERNS: &[&str] = &[
    r"^ls(\s|$)",
    r"^cat\s",
    r"^head(\s|$)",
    r"^tail(\s|$)",
    r"^grep\s",
    r"^find\s",
    r"^ps(\s|$)",
    r"^top(\s|$)",
    r"^df(\s|$)",
    r"^du(\s|$)",
    r"^free(\s|$)",
    r"^uptime(\s|$)",
    r"^uname(\s|$)",
    r"^whoami(\s|$)",
    r"^id(\s|$)",
    r"^date(\s|$)",
    r"^hostname(\s|$)",
    r"^ip\s+addr(\s|$)",
    r"^ss(\s|$)",
    r"^netstat(\s|$)",
    r"^ping\s",
    r"^systemctl\s+status(\s|$)",
    r"^journalctl(\s|$)",
    r"^docker\s+(ps|logs|stats)(\s|$)",
    r"^kubectl\s+(get|logs|describe)(\s|$)",
];

/// Outcome of validating one command against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    /// Whether the command may execute.
    pub allowed: bool,
    /// Human-readable reason, suitable for returning to the caller.
    pub reason: String,
}

impl PolicyDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Compiled task command policy.
///
/// Construction compiles every pattern once; validation is a pure,
/// side-effect-free scan and is safe to call concurrently.
#[derive(Debug)]
pub struct CommandPolicy {
    mode: PolicyMode,
    deny: Vec<(String, Regex)>,
    allow: Vec<(String, Regex)>,
}

impl CommandPolicy {
    /// Build the policy from configuration.
    ///
    /// Operator-supplied extra patterns that fail to compile are logged
    /// and skipped; they never abort construction.
    pub fn from_config(config: &PolicyConfig) -> Self {
        let mut deny = compile_all(DEFAULT_DENY_PATTERNS.iter().copied());
        deny.extend(compile_extra(&config.extra_deny_patterns));

        let mut allow = compile_all(DEFAULT_ALLOW_PATTERNS.iter().copied());
        allow.extend(compile_extra(&config.extra_allow_patterns));

        Self {
            mode: config.mode,
            deny,
            allow,
        }
    }

    /// The active policy mode.
    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    /// Decide whether a command may execute.
    ///
    /// Empty or whitespace-only commands are always rejected. In denylist
    /// mode the first matching dangerous pattern rejects the command; in
    /// allowlist mode the first matching approved pattern accepts it.
    pub fn validate_command(&self, command: &str) -> PolicyDecision {
        let command = command.trim();
        if command.is_empty() {
            return PolicyDecision::deny("empty command");
        }

        match self.mode {
            PolicyMode::Denylist => {
                for (source, regex) in &self.deny {
                    if regex.is_match(command) {
                        return PolicyDecision::deny(format!(
                            "command matches dangerous pattern: {source}"
                        ));
                    }
                }
                PolicyDecision::allow("command passed denylist check")
            }
            PolicyMode::Allowlist => {
                for (_, regex) in &self.allow {
                    if regex.is_match(command) {
                        return PolicyDecision::allow("command matches allowlist");
                    }
                }
                PolicyDecision::deny("command is not in the allowlist")
            }
        }
    }

    /// Validate a command, surfacing rejection as a policy-violation error.
    ///
    /// Callers map [`ErrorKind::PolicyViolation`] to a distinct HTTP status
    /// and user message.
    ///
    /// [`ErrorKind::PolicyViolation`]: fleetwatch_core::error::ErrorKind::PolicyViolation
    pub fn check_command(&self, command: &str) -> AppResult<()> {
        let decision = self.validate_command(command);
        if decision.allowed {
            Ok(())
        } else {
            Err(AppError::policy_violation(decision.reason))
        }
    }
}

fn compile_all<'a>(patterns: impl Iterator<Item = &'a str>) -> Vec<(String, Regex)> {
    patterns
        .filter_map(|p| compile(p).map(|r| (p.to_string(), r)))
        .collect()
}

/// Parse a comma-separated operator pattern list, skipping invalid entries.
fn compile_extra(raw: &str) -> Vec<(String, Regex)> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(|p| match compile(p) {
            Some(r) => Some((p.to_string(), r)),
            None => {
                warn!(pattern = %p, "Skipping invalid policy pattern");
                None
            }
        })
        .collect()
}

fn compile(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_core::error::ErrorKind;

    fn policy(mode: PolicyMode) -> CommandPolicy {
        CommandPolicy::from_config(&PolicyConfig {
            mode,
            extra_deny_patterns: String::new(),
            extra_allow_patterns: String::new(),
        })
    }

    #[test]
    fn denylist_blocks_destructive_commands() {
        let policy = policy(PolicyMode::Denylist);
        for cmd in [
            "rm -rf /",
            "sudo rm -rf / --no-preserve-root",
            "mkfs.ext4 /dev/sdb1",
            "dd if=/dev/zero of=/dev/sda",
            "shutdown -h now",
            "REBOOT",
            "init 0",
            "passwd root",
            "chmod 777 /",
            "iptables -F",
            ":(){ :|:& };:",
        ] {
            let decision = policy.validate_command(cmd);
            assert!(!decision.allowed, "expected rejection for {cmd:?}");
            assert!(
                decision.reason.contains("dangerous pattern"),
                "reason should name the pattern for {cmd:?}: {}",
                decision.reason
            );
        }
    }

    #[test]
    fn denylist_allows_ordinary_commands() {
        let policy = policy(PolicyMode::Denylist);
        for cmd in [
            "ls -la /var/log",
            "rm -f ./build.log",
            "systemctl status nginx",
            "docker ps -a",
            "echo hello",
        ] {
            assert!(
                policy.validate_command(cmd).allowed,
                "expected approval for {cmd:?}"
            );
        }
    }

    #[test]
    fn allowlist_only_accepts_approved_prefixes() {
        let policy = policy(PolicyMode::Allowlist);
        assert!(policy.validate_command("ls -la").allowed);
        assert!(policy.validate_command("systemctl status sshd").allowed);
        let decision = policy.validate_command("some_random_command");
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "command is not in the allowlist");
    }

    #[test]
    fn empty_command_is_rejected_with_distinct_reason() {
        let policy = policy(PolicyMode::Denylist);
        let decision = policy.validate_command("   ");
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "empty command");
    }

    #[test]
    fn extra_patterns_extend_the_lists() {
        let policy = CommandPolicy::from_config(&PolicyConfig {
            mode: PolicyMode::Denylist,
            extra_deny_patterns: r"\bcurl\b,[unclosed".to_string(),
            extra_allow_patterns: String::new(),
        });
        assert!(!policy.validate_command("curl http://example.com").allowed);
        // The invalid pattern is skipped, not fatal.
        assert!(policy.validate_command("wget http://example.com").allowed);
    }

    #[test]
    fn check_command_maps_rejection_to_policy_violation() {
        let policy = policy(PolicyMode::Allowlist);
        let err = policy.check_command("rm -rf /tmp/x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::PolicyViolation);
        assert!(policy.check_command("df -h").is_ok());
    }
}
