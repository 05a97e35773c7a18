//! Outcomes delivered back to the agent loop

use serde::{Deserialize, Serialize};

/// Captured result of an executed action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Captured standard output (file and extension backends report here)
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Process exit code; non-process backends report 0 on success
    pub exit_code: i32,
}

impl ExecutionResult {
    /// Create a successful result with output
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            stdout: output.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Whether the action completed with a zero exit code
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Combined stdout/stderr for diagnostics
    pub fn combined_output(&self) -> String {
        let mut out = String::new();
        if !self.stdout.is_empty() {
            out.push_str(&self.stdout);
        }
        if !self.stderr.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("STDERR:\n");
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Why an action was denied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DenyReason {
    /// A stored rule forbids the action; carries the rule's display form
    Rule(String),
    /// The human declined at the prompt
    User,
    /// No rule matched and no prompt resolution was available
    Indeterminate,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::Rule(rule) => write!(f, "denied by rule {}", rule),
            DenyReason::User => write!(f, "denied by user"),
            DenyReason::Indeterminate => {
                write!(f, "no matching rule and no prompt resolution available")
            }
        }
    }
}

/// Terminal outcome of one proposed action, as seen by the agent loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// Executed and exited cleanly
    Completed(ExecutionResult),

    /// Not executed; authorization refused
    Denied {
        /// Why the action was refused
        reason: DenyReason,
    },

    /// Executed but failed (non-zero exit, I/O error)
    Failed {
        /// Diagnostic message
        message: String,
        /// Captured output, when the action ran far enough to produce any
        result: Option<ExecutionResult>,
    },

    /// Terminated on deadline expiry
    TimedOut {
        /// Milliseconds elapsed before termination
        elapsed_ms: u64,
    },

    /// Aborted by caller signal
    Cancelled,
}

impl ActionOutcome {
    /// Whether the action ran to successful completion
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed(_))
    }

    /// Whether the action was refused before execution
    pub fn is_denied(&self) -> bool {
        matches!(self, ActionOutcome::Denied { .. })
    }

    /// Whether the action was stopped (timeout or cancel) rather than failed
    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            ActionOutcome::TimedOut { .. } | ActionOutcome::Cancelled
        )
    }
}
