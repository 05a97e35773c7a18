//! Broker error types

use thiserror::Error;

/// Errors that can occur while executing approved actions
///
/// Authorization refusals are not errors; they reach the agent loop as
/// `ActionOutcome::Denied` with a `DenyReason`.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The approved action itself failed
    #[error("Execution failed: {0}")]
    ExecutionFailure(String),

    /// The action exceeded its caller-supplied deadline
    #[error("Execution timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the action was terminated
        elapsed_ms: u64,
    },

    /// The action was aborted by caller signal
    #[error("Execution cancelled")]
    Cancelled,

    /// A permission configuration source failed to load
    #[error("Configuration corrupt: {path}: {reason}")]
    ConfigurationCorrupt {
        /// The configuration file that failed to load
        path: String,
        /// Why it could not be loaded
        reason: String,
    },

    /// A rule string could not be parsed
    #[error("Invalid permission rule: {0}")]
    InvalidRule(String),

    /// No extension tool registered under the requested name
    #[error("Unknown extension tool: {0}")]
    UnknownExtension(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BrokerError {
    /// Create an execution failure from a message
    pub fn execution(msg: impl Into<String>) -> Self {
        BrokerError::ExecutionFailure(msg.into())
    }

    /// Check whether this error means the action was stopped rather than failed
    pub fn is_stopped(&self) -> bool {
        matches!(self, BrokerError::Timeout { .. } | BrokerError::Cancelled)
    }
}

/// Result type alias for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;
