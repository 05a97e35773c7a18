//! Stored permission rules

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::core::{BrokerResult, MatchStyle};

use super::pattern::RulePattern;

/// What a matching rule decides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The action is authorized
    Allow,
    /// The action is forbidden
    Deny,
}

/// Precedence/persistence tier of a rule
///
/// Precedence order: SessionDenied > SessionGranted > Project > Global.
/// The session scopes are in-memory only; the most recent explicit human
/// decision wins over anything loaded from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleScope {
    /// User-global configuration file
    Global,
    /// Project-local configuration file
    Project,
    /// "Always allow" answers given during this session
    SessionGranted,
    /// "Always deny" answers given during this session
    SessionDenied,
}

impl RuleScope {
    /// Numeric precedence; higher wins
    pub fn precedence(&self) -> u8 {
        match self {
            RuleScope::SessionDenied => 3,
            RuleScope::SessionGranted => 2,
            RuleScope::Project => 1,
            RuleScope::Global => 0,
        }
    }

    /// Whether rules in this scope are discarded at session end
    pub fn is_session(&self) -> bool {
        matches!(self, RuleScope::SessionGranted | RuleScope::SessionDenied)
    }

    /// All scopes, highest precedence first
    pub fn ordered() -> [RuleScope; 4] {
        [
            RuleScope::SessionDenied,
            RuleScope::SessionGranted,
            RuleScope::Project,
            RuleScope::Global,
        ]
    }
}

/// Where a rule came from, for auditability
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    /// Loaded from a configuration file
    File(PathBuf),
    /// Recorded from an interactive prompt answer
    InteractiveSession,
}

impl std::fmt::Display for RuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSource::File(path) => write!(f, "{}", path.display()),
            RuleSource::InteractiveSession => write!(f, "interactive-session"),
        }
    }
}

/// A stored (pattern, decision, scope) triple with provenance
#[derive(Debug, Clone)]
pub struct PermissionRule {
    /// What invocations this rule covers
    pub pattern: RulePattern,
    /// Allow or Deny
    pub decision: Decision,
    /// Precedence tier
    pub scope: RuleScope,
    /// Provenance for audit logs
    pub source: RuleSource,
    /// When the rule entered the store
    pub added_at: DateTime<Utc>,
}

impl PermissionRule {
    /// Create a rule from its parts
    pub fn new(pattern: RulePattern, decision: Decision, scope: RuleScope, source: RuleSource) -> Self {
        Self {
            pattern,
            decision,
            scope,
            source,
            added_at: Utc::now(),
        }
    }

    /// Parse a rule string into an Allow rule
    pub fn allow(rule: &str, scope: RuleScope, source: RuleSource) -> BrokerResult<Self> {
        Ok(Self::new(RulePattern::parse(rule)?, Decision::Allow, scope, source))
    }

    /// Parse a rule string into a Deny rule
    pub fn deny(rule: &str, scope: RuleScope, source: RuleSource) -> BrokerResult<Self> {
        Ok(Self::new(RulePattern::parse(rule)?, Decision::Deny, scope, source))
    }

    /// Check this rule against a concrete invocation
    pub fn matches(&self, category: &str, arguments: &str, style: MatchStyle) -> bool {
        self.pattern.matches(category, arguments, style)
    }

    /// Two rules are duplicates when pattern, decision and scope coincide
    pub fn is_duplicate_of(&self, other: &PermissionRule) -> bool {
        self.pattern == other.pattern && self.decision == other.decision && self.scope == other.scope
    }
}
