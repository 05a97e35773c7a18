//! Layered permission store
//!
//! Holds ordered rule sets for the four scopes. Global and Project scopes
//! are loaded from configuration at session start and are read-only
//! afterwards from this component's point of view; the session scopes are
//! in-memory only and mutated by the decision engine's prompt-resolution
//! path.

use crate::core::MatchStyle;

use super::rule::{PermissionRule, RuleScope};

/// Layered rule storage with defined cross-scope precedence
#[derive(Debug, Default)]
pub struct PermissionStore {
    global: Vec<PermissionRule>,
    project: Vec<PermissionRule>,
    session_granted: Vec<PermissionRule>,
    session_denied: Vec<PermissionRule>,
}

impl PermissionStore {
    /// Create an empty store (everything will require prompting)
    pub fn new() -> Self {
        Self::default()
    }

    fn scope_rules(&self, scope: RuleScope) -> &Vec<PermissionRule> {
        match scope {
            RuleScope::Global => &self.global,
            RuleScope::Project => &self.project,
            RuleScope::SessionGranted => &self.session_granted,
            RuleScope::SessionDenied => &self.session_denied,
        }
    }

    fn scope_rules_mut(&mut self, scope: RuleScope) -> &mut Vec<PermissionRule> {
        match scope {
            RuleScope::Global => &mut self.global,
            RuleScope::Project => &mut self.project,
            RuleScope::SessionGranted => &mut self.session_granted,
            RuleScope::SessionDenied => &mut self.session_denied,
        }
    }

    /// Add a rule to its scope, preserving insertion order
    ///
    /// Duplicates (same pattern, decision, scope) are dropped silently so
    /// repeated "always allow" answers don't pile up.
    pub fn add(&mut self, rule: PermissionRule) {
        let rules = self.scope_rules_mut(rule.scope);
        if rules.iter().any(|r| r.is_duplicate_of(&rule)) {
            tracing::debug!("[Store] Skipping duplicate rule {}", rule.pattern);
            return;
        }
        tracing::info!(
            "[Store] Adding {:?} rule {} at scope {:?} (source: {})",
            rule.decision,
            rule.pattern,
            rule.scope,
            rule.source
        );
        rules.push(rule);
    }

    /// Remove every rule in a scope whose pattern renders as `pattern`
    ///
    /// Returns true when at least one rule was removed.
    pub fn remove(&mut self, scope: RuleScope, pattern: &str) -> bool {
        let rules = self.scope_rules_mut(scope);
        let before = rules.len();
        rules.retain(|r| r.pattern.to_string() != pattern);
        before != rules.len()
    }

    /// Drop all rules in one scope
    pub fn clear(&mut self, scope: RuleScope) {
        tracing::info!("[Store] Clearing scope {:?}", scope);
        self.scope_rules_mut(scope).clear();
    }

    /// Replace the contents of a scope wholesale (configuration load)
    pub fn set_scope(&mut self, scope: RuleScope, rules: Vec<PermissionRule>) {
        *self.scope_rules_mut(scope) = rules;
    }

    /// All rules whose category and pattern match the invocation,
    /// highest-precedence scope first, insertion order within a scope
    pub fn lookup(
        &self,
        category: &str,
        arguments: &str,
        style: MatchStyle,
    ) -> Vec<&PermissionRule> {
        let mut matched = Vec::new();
        for scope in RuleScope::ordered() {
            matched.extend(
                self.scope_rules(scope)
                    .iter()
                    .filter(|r| r.matches(category, arguments, style)),
            );
        }
        matched
    }

    /// View the rules in one scope
    pub fn rules(&self, scope: RuleScope) -> &[PermissionRule] {
        self.scope_rules(scope)
    }

    /// All rules across scopes, highest precedence first
    pub fn all_rules(&self) -> Vec<&PermissionRule> {
        RuleScope::ordered()
            .iter()
            .flat_map(|scope| self.scope_rules(*scope).iter())
            .collect()
    }

    /// Total rule count
    pub fn len(&self) -> usize {
        self.global.len() + self.project.len() + self.session_granted.len() + self.session_denied.len()
    }

    /// Whether the store holds no rules at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
