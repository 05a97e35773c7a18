//! Decision engine
//!
//! Evaluates one `ActionRequest` against the layered store and returns
//! Allow, Deny or RequiresPrompt. Precedence: SessionDenied first, then
//! SessionGranted, then the most specific Project match, then the most
//! specific Global match. Evaluation never mutates the store; only prompt
//! resolution does.

use crate::core::ActionRequest;

use super::pattern::RulePattern;
use super::resolver::PromptResolution;
use super::rule::{Decision, PermissionRule, RuleScope, RuleSource};
use super::store::PermissionStore;

/// Authorization verdict for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Execute it
    Allow,
    /// Refuse it
    Deny,
    /// No rule matched; external resolution required
    RequiresPrompt,
}

/// Verdict plus the rule that produced it, if any
#[derive(Debug, Clone)]
pub struct DecisionResult {
    /// The verdict for this request
    pub verdict: Verdict,
    /// The matched rule, or None when a default policy (prompt/bypass) applied
    pub matched: Option<PermissionRule>,
}

/// Evaluates requests against the permission store
///
/// The bypass flag is fixed at construction; it cannot be toggled
/// mid-session.
#[derive(Debug)]
pub struct DecisionEngine {
    bypass_all: bool,
}

impl DecisionEngine {
    /// Create an engine that consults the store normally
    pub fn new() -> Self {
        Self { bypass_all: false }
    }

    /// Create an engine that allows everything without consulting the store
    ///
    /// This is the unconditional-skip mode. It is loud on purpose.
    pub fn with_bypass_all() -> Self {
        tracing::warn!(
            "[Engine] BYPASS MODE ENABLED: all actions will be allowed without permission checks"
        );
        Self { bypass_all: true }
    }

    /// Whether this engine bypasses the store entirely
    pub fn is_bypassing(&self) -> bool {
        self.bypass_all
    }

    /// Decide whether the request is authorized
    ///
    /// Idempotent: repeated calls with an unchanged store yield the same
    /// verdict. In bypass mode the store is never touched.
    pub fn decide(&self, store: &PermissionStore, request: &ActionRequest) -> DecisionResult {
        if self.bypass_all {
            tracing::debug!("[Engine] Bypass: allowing {} without lookup", request.describe());
            return DecisionResult {
                verdict: Verdict::Allow,
                matched: None,
            };
        }

        let category = request.category();
        let arguments = request.arguments();
        let matches = store.lookup(category.rule_name(), &arguments, category.match_style());

        // Explicit session revocation wins over everything
        if let Some(rule) = matches.iter().find(|r| r.scope == RuleScope::SessionDenied) {
            return self.verdict_from(rule, request);
        }
        if let Some(rule) = matches.iter().find(|r| r.scope == RuleScope::SessionGranted) {
            return self.verdict_from(rule, request);
        }

        // Project over Global; within a scope the most specific pattern wins,
        // first-listed on ties
        for scope in [RuleScope::Project, RuleScope::Global] {
            if let Some(rule) = most_specific(matches.iter().filter(|r| r.scope == scope).copied())
            {
                return self.verdict_from(rule, request);
            }
        }

        tracing::debug!("[Engine] No rule matched {}, prompting", request.describe());
        DecisionResult {
            verdict: Verdict::RequiresPrompt,
            matched: None,
        }
    }

    fn verdict_from(&self, rule: &PermissionRule, request: &ActionRequest) -> DecisionResult {
        let verdict = match rule.decision {
            Decision::Allow => Verdict::Allow,
            Decision::Deny => Verdict::Deny,
        };
        tracing::info!(
            "[Engine] {:?} for {} via rule {} ({:?}, source: {})",
            verdict,
            request.describe(),
            rule.pattern,
            rule.scope,
            rule.source
        );
        DecisionResult {
            verdict,
            matched: Some(rule.clone()),
        }
    }

    /// Apply a prompt resolution, recording "always" answers in the store
    ///
    /// Returns the verdict the resolution implies. Allow-once and deny-once
    /// mutate nothing; the always variants add an exact session rule for
    /// this request's concrete arguments.
    pub fn apply_resolution(
        &self,
        store: &mut PermissionStore,
        request: &ActionRequest,
        resolution: PromptResolution,
    ) -> Verdict {
        match resolution {
            PromptResolution::AllowOnce => Verdict::Allow,
            PromptResolution::DenyOnce => Verdict::Deny,
            PromptResolution::AllowAlways => {
                let pattern = RulePattern::exact_for(&request.category(), &request.arguments());
                store.add(PermissionRule::new(
                    pattern,
                    Decision::Allow,
                    RuleScope::SessionGranted,
                    RuleSource::InteractiveSession,
                ));
                Verdict::Allow
            }
            PromptResolution::DenyAlways => {
                let pattern = RulePattern::exact_for(&request.category(), &request.arguments());
                store.add(PermissionRule::new(
                    pattern,
                    Decision::Deny,
                    RuleScope::SessionDenied,
                    RuleSource::InteractiveSession,
                ));
                Verdict::Deny
            }
        }
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// First rule with the strictly highest specificity
fn most_specific<'a>(
    rules: impl Iterator<Item = &'a PermissionRule>,
) -> Option<&'a PermissionRule> {
    rules.fold(None, |best: Option<&PermissionRule>, rule| match best {
        Some(current) if current.pattern.specificity() >= rule.pattern.specificity() => Some(current),
        _ => Some(rule),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::rule::RuleSource;
    use std::path::PathBuf;

    fn allow(rule: &str, scope: RuleScope) -> PermissionRule {
        PermissionRule::allow(rule, scope, RuleSource::File(PathBuf::from("perm.json"))).unwrap()
    }

    fn deny(rule: &str, scope: RuleScope) -> PermissionRule {
        PermissionRule::deny(rule, scope, RuleSource::File(PathBuf::from("perm.json"))).unwrap()
    }

    #[test]
    fn test_global_allow_matches() {
        let mut store = PermissionStore::new();
        store.add(allow("Edit", RuleScope::Global));

        let engine = DecisionEngine::new();
        let result = engine.decide(&store, &ActionRequest::edit_file("app.js", "a", "b"));

        assert_eq!(result.verdict, Verdict::Allow);
        let matched = result.matched.unwrap();
        assert_eq!(matched.scope, RuleScope::Global);
        assert_eq!(matched.pattern.to_string(), "Edit");
    }

    #[test]
    fn test_no_match_prompts_never_allows() {
        let mut store = PermissionStore::new();
        store.add(allow("Bash(git *)", RuleScope::Project));

        let engine = DecisionEngine::new();
        let result = engine.decide(&store, &ActionRequest::shell("rm -rf /"));

        assert_eq!(result.verdict, Verdict::RequiresPrompt);
        assert!(result.matched.is_none());
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let mut store = PermissionStore::new();
        store.add(deny("Bash(npm *)", RuleScope::Project));
        store.add(allow("Bash(npm install lodash)", RuleScope::Project));

        let engine = DecisionEngine::new();
        let result = engine.decide(&store, &ActionRequest::shell("npm install lodash"));
        assert_eq!(result.verdict, Verdict::Allow);

        // The wildcard still covers everything else
        let result = engine.decide(&store, &ActionRequest::shell("npm publish"));
        assert_eq!(result.verdict, Verdict::Deny);
    }

    #[test]
    fn test_session_denied_beats_session_granted() {
        let mut store = PermissionStore::new();
        let engine = DecisionEngine::new();

        // Narrow grant first, broader denial afterwards: denial still wins
        let request = ActionRequest::shell("npm install lodash");
        engine.apply_resolution(&mut store, &request, PromptResolution::AllowAlways);
        store.add(
            PermissionRule::deny(
                "Bash(npm *)",
                RuleScope::SessionDenied,
                RuleSource::InteractiveSession,
            )
            .unwrap(),
        );

        let result = engine.decide(&store, &ActionRequest::shell("npm install lodash"));
        assert_eq!(result.verdict, Verdict::Deny);
        assert_eq!(result.matched.unwrap().scope, RuleScope::SessionDenied);
    }

    #[test]
    fn test_session_granted_beats_project_deny() {
        let mut store = PermissionStore::new();
        store.add(deny("Bash(cargo *)", RuleScope::Project));
        store.add(
            PermissionRule::allow(
                "Bash(cargo build)",
                RuleScope::SessionGranted,
                RuleSource::InteractiveSession,
            )
            .unwrap(),
        );

        let engine = DecisionEngine::new();
        let result = engine.decide(&store, &ActionRequest::shell("cargo build"));
        assert_eq!(result.verdict, Verdict::Allow);
    }

    #[test]
    fn test_project_beats_global() {
        let mut store = PermissionStore::new();
        store.add(allow("Bash(git *)", RuleScope::Global));
        store.add(deny("Bash(git *)", RuleScope::Project));

        let engine = DecisionEngine::new();
        let result = engine.decide(&store, &ActionRequest::shell("git push"));
        assert_eq!(result.verdict, Verdict::Deny);
        assert_eq!(result.matched.unwrap().scope, RuleScope::Project);
    }

    #[test]
    fn test_decide_is_idempotent() {
        let mut store = PermissionStore::new();
        store.add(deny("Bash(sudo *)", RuleScope::Global));

        let engine = DecisionEngine::new();
        let request = ActionRequest::shell("sudo apt install");
        let first = engine.decide(&store, &request);
        let second = engine.decide(&store, &request);

        assert_eq!(first.verdict, Verdict::Deny);
        assert_eq!(first.verdict, second.verdict);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_bypass_ignores_store() {
        let mut store = PermissionStore::new();
        // Even an explicit session denial is ignored in bypass mode, which
        // proves the store is never consulted
        store.add(
            PermissionRule::deny("Bash", RuleScope::SessionDenied, RuleSource::InteractiveSession)
                .unwrap(),
        );

        let engine = DecisionEngine::with_bypass_all();
        let result = engine.decide(&store, &ActionRequest::shell("anything"));
        assert_eq!(result.verdict, Verdict::Allow);
        assert!(result.matched.is_none());
    }

    #[test]
    fn test_allow_always_round_trip() {
        let mut store = PermissionStore::new();
        let engine = DecisionEngine::new();
        let request = ActionRequest::shell("npm install lodash");

        assert_eq!(engine.decide(&store, &request).verdict, Verdict::RequiresPrompt);

        let verdict = engine.apply_resolution(&mut store, &request, PromptResolution::AllowAlways);
        assert_eq!(verdict, Verdict::Allow);

        // Immediate re-decide allows without another prompt
        let result = engine.decide(&store, &request);
        assert_eq!(result.verdict, Verdict::Allow);
        assert_eq!(
            result.matched.unwrap().pattern.to_string(),
            "Bash(npm install lodash)"
        );

        // The grant is exact, not a category grant
        let other = ActionRequest::shell("npm install left-pad");
        assert_eq!(engine.decide(&store, &other).verdict, Verdict::RequiresPrompt);
    }

    #[test]
    fn test_once_resolutions_leave_store_unchanged() {
        let mut store = PermissionStore::new();
        let engine = DecisionEngine::new();
        let request = ActionRequest::shell("ls");

        assert_eq!(
            engine.apply_resolution(&mut store, &request, PromptResolution::AllowOnce),
            Verdict::Allow
        );
        assert_eq!(
            engine.apply_resolution(&mut store, &request, PromptResolution::DenyOnce),
            Verdict::Deny
        );
        assert!(store.is_empty());
    }
}
