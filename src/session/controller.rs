//! Session controller
//!
//! Single entry point tying the store, decision engine, prompt resolver
//! and executor together. The agent loop proposes actions here and gets
//! back a terminal [`ActionOutcome`]; nothing executes without an Allow
//! verdict first.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::{ActionOutcome, ActionRequest, BrokerError, BrokerResult, DenyReason};
use crate::executor::{ActionExecutor, ExecOptions, ExtensionTool};
use crate::permissions::{
    config, Decision, DecisionEngine, PermissionRule, PermissionStore, PromptResolver, RuleScope,
    RuleSource, Verdict,
};

use super::state::SessionState;

/// Mediates every proposed action for one session
pub struct SessionController {
    state: SessionState,
    store: PermissionStore,
    engine: DecisionEngine,
    executor: ActionExecutor,
    resolver: Arc<dyn PromptResolver>,
}

impl SessionController {
    /// Start a session rooted at the current directory
    pub fn new(resolver: Arc<dyn PromptResolver>) -> BrokerResult<Self> {
        Ok(Self::with_working_dir(std::env::current_dir()?, resolver))
    }

    /// Start a session rooted at a specific directory
    pub fn with_working_dir(dir: impl Into<PathBuf>, resolver: Arc<dyn PromptResolver>) -> Self {
        Self {
            state: SessionState::new(false),
            store: PermissionStore::new(),
            engine: DecisionEngine::new(),
            executor: ActionExecutor::with_working_dir(dir),
            resolver,
        }
    }

    /// Skip every permission check for this session
    ///
    /// Takes effect at construction only; there is no way to enable or
    /// disable bypass mid-session.
    pub fn with_bypass_all(mut self) -> Self {
        self.state = SessionState::new(true);
        self.engine = DecisionEngine::with_bypass_all();
        self
    }

    /// Replace the pre-loaded permission store
    pub fn with_store(mut self, store: PermissionStore) -> Self {
        self.store = store;
        self
    }

    /// Replace the executor (custom concurrency cap, extensions)
    pub fn with_executor(mut self, executor: ActionExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Load Global rules from the user config and Project rules from the
    /// project config
    ///
    /// Missing files yield empty scopes; corrupt files are logged and also
    /// yield empty scopes, so unreadable config never widens permissions.
    pub fn load_config(&mut self, project_dir: impl AsRef<Path>) {
        if let Some(user_path) = config::user_config_path() {
            let rules = config::load_scope_or_empty(&user_path, RuleScope::Global);
            info!("[Session] Loaded {} global rule(s)", rules.len());
            self.store.set_scope(RuleScope::Global, rules);
        }
        let project_path = config::project_config_path(project_dir);
        let rules = config::load_scope_or_empty(&project_path, RuleScope::Project);
        info!("[Session] Loaded {} project rule(s)", rules.len());
        self.store.set_scope(RuleScope::Project, rules);
    }

    /// Register an extension tool with the executor
    pub fn register_extension<T: ExtensionTool + 'static>(&mut self, tool: T) {
        self.executor.register_extension(tool);
    }

    /// Decide, possibly prompt, then execute one proposed action
    pub async fn handle_proposed_action(&mut self, request: ActionRequest) -> ActionOutcome {
        self.handle_proposed_action_with(request, &ExecOptions::new())
            .await
    }

    /// As [`handle_proposed_action`](Self::handle_proposed_action), with
    /// caller-supplied timeout, cancellation and progress options
    pub async fn handle_proposed_action_with(
        &mut self,
        request: ActionRequest,
        opts: &ExecOptions,
    ) -> ActionOutcome {
        let decision = self.engine.decide(&self.store, &request);

        match decision.verdict {
            Verdict::Allow => self.run(&request, opts).await,
            Verdict::Deny => {
                let reason = match decision.matched {
                    Some(rule) => DenyReason::Rule(rule.pattern.to_string()),
                    None => DenyReason::Indeterminate,
                };
                info!("[Session] Denied {}: {}", request.describe(), reason);
                ActionOutcome::Denied { reason }
            }
            Verdict::RequiresPrompt => match self.resolver.resolve(&request).await {
                None => {
                    warn!(
                        "[Session] No resolution for {}, denying",
                        request.describe()
                    );
                    ActionOutcome::Denied {
                        reason: DenyReason::Indeterminate,
                    }
                }
                Some(resolution) => {
                    let verdict =
                        self.engine
                            .apply_resolution(&mut self.store, &request, resolution);
                    match verdict {
                        Verdict::Allow => self.run(&request, opts).await,
                        _ => ActionOutcome::Denied {
                            reason: DenyReason::User,
                        },
                    }
                }
            },
        }
    }

    async fn run(&self, request: &ActionRequest, opts: &ExecOptions) -> ActionOutcome {
        match self.executor.execute(request, opts).await {
            Ok(result) if result.is_success() => ActionOutcome::Completed(result),
            Ok(result) => ActionOutcome::Failed {
                message: format!("exited with code {}", result.exit_code),
                result: Some(result),
            },
            Err(BrokerError::Timeout { elapsed_ms }) => ActionOutcome::TimedOut { elapsed_ms },
            Err(BrokerError::Cancelled) => ActionOutcome::Cancelled,
            Err(err) => ActionOutcome::Failed {
                message: err.to_string(),
                result: None,
            },
        }
    }

    /// Add a session-scoped allow rule, e.g. `Bash(git *)`
    pub fn grant_session(&mut self, rule: &str) -> BrokerResult<()> {
        let rule = PermissionRule::allow(
            rule,
            RuleScope::SessionGranted,
            RuleSource::InteractiveSession,
        )?;
        self.store.add(rule);
        Ok(())
    }

    /// Add a session-scoped deny rule; revocations outrank every grant
    pub fn revoke_session(&mut self, rule: &str) -> BrokerResult<()> {
        let rule = PermissionRule::deny(
            rule,
            RuleScope::SessionDenied,
            RuleSource::InteractiveSession,
        )?;
        self.store.add(rule);
        Ok(())
    }

    /// Remove one rule from a scope; returns whether anything was removed
    pub fn remove_rule(&mut self, scope: RuleScope, pattern: &str) -> bool {
        self.store.remove(scope, pattern)
    }

    /// Drop every session-scoped rule, granted and denied alike
    pub fn clear_session_rules(&mut self) {
        self.store.clear(RuleScope::SessionGranted);
        self.store.clear(RuleScope::SessionDenied);
    }

    /// Write this session's granted rules into a permissions file
    ///
    /// Appends to `allowedTools`, skipping patterns already present.
    /// Returns how many rules were written.
    pub fn persist_session_grants(&self, path: &Path) -> BrokerResult<usize> {
        let patterns: Vec<String> = self
            .store
            .rules(RuleScope::SessionGranted)
            .iter()
            .filter(|r| r.decision == Decision::Allow)
            .map(|r| r.pattern.to_string())
            .collect();
        if patterns.is_empty() {
            return Ok(0);
        }
        let written = config::append_allowed(path, &patterns)?;
        info!(
            "[Session] Persisted {} session grant(s) to {}",
            written,
            path.display()
        );
        Ok(written)
    }

    /// Session identity and lifecycle flags
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The rule store, for listings
    pub fn store(&self) -> &PermissionStore {
        &self.store
    }
}
