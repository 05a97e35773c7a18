//! Permission system: patterns, rules, layered store and decision engine
//!
//! Rules are (pattern, decision, scope) triples. Scopes form a precedence
//! ladder reflecting "most recent and most specific explicit human decision
//! wins":
//!
//! - **SessionDenied**: "always deny" answers from this session
//! - **SessionGranted**: "always allow" answers from this session
//! - **Project**: `.toolbroker/permissions.json` in the project
//! - **Global**: `~/.toolbroker/permissions.json`
//!
//! ## Example
//!
//! ```rust,ignore
//! use toolbroker::core::ActionRequest;
//! use toolbroker::permissions::{
//!     DecisionEngine, PermissionRule, PermissionStore, RuleScope, RuleSource, Verdict,
//! };
//!
//! let mut store = PermissionStore::new();
//! store.add(PermissionRule::allow(
//!     "Bash(git *)",
//!     RuleScope::Project,
//!     RuleSource::File(".toolbroker/permissions.json".into()),
//! )?);
//!
//! let engine = DecisionEngine::new();
//! match engine.decide(&store, &ActionRequest::shell("git status")).verdict {
//!     Verdict::Allow => { /* execute */ }
//!     Verdict::Deny => { /* reject */ }
//!     Verdict::RequiresPrompt => { /* ask the resolver */ }
//! }
//! ```

pub mod config;
mod engine;
mod pattern;
mod resolver;
mod rule;
mod store;

pub use engine::{DecisionEngine, DecisionResult, Verdict};
pub use pattern::{ArgPattern, RulePattern, Specificity};
pub use resolver::{HeadlessResolver, PromptResolution, PromptResolver, ScriptedResolver};
pub use rule::{Decision, PermissionRule, RuleScope, RuleSource};
pub use store::PermissionStore;
