//! Prompt resolution boundary
//!
//! The decision engine's RequiresPrompt path suspends on an injectable
//! resolver. Interactive callers plug in a console prompt; headless callers
//! get a deterministic no-resolution default so nothing hangs forever; tests
//! script the answers.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::ActionRequest;

/// An external answer to a permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResolution {
    /// Allow this one request; no rule is recorded
    AllowOnce,
    /// Allow and record a SessionGranted rule for the exact request
    AllowAlways,
    /// Deny this one request; no rule is recorded
    DenyOnce,
    /// Deny and record a SessionDenied rule for the exact request
    DenyAlways,
}

impl PromptResolution {
    /// Whether the resolution authorizes execution
    pub fn allows(&self) -> bool {
        matches!(self, PromptResolution::AllowOnce | PromptResolution::AllowAlways)
    }
}

/// The human-in-the-loop boundary
///
/// `resolve` returning `None` means no resolution is available (headless
/// mode, closed channel); the caller must treat that as an indeterminate
/// authorization and deny safely.
#[async_trait]
pub trait PromptResolver: Send + Sync {
    /// Resolve one permission prompt for the given request
    async fn resolve(&self, request: &ActionRequest) -> Option<PromptResolution>;
}

/// Resolver for non-interactive contexts: never answers
///
/// Every prompt resolves to an indeterminate authorization, which the
/// session controller turns into a safe deny.
#[derive(Debug, Default)]
pub struct HeadlessResolver;

#[async_trait]
impl PromptResolver for HeadlessResolver {
    async fn resolve(&self, request: &ActionRequest) -> Option<PromptResolution> {
        tracing::info!(
            "[Resolver] Headless mode, no resolution for {}",
            request.describe()
        );
        None
    }
}

/// Resolver that plays back a scripted sequence of answers
///
/// Primarily for tests and policy-driven callers. When the script runs out
/// it falls back to the configured default (or no resolution).
#[derive(Debug)]
pub struct ScriptedResolver {
    script: Mutex<VecDeque<PromptResolution>>,
    fallback: Option<PromptResolution>,
}

impl ScriptedResolver {
    /// Create a resolver that answers from the given sequence
    pub fn new(answers: impl IntoIterator<Item = PromptResolution>) -> Self {
        Self {
            script: Mutex::new(answers.into_iter().collect()),
            fallback: None,
        }
    }

    /// Answer every prompt the same way
    pub fn always(resolution: PromptResolution) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(resolution),
        }
    }

    /// Set the answer used once the script is exhausted
    pub fn with_fallback(mut self, resolution: PromptResolution) -> Self {
        self.fallback = Some(resolution);
        self
    }

    /// How many scripted answers remain unconsumed
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PromptResolver for ScriptedResolver {
    async fn resolve(&self, _request: &ActionRequest) -> Option<PromptResolution> {
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_headless_never_resolves() {
        let resolver = HeadlessResolver;
        let request = ActionRequest::shell("ls");
        assert_eq!(resolver.resolve(&request).await, None);
    }

    #[tokio::test]
    async fn test_scripted_plays_in_order() {
        let resolver = ScriptedResolver::new([
            PromptResolution::AllowOnce,
            PromptResolution::DenyAlways,
        ]);
        let request = ActionRequest::shell("ls");

        assert_eq!(
            resolver.resolve(&request).await,
            Some(PromptResolution::AllowOnce)
        );
        assert_eq!(
            resolver.resolve(&request).await,
            Some(PromptResolution::DenyAlways)
        );
        assert_eq!(resolver.resolve(&request).await, None);
    }

    #[tokio::test]
    async fn test_scripted_fallback() {
        let resolver = ScriptedResolver::always(PromptResolution::DenyOnce);
        let request = ActionRequest::shell("ls");
        assert_eq!(
            resolver.resolve(&request).await,
            Some(PromptResolution::DenyOnce)
        );
    }

    #[test]
    fn test_resolution_allows() {
        assert!(PromptResolution::AllowOnce.allows());
        assert!(PromptResolution::AllowAlways.allows());
        assert!(!PromptResolution::DenyOnce.allows());
        assert!(!PromptResolution::DenyAlways.allows());
    }
}
