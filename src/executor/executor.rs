//! Action executor
//!
//! Uniform execution contract over the shell, file and extension backends.
//! The executor performs no authorization of its own: it is only ever
//! handed actions that already carry an Allow verdict.
//!
//! Independent approved actions may run concurrently up to a caller-set
//! cap; actions that target the same resource (same file path) serialize,
//! so interleaved writes cannot happen. The conflict key is resource
//! identity, not action type.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::core::{ActionPayload, ActionRequest, BrokerError, BrokerResult, ExecutionResult};

use super::extension::{ExtensionRegistry, ExtensionTool};
use super::file::FileBackend;
use super::shell::ShellBackend;

/// Default cap on concurrently executing actions
const DEFAULT_CONCURRENCY: usize = 4;

/// Incremental output forwarded while an action runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressChunk {
    /// A line of standard output
    Stdout(String),
    /// A line of standard error
    Stderr(String),
}

/// Per-execution options supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Maximum duration before the action is terminated
    pub timeout: Option<Duration>,
    /// Caller-signalled abort
    pub cancel: Option<CancellationToken>,
    /// Channel for incremental output while the action runs
    pub progress: Option<mpsc::UnboundedSender<ProgressChunk>>,
}

impl ExecOptions {
    /// Options with no timeout, no cancellation, no streaming
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a maximum duration
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation token
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Attach a progress channel
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<ProgressChunk>) -> Self {
        self.progress = Some(sender);
        self
    }
}

/// Executes approved actions through the backend matching their payload
pub struct ActionExecutor {
    shell: ShellBackend,
    files: FileBackend,
    extensions: ExtensionRegistry,
    permits: Arc<Semaphore>,
    resource_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ActionExecutor {
    /// Create an executor rooted at the current directory
    pub fn new() -> BrokerResult<Self> {
        Ok(Self::with_working_dir(std::env::current_dir()?))
    }

    /// Create an executor rooted at a specific directory
    pub fn with_working_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            shell: ShellBackend::new(dir.clone()),
            files: FileBackend::new(dir),
            extensions: ExtensionRegistry::new(),
            permits: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
            resource_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Set the cap on concurrently executing actions
    pub fn with_concurrency(mut self, cap: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(cap.max(1)));
        self
    }

    /// Register an extension tool
    pub fn register_extension<T: ExtensionTool + 'static>(&mut self, tool: T) {
        self.extensions.register(tool);
    }

    /// The extension registry (for listings)
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Execute one approved action
    ///
    /// Must only be called after an Allow verdict; this method performs no
    /// permission check of its own.
    pub async fn execute(
        &self,
        request: &ActionRequest,
        opts: &ExecOptions,
    ) -> BrokerResult<ExecutionResult> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BrokerError::execution("executor shut down"))?;

        // Hold the resource lock for the duration of the action so writes
        // to the same path cannot interleave
        let _resource_guard = match request.resource_key() {
            Some(key) => Some(self.resource_lock(&key).lock_owned().await),
            None => None,
        };

        match &request.payload {
            ActionPayload::Shell { command } => self.shell.execute(command, opts).await,
            ActionPayload::WriteFile { path, content } => {
                let files = self.files.clone();
                let path = path.clone();
                let content = content.clone();
                self.run_limited(opts, run_blocking(move || files.write_file(&path, &content)))
                    .await
            }
            ActionPayload::EditFile {
                path,
                old_string,
                new_string,
                replace_all,
            } => {
                let files = self.files.clone();
                let path = path.clone();
                let old_string = old_string.clone();
                let new_string = new_string.clone();
                let replace_all = *replace_all;
                self.run_limited(
                    opts,
                    run_blocking(move || {
                        files.edit_file(&path, &old_string, &new_string, replace_all)
                    }),
                )
                .await
            }
            ActionPayload::Extension { tool, input } => {
                self.run_limited(opts, self.extensions.invoke(tool, input))
                    .await
            }
        }
    }

    /// Execute a batch of approved actions, results in request order
    ///
    /// Independent actions run concurrently up to the executor's cap;
    /// same-resource actions serialize through their resource lock.
    pub async fn execute_all(
        &self,
        requests: &[ActionRequest],
        opts: &ExecOptions,
    ) -> Vec<BrokerResult<ExecutionResult>> {
        futures::future::join_all(requests.iter().map(|r| self.execute(r, opts))).await
    }

    /// Wrap a backend future with the caller's timeout and cancellation
    ///
    /// The shell backend handles its own limits because it must kill the
    /// child process; everything else goes through here.
    async fn run_limited<F>(&self, opts: &ExecOptions, fut: F) -> BrokerResult<ExecutionResult>
    where
        F: std::future::Future<Output = BrokerResult<ExecutionResult>>,
    {
        let started = Instant::now();
        tokio::select! {
            result = fut => result,
            _ = sleep_or_forever(opts.timeout) => Err(BrokerError::Timeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
            _ = cancelled_or_forever(opts.cancel.clone()) => Err(BrokerError::Cancelled),
        }
    }

    fn resource_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.resource_locks.lock().unwrap();
        // Entries nobody holds anymore are stale; drop them so the map
        // does not grow with every file the session ever touched
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key.to_string()).or_default().clone()
    }
}

/// Run blocking filesystem work off the async workers
///
/// The timeout/cancel arms in `run_limited` can only preempt at an await
/// point; a direct `std::fs` call would hold the worker until the OS
/// returns.
async fn run_blocking<F>(work: F) -> BrokerResult<ExecutionResult>
where
    F: FnOnce() -> BrokerResult<String> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BrokerError::execution(format!("file task failed: {}", e)))?
        .map(ExecutionResult::success)
}

/// Sleep for the timeout, or forever when none is set
pub(crate) async fn sleep_or_forever(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// Wait for cancellation, or forever when no token is attached
pub(crate) async fn cancelled_or_forever(token: Option<CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}
