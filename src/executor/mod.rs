//! Execution backends for approved actions
//!
//! [`ActionExecutor`] is the single entry point: it dispatches each
//! approved action to the shell, file, or extension backend and applies
//! the caller's timeout, cancellation and concurrency limits uniformly.

mod executor;
mod extension;
mod file;
mod shell;

pub use executor::{ActionExecutor, ExecOptions, ProgressChunk};
pub use extension::{ExtensionRegistry, ExtensionTool};
