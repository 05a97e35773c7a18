//! Tracing setup
//!
//! Call one of these once at startup. `RUST_LOG` overrides the default
//! filter in either mode.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Log to stderr
///
/// Default level is `warn`, or `debug` for this crate when `verbose` is set.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "warn,toolbroker=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Log to a daily-rolling file under `log_dir`
///
/// Keep the returned guard alive for the process lifetime or buffered
/// lines are lost on exit.
pub fn init_file_logging(log_dir: impl AsRef<Path>) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(log_dir, "toolbroker.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}
