//! Shell command backend
//!
//! Runs approved commands via `bash -c`, streaming output line by line so
//! the session controller can forward progress while the command is still
//! running. Timeouts and cancellation kill the child process rather than
//! abandoning it.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::core::{BrokerError, BrokerResult, ExecutionResult};

use super::executor::{cancelled_or_forever, sleep_or_forever, ExecOptions, ProgressChunk};

/// Maximum captured length per stream in characters
const MAX_OUTPUT_LENGTH: usize = 30000;

/// Executes shell commands in a fixed working directory
#[derive(Debug, Clone)]
pub struct ShellBackend {
    working_dir: PathBuf,
}

impl ShellBackend {
    /// Create a backend rooted at the given working directory
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Run one command, capturing output and exit status
    pub(crate) async fn execute(
        &self,
        command: &str,
        opts: &ExecOptions,
    ) -> BrokerResult<ExecutionResult> {
        tracing::info!("[Shell] Executing: {}", command);
        tracing::debug!("[Shell] Working directory: {}", self.working_dir.display());

        let mut child = Command::new("bash")
            .arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BrokerError::execution("stdout pipe unavailable"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BrokerError::execution("stderr pipe unavailable"))?;

        let out_task = tokio::spawn(read_stream(stdout, opts.progress.clone(), false));
        let err_task = tokio::spawn(read_stream(stderr, opts.progress.clone(), true));

        let started = Instant::now();
        let status = tokio::select! {
            status = child.wait() => status?,
            _ = sleep_or_forever(opts.timeout) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::warn!("[Shell] Killing command after {}ms timeout: {}", elapsed_ms, command);
                let _ = child.kill().await;
                out_task.abort();
                err_task.abort();
                return Err(BrokerError::Timeout { elapsed_ms });
            }
            _ = cancelled_or_forever(opts.cancel.clone()) => {
                tracing::info!("[Shell] Cancelled, killing: {}", command);
                let _ = child.kill().await;
                out_task.abort();
                err_task.abort();
                return Err(BrokerError::Cancelled);
            }
        };

        let stdout = out_task
            .await
            .map_err(|e| BrokerError::execution(format!("stdout reader failed: {}", e)))?;
        let stderr = err_task
            .await
            .map_err(|e| BrokerError::execution(format!("stderr reader failed: {}", e)))?;

        let exit_code = status.code().unwrap_or(-1);
        tracing::debug!("[Shell] Exit code: {}", exit_code);

        Ok(ExecutionResult {
            stdout: truncate_output(stdout),
            stderr: truncate_output(stderr),
            exit_code,
        })
    }
}

/// Collect a stream line by line, forwarding each line as progress
async fn read_stream<R: AsyncRead + Unpin + Send + 'static>(
    reader: R,
    progress: Option<mpsc::UnboundedSender<ProgressChunk>>,
    is_stderr: bool,
) -> String {
    let mut lines = BufReader::new(reader).lines();
    let mut collected = String::new();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(tx) = &progress {
                    let chunk = if is_stderr {
                        ProgressChunk::Stderr(line.clone())
                    } else {
                        ProgressChunk::Stdout(line.clone())
                    };
                    // Receiver dropping is not the command's problem
                    let _ = tx.send(chunk);
                }
                collected.push_str(&line);
                collected.push('\n');
            }
            Ok(None) => break,
            Err(e) => {
                // Non-UTF-8 output lands here; keep what was captured
                tracing::warn!("[Shell] Output stream unreadable, capture stops: {}", e);
                collected.push_str("... (unreadable output omitted)\n");
                break;
            }
        }
    }

    collected
}

fn truncate_output(mut output: String) -> String {
    if output.len() > MAX_OUTPUT_LENGTH {
        output.truncate(MAX_OUTPUT_LENGTH);
        output.push_str("\n... (output truncated)");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn backend() -> ShellBackend {
        ShellBackend::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let result = backend()
            .execute("echo hello", &ExecOptions::new())
            .await
            .unwrap();
        assert_eq!(result.stdout.trim(), "hello");
        assert_eq!(result.exit_code, 0);
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_captures_stderr_and_nonzero_exit() {
        let result = backend()
            .execute("echo oops >&2; exit 3", &ExecOptions::new())
            .await
            .unwrap();
        assert_eq!(result.stderr.trim(), "oops");
        assert_eq!(result.exit_code, 3);
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let opts = ExecOptions::new().with_timeout(Duration::from_millis(100));
        let err = backend().execute("sleep 5", &opts).await.unwrap_err();
        assert!(matches!(err, BrokerError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_is_distinct_from_timeout() {
        let token = CancellationToken::new();
        let opts = ExecOptions::new().with_cancel(token.clone());

        let cancel_after = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let err = backend().execute("sleep 5", &opts).await.unwrap_err();
        assert!(matches!(err, BrokerError::Cancelled));
        cancel_after.await.unwrap();
    }

    #[tokio::test]
    async fn test_streams_progress_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let opts = ExecOptions::new().with_progress(tx);

        let result = backend()
            .execute("echo one; echo two", &opts)
            .await
            .unwrap();
        assert!(result.is_success());

        let mut lines = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            if let ProgressChunk::Stdout(line) = chunk {
                lines.push(line);
            }
        }
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_non_utf8_output_is_noted_not_silently_dropped() {
        let result = backend()
            .execute("printf 'ok\\n'; printf '\\377\\n'", &ExecOptions::new())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("ok"));
        assert!(result.stdout.contains("unreadable output omitted"));
    }

    #[test]
    fn test_truncate_output() {
        let long = "x".repeat(MAX_OUTPUT_LENGTH + 10);
        let truncated = truncate_output(long);
        assert!(truncated.ends_with("... (output truncated)"));
    }
}
