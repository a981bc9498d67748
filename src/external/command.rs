//! Base command execution abstraction
//!
//! Provides the foundational trait for executing external commands, enabling
//! dependency injection for testing.

use async_trait::async_trait;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

pub use crate::error::{CommandError, ProcessError};

#[cfg(test)]
use mockall::automock;

/// Trait for executing external commands
///
/// Every invocation runs `program` directly (no shell) with each element of
/// `args` passed as one argument, inside `cwd`. On exit status 0 the combined
/// stdout/stderr text is returned; on any other status the call fails with
/// [`CommandError::Failed`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, program: &str, args: &[String], cwd: &Path)
        -> Result<String, CommandError>;
}

/// Real implementation using tokio::process::Command
#[derive(Debug, Clone, Default)]
pub struct ProcessCommandExecutor {
    timeout: Option<Duration>,
    redact_args: bool,
}

impl ProcessCommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill and fail any process still running after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Log only the argument count, never the arguments. Clone URLs can
    /// carry credentials.
    pub fn redact_args(mut self, redact: bool) -> Self {
        self.redact_args = redact;
        self
    }
}

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<String, CommandError> {
        if self.redact_args {
            debug!(program, arg_count = args.len(), cwd = %cwd.display(), "spawning process");
        } else {
            debug!(program, ?args, cwd = %cwd.display(), "spawning process");
        }

        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        let finished = match self.timeout {
            None => run_to_exit(&mut child).await,
            Some(limit) => match tokio::time::timeout(limit, run_to_exit(&mut child)).await {
                Ok(finished) => finished,
                Err(_) => {
                    warn!(program, timeout_ms = limit.as_millis() as u64, "killing timed out process");
                    let _ = child.kill().await;
                    return Err(CommandError::Timeout {
                        command: program.to_string(),
                        timeout_ms: limit.as_millis() as u64,
                    });
                }
            },
        };
        let (output, status) = finished.map_err(|e| io_error(program, e))?;
        let output = String::from_utf8_lossy(&output).into_owned();

        match status.code() {
            Some(0) => Ok(output),
            code => {
                // Terminated by a signal when there is no code.
                let code = code.unwrap_or(-1);
                debug!(program, code, "process exited with failure");
                Err(ProcessError::new(code, output).into())
            }
        }
    }
}

/// Collect the combined output, then wait for the process to exit.
async fn run_to_exit(child: &mut Child) -> std::io::Result<(Vec<u8>, ExitStatus)> {
    let output = capture_combined(child).await?;
    let status = child.wait().await?;
    Ok((output, status))
}

/// Read stdout and stderr until both close, appending chunks in the order
/// they arrive.
async fn capture_combined(child: &mut Child) -> std::io::Result<Vec<u8>> {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut combined = Vec::new();
    let mut out_buf = [0u8; 8192];
    let mut err_buf = [0u8; 8192];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut out_buf), if stdout.is_some() => {
                match read? {
                    0 => stdout = None,
                    n => combined.extend_from_slice(&out_buf[..n]),
                }
            }
            read = read_chunk(&mut stderr, &mut err_buf), if stderr.is_some() => {
                match read? {
                    0 => stderr = None,
                    n => combined.extend_from_slice(&err_buf[..n]),
                }
            }
        }
    }

    Ok(combined)
}

async fn read_chunk<R>(stream: &mut Option<R>, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match stream {
        Some(stream) => stream.read(buf).await,
        None => Ok(0),
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> CommandError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CommandError::CommandNotFound {
            command: program.to_string(),
        }
    } else {
        io_error(program, err)
    }
}

fn io_error(program: &str, err: std::io::Error) -> CommandError {
    CommandError::Io {
        command: program.to_string(),
        message: err.to_string(),
    }
}
