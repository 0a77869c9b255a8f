//! CAD kernel boundary.
//!
//! [`CadKernel`] executes a [`BuildPlan`]: load the base STEP, cut the slot
//! features in order, export STL to `plan.output`. The production
//! implementation, [`ExternalKernel`], runs a child process and pipes the
//! plan to its stdin as JSON.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::plan::BuildPlan;

/// Maximum stderr captured from the kernel process (1 MiB).
const MAX_STDERR_BYTES: u64 = 1024 * 1024;

/// Errors raised while running a build plan.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("failed to start CAD kernel '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CAD kernel timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("CAD kernel failed with exit code {exit_code}: {stderr}")]
    ExecutionFailed { exit_code: i32, stderr: String },

    #[error("CAD kernel exited successfully but wrote no output at {0}")]
    MissingOutput(PathBuf),

    #[error("failed to encode build plan: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error talking to CAD kernel: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can turn a [`BuildPlan`] into an STL file.
#[async_trait]
pub trait CadKernel: Send + Sync {
    /// Build the model and write it to `plan.output`.
    async fn build(&self, plan: &BuildPlan) -> Result<(), KernelError>;
}

/// Runs a CAD kernel as a child process.
///
/// The process receives the JSON-encoded plan on stdin and must write the
/// STL to `plan.output` before exiting with status 0.
#[derive(Debug, Clone)]
pub struct ExternalKernel {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalKernel {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl CadKernel for ExternalKernel {
    async fn build(&self, plan: &BuildPlan) -> Result<(), KernelError> {
        let payload = serde_json::to_vec(plan)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| KernelError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let stderr_task = tokio::spawn(read_capped(child.stderr.take()));
        let stdin = child.stdin.take();

        // The timeout covers feeding stdin as well: a kernel that never reads
        // would otherwise block the write once the pipe buffer fills.
        let run = async {
            if let Some(mut stdin) = stdin {
                // The kernel may legitimately stop reading early and fail; its
                // exit status is what gets reported.
                let _ = stdin.write_all(&payload).await;
                drop(stdin);
            }
            child.wait().await
        };

        // On timeout `child` is dropped, and `kill_on_drop` reaps it.
        let status = match tokio::time::timeout(self.timeout, run).await {
            Ok(status) => status?,
            Err(_) => {
                return Err(KernelError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                })
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let stderr_bytes = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(KernelError::ExecutionFailed {
                exit_code: status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&stderr_bytes).trim().to_string(),
            });
        }

        match tokio::fs::metadata(&plan.output).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {}
            _ => return Err(KernelError::MissingOutput(plan.output.clone())),
        }

        tracing::debug!(
            program = %self.program,
            slots = plan.slots.len(),
            elapsed_ms,
            "CAD kernel build finished"
        );
        Ok(())
    }
}

/// Read a stream to the end, keeping at most [`MAX_STDERR_BYTES`].
async fn read_capped<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_STDERR_BYTES)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
