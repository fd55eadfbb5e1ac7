//! Subprocess execution used by every clipboard backend and converter.
//!
//! Programs are always invoked with an argument vector, never through a
//! shell string. Each call carries its own timeout and output cap.

#[cfg(test)]
pub mod scripted;

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Default timeout for text-mode calls
const TEXT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for binary-mode calls (image payloads)
const BINARY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default output cap for text-mode calls (10MB)
const TEXT_MAX_BUFFER: usize = 10 * 1024 * 1024;

/// Default output cap for binary-mode calls (50MB)
const BINARY_MAX_BUFFER: usize = 50 * 1024 * 1024;

/// Errors produced while running an external program
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("{program} not found")]
    NotFound { program: String },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} timed out after {}s", .timeout.as_secs_f64())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} produced more than {limit} bytes of output")]
    OutputTooLarge { program: String, limit: usize },

    #[error("{program} exited with {}: {stderr}", .code.map_or("signal".to_string(), |c| format!("status {c}")))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error talking to {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    /// True when the program itself could not be located
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExecError::NotFound { .. })
    }
}

/// Per-call execution limits
#[derive(Debug, Clone)]
pub struct ExecOptions {
    pub timeout: Duration,
    pub max_buffer: usize,
    pub cwd: Option<PathBuf>,
}

impl ExecOptions {
    /// Limits for calls whose output is text (type lists, paths, probes)
    pub fn text() -> Self {
        ExecOptions {
            timeout: TEXT_TIMEOUT,
            max_buffer: TEXT_MAX_BUFFER,
            cwd: None,
        }
    }

    /// Limits for calls whose output is image data
    pub fn binary() -> Self {
        ExecOptions {
            timeout: BINARY_TIMEOUT,
            max_buffer: BINARY_MAX_BUFFER,
            cwd: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self::text()
    }
}

/// Output of a text-mode call
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Output of a binary-mode call
#[derive(Debug, Clone, Default)]
pub struct BinaryOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Trait for running external programs
/// Backends only talk to the host through this, so tests can script it
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program and collect stdout/stderr as text
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        options: &ExecOptions,
    ) -> Result<ExecOutput, ExecError>;

    /// Run a program and collect stdout as raw bytes, optionally piping stdin
    async fn run_binary(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
        options: &ExecOptions,
    ) -> Result<BinaryOutput, ExecError>;

    /// Look a program up on PATH
    fn which(&self, program: &str) -> Option<PathBuf>;
}

/// CommandRunner backed by real processes via tokio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        SystemRunner
    }

    async fn execute(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
        options: &ExecOptions,
    ) -> Result<(Vec<u8>, Vec<u8>), ExecError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ExecError::NotFound {
                    program: program.to_string(),
                }
            } else {
                ExecError::Spawn {
                    program: program.to_string(),
                    source,
                }
            }
        })?;

        let io_err = |source: io::Error| ExecError::Io {
            program: program.to_string(),
            source,
        };

        let stdin_pipe = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io_err(io::Error::other("stdout was not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io_err(io::Error::other("stderr was not captured")))?;

        let limit = options.max_buffer;
        let input = stdin.map(<[u8]>::to_vec);

        let work = async {
            // stderr is drained on its own task so a child blocked on a full
            // stdout pipe can still be killed and reaped
            let stderr_task = tokio::spawn(read_capped(stderr, limit));

            let feed = async {
                if let (Some(mut pipe), Some(data)) = (stdin_pipe, input) {
                    match pipe.write_all(&data).await {
                        Ok(()) => {}
                        // Tool exited without consuming all input
                        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
                        Err(e) => return Err(e),
                    }
                    pipe.shutdown().await.or_else(|e| {
                        if e.kind() == io::ErrorKind::BrokenPipe {
                            Ok(())
                        } else {
                            Err(e)
                        }
                    })?;
                }
                Ok::<(), io::Error>(())
            };

            let (fed, out) = tokio::join!(feed, read_capped(stdout, limit));
            fed.map_err(io_err)?;
            let (stdout_buf, overflow) = out.map_err(io_err)?;

            if overflow {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(ExecError::OutputTooLarge {
                    program: program.to_string(),
                    limit,
                });
            }

            let status = child.wait().await.map_err(io_err)?;
            let (stderr_buf, _) = stderr_task
                .await
                .map_err(|e| io_err(io::Error::other(e)))?
                .map_err(io_err)?;

            if !status.success() {
                return Err(ExecError::Failed {
                    program: program.to_string(),
                    code: status.code(),
                    stderr: String::from_utf8_lossy(&stderr_buf).trim().to_string(),
                });
            }

            Ok((stdout_buf, stderr_buf))
        };

        let outcome = tokio::time::timeout(options.timeout, work).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                let _ = child.start_kill();
                log::warn!(
                    "{} timed out after {:.1}s, killed",
                    program,
                    options.timeout.as_secs_f64()
                );
                Err(ExecError::Timeout {
                    program: program.to_string(),
                    timeout: options.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        options: &ExecOptions,
    ) -> Result<ExecOutput, ExecError> {
        log::debug!("exec {} {:?}", program, args);
        let (stdout, stderr) = self.execute(program, args, None, options).await?;
        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    async fn run_binary(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
        options: &ExecOptions,
    ) -> Result<BinaryOutput, ExecError> {
        log::debug!(
            "exec (binary) {} {:?}, {} bytes stdin",
            program,
            args,
            stdin.map_or(0, <[u8]>::len)
        );
        let (stdout, stderr) = self.execute(program, args, stdin, options).await?;
        Ok(BinaryOutput {
            stdout,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Read at most `limit + 1` bytes; the flag reports whether the limit was exceeded
async fn read_capped<R>(reader: R, limit: usize) -> io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut buf).await?;
    let overflow = buf.len() > limit;
    if overflow {
        buf.truncate(limit);
    }
    Ok((buf, overflow))
}

/// Lazily resolved location of an external tool
/// Falls back to the bare name, which is still a valid program argument
#[derive(Debug)]
pub struct ToolPath {
    name: &'static str,
    resolved: OnceLock<String>,
}

impl ToolPath {
    pub const fn new(name: &'static str) -> Self {
        ToolPath {
            name,
            resolved: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Absolute path if found on PATH, otherwise the bare name
    pub fn program(&self, runner: &dyn CommandRunner) -> &str {
        self.resolved.get_or_init(|| {
            runner
                .which(self.name)
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.name.to_string())
        })
    }

    /// Whether the tool can be found on PATH right now
    pub fn is_available(&self, runner: &dyn CommandRunner) -> bool {
        runner.which(self.name).is_some()
    }
}
