use log::{debug, error, warn};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::ToolConfig;
use crate::errors::PipelineError;

// @module: External tool invocation with timeout and bounded retry

/// One external tool call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Keep standard output (probe calls); discarded otherwise
    pub capture_stdout: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            capture_stdout: false,
        }
    }

    pub fn capturing_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    /// Printable command line, arguments with spaces quoted
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("'{}'", part.replace('\'', "'\\''"))
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs external tools.
///
/// A timeout counts as a failed attempt just like a non-zero exit. Failed
/// attempts are retried `retries` times with exponential backoff; a tool
/// that cannot be started at all is not retried.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    retries: u32,
    backoff_base_ms: u64,
}

impl ProcessRunner {
    pub fn new(retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            retries,
            backoff_base_ms,
        }
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(config.retry_count, config.retry_backoff_ms)
    }

    /// Run until success or until retries are exhausted; returns stdout
    pub async fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, PipelineError> {
        let command_line = invocation.command_line();
        let mut attempt: u32 = 0;
        let mut last_exit_code = None;
        let mut last_stderr = String::new();

        while attempt <= self.retries {
            if attempt > 0 {
                let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1).min(16));
                debug!("Retrying in {}ms (attempt {}/{}): {}", backoff_ms, attempt + 1, self.retries + 1, command_line);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            attempt += 1;
            debug!("Running: {}", command_line);

            let child = Command::new(&invocation.program)
                .args(&invocation.args)
                .stdin(Stdio::null())
                .stdout(if invocation.capture_stdout { Stdio::piped() } else { Stdio::null() })
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn();

            let child = match child {
                Ok(child) => child,
                Err(e) => {
                    error!("Failed to start {}: {}", invocation.program, e);
                    return Err(PipelineError::ProcessInvocation {
                        command: command_line,
                        exit_code: None,
                        stderr: format!("failed to start: {}", e),
                        attempts: attempt,
                    });
                }
            };

            match tokio::time::timeout(invocation.timeout, child.wait_with_output()).await {
                Ok(Ok(output)) if output.status.success() => return Ok(output.stdout),
                Ok(Ok(output)) => {
                    last_exit_code = output.status.code();
                    last_stderr = filter_ffmpeg_stderr(&String::from_utf8_lossy(&output.stderr));
                    warn!(
                        "{} exited with {:?} - attempt {}/{}",
                        invocation.program,
                        last_exit_code,
                        attempt,
                        self.retries + 1
                    );
                }
                Ok(Err(e)) => {
                    last_exit_code = None;
                    last_stderr = format!("failed while waiting for process: {}", e);
                    warn!("{} - attempt {}/{}", last_stderr, attempt, self.retries + 1);
                }
                Err(_) => {
                    // the timed-out child is dropped here and killed
                    last_exit_code = None;
                    last_stderr = format!("timed out after {}s", invocation.timeout.as_secs_f64());
                    warn!(
                        "{} {} - attempt {}/{}",
                        invocation.program,
                        last_stderr,
                        attempt,
                        self.retries + 1
                    );
                }
            }
        }

        error!("Command failed: {}\n{}", command_line, last_stderr);
        Err(PipelineError::ProcessInvocation {
            command: command_line,
            exit_code: last_exit_code,
            stderr: last_stderr,
            attempts: attempt,
        })
    }
}

/// Filter ffmpeg stderr to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Stream #",
        "encoder",
        "handler_name",
        "major_brand",
        "minor_version",
        "compatible_brands",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "frame=",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
