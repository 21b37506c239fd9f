/*!
 * Error types for the chunkreel pipeline.
 *
 * A single taxonomy covers every stage of a run. Validation and empty-output
 * errors stop the run before any external tool is started; process errors
 * abort it with the full command line attached. Concat mismatches and layout
 * overflows are recovered locally and only ever show up in the logs.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a successful run
pub const EXIT_OK: i32 = 0;
/// Exit code for errors that are not part of the pipeline taxonomy
pub const EXIT_GENERIC: i32 = 1;
/// Exit code for malformed input or configuration
pub const EXIT_VALIDATION: i32 = 2;
/// Exit code when every chunk degenerated to zero length
pub const EXIT_EMPTY_OUTPUT: i32 = 3;
/// Exit code when an external tool failed or timed out
pub const EXIT_PROCESS: i32 = 4;

/// Errors that can occur while assembling a video
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A line record is malformed
    #[error("Invalid input at line {index}: {reason}")]
    InvalidInput {
        /// Zero-based index of the offending line record
        index: usize,
        /// Human readable reason
        reason: String,
    },

    /// A required input file does not exist
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// The configuration is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every chunk was dropped as zero length
    #[error("No output could be produced: {0}")]
    EmptyOutput(String),

    /// An external tool exited non-zero, timed out, or could not be started
    #[error("Command failed after {attempts} attempt(s) (exit code: {}): {command}\n{stderr}", exit_code_label(.exit_code))]
    ProcessInvocation {
        /// The full command line
        command: String,
        /// Exit code, `None` on timeout or spawn failure
        exit_code: Option<i32>,
        /// Filtered standard error of the last attempt
        stderr: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// The stream-copy join was rejected
    #[error("Stream-copy concatenation rejected: {0}")]
    ConcatMismatch(String),

    /// A caption block could not fit even at the minimum font size
    #[error("Caption overflows the safe area by {overflow_px}px at the minimum font size {font_size}")]
    LayoutOverflow {
        /// Pixels past the safe area after every correction
        overflow_px: i32,
        /// Font size the block ended up with
        font_size: u32,
    },

    /// File system error
    #[error("File error: {0}")]
    Io(String),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

impl PipelineError {
    /// Shorthand for an `InvalidInput` error
    pub fn invalid_input(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            index,
            reason: reason.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput { .. } | Self::MissingInput(_) | Self::Config(_) => EXIT_VALIDATION,
            Self::EmptyOutput(_) => EXIT_EMPTY_OUTPUT,
            Self::ProcessInvocation { .. } => EXIT_PROCESS,
            Self::ConcatMismatch(_) | Self::LayoutOverflow { .. } | Self::Io(_) => EXIT_GENERIC,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        Self::Io(format!("JSON error: {}", error))
    }
}
