/*!
 * Tests for error types, conversions and exit codes
 */

use chunkreel::errors::{EXIT_EMPTY_OUTPUT, EXIT_GENERIC, EXIT_PROCESS, EXIT_VALIDATION, PipelineError};
use std::path::PathBuf;

#[test]
fn test_invalidInput_shouldNameLineAndReason() {
    let error = PipelineError::invalid_input(4, "duration is not a number");
    let display = format!("{}", error);
    assert!(display.contains("line 4"));
    assert!(display.contains("duration is not a number"));
    assert_eq!(error.exit_code(), EXIT_VALIDATION);
}

#[test]
fn test_missingInput_shouldShowPathAndExitAsValidation() {
    let error = PipelineError::MissingInput(PathBuf::from("/data/voice.mp3"));
    assert!(format!("{}", error).contains("/data/voice.mp3"));
    assert_eq!(error.exit_code(), EXIT_VALIDATION);
}

#[test]
fn test_processInvocation_shouldCarryCommandLineAndStderr() {
    let error = PipelineError::ProcessInvocation {
        command: "ffmpeg -i bg.png out.mp4".to_string(),
        exit_code: Some(183),
        stderr: "Unknown encoder 'libx265'".to_string(),
        attempts: 3,
    };
    let display = format!("{}", error);
    assert!(display.contains("ffmpeg -i bg.png out.mp4"));
    assert!(display.contains("183"));
    assert!(display.contains("3 attempt(s)"));
    assert!(display.contains("Unknown encoder"));
    assert_eq!(error.exit_code(), EXIT_PROCESS);
}

#[test]
fn test_emptyOutput_shouldHaveItsOwnExitCode() {
    let error = PipelineError::EmptyOutput("all 3 chunk(s) have zero length".to_string());
    assert_eq!(error.exit_code(), EXIT_EMPTY_OUTPUT);
}

#[test]
fn test_recoverableErrors_shouldMapToGenericExitCode() {
    let mismatch = PipelineError::ConcatMismatch("joined file is 8.1s, expected 9.0s".to_string());
    let overflow = PipelineError::LayoutOverflow {
        overflow_px: 12,
        font_size: 28,
    };
    assert_eq!(mismatch.exit_code(), EXIT_GENERIC);
    assert_eq!(overflow.exit_code(), EXIT_GENERIC);
    assert!(format!("{}", overflow).contains("12px"));
}

#[test]
fn test_fromIoError_shouldWrapAsFileError() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only file system");
    let error: PipelineError = io_error.into();
    let display = format!("{}", error);
    assert!(display.contains("File error"));
    assert!(display.contains("read-only file system"));
}

#[test]
fn test_pipelineError_shouldSurviveAnyhowRoundTrip() {
    let error: anyhow::Error = PipelineError::Config("rows must be 1 or 2, got 3".to_string()).into();
    let code = error.downcast_ref::<PipelineError>().map(PipelineError::exit_code);
    assert_eq!(code, Some(EXIT_VALIDATION));
}
