/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use chunkreel::file_utils::FileManager;
use std::fs;
use std::path::Path;

use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "voice.mp3", "audio")?;

    assert!(FileManager::file_exists(&test_file));
    Ok(())
}

/// Test that file_exists returns false for non-existent files
#[test]
fn test_file_exists_withNonExistentFile_shouldReturnFalse() {
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
}

#[test]
fn test_sibling_path_shouldSitNextToOutput() {
    let log = FileManager::sibling_path(Path::new("/renders/episode.01.mp4"), "issues.log");
    assert_eq!(log, Path::new("/renders/episode.01.issues.log"));
}

#[test]
fn test_move_file_intoMissingDirectory_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "joined.mp4", "video")?;
    let target = temp_dir.path().join("nested").join("out").join("final.mp4");

    FileManager::move_file(&source, &target)?;

    assert!(!source.exists());
    assert_eq!(fs::read_to_string(&target)?, "video");
    Ok(())
}

#[test]
fn test_append_to_log_file_shouldKeepEarlierEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let log = temp_dir.path().join("final.issues.log");

    FileManager::append_to_log_file(&log, "first")?;
    FileManager::append_to_log_file(&log, "second")?;

    let content = fs::read_to_string(&log)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("first"));
    assert!(lines[1].ends_with("second"));
    Ok(())
}
