/*!
 * Tests for loading timed-line scripts from disk
 */

use anyhow::Result;
use chunkreel::app_config::SpeakerNames;
use chunkreel::errors::PipelineError;
use chunkreel::script::{Speaker, load_script};

use crate::common;

#[test]
fn test_loadScript_withValidFile_shouldKeepOrderAndSpeakers() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(dir.path(), "lines.json", common::SCENARIO_A_SCRIPT)?;

    let lines = load_script(&path, &SpeakerNames::default())?;

    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0].speaker, Speaker::Narrator);
    assert_eq!(lines[1].speaker, Speaker::SpeakerA);
    assert_eq!(lines[2].speaker, Speaker::SpeakerB);
    assert_eq!(lines[2].row(1), Some("Immer. Bitte stark."));
    let durations: Vec<f64> = lines.iter().map(|l| l.duration_seconds).collect();
    assert_eq!(durations, vec![2.0, 1.5, 3.0, 0.5, 2.0]);
    Ok(())
}

#[test]
fn test_loadScript_withMissingFile_shouldFailWithFileError() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_script(&dir.path().join("nope.json"), &SpeakerNames::default());
    assert!(matches!(result, Err(PipelineError::Io(_))));
}

#[test]
fn test_loadScript_withTruncatedJson_shouldFailAsInvalidInput() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(dir.path(), "lines.json", r#"[["N", "cut off", 1.0"#)?;

    let error = load_script(&path, &SpeakerNames::default()).unwrap_err();
    assert!(matches!(error, PipelineError::InvalidInput { .. }));
    assert_eq!(error.exit_code(), 2);
    Ok(())
}

#[test]
fn test_loadScript_withBadRecord_shouldReportItsIndex() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        dir.path(),
        "lines.json",
        r#"[["N", "fine", 1.0], ["A", "also fine", 2.0], ["Z", "who?", 1.0]]"#,
    )?;

    match load_script(&path, &SpeakerNames::default()) {
        Err(PipelineError::InvalidInput { index, reason }) => {
            assert_eq!(index, 2);
            assert!(reason.contains("Z"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[test]
fn test_loadScript_withCustomNames_shouldResolveDisplayNames() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(dir.path(), "lines.json", r#"[["Mina", "Hi!", 1.0], ["Joon", "Hey.", 1.0]]"#)?;
    let names = SpeakerNames {
        narrator: "Voice".to_string(),
        speaker_a: "Mina".to_string(),
        speaker_b: "Joon".to_string(),
    };

    let lines = load_script(&path, &names)?;
    assert_eq!(lines[0].speaker, Speaker::SpeakerA);
    assert_eq!(lines[1].speaker.display_name(&names), "Joon");
    Ok(())
}
