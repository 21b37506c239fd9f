/*!
 * Tests for configuration loading, parsing and validation
 */

use anyhow::Result;
use chunkreel::app_config::{Canvas, CanvasSize, Config, FitMode, LogLevel};
use std::fs;

use crate::common;

#[test]
fn test_config_fromJsonFile_shouldMergeWithDefaults() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        dir.path(),
        "chunkreel.json",
        r#"{
            "render": { "chunk_size": 10, "canvas": { "width": 1080, "height": 1920, "fit": "contain" } },
            "captions": { "show_narrator_label": true, "speaker_names": { "narrator": "Host" } },
            "log_level": "debug"
        }"#,
    )?;

    let config: Config = serde_json::from_str(&fs::read_to_string(path)?)?;

    assert_eq!(config.render.chunk_size, 10);
    assert_eq!(config.render.canvas, Canvas::new(1080, 1920, FitMode::Contain));
    assert_eq!(config.render.rows, 2);
    assert!(config.captions.show_narrator_label);
    assert_eq!(config.captions.speaker_names.narrator, "Host");
    assert_eq!(config.captions.speaker_names.speaker_a, "A");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
    Ok(())
}

#[test]
fn test_config_serialized_shouldRoundTrip() -> Result<()> {
    let mut config = Config::default();
    config.render.max_workers = 6;
    config.captions.font_size_top = Some(72);

    let json = serde_json::to_string_pretty(&config)?;
    let parsed: Config = serde_json::from_str(&json)?;

    assert_eq!(parsed.render.max_workers, 6);
    assert_eq!(parsed.captions.font_size_top, Some(72));
    assert_eq!(parsed.encoding.video_codec, config.encoding.video_codec);
    Ok(())
}

#[test]
fn test_validate_withZeroWorkers_shouldFail() {
    let mut config = Config::default();
    config.render.max_workers = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withZeroChunkSize_shouldFail() {
    let mut config = Config::default();
    config.render.chunk_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withZeroFontOverride_shouldFail() {
    let mut config = Config::default();
    config.captions.font_size_bottom = Some(0);
    assert!(config.validate().is_err());
}

#[test]
fn test_canvasSize_withBadInput_shouldFail() {
    assert!("1920".parse::<CanvasSize>().is_err());
    assert!("0x1080".parse::<CanvasSize>().is_err());
    assert!("widexhigh".parse::<CanvasSize>().is_err());
    assert_eq!(
        " 1080X1920 ".parse::<CanvasSize>().ok(),
        Some(CanvasSize {
            width: 1080,
            height: 1920
        })
    );
}

#[test]
fn test_captionSizes_onVerticalCanvas_shouldScaleWithHeight() {
    let config = Config::default();
    let landscape = Canvas::default();
    let half = Canvas::new(960, 540, FitMode::Cover);

    let full_top = config.captions.top_font_size(&landscape);
    let half_top = config.captions.top_font_size(&half);
    assert!(half_top < full_top);
    assert!((half_top as i64 * 2 - full_top as i64).abs() <= 1);
}
