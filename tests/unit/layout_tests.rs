/*!
 * Tests for caption layout through the public engine API
 */

use chunkreel::app_config::{Canvas, CaptionConfig, FitMode};
use chunkreel::layout::{FontChain, FontHandle, LayoutEngine, Script};
use chunkreel::script::{Line, Speaker};
use std::path::PathBuf;

fn engine(canvas: Canvas, rows: usize) -> LayoutEngine {
    let fonts = FontChain::from_available(
        Some(PathBuf::from("/fonts/latin.ttf")),
        Some(PathBuf::from("/fonts/cjk.otf")),
        None,
    );
    LayoutEngine::new(&CaptionConfig::default(), canvas, rows, fonts)
}

fn line(speaker: Speaker, rows: &[&str]) -> Line {
    Line::new(speaker, rows.iter().map(|r| r.to_string()).collect(), 2.0)
}

#[test]
fn test_layoutLine_withJapaneseAndEnglish_shouldPickFontPerRow() {
    let engine = engine(Canvas::default(), 2);
    let layout = engine.layout_line(&line(Speaker::Narrator, &["今日はいい天気ですね。", "Nice weather today."]));

    assert_eq!(layout.blocks.len(), 2);
    assert_eq!(layout.blocks[0].script, Script::Cjk);
    assert_eq!(layout.blocks[0].font, FontHandle::File(PathBuf::from("/fonts/cjk.otf")));
    assert_eq!(layout.blocks[1].script, Script::Latin);
    assert_eq!(layout.blocks[1].font, FontHandle::File(PathBuf::from("/fonts/latin.ttf")));
}

#[test]
fn test_layoutLine_withHangulAndNoHangulFont_shouldFallBack() {
    let engine = engine(Canvas::default(), 1);
    let layout = engine.layout_line(&line(Speaker::Narrator, &["안녕하세요, 만나서 반갑습니다."]));

    assert_eq!(layout.blocks.len(), 1);
    assert_eq!(layout.blocks[0].script, Script::Hangul);
    assert_ne!(layout.blocks[0].font, FontHandle::Default);
}

#[test]
fn test_layoutLine_withSingleRow_shouldIgnoreSecondRow() {
    let engine = engine(Canvas::default(), 1);
    let layout = engine.layout_line(&line(Speaker::SpeakerA, &["Top only.", "Never shown."]));

    assert_eq!(layout.blocks.len(), 1);
    assert_eq!(layout.blocks[0].row_index, 0);
}

#[test]
fn test_layoutLine_onVerticalCanvas_shouldStayInsideCanvas() {
    let canvas = Canvas::new(1080, 1920, FitMode::Contain);
    let engine = engine(canvas, 2);
    let text = "A considerably longer caption that has to wrap over several lines on a narrow vertical canvas";
    let layout = engine.layout_line(&line(Speaker::SpeakerB, &[text, text]));

    let safe_bottom = engine.metrics().safe_bottom(&canvas);
    for block in &layout.blocks {
        assert!(block.position.x >= 0);
        assert!(block.position.x + block.bounding_box.width as i32 <= canvas.width as i32);
        assert!(block.position.y >= 0);
        assert!(block.lines.len() <= CaptionConfig::default().max_lines);
    }
    assert!(layout.bottom() <= safe_bottom || layout.overflow_px > 0);
}

#[test]
fn test_layoutLine_withOnlyWhitespace_shouldProduceNoBlocks() {
    let engine = engine(Canvas::default(), 2);
    let layout = engine.layout_line(&line(Speaker::Narrator, &["   ", "\t"]));
    assert!(layout.is_empty());
    assert_eq!(layout.overflow_px, 0);
}
