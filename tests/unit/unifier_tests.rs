/*!
 * Tests for canvas unification of rendered segments
 */

use anyhow::Result;
use chunkreel::app_config::{Canvas, FitMode};
use chunkreel::media::{CanvasUnifier, MediaInfo, RenderedSegment};

use crate::common;
use crate::common::mock_backend::{MockBackend, MockCall, video_info};

fn segments(dir: &std::path::Path, infos: &[MediaInfo], backend: &MockBackend) -> Vec<RenderedSegment> {
    infos
        .iter()
        .enumerate()
        .map(|(index, info)| {
            let path = dir.join(format!("segment_{:04}.mp4", index));
            backend.register(&path, info.clone());
            RenderedSegment {
                chunk_index: index,
                path,
                duration_secs: info.duration_secs,
            }
        })
        .collect()
}

#[tokio::test]
async fn test_unify_withMatchingSegments_shouldKeepThem() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let backend = MockBackend::default();
    let input = segments(dir.path(), &[video_info(2.0, 1920, 1080), video_info(3.0, 1920, 1080)], &backend);

    let unified = CanvasUnifier::new(Canvas::default())
        .unify(&backend, input.clone(), |index| dir.path().join(format!("unified_{index}.mp4")))
        .await?;

    assert!(!unified.normalized);
    assert_eq!(unified.segments, input);
    assert_eq!(backend.count(|c| matches!(c, MockCall::Normalize(_))), 0);
    Ok(())
}

#[tokio::test]
async fn test_unify_withSameSizeOtherCodec_shouldNormalizeAll() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let backend = MockBackend::default();
    let odd = MediaInfo {
        video_codec: Some("hevc".to_string()),
        audio_codec: Some("mp3".to_string()),
        ..video_info(3.0, 1920, 1080)
    };
    let input = segments(dir.path(), &[video_info(2.0, 1920, 1080), odd], &backend);

    let unified = CanvasUnifier::new(Canvas::new(1920, 1080, FitMode::Cover))
        .unify(&backend, input, |index| dir.path().join(format!("unified_{index}.mp4")))
        .await?;

    assert!(unified.normalized);
    assert_eq!(unified.mismatched, vec![1]);
    assert_eq!(backend.count(|c| matches!(c, MockCall::Normalize(_))), 2);
    assert!(unified.segments.iter().all(|s| s.path.file_name().is_some_and(|n| n.to_string_lossy().starts_with("unified_"))));
    Ok(())
}

#[tokio::test]
async fn test_unify_withOffSizeSegment_shouldReportOnlyThatOne() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let backend = MockBackend::default();
    let input = segments(
        dir.path(),
        &[video_info(2.0, 1920, 1080), video_info(2.0, 1918, 1080), video_info(2.0, 1920, 1080)],
        &backend,
    );

    let unified = CanvasUnifier::new(Canvas::default())
        .unify(&backend, input, |index| dir.path().join(format!("unified_{index}.mp4")))
        .await?;

    assert_eq!(unified.mismatched, vec![1]);
    assert_eq!(unified.segments.len(), 3);
    Ok(())
}
