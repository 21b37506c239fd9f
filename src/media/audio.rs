use log::{debug, info};
use std::path::Path;

use super::{MediaBackend, MediaInfo};
use crate::errors::PipelineError;
use crate::issues::{IssueKind, IssueLog};
use crate::timeline::{Chunk, Timeline};

// @module: Per-chunk narration slicing

/// Extension for audio slices; stream copy keeps the narration container
pub fn slice_extension(narration: &Path) -> String {
    narration
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "wav".to_string())
}

/// Cuts the narration into per-chunk clips and checks their lengths
#[derive(Debug, Clone)]
pub struct AudioSlicer {
    /// Allowed drift between measured and expected lengths
    tolerance: f64,
    issues: IssueLog,
}

impl AudioSlicer {
    pub fn new(tolerance: f64, issues: IssueLog) -> Self {
        Self { tolerance, issues }
    }

    /// Probe the narration once and compare it with the timeline total
    pub async fn check_narration(
        &self,
        backend: &dyn MediaBackend,
        narration: &Path,
        timeline: &Timeline,
    ) -> Result<MediaInfo, PipelineError> {
        let info = backend.probe(narration).await?;
        if !timeline.matches_duration(info.duration_secs, self.tolerance) {
            self.issues.record(
                IssueKind::DurationDrift,
                None,
                format!(
                    "narration is {:.3}s but the lines add up to {:.3}s",
                    info.duration_secs,
                    timeline.total()
                ),
            );
        } else {
            info!("Narration: {:.3}s", info.duration_secs);
        }
        Ok(info)
    }

    /// Stream-copy the chunk window out of the narration into `output`
    pub async fn slice(
        &self,
        backend: &dyn MediaBackend,
        narration: &Path,
        chunk: &Chunk,
        output: &Path,
    ) -> Result<(), PipelineError> {
        let expected = chunk.duration();
        backend.slice_audio(narration, chunk.start_time, expected, output).await?;

        let measured = backend.probe(output).await?.duration_secs;
        if (measured - expected).abs() > self.tolerance {
            self.issues.record(
                IssueKind::DurationDrift,
                Some(chunk.index),
                format!("audio slice is {:.3}s, expected {:.3}s", measured, expected),
            );
        } else {
            debug!("Chunk {} audio: {:.3}s", chunk.index, measured);
        }

        Ok(())
    }
}
