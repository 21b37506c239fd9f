use log::{debug, info};
use std::path::PathBuf;

use super::{MediaBackend, RenderedSegment};
use crate::app_config::{Canvas, FitMode};
use crate::errors::PipelineError;

// @module: Canvas geometry normalization before concatenation

/// Scale filter fitting any input onto the canvas
pub fn fit_filter(canvas: &Canvas, pad_color: &str) -> String {
    let (w, h) = (canvas.width, canvas.height);
    match canvas.fit {
        FitMode::Cover => format!("scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}"),
        FitMode::Contain => format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color={pad_color}"
        ),
    }
}

/// Outcome of the unify pass
#[derive(Debug, Clone, PartialEq)]
pub struct Unified {
    pub segments: Vec<RenderedSegment>,
    /// Whether any segment was re-encoded
    pub normalized: bool,
    /// Chunk indices of segments off the canvas geometry or the first segment's codecs
    pub mismatched: Vec<usize>,
}

/// Brings every segment onto the canvas geometry when any of them is off
#[derive(Debug, Clone, Copy)]
pub struct CanvasUnifier {
    canvas: Canvas,
}

impl CanvasUnifier {
    pub fn new(canvas: Canvas) -> Self {
        Self { canvas }
    }

    /// Probe all segments; if one differs from the canvas or from the codecs
    /// of the first segment, normalize all of them into `output_for(chunk_index)`.
    /// Nothing is re-encoded when every segment already matches.
    pub async fn unify<F>(
        &self,
        backend: &dyn MediaBackend,
        segments: Vec<RenderedSegment>,
        output_for: F,
    ) -> Result<Unified, PipelineError>
    where
        F: Fn(usize) -> PathBuf,
    {
        let mut mismatched = Vec::new();
        let mut reference: Option<(Option<String>, Option<String>)> = None;
        for segment in &segments {
            let info = backend.probe(&segment.path).await?;
            let codecs = (info.video_codec.clone(), info.audio_codec.clone());
            let reference = reference.get_or_insert_with(|| codecs.clone());

            if !info.matches_canvas(&self.canvas) {
                debug!(
                    "Segment {} is {:?}, expected {}",
                    segment.chunk_index,
                    info.resolution(),
                    self.canvas
                );
                mismatched.push(segment.chunk_index);
            } else if *reference != codecs {
                debug!(
                    "Segment {} uses codecs {:?}, expected {:?}",
                    segment.chunk_index, codecs, reference
                );
                mismatched.push(segment.chunk_index);
            }
        }

        if mismatched.is_empty() {
            debug!("All {} segment(s) match {}", segments.len(), self.canvas);
            return Ok(Unified {
                segments,
                normalized: false,
                mismatched,
            });
        }

        info!(
            "{} segment(s) differ from {} or in codecs, normalizing all {} with {} fit",
            mismatched.len(),
            self.canvas,
            segments.len(),
            self.canvas.fit
        );

        let mut unified = Vec::with_capacity(segments.len());
        for segment in segments {
            let output = output_for(segment.chunk_index);
            backend.normalize_segment(&segment.path, &output, &self.canvas).await?;
            unified.push(RenderedSegment { path: output, ..segment });
        }

        Ok(Unified {
            segments: unified,
            normalized: true,
            mismatched,
        })
    }
}
