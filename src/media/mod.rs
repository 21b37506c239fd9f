/*!
 * Media stages of the pipeline and the seam to the external tools.
 *
 * Every stage talks to ffmpeg through [`MediaBackend`]; [`FfmpegBackend`]
 * is the production implementation and tests substitute their own.
 */

pub mod audio;
pub mod compositor;
pub mod concat;
pub mod ffmpeg;
pub mod runner;
pub mod unifier;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::app_config::Canvas;
use crate::errors::PipelineError;

pub use audio::AudioSlicer;
pub use compositor::{SegmentCompositor, SegmentPlan, TimedCaption};
pub use concat::{ConcatResolver, JoinStrategy};
pub use ffmpeg::FfmpegBackend;
pub use runner::{Invocation, ProcessRunner};
pub use unifier::CanvasUnifier;

/// What a probe learned about a media file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    pub duration_secs: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
}

impl MediaInfo {
    /// Resolution of the first video stream
    pub fn resolution(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }

    /// Whether the file has exactly the canvas resolution
    pub fn matches_canvas(&self, canvas: &Canvas) -> bool {
        self.resolution() == Some((canvas.width, canvas.height))
    }
}

/// A rendered per-chunk video
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSegment {
    pub chunk_index: usize,
    pub path: PathBuf,
    /// Expected length from the timeline
    pub duration_secs: f64,
}

/// Operations the pipeline needs from a media toolchain
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Duration, resolution and codecs of a media file
    async fn probe(&self, path: &Path) -> Result<MediaInfo, PipelineError>;

    /// Stream-copy `[start, start + duration)` of `source` into `output`
    async fn slice_audio(&self, source: &Path, start: f64, duration: f64, output: &Path) -> Result<(), PipelineError>;

    /// Render one segment: static background, timed captions and the chunk audio
    async fn render_segment(&self, plan: &SegmentPlan, canvas: &Canvas) -> Result<(), PipelineError>;

    /// Re-encode a segment to exactly the canvas geometry
    async fn normalize_segment(&self, input: &Path, output: &Path, canvas: &Canvas) -> Result<(), PipelineError>;

    /// Join the files of a concat list without re-encoding
    async fn concat_stream_copy(&self, list_file: &Path, output: &Path) -> Result<(), PipelineError>;

    /// Join the files of a concat list with a full re-encode
    async fn concat_reencode(&self, list_file: &Path, output: &Path) -> Result<(), PipelineError>;
}
