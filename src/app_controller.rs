use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::issues::{IssueEntry, IssueKind, IssueLog};
use crate::layout::{FontChain, LayoutEngine};
use crate::media::audio::slice_extension;
use crate::media::{
    AudioSlicer, CanvasUnifier, ConcatResolver, FfmpegBackend, JoinStrategy, MediaBackend, RenderedSegment,
    SegmentCompositor,
};
use crate::script::{Line, load_script};
use crate::timeline::{Partition, Timeline, partition};
use crate::workspace::RunWorkspace;

// @module: Run orchestration from script to final video

/// Inputs and output of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// JSON array of timed line records
    pub lines_path: PathBuf,
    /// Continuous narration audio
    pub narration_path: PathBuf,
    /// Background image
    pub background_path: PathBuf,
    pub output_path: PathBuf,
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output_path: PathBuf,
    pub chunks_rendered: usize,
    pub chunks_dropped: usize,
    pub lines_dropped: usize,
    /// Sum of the rendered chunk durations
    pub total_duration_secs: f64,
    pub join_strategy: JoinStrategy,
    /// Whether the canvas unifier re-encoded the segments
    pub unified: bool,
    pub issues: Vec<IssueEntry>,
    /// Workspace left on disk for diagnostics
    pub artifacts_dir: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Main application controller for video assembly
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Media toolchain
    backend: Arc<dyn MediaBackend>,
    // @field: Where run workspaces are created, system temp dir when unset
    workspace_parent: Option<PathBuf>,
}

impl Controller {
    // @method: Create a controller driving ffmpeg
    pub fn with_config(config: Config) -> Result<Self, PipelineError> {
        config.validate().map_err(|e| PipelineError::Config(e.to_string()))?;
        let backend = Arc::new(FfmpegBackend::new(&config));
        Ok(Self {
            config,
            backend,
            workspace_parent: None,
        })
    }

    // @method: Create a controller with a custom media backend
    pub fn with_backend(config: Config, backend: Arc<dyn MediaBackend>) -> Result<Self, PipelineError> {
        config.validate().map_err(|e| PipelineError::Config(e.to_string()))?;
        Ok(Self {
            config,
            backend,
            workspace_parent: None,
        })
    }

    // @method: Create run workspaces under `parent`
    pub fn with_workspace_dir(mut self, parent: impl Into<PathBuf>) -> Self {
        self.workspace_parent = Some(parent.into());
        self
    }

    /// Load the script and render it
    pub async fn run(&self, request: &RenderRequest) -> Result<RunSummary, PipelineError> {
        Self::check_inputs(request)?;
        let lines = load_script(&request.lines_path, &self.config.captions.speaker_names)?;
        info!("Loaded {} line(s) from {}", lines.len(), request.lines_path.display());
        self.render_lines(&lines, request).await
    }

    /// Render already parsed lines into `request.output_path`.
    ///
    /// Either the output file is complete when this returns `Ok`, or it was
    /// never touched.
    pub async fn render_lines(&self, lines: &[Line], request: &RenderRequest) -> Result<RunSummary, PipelineError> {
        let start_time = Instant::now();
        Self::check_inputs(request)?;
        crate::script::validate_lines(lines)?;

        let render = &self.config.render;
        let issues = IssueLog::new();

        let timeline = Timeline::from_lines(lines);
        for index in timeline.clamped_lines() {
            issues.record(IssueKind::ClampedDuration, None, format!("line {} had a negative duration", index));
        }

        let partition = partition(lines, &timeline, render.chunk_size, render.chunk_epsilon_secs)?;
        Self::record_drops(&partition, &issues);
        info!(
            "{} chunk(s) of up to {} line(s), {} total",
            partition.chunks.len(),
            render.chunk_size,
            Self::format_seconds(partition.total_duration())
        );

        let workspace = match &self.workspace_parent {
            Some(parent) => RunWorkspace::create_in(parent, render.keep_artifacts)?,
            None => RunWorkspace::create(render.keep_artifacts)?,
        };
        debug!("Workspace: {}", workspace.path().display());

        let backend = self.backend.as_ref();
        let slicer = AudioSlicer::new(render.duration_tolerance_secs, issues.clone());
        slicer.check_narration(backend, &request.narration_path, &timeline).await?;

        let compositor = SegmentCompositor::new(self.layout_engine(&issues), issues.clone());
        let segments = self
            .render_chunks(&partition, request, &workspace, &slicer, &compositor)
            .await?;

        let unified = CanvasUnifier::new(render.canvas)
            .unify(backend, segments, |index| workspace.unified_segment(index))
            .await?;

        let joined = workspace.joined_output();
        let join_strategy = ConcatResolver::new(render.duration_tolerance_secs, issues.clone())
            .join(backend, &unified.segments, &workspace.concat_list(), &joined)
            .await?;

        FileManager::move_file(&joined, &request.output_path).map_err(|e| PipelineError::Io(format!("{:#}", e)))?;
        info!("Success: {}", request.output_path.display());

        if !issues.is_empty() {
            let log_path = FileManager::sibling_path(&request.output_path, "issues.log");
            let context = request.output_path.display().to_string();
            match issues.write_to_file(&log_path, &context) {
                Ok(()) => info!("{} issue(s) written to {}", issues.len(), log_path.display()),
                Err(e) => warn!("Failed to write issues log: {}", e),
            }
        }

        let artifacts_dir = workspace.finish();
        let summary = RunSummary {
            output_path: request.output_path.clone(),
            chunks_rendered: unified.segments.len(),
            chunks_dropped: partition.dropped_chunks.len(),
            lines_dropped: partition.dropped_lines.len(),
            total_duration_secs: partition.total_duration(),
            join_strategy,
            unified: unified.normalized,
            issues: issues.entries(),
            artifacts_dir,
            elapsed: start_time.elapsed(),
        };
        Self::log_summary(&summary);
        Ok(summary)
    }

    /// Slice and render every chunk, at most `max_workers` at a time.
    ///
    /// The first failure drops the remaining jobs, which kills their
    /// processes. Segments come back in chunk order.
    async fn render_chunks(
        &self,
        partition: &Partition,
        request: &RenderRequest,
        workspace: &RunWorkspace,
        slicer: &AudioSlicer,
        compositor: &SegmentCompositor,
    ) -> Result<Vec<RenderedSegment>, PipelineError> {
        let backend = self.backend.as_ref();
        let extension = slice_extension(&request.narration_path);
        let progress_bar = Self::progress_bar(partition.chunks.len() as u64);

        let mut segments: Vec<RenderedSegment> = stream::iter(partition.chunks.iter())
            .map(|chunk| {
                let audio = workspace.audio_slice(chunk.index, &extension);
                let progress_bar = progress_bar.clone();
                async move {
                    slicer.slice(backend, &request.narration_path, chunk, &audio).await?;
                    let plan = compositor.plan(
                        chunk,
                        &audio,
                        &request.background_path,
                        workspace.segment(chunk.index),
                        workspace.caption_dir(chunk.index),
                    );
                    let segment = compositor.render(backend, &plan).await?;
                    progress_bar.inc(1);
                    Ok::<_, PipelineError>(segment)
                }
            })
            .buffer_unordered(self.config.render.max_workers)
            .try_collect()
            .await
            .inspect_err(|_| progress_bar.abandon())?;

        progress_bar.finish_and_clear();
        segments.sort_by_key(|segment| segment.chunk_index);
        Ok(segments)
    }

    fn layout_engine(&self, issues: &IssueLog) -> LayoutEngine {
        let fonts = &self.config.captions.fonts;
        for (label, path) in [("latin", &fonts.latin), ("cjk", &fonts.cjk), ("hangul", &fonts.hangul)] {
            if let Some(path) = path {
                if !FileManager::file_exists(path) {
                    issues.record(IssueKind::MissingFont, None, format!("{} font {} not found", label, path.display()));
                }
            }
        }

        LayoutEngine::new(
            &self.config.captions,
            self.config.render.canvas,
            self.config.render.rows,
            FontChain::resolve(fonts),
        )
    }

    fn record_drops(partition: &Partition, issues: &IssueLog) {
        for index in &partition.dropped_chunks {
            issues.record(IssueKind::DroppedChunk, Some(*index), "zero-length chunk was not rendered");
        }
        for index in &partition.dropped_lines {
            issues.record(IssueKind::DroppedChunk, None, format!("zero-length line {} has no caption", index));
        }
    }

    fn check_inputs(request: &RenderRequest) -> Result<(), PipelineError> {
        for path in [&request.lines_path, &request.narration_path, &request.background_path] {
            if !FileManager::file_exists(path) {
                return Err(PipelineError::MissingInput(path.clone()));
            }
        }
        Ok(())
    }

    fn progress_bar(total: u64) -> ProgressBar {
        let progress_bar = ProgressBar::new(total);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Rendering");
        progress_bar
    }

    fn log_summary(summary: &RunSummary) {
        info!(
            "Rendered {} chunk(s), {} of video, joined by {}{} in {}",
            summary.chunks_rendered,
            Self::format_seconds(summary.total_duration_secs),
            summary.join_strategy,
            if summary.unified { " after canvas normalization" } else { "" },
            Self::format_duration(summary.elapsed)
        );
        if summary.chunks_dropped > 0 || summary.lines_dropped > 0 {
            info!(
                "Dropped {} zero-length chunk(s) and {} line(s)",
                summary.chunks_dropped, summary.lines_dropped
            );
        }
        if !summary.issues.is_empty() {
            warn!("Completed with {} issue(s)", summary.issues.len());
        }
    }

    // Format a timeline length, saturating lengths no Duration can hold
    pub fn format_seconds(seconds: f64) -> String {
        Self::format_duration(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX))
    }

    // Format duration in a human-readable format (HH:MM:SS)
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Resolve the output path against the current directory and create its parent
pub fn prepare_output_path(path: &Path) -> Result<PathBuf, PipelineError> {
    let absolute = FileManager::absolute(path).map_err(|e| PipelineError::Io(e.to_string()))?;
    if let Some(parent) = absolute.parent() {
        FileManager::ensure_dir(parent).map_err(|e| PipelineError::Io(e.to_string()))?;
    }
    Ok(absolute)
}
