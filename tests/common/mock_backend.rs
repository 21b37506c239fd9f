/*!
 * Mock media backend for testing
 *
 * Stands in for ffmpeg and ffprobe: every operation writes a placeholder
 * file and remembers what a probe of that file should report, so the whole
 * pipeline can run without external tools.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chunkreel::app_config::Canvas;
use chunkreel::errors::PipelineError;
use chunkreel::media::{MediaBackend, MediaInfo, SegmentPlan};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Probe(PathBuf),
    SliceAudio { start: f64, duration: f64 },
    Render { chunk_index: usize, captions: usize },
    Normalize(PathBuf),
    ConcatCopy,
    ConcatReencode,
}

/// Scripted media backend
#[derive(Debug, Default)]
pub struct MockBackend {
    files: Mutex<HashMap<PathBuf, MediaInfo>>,
    calls: Mutex<Vec<MockCall>>,
    plans: Mutex<Vec<SegmentPlan>>,
    /// Resolution a chunk renders at instead of the canvas
    render_resolution: HashMap<usize, (u32, u32)>,
    /// Chunk whose render exits non-zero
    failing_render: Option<usize>,
    failing_stream_copy: bool,
    render_delay: Duration,
    active_renders: AtomicUsize,
    peak_renders: AtomicUsize,
}

impl MockBackend {
    /// Create a backend whose narration file probes as `narration_secs`
    pub fn new(narration: &Path, narration_secs: f64) -> Self {
        let backend = Self::default();
        backend.register(narration, audio_info(narration_secs));
        backend
    }

    /// Render the given chunk at a different resolution
    pub fn with_render_resolution(mut self, chunk_index: usize, width: u32, height: u32) -> Self {
        self.render_resolution.insert(chunk_index, (width, height));
        self
    }

    /// Make the render of the given chunk fail
    pub fn with_failing_render(mut self, chunk_index: usize) -> Self {
        self.failing_render = Some(chunk_index);
        self
    }

    /// Make the stream-copy join fail as on a codec mismatch
    pub fn with_failing_stream_copy(mut self) -> Self {
        self.failing_stream_copy = true;
        self
    }

    /// Hold every render for a while so concurrent renders overlap
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    pub fn register(&self, path: &Path, info: MediaInfo) {
        self.files.lock().insert(path.to_path_buf(), info);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Segment plans passed to `render_segment`, in call order
    pub fn plans(&self) -> Vec<SegmentPlan> {
        self.plans.lock().clone()
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&MockCall) -> bool,
    {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    /// Highest number of renders that were in flight at once
    pub fn peak_concurrent_renders(&self) -> usize {
        self.peak_renders.load(Ordering::SeqCst)
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
    }

    fn produce(&self, path: &Path, info: MediaInfo) -> Result<(), PipelineError> {
        std::fs::write(path, b"mock media")?;
        self.register(path, info);
        Ok(())
    }

    /// Sum the durations of the files a concat list names
    fn joined_info(&self, list_file: &Path) -> Result<MediaInfo, PipelineError> {
        let content = std::fs::read_to_string(list_file)?;
        let files = self.files.lock();
        let mut joined = MediaInfo::default();
        for entry in content.lines().filter(|line| !line.trim().is_empty()) {
            let path = parse_concat_entry(entry)
                .ok_or_else(|| PipelineError::Io(format!("malformed concat entry: {}", entry)))?;
            let info = files
                .get(&path)
                .ok_or_else(|| PipelineError::Io(format!("concat input missing: {}", path.display())))?;
            joined.duration_secs += info.duration_secs;
            joined.width = info.width;
            joined.height = info.height;
            joined.video_codec = info.video_codec.clone();
            joined.audio_codec = info.audio_codec.clone();
        }
        Ok(joined)
    }
}

#[async_trait]
impl MediaBackend for MockBackend {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, PipelineError> {
        self.record(MockCall::Probe(path.to_path_buf()));
        self.files.lock().get(path).cloned().ok_or_else(|| PipelineError::ProcessInvocation {
            command: format!("ffprobe {}", path.display()),
            exit_code: Some(1),
            stderr: "No such file or directory".to_string(),
            attempts: 1,
        })
    }

    async fn slice_audio(&self, _source: &Path, start: f64, duration: f64, output: &Path) -> Result<(), PipelineError> {
        self.record(MockCall::SliceAudio { start, duration });
        self.produce(output, audio_info(duration))
    }

    async fn render_segment(&self, plan: &SegmentPlan, canvas: &Canvas) -> Result<(), PipelineError> {
        self.record(MockCall::Render {
            chunk_index: plan.chunk_index,
            captions: plan.captions.len(),
        });
        self.plans.lock().push(plan.clone());

        // A broken filter graph fails right away, before any encoding
        if self.failing_render == Some(plan.chunk_index) {
            return Err(PipelineError::ProcessInvocation {
                command: format!("ffmpeg -i {}", plan.background.display()),
                exit_code: Some(1),
                stderr: "Error initializing filter 'drawtext'".to_string(),
                attempts: 3,
            });
        }

        let active = self.active_renders.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_renders.fetch_max(active, Ordering::SeqCst);
        if !self.render_delay.is_zero() {
            tokio::time::sleep(self.render_delay).await;
        }
        self.active_renders.fetch_sub(1, Ordering::SeqCst);

        let (width, height) = self
            .render_resolution
            .get(&plan.chunk_index)
            .copied()
            .unwrap_or((canvas.width, canvas.height));
        self.produce(&plan.output, video_info(plan.duration_secs, width, height))
    }

    async fn normalize_segment(&self, input: &Path, output: &Path, canvas: &Canvas) -> Result<(), PipelineError> {
        self.record(MockCall::Normalize(input.to_path_buf()));
        let duration = self.files.lock().get(input).map(|info| info.duration_secs).unwrap_or_default();
        self.produce(output, video_info(duration, canvas.width, canvas.height))
    }

    async fn concat_stream_copy(&self, list_file: &Path, output: &Path) -> Result<(), PipelineError> {
        self.record(MockCall::ConcatCopy);
        if self.failing_stream_copy {
            // Leave a partial file behind like an aborted ffmpeg run
            std::fs::write(output, b"partial")?;
            return Err(PipelineError::ProcessInvocation {
                command: format!("ffmpeg -f concat -i {} -c copy", list_file.display()),
                exit_code: Some(1),
                stderr: "Non-monotonous DTS in output stream".to_string(),
                attempts: 1,
            });
        }
        let joined = self.joined_info(list_file)?;
        self.produce(output, joined)
    }

    async fn concat_reencode(&self, list_file: &Path, output: &Path) -> Result<(), PipelineError> {
        self.record(MockCall::ConcatReencode);
        let joined = self.joined_info(list_file)?;
        self.produce(output, joined)
    }
}

pub fn audio_info(duration_secs: f64) -> MediaInfo {
    MediaInfo {
        duration_secs,
        audio_codec: Some("aac".to_string()),
        ..MediaInfo::default()
    }
}

pub fn video_info(duration_secs: f64, width: u32, height: u32) -> MediaInfo {
    MediaInfo {
        duration_secs,
        width: Some(width),
        height: Some(height),
        video_codec: Some("h264".to_string()),
        audio_codec: Some("aac".to_string()),
    }
}

/// Path of a `file '...'` concat entry
fn parse_concat_entry(entry: &str) -> Option<PathBuf> {
    let quoted = entry.trim().strip_prefix("file '")?.strip_suffix('\'')?;
    Some(PathBuf::from(quoted.replace("'\\''", "'")))
}
