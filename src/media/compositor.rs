/*!
 * Segment compositing.
 *
 * A chunk becomes a [`SegmentPlan`]: every line is laid out once and its
 * caption blocks are enabled only during the line's own window, relative
 * to the start of the chunk. The plan is turned into an ffmpeg filter
 * graph by [`build_filter_graph`].
 */

use log::debug;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::unifier::fit_filter;
use super::{MediaBackend, RenderedSegment};
use crate::app_config::{Canvas, CaptionConfig};
use crate::errors::PipelineError;
use crate::issues::{IssueKind, IssueLog};
use crate::layout::{CaptionBlock, FontHandle, LayoutEngine};
use crate::timeline::Chunk;

/// A caption block with its window inside the segment
#[derive(Debug, Clone, PartialEq)]
pub struct TimedCaption {
    /// Script index of the line the block belongs to
    pub line_index: usize,
    /// Seconds from the start of the segment, inclusive
    pub start: f64,
    /// Seconds from the start of the segment, exclusive
    pub end: f64,
    pub block: CaptionBlock,
}

/// Everything needed to render one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    pub chunk_index: usize,
    pub background: PathBuf,
    pub audio: PathBuf,
    pub duration_secs: f64,
    pub captions: Vec<TimedCaption>,
    pub output: PathBuf,
    /// Directory receiving one text file per wrapped caption line
    pub text_dir: PathBuf,
}

impl SegmentPlan {
    /// Text file holding line `line` of caption `caption`
    pub fn caption_file(&self, caption: usize, line: usize) -> PathBuf {
        self.text_dir.join(format!("caption_{:04}_{:02}.txt", caption, line))
    }

    /// Text files the renderer reads, with their content
    pub fn caption_files(&self) -> Vec<(PathBuf, String)> {
        self.captions
            .iter()
            .enumerate()
            .flat_map(|(caption, timed)| {
                timed
                    .block
                    .lines
                    .iter()
                    .enumerate()
                    .map(move |(line, text)| (self.caption_file(caption, line), text.clone()))
            })
            .collect()
    }
}

/// Fixed caption colors plus the configurable box opacity
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub text_color: String,
    pub border_color: String,
    pub box_color: String,
    pub box_opacity: f64,
}

impl CaptionStyle {
    pub fn from_config(config: &CaptionConfig) -> Self {
        Self {
            text_color: "white".to_string(),
            border_color: "black".to_string(),
            box_color: "black".to_string(),
            box_opacity: config.box_opacity.clamp(0.0, 1.0),
        }
    }
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self::from_config(&CaptionConfig::default())
    }
}

/// Escape a path for a single-quoted filter option value.
///
/// The graph parser strips the quotes and the option parser then unescapes
/// `\\` and `\:`. A quote cannot appear inside the quoted span, so it closes
/// the span and is written as `\\\'` to survive both passes.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "'\\\\\\''")
}

fn enable_expr(start: f64, end: f64) -> String {
    format!("'gte(t,{:.6})*lt(t,{:.6})'", start, end)
}

/// Filter graph for a segment.
///
/// Input 0 is the looped background, the result is labeled `[v]`.
pub fn build_filter_graph(plan: &SegmentPlan, canvas: &Canvas, style: &CaptionStyle, pad_color: &str, pixel_format: &str) -> String {
    let mut graph = format!("[0:v]{},setsar=1,format={}[bg];[bg]", fit_filter(canvas, pad_color), pixel_format);

    let mut overlays = Vec::new();
    for (index, caption) in plan.captions.iter().enumerate() {
        let block = &caption.block;
        let enable = enable_expr(caption.start, caption.end);

        overlays.push(format!(
            "drawbox=x={}:y={}:w={}:h={}:color={}@{:.2}:t=fill:enable={}",
            block.position.x,
            block.position.y,
            block.bounding_box.width,
            block.bounding_box.height,
            style.box_color,
            style.box_opacity,
            enable
        ));

        for line in 0..block.lines.len() {
            let mut drawtext = String::from("drawtext=");
            if let FontHandle::File(path) = &block.font {
                let _ = write!(drawtext, "fontfile='{}':", escape_filter_path(path));
            }
            let _ = write!(
                drawtext,
                "textfile='{}':expansion=none:fontsize={}:fontcolor={}:borderw={}:bordercolor={}:x={}-text_w/2:y={}:enable={}",
                escape_filter_path(&plan.caption_file(index, line)),
                block.font_size,
                style.text_color,
                block.stroke_width,
                style.border_color,
                block.center_x(),
                block.text_top() + (line as u32 * block.line_height) as i32,
                enable
            );
            overlays.push(drawtext);
        }
    }

    if overlays.is_empty() {
        graph.push_str("null");
    } else {
        graph.push_str(&overlays.join(","));
    }
    graph.push_str("[v]");
    graph
}

/// Lays out chunks and hands them to the backend for rendering
#[derive(Debug, Clone)]
pub struct SegmentCompositor {
    layout: LayoutEngine,
    issues: IssueLog,
}

impl SegmentCompositor {
    pub fn new(layout: LayoutEngine, issues: IssueLog) -> Self {
        Self { layout, issues }
    }

    pub fn canvas(&self) -> Canvas {
        self.layout.canvas()
    }

    /// Lay out every line of a chunk on its local window
    pub fn plan(&self, chunk: &Chunk, audio: &Path, background: &Path, output: PathBuf, text_dir: PathBuf) -> SegmentPlan {
        let mut captions = Vec::new();

        for timed in &chunk.lines {
            let layout = self.layout.layout_line(&timed.line);
            if layout.overflow_px > 0 {
                self.issues.record(
                    IssueKind::LayoutOverflow,
                    Some(chunk.index),
                    format!("line {} overflows the safe area by {}px", timed.index, layout.overflow_px),
                );
            }
            for row in &layout.truncated_rows {
                self.issues.record(
                    IssueKind::TruncatedCaption,
                    Some(chunk.index),
                    format!("line {} row {} was cut to fit", timed.index, row + 1),
                );
            }

            let (start, end) = chunk.local_window(timed);
            captions.extend(layout.blocks.into_iter().map(|block| TimedCaption {
                line_index: timed.index,
                start,
                end,
                block,
            }));
        }

        debug!("Chunk {}: {} caption block(s) over {:.3}s", chunk.index, captions.len(), chunk.duration());

        SegmentPlan {
            chunk_index: chunk.index,
            background: background.to_path_buf(),
            audio: audio.to_path_buf(),
            duration_secs: chunk.duration(),
            captions,
            output,
            text_dir,
        }
    }

    /// Render a planned segment
    pub async fn render(&self, backend: &dyn MediaBackend, plan: &SegmentPlan) -> Result<RenderedSegment, PipelineError> {
        backend.render_segment(plan, &self.layout.canvas()).await?;
        Ok(RenderedSegment {
            chunk_index: plan.chunk_index,
            path: plan.output.clone(),
            duration_secs: plan.duration_secs,
        })
    }
}
