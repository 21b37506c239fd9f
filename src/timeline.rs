/*!
 * Cumulative timeline and chunk partitioning.
 *
 * Line durations become absolute offsets once, up front. Chunk windows are
 * read straight off those offsets, so dropping a degenerate chunk or line
 * never shifts any other boundary.
 */

use log::{debug, warn};

use crate::errors::PipelineError;
use crate::script::Line;

/// Default threshold under which a chunk or line counts as zero length
pub const DEFAULT_CHUNK_EPSILON: f64 = 1e-6;

/// Running sum of line durations, one entry more than there are lines
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    offsets: Vec<f64>,
    /// Indices of lines whose negative duration was clamped to zero
    clamped: Vec<usize>,
}

impl Timeline {
    /// Build the timeline from raw durations.
    ///
    /// Negative or non-finite durations are clamped to zero and reported
    /// through `clamped_lines`.
    pub fn accumulate<I>(durations: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut offsets = vec![0.0];
        let mut clamped = Vec::new();
        let mut total = 0.0;

        for (index, duration) in durations.into_iter().enumerate() {
            let duration = if duration.is_finite() && duration >= 0.0 {
                duration
            } else {
                warn!("Line {} has invalid duration {}, clamping to 0", index, duration);
                clamped.push(index);
                0.0
            };
            total += duration;
            offsets.push(total);
        }

        Self { offsets, clamped }
    }

    /// Timeline of a line sequence
    pub fn from_lines(lines: &[Line]) -> Self {
        Self::accumulate(lines.iter().map(|line| line.duration_seconds))
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// Absolute offset at a line boundary
    pub fn offset(&self, boundary: usize) -> f64 {
        self.offsets[boundary.min(self.offsets.len() - 1)]
    }

    /// Number of lines covered
    pub fn line_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total narration length
    pub fn total(&self) -> f64 {
        self.offsets[self.offsets.len() - 1]
    }

    /// Indices of lines that had to be clamped
    pub fn clamped_lines(&self) -> &[usize] {
        &self.clamped
    }

    /// Whether the total matches a measured duration within `tolerance`
    pub fn matches_duration(&self, measured: f64, tolerance: f64) -> bool {
        (self.total() - measured).abs() <= tolerance
    }
}

/// A line placed on the absolute timeline
#[derive(Debug, Clone, PartialEq)]
pub struct TimedLine {
    /// Index of the line in the whole script
    pub index: usize,
    pub line: Line,
    pub start_time: f64,
    pub end_time: f64,
}

impl TimedLine {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// A contiguous group of lines rendered as one segment
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    /// Lines with a renderable duration, in script order
    pub lines: Vec<TimedLine>,
    /// Script indices `[first, last)` covered by this chunk
    pub line_range: std::ops::Range<usize>,
    pub start_time: f64,
    pub end_time: f64,
}

impl Chunk {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Caption window of a line relative to the start of this chunk
    pub fn local_window(&self, line: &TimedLine) -> (f64, f64) {
        (
            (line.start_time - self.start_time).max(0.0),
            (line.end_time - self.start_time).min(self.duration()),
        )
    }
}

/// Outcome of partitioning a script
#[derive(Debug, Clone)]
pub struct Partition {
    /// Chunks that will be rendered, in index order
    pub chunks: Vec<Chunk>,
    /// Indices of chunks dropped as zero length
    pub dropped_chunks: Vec<usize>,
    /// Script indices of lines dropped from their chunk as zero length
    pub dropped_lines: Vec<usize>,
}

impl Partition {
    /// Sum of the rendered chunk durations
    pub fn total_duration(&self) -> f64 {
        self.chunks.iter().map(Chunk::duration).sum()
    }
}

/// Split lines into groups of at most `max_lines_per_chunk` and map each
/// group to its `[start, end)` window on the timeline.
///
/// Chunks whose window is no longer than `epsilon` are dropped; if every
/// chunk is dropped the run has nothing to render.
pub fn partition(
    lines: &[Line],
    timeline: &Timeline,
    max_lines_per_chunk: usize,
    epsilon: f64,
) -> Result<Partition, PipelineError> {
    if max_lines_per_chunk == 0 {
        return Err(PipelineError::Config("max_lines_per_chunk must be at least 1".to_string()));
    }
    if timeline.line_count() != lines.len() {
        return Err(PipelineError::Config(format!(
            "timeline covers {} lines but the script has {}",
            timeline.line_count(),
            lines.len()
        )));
    }

    let mut chunks = Vec::new();
    let mut dropped_chunks = Vec::new();
    let mut dropped_lines = Vec::new();

    for (index, first) in (0..lines.len()).step_by(max_lines_per_chunk).enumerate() {
        let last = (first + max_lines_per_chunk).min(lines.len());
        let start_time = timeline.offset(first);
        let end_time = timeline.offset(last);

        if end_time - start_time <= epsilon {
            debug!("Dropping chunk {} (lines {}..{}): zero length", index, first, last);
            dropped_chunks.push(index);
            continue;
        }

        let mut timed = Vec::with_capacity(last - first);
        for line_index in first..last {
            let line_start = timeline.offset(line_index);
            let line_end = timeline.offset(line_index + 1);
            if line_end - line_start <= epsilon {
                debug!("Dropping line {} from chunk {}: zero length", line_index, index);
                dropped_lines.push(line_index);
                continue;
            }
            timed.push(TimedLine {
                index: line_index,
                line: lines[line_index].clone(),
                start_time: line_start,
                end_time: line_end,
            });
        }

        chunks.push(Chunk {
            index,
            lines: timed,
            line_range: first..last,
            start_time,
            end_time,
        });
    }

    if chunks.is_empty() {
        return Err(PipelineError::EmptyOutput(format!(
            "all {} chunk(s) have zero length",
            dropped_chunks.len()
        )));
    }

    Ok(Partition {
        chunks,
        dropped_chunks,
        dropped_lines,
    })
}
