/*!
 * Final join of the rendered segments.
 *
 * The concat list is written in chunk-index order no matter in which order
 * the segments finished. A stream-copy join is tried first and verified by
 * probing its length; when it fails or comes out with the wrong length the
 * segments are re-encoded into the output instead.
 */

use log::{debug, info};
use std::fmt;
use std::path::Path;

use super::{MediaBackend, RenderedSegment};
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::issues::{IssueKind, IssueLog};

/// How the final video was joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    /// Concatenated without re-encoding
    StreamCopy,
    /// Fallback full re-encode
    Reencode,
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamCopy => write!(f, "stream copy"),
            Self::Reencode => write!(f, "re-encode"),
        }
    }
}

/// One `file '...'` entry of a concat list
pub fn concat_entry(path: &Path) -> String {
    format!("file '{}'", path.to_string_lossy().replace('\'', "'\\''"))
}

/// Concat list content: absolute paths in chunk-index order
pub fn concat_list(segments: &[RenderedSegment]) -> Result<String, PipelineError> {
    let mut ordered: Vec<&RenderedSegment> = segments.iter().collect();
    ordered.sort_by_key(|segment| segment.chunk_index);

    let mut content = String::new();
    for segment in ordered {
        let absolute = FileManager::absolute(&segment.path).map_err(|e| PipelineError::Io(e.to_string()))?;
        content.push_str(&concat_entry(&absolute));
        content.push('\n');
    }
    Ok(content)
}

/// Joins segments with a stream copy, falling back to a re-encode
#[derive(Debug, Clone)]
pub struct ConcatResolver {
    tolerance: f64,
    issues: IssueLog,
}

impl ConcatResolver {
    pub fn new(tolerance: f64, issues: IssueLog) -> Self {
        Self { tolerance, issues }
    }

    /// Write the concat list to `list_file` and join into `output`
    pub async fn join(
        &self,
        backend: &dyn MediaBackend,
        segments: &[RenderedSegment],
        list_file: &Path,
        output: &Path,
    ) -> Result<JoinStrategy, PipelineError> {
        if segments.is_empty() {
            return Err(PipelineError::EmptyOutput("no segments to join".to_string()));
        }

        let expected: f64 = segments.iter().map(|s| s.duration_secs).sum();
        tokio::fs::write(list_file, concat_list(segments)?).await?;
        debug!("Concat list with {} segment(s): {}", segments.len(), list_file.display());

        let mismatch = match backend.concat_stream_copy(list_file, output).await {
            Ok(()) => match self.verify(backend, output, expected).await {
                Ok(()) => {
                    info!("Joined {} segment(s) by stream copy", segments.len());
                    return Ok(JoinStrategy::StreamCopy);
                }
                Err(mismatch) => mismatch,
            },
            Err(e) => PipelineError::ConcatMismatch(e.to_string()),
        };

        self.issues.record(IssueKind::ConcatMismatch, None, format!("{}, re-encoding", mismatch));
        if output.exists() {
            tokio::fs::remove_file(output).await?;
        }

        backend.concat_reencode(list_file, output).await?;
        let measured = backend.probe(output).await?.duration_secs;
        if (measured - expected).abs() > self.tolerance {
            self.issues.record(
                IssueKind::DurationDrift,
                None,
                format!("re-encoded output is {:.3}s, expected {:.3}s", measured, expected),
            );
        }

        info!("Joined {} segment(s) by re-encoding", segments.len());
        Ok(JoinStrategy::Reencode)
    }

    /// Probe a stream-copy result; a wrong length or failed probe is a mismatch
    async fn verify(&self, backend: &dyn MediaBackend, output: &Path, expected: f64) -> Result<(), PipelineError> {
        let measured = backend
            .probe(output)
            .await
            .map_err(|e| PipelineError::ConcatMismatch(format!("joined file is unreadable: {}", e)))?
            .duration_secs;

        if (measured - expected).abs() > self.tolerance {
            return Err(PipelineError::ConcatMismatch(format!(
                "joined file is {:.3}s, expected {:.3}s",
                measured, expected
            )));
        }
        Ok(())
    }
}
