/*!
 * Non-fatal issues collected during a run.
 *
 * Workers record drift, dropped chunks, layout overflow and join fallbacks
 * here instead of aborting; the controller reports them at the end of the
 * run and writes them next to the output.
 */

use anyhow::Result;
use log::warn;
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::file_utils::FileManager;

/// Category of a recorded issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// A chunk or line was dropped as zero length
    DroppedChunk,
    /// A negative duration was clamped to zero
    ClampedDuration,
    /// Narration or slice length differs from the timeline
    DurationDrift,
    /// Captions did not fit at the minimum font size
    LayoutOverflow,
    /// Caption text was cut with an ellipsis
    TruncatedCaption,
    /// The stream-copy join failed and the re-encode fallback ran
    ConcatMismatch,
    /// A configured font was unavailable
    MissingFont,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::DroppedChunk => "DROPPED",
            Self::ClampedDuration => "CLAMPED",
            Self::DurationDrift => "DRIFT",
            Self::LayoutOverflow => "OVERFLOW",
            Self::TruncatedCaption => "TRUNCATED",
            Self::ConcatMismatch => "CONCAT",
            Self::MissingFont => "FONT",
        };
        write!(f, "{}", label)
    }
}

/// One recorded issue
#[derive(Debug, Clone, PartialEq)]
pub struct IssueEntry {
    pub kind: IssueKind,
    /// Chunk the issue belongs to, if any
    pub chunk: Option<usize>,
    pub message: String,
}

impl fmt::Display for IssueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chunk {
            Some(chunk) => write!(f, "[{}] chunk {}: {}", self.kind, chunk, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Shared, append-only issue collection
#[derive(Debug, Clone, Default)]
pub struct IssueLog {
    entries: Arc<Mutex<Vec<IssueEntry>>>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue and log it as a warning
    pub fn record(&self, kind: IssueKind, chunk: Option<usize>, message: impl Into<String>) {
        let entry = IssueEntry {
            kind,
            chunk,
            message: message.into(),
        };
        warn!("{}", entry);
        self.entries.lock().push(entry);
    }

    /// Snapshot of the entries in recording order
    pub fn entries(&self) -> Vec<IssueEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.entries.lock().iter().filter(|e| e.kind == kind).count()
    }

    /// Append every entry to a log file under a context header
    pub fn write_to_file(&self, path: &Path, context: &str) -> Result<()> {
        let entries = self.entries();
        FileManager::append_to_log_file(path, &format!("Render issues - {} ({} entries)", context, entries.len()))?;
        for entry in &entries {
            FileManager::append_to_log_file(path, &entry.to_string())?;
        }
        Ok(())
    }
}
