use log::{info, warn};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::errors::PipelineError;

// @module: Scoped working directory for per-run artifacts

/// Exclusively owned temporary directory of one run.
///
/// Removed when dropped, on success and failure alike, unless artifacts
/// are kept for diagnostics.
#[derive(Debug)]
pub struct RunWorkspace {
    dir: Option<TempDir>,
    root: PathBuf,
    keep: bool,
}

impl RunWorkspace {
    /// Create a fresh workspace under the system temp directory
    pub fn create(keep: bool) -> Result<Self, PipelineError> {
        Self::create_in(&std::env::temp_dir(), keep)
    }

    /// Create a fresh workspace under `parent`
    pub fn create_in(parent: &Path, keep: bool) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix("chunkreel-")
            .tempdir_in(parent)
            .map_err(|e| PipelineError::Io(format!("Failed to create workspace in {}: {}", parent.display(), e)))?;
        let root = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            root,
            keep,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn audio_slice(&self, chunk_index: usize, extension: &str) -> PathBuf {
        self.root.join(format!("audio_{:04}.{}", chunk_index, extension))
    }

    pub fn segment(&self, chunk_index: usize) -> PathBuf {
        self.root.join(format!("segment_{:04}.mp4", chunk_index))
    }

    pub fn unified_segment(&self, chunk_index: usize) -> PathBuf {
        self.root.join(format!("unified_{:04}.mp4", chunk_index))
    }

    pub fn caption_dir(&self, chunk_index: usize) -> PathBuf {
        self.root.join(format!("captions_{:04}", chunk_index))
    }

    pub fn concat_list(&self) -> PathBuf {
        self.root.join("concat.txt")
    }

    /// Join target, moved to the output path only once complete
    pub fn joined_output(&self) -> PathBuf {
        self.root.join("joined.mp4")
    }

    /// Remove the workspace now, reporting failures, or keep it if requested
    pub fn finish(mut self) -> Option<PathBuf> {
        let dir = self.dir.take()?;
        if self.keep {
            let kept = dir.into_path();
            info!("Kept artifacts in {}", kept.display());
            return Some(kept);
        }
        if let Err(e) = dir.close() {
            warn!("Failed to remove workspace {}: {}", self.root.display(), e);
        }
        None
    }
}

impl Drop for RunWorkspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if self.keep {
                let kept = dir.into_path();
                info!("Kept artifacts in {}", kept.display());
            }
        }
    }
}
