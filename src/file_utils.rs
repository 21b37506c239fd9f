use anyhow::{Context, Result, anyhow};
use chrono::Local;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Sibling path with the output stem and a new suffix
    // @params: output_file, suffix (e.g. "issues.log")
    pub fn sibling_path<P: AsRef<Path>>(output_file: P, suffix: &str) -> PathBuf {
        let output_file = output_file.as_ref();
        let stem = output_file.file_stem().unwrap_or_default();

        let mut filename = stem.to_string_lossy().to_string();
        filename.push('.');
        filename.push_str(suffix);

        match output_file.parent() {
            Some(parent) => parent.join(filename),
            None => PathBuf::from(filename),
        }
    }

    /// Absolute form of a path, resolved against the current directory
    pub fn absolute<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
        Ok(cwd.join(path))
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow!("Source file does not exist: {:?}", from));
        }

        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::copy(from, to).with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;

        Ok(())
    }

    /// Move a file into place.
    ///
    /// Renames when source and target share a filesystem; otherwise copies
    /// to a temporary name beside the target, renames that over the target
    /// and removes the source.
    pub fn move_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        if fs::rename(from, to).is_ok() {
            return Ok(());
        }

        let staging = Self::sibling_path(to, "partial");
        Self::copy_file(from, &staging)?;
        if let Err(e) = fs::rename(&staging, to) {
            let _ = fs::remove_file(&staging);
            return Err(anyhow!("Failed to move {:?} into {:?}: {}", from, to, e));
        }
        let _ = fs::remove_file(from);

        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }
}
