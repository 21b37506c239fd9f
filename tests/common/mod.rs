/*!
 * Common test utilities for the chunkreel test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use chunkreel::app_config::Config;
use chunkreel::app_controller::RenderRequest;

// Re-export the mock backend module
pub mod mock_backend;

/// Route library logs through env_logger once per test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Script with the five lines of the reference partition example
pub const SCENARIO_A_SCRIPT: &str = r#"[
    ["N", "The city wakes up slowly.", "Die Stadt erwacht langsam.", 2.0],
    ["A", "Morning! Coffee?", "Morgen! Kaffee?", 1.5],
    ["B", "Always. Make it strong, please.", "Immer. Bitte stark.", 3.0],
    ["A", "Done.", "Fertig.", 0.5],
    ["N", "And so the day begins.", "Und so beginnt der Tag.", 2.0]
]"#;

/// Input files of one run laid out in a temp directory
pub struct TestInputs {
    pub dir: TempDir,
    pub request: RenderRequest,
}

impl TestInputs {
    /// Write `script` plus placeholder narration and background files
    pub fn new(script: &str) -> Result<Self> {
        let dir = create_temp_dir()?;
        let lines_path = create_test_file(dir.path(), "lines.json", script)?;
        let narration_path = create_test_file(dir.path(), "voice.mp3", "narration")?;
        let background_path = create_test_file(dir.path(), "bg.png", "background")?;
        let output_path = dir.path().join("output").join("final.mp4");
        fs::create_dir_all(dir.path().join("output"))?;
        fs::create_dir_all(dir.path().join("work"))?;

        Ok(Self {
            request: RenderRequest {
                lines_path,
                narration_path,
                background_path,
                output_path,
            },
            dir,
        })
    }

    /// Parent directory for run workspaces
    pub fn work_dir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// Entries left in the workspace parent
    pub fn leftover_workspaces(&self) -> Result<usize> {
        Ok(fs::read_dir(self.work_dir())?.count())
    }
}

/// Default config with the given chunk size and worker count
pub fn test_config(chunk_size: usize, max_workers: usize) -> Config {
    let mut config = Config::default();
    config.render.chunk_size = chunk_size;
    config.render.max_workers = max_workers;
    config
}
