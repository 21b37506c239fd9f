use log::{debug, warn};
use std::path::{Path, PathBuf};

use super::Script;
use crate::app_config::FontConfig;

/// Font a caption is drawn with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FontHandle {
    /// A font file on disk
    File(PathBuf),
    /// The renderer's built-in font
    Default,
}

impl FontHandle {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Default => None,
        }
    }
}

/// Per-script font files that were found on disk, resolved once per run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontChain {
    latin: Option<PathBuf>,
    cjk: Option<PathBuf>,
    hangul: Option<PathBuf>,
}

impl FontChain {
    /// Keep only the configured fonts that exist
    pub fn resolve(config: &FontConfig) -> Self {
        let existing = |label: &str, path: &Option<PathBuf>| -> Option<PathBuf> {
            let path = path.as_ref()?;
            if path.is_file() {
                debug!("Using {} font {}", label, path.display());
                Some(path.clone())
            } else {
                warn!("{} font {} not found, falling back", label, path.display());
                None
            }
        };

        Self {
            latin: existing("Latin", &config.latin),
            cjk: existing("CJK", &config.cjk),
            hangul: existing("Hangul", &config.hangul),
        }
    }

    /// Chain from fonts already known to exist
    pub fn from_available(latin: Option<PathBuf>, cjk: Option<PathBuf>, hangul: Option<PathBuf>) -> Self {
        Self { latin, cjk, hangul }
    }

    /// First available font in the fallback order of a script
    pub fn select(&self, script: Script) -> FontHandle {
        let order = match script {
            Script::Latin => [&self.latin, &self.cjk, &self.hangul],
            Script::Cjk => [&self.cjk, &self.latin, &self.hangul],
            Script::Hangul => [&self.hangul, &self.cjk, &self.latin],
        };

        order
            .into_iter()
            .flatten()
            .next()
            .map(|path| FontHandle::File(path.clone()))
            .unwrap_or(FontHandle::Default)
    }
}
