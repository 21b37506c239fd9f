/*!
 * Script-aware caption wrapping.
 *
 * CJK text has no word boundaries and wraps on a fixed character count.
 * Latin and Hangul text wraps on spaces; hyphenated compounds are never
 * split at their hyphen.
 */

use textwrap::{Options, WordSplitter};

use super::Script;
use super::text::{NARROW_ADVANCE, line_width_px};

/// Appended to the last kept line when text is cut
pub const ELLIPSIS: char = '…';

/// Wrapped caption text
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedText {
    pub lines: Vec<String>,
    /// Whether lines past the limit were cut
    pub truncated: bool,
}

impl WrappedText {
    /// Lines joined with newlines
    pub fn joined(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }
}

/// Wrapping limits for one row at one font size
#[derive(Debug, Clone, Copy)]
pub struct WrapLimits {
    /// Available text width in pixels
    pub width_px: u32,
    pub font_size: u32,
    /// Characters per line for CJK text
    pub cjk_chars: usize,
    pub max_lines: usize,
}

impl WrapLimits {
    /// Width in textwrap columns, one column being a narrow glyph
    fn columns(&self) -> usize {
        let column_px = (self.font_size as f64 * NARROW_ADVANCE).max(1.0);
        ((self.width_px as f64 / column_px).floor() as usize).max(1)
    }
}

/// Wrap sanitized text for a script
pub fn wrap_caption(text: &str, script: Script, limits: WrapLimits) -> WrappedText {
    if text.is_empty() {
        return WrappedText {
            lines: Vec::new(),
            truncated: false,
        };
    }

    let lines = match script {
        Script::Cjk => wrap_by_chars(text, limits.cjk_chars.max(1)),
        Script::Latin | Script::Hangul => wrap_by_words(text, limits.columns()),
    };

    truncate(lines, script, limits)
}

fn wrap_by_chars(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect::<String>().trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn wrap_by_words(text: &str, columns: usize) -> Vec<String> {
    let options = Options::new(columns)
        .word_splitter(WordSplitter::NoHyphenation)
        .break_words(true);

    textwrap::wrap(text, options)
        .into_iter()
        .map(|line| line.trim_end().to_string())
        .collect()
}

fn truncate(mut lines: Vec<String>, script: Script, limits: WrapLimits) -> WrappedText {
    let max_lines = limits.max_lines.max(1);
    if lines.len() <= max_lines {
        return WrappedText {
            lines,
            truncated: false,
        };
    }

    lines.truncate(max_lines);
    if let Some(last) = lines.last_mut() {
        let mut kept: String = last.trim_end_matches([' ', ',', '.', '、', '。']).to_string();
        let fits = |s: &str| match script {
            Script::Cjk => s.chars().count() < limits.cjk_chars.max(1),
            Script::Latin | Script::Hangul => {
                line_width_px(&format!("{}{}", s, ELLIPSIS), limits.font_size) <= limits.width_px
            }
        };
        while !kept.is_empty() && !fits(&kept) {
            kept.pop();
            kept = kept.trim_end().to_string();
        }
        kept.push(ELLIPSIS);
        *last = kept;
    }

    WrappedText {
        lines,
        truncated: true,
    }
}
