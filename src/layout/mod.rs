/*!
 * Caption layout.
 *
 * Turns the text rows of a line into placed caption blocks: sanitized,
 * wrapped for their script, sized to fit above the bottom margin and
 * positioned on the output canvas.
 */

pub mod engine;
pub mod fonts;
pub mod text;
pub mod wrap;

pub use engine::{LayoutEngine, LayoutMetrics};
pub use fonts::{FontChain, FontHandle};

/// Dominant writing system of a caption row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    /// Han ideographs and Japanese kana
    Cjk,
    Hangul,
}

impl std::fmt::Display for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latin => write!(f, "latin"),
            Self::Cjk => write!(f, "cjk"),
            Self::Hangul => write!(f, "hangul"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub width: u32,
    pub height: u32,
}

/// Top-left corner in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// One placed caption row
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionBlock {
    pub row_index: usize,
    /// Wrapped lines joined with newlines
    pub wrapped_text: String,
    pub lines: Vec<String>,
    pub script: Script,
    pub font: FontHandle,
    pub font_size: u32,
    pub line_height: u32,
    pub stroke_width: u32,
    /// Padded box behind the text
    pub bounding_box: BoundingBox,
    /// Top-left of the padded box
    pub position: Position,
    /// Horizontal and vertical padding inside the box
    pub padding: (u32, u32),
}

impl CaptionBlock {
    /// Horizontal center the text lines are aligned on
    pub fn center_x(&self) -> i32 {
        self.position.x + self.bounding_box.width as i32 / 2
    }

    /// Top of the first text line
    pub fn text_top(&self) -> i32 {
        self.position.y + self.padding.1 as i32
    }

    /// Bottom edge of the padded box
    pub fn bottom(&self) -> i32 {
        self.position.y + self.bounding_box.height as i32
    }
}

/// Caption blocks of one line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineLayout {
    pub blocks: Vec<CaptionBlock>,
    /// Pixels the block still extends past the safe area
    pub overflow_px: i32,
    /// Fonts reached their floor without fitting
    pub floor_hit: bool,
    /// Rows whose text was cut with an ellipsis
    pub truncated_rows: Vec<usize>,
}

impl LineLayout {
    /// Lowest edge of any block
    pub fn bottom(&self) -> i32 {
        self.blocks.iter().map(CaptionBlock::bottom).max().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
