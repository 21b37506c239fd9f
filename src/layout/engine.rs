use log::{debug, warn};

use super::fonts::FontChain;
use super::text::{classify, line_width_px, sanitize};
use super::wrap::{WrapLimits, WrappedText, wrap_caption};
use super::{BoundingBox, CaptionBlock, LineLayout, Position, Script};
use crate::app_config::{Canvas, CaptionConfig, scale_px};
use crate::errors::PipelineError;
use crate::script::Line;

/// Layout distances scaled to the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub text_width: u32,
    pub position_y: u32,
    pub line_gap: u32,
    pub bottom_margin: u32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub horizontal_offset: i32,
}

impl LayoutMetrics {
    /// Scale the 1920x1080 reference values to a canvas
    pub fn for_canvas(config: &CaptionConfig, canvas: &Canvas) -> Self {
        let h = canvas.horizontal_scale();
        let v = canvas.vertical_scale();
        let pad_x = scale_px(config.pad_x, h);
        let max_text_width = canvas.width.saturating_sub(2 * pad_x).max(1);

        Self {
            text_width: scale_px(config.text_width, h).min(max_text_width),
            position_y: scale_px(config.position_y, v),
            line_gap: scale_px(config.line_gap, v),
            bottom_margin: scale_px(config.bottom_margin, v),
            pad_x,
            pad_y: scale_px(config.pad_y, v),
            horizontal_offset: (config.horizontal_offset as f64 * h).round() as i32,
        }
    }

    /// Lowest y a caption block may reach
    pub fn safe_bottom(&self, canvas: &Canvas) -> i32 {
        canvas.height as i32 - self.bottom_margin as i32
    }
}

/// One caption row before sizing
#[derive(Debug, Clone)]
struct RowText {
    row_index: usize,
    text: String,
    script: Script,
    centered: bool,
}

#[derive(Debug, Clone)]
struct Measured {
    wrapped: WrappedText,
    line_height: u32,
    text_width: u32,
    text_height: u32,
}

/// Places caption rows on the canvas.
///
/// Both rows shrink together until the block fits above the bottom margin
/// or the font floor is reached; the block is then nudged up by whatever
/// still overflows.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    config: CaptionConfig,
    canvas: Canvas,
    rows: usize,
    metrics: LayoutMetrics,
    fonts: FontChain,
}

impl LayoutEngine {
    pub fn new(config: &CaptionConfig, canvas: Canvas, rows: usize, fonts: FontChain) -> Self {
        Self {
            config: config.clone(),
            canvas,
            rows: rows.max(1),
            metrics: LayoutMetrics::for_canvas(config, &canvas),
            fonts,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn metrics(&self) -> LayoutMetrics {
        self.metrics
    }

    /// Lay out every caption row of a line.
    ///
    /// Rows with no text after sanitizing get no block. The result is a pure
    /// function of the line and the engine settings.
    pub fn layout_line(&self, line: &Line) -> LineLayout {
        let rows = self.row_texts(line);
        if rows.is_empty() {
            return LineLayout::default();
        }

        let initial: Vec<u32> = rows.iter().map(|row| self.initial_font_size(row.row_index)).collect();
        let floors: Vec<u32> = initial.iter().map(|size| (*size).min(self.config.min_font_size)).collect();
        let ratio = self.config.effective_shrink_ratio();
        let safe_bottom = self.metrics.safe_bottom(&self.canvas);

        let mut sizes = initial.clone();
        let mut measured = self.measure_rows(&rows, &sizes);
        let mut iterations = 0;

        // Past the iteration cap the sizes drop straight to their floors
        while self.block_height(&measured) > safe_bottom {
            let next: Vec<u32> = if iterations < self.config.max_fit_iterations {
                sizes
                    .iter()
                    .zip(&floors)
                    .map(|(size, floor)| shrink(*size, ratio, *floor))
                    .collect()
            } else {
                floors.clone()
            };
            if next == sizes {
                break;
            }
            sizes = next;
            measured = self.measure_rows(&rows, &sizes);
            iterations += 1;
        }

        if iterations > 0 {
            debug!("Shrank captions from {:?} to {:?} in {} step(s)", initial, sizes, iterations);
        }

        let block_height = self.block_height(&measured);
        let floor_hit = sizes.iter().zip(&floors).all(|(size, floor)| size <= floor);

        let mut top = self.metrics.position_y as i32;
        if top + block_height > safe_bottom {
            top = safe_bottom - block_height;
        }
        top = top.max(0);
        let overflow_px = (top + block_height - safe_bottom).max(0);

        if overflow_px > 0 {
            let err = PipelineError::LayoutOverflow {
                overflow_px,
                font_size: sizes.iter().copied().min().unwrap_or_default(),
            };
            warn!("{}", err);
        }

        let mut blocks = Vec::with_capacity(rows.len());
        let mut truncated_rows = Vec::new();
        let mut y = top;

        for ((row, measure), font_size) in rows.into_iter().zip(measured).zip(sizes) {
            if measure.wrapped.truncated {
                truncated_rows.push(row.row_index);
            }

            let width = measure.text_width + 2 * self.metrics.pad_x;
            let height = measure.text_height + 2 * self.metrics.pad_y;
            let offset = if row.centered { 0 } else { self.metrics.horizontal_offset };
            let x = (self.canvas.width as i32 - width as i32) / 2 + offset;

            blocks.push(CaptionBlock {
                row_index: row.row_index,
                wrapped_text: measure.wrapped.joined(),
                lines: measure.wrapped.lines,
                script: row.script,
                font: self.fonts.select(row.script),
                font_size,
                line_height: measure.line_height,
                stroke_width: self.stroke_width(row.row_index, font_size),
                bounding_box: BoundingBox { width, height },
                position: Position { x, y },
                padding: (self.metrics.pad_x, self.metrics.pad_y),
            });

            y += height as i32 + self.metrics.line_gap as i32;
        }

        LineLayout {
            blocks,
            overflow_px,
            floor_hit: floor_hit && block_height > safe_bottom,
            truncated_rows,
        }
    }

    fn row_texts(&self, line: &Line) -> Vec<RowText> {
        (0..self.rows)
            .filter_map(|row_index| {
                let body = sanitize(line.row(row_index).unwrap_or_default());
                if body.is_empty() {
                    return None;
                }
                let script = classify(&body);
                let text = if row_index == 0 && line.speaker.is_labeled(self.config.show_narrator_label) {
                    format!("{}: {}", line.speaker.display_name(&self.config.speaker_names), body)
                } else {
                    body
                };
                Some(RowText {
                    row_index,
                    text,
                    script,
                    centered: line.speaker.is_centered(self.config.center_narrator_text),
                })
            })
            .collect()
    }

    fn initial_font_size(&self, row_index: usize) -> u32 {
        if row_index == 0 {
            self.config.top_font_size(&self.canvas)
        } else {
            self.config.bottom_font_size(&self.canvas)
        }
    }

    fn stroke_width(&self, row_index: usize, font_size: u32) -> u32 {
        let reference = if row_index == 0 { self.config.stroke_top } else { self.config.stroke_bottom };
        let reference_size = self.initial_font_size(row_index).max(1);
        if reference == 0 {
            return 0;
        }
        ((reference as f64 * font_size as f64 / reference_size as f64).round() as u32).max(1)
    }

    fn measure_rows(&self, rows: &[RowText], sizes: &[u32]) -> Vec<Measured> {
        rows.iter().zip(sizes).map(|(row, size)| self.measure(row, *size)).collect()
    }

    fn measure(&self, row: &RowText, font_size: u32) -> Measured {
        let wrapped = wrap_caption(
            &row.text,
            row.script,
            WrapLimits {
                width_px: self.metrics.text_width,
                font_size,
                cjk_chars: self.config.cjk_wrap_chars,
                max_lines: self.config.max_lines,
            },
        );
        let line_height = (font_size as f64 * self.config.line_spacing).ceil() as u32;
        let text_width = wrapped
            .lines
            .iter()
            .map(|line| line_width_px(line, font_size))
            .max()
            .unwrap_or_default();
        let text_height = line_height * wrapped.lines.len() as u32;

        Measured {
            wrapped,
            line_height,
            text_width,
            text_height,
        }
    }

    /// Height of the stacked padded rows including gaps
    fn block_height(&self, measured: &[Measured]) -> i32 {
        let rows: u32 = measured.iter().map(|m| m.text_height + 2 * self.metrics.pad_y).sum();
        let gaps = self.metrics.line_gap * measured.len().saturating_sub(1) as u32;
        (rows + gaps) as i32
    }
}

fn shrink(size: u32, ratio: f64, floor: u32) -> u32 {
    if size <= floor {
        return floor;
    }
    let next = (size as f64 * ratio).floor() as u32;
    next.min(size - 1).max(floor)
}
