use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Chunking, canvas and output settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Caption layout and styling
    #[serde(default)]
    pub captions: CaptionConfig,

    /// External tool invocation
    #[serde(default)]
    pub tools: ToolConfig,

    /// Codec settings for rendered segments and the fallback join
    #[serde(default)]
    pub encoding: EncodingConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Background fitting strategy
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    // @mode: Scale up and center-crop
    #[default]
    Cover,
    // @mode: Scale down and pad
    Contain,
}

impl std::fmt::Display for FitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cover => write!(f, "cover"),
            Self::Contain => write!(f, "contain"),
        }
    }
}

/// Target output canvas, fixed for a whole run
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    #[serde(default = "default_canvas_width")]
    pub width: u32,

    #[serde(default = "default_canvas_height")]
    pub height: u32,

    #[serde(default)]
    pub fit: FitMode,
}

impl Canvas {
    pub fn new(width: u32, height: u32, fit: FitMode) -> Self {
        Self { width, height, fit }
    }

    /// Scale factor relative to the 1080 px reference height
    pub fn vertical_scale(&self) -> f64 {
        self.height as f64 / REFERENCE_HEIGHT
    }

    /// Scale factor relative to the 1920 px reference width
    pub fn horizontal_scale(&self) -> f64 {
        self.width as f64 / REFERENCE_WIDTH
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: default_canvas_width(),
            height: default_canvas_height(),
            fit: FitMode::default(),
        }
    }
}

impl std::fmt::Display for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// `WxH` canvas size as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl std::str::FromStr for CanvasSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| anyhow!("Invalid canvas size: {} (expected WxH, e.g. 1920x1080)", s))?;
        let width: u32 = w.trim().parse().map_err(|_| anyhow!("Invalid canvas width: {}", w))?;
        let height: u32 = h.trim().parse().map_err(|_| anyhow!("Invalid canvas height: {}", h))?;
        if width == 0 || height == 0 {
            return Err(anyhow!("Canvas dimensions must be positive: {}", s));
        }
        Ok(Self { width, height })
    }
}

/// Chunking and output settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RenderConfig {
    /// Maximum number of lines per rendered segment
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Maximum number of chunks rendered concurrently
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Number of caption rows (1 = spoken language only, 2 = with translation)
    #[serde(default = "default_rows")]
    pub rows: usize,

    #[serde(default)]
    pub canvas: Canvas,

    /// Output frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Keep the temporary working directory for diagnostics
    #[serde(default)]
    pub keep_artifacts: bool,

    /// Allowed drift between measured and expected media durations
    #[serde(default = "default_duration_tolerance_secs")]
    pub duration_tolerance_secs: f64,

    /// Chunks and lines no longer than this are treated as zero length
    #[serde(default = "default_chunk_epsilon_secs")]
    pub chunk_epsilon_secs: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_workers: default_max_workers(),
            rows: default_rows(),
            canvas: Canvas::default(),
            fps: default_fps(),
            keep_artifacts: false,
            duration_tolerance_secs: default_duration_tolerance_secs(),
            chunk_epsilon_secs: default_chunk_epsilon_secs(),
        }
    }
}

/// Display names of the three speakers
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpeakerNames {
    #[serde(default = "default_narrator_name")]
    pub narrator: String,

    #[serde(default = "default_speaker_a_name")]
    pub speaker_a: String,

    #[serde(default = "default_speaker_b_name")]
    pub speaker_b: String,
}

impl Default for SpeakerNames {
    fn default() -> Self {
        Self {
            narrator: default_narrator_name(),
            speaker_a: default_speaker_a_name(),
            speaker_b: default_speaker_b_name(),
        }
    }
}

/// Font files per script; missing entries fall through the fallback chain
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct FontConfig {
    #[serde(default)]
    pub latin: Option<PathBuf>,

    #[serde(default)]
    pub cjk: Option<PathBuf>,

    #[serde(default)]
    pub hangul: Option<PathBuf>,
}

/// Caption layout settings.
///
/// Pixel values are given for a 1920x1080 canvas and scaled to the actual
/// canvas at layout time.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CaptionConfig {
    /// Top row font size override (computed from the canvas when absent)
    #[serde(default)]
    pub font_size_top: Option<u32>,

    /// Bottom row font size override (computed from the canvas when absent)
    #[serde(default)]
    pub font_size_bottom: Option<u32>,

    /// Floor for the overflow shrink loop
    #[serde(default = "default_min_font_size")]
    pub min_font_size: u32,

    /// Factor applied to both rows on each shrink step
    #[serde(default = "default_shrink_ratio")]
    pub shrink_ratio: f64,

    #[serde(default = "default_max_fit_iterations")]
    pub max_fit_iterations: u32,

    /// Maximum wrapped lines per row; extra text is cut with an ellipsis
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    /// Characters per wrapped line for CJK text
    #[serde(default = "default_cjk_wrap_chars")]
    pub cjk_wrap_chars: usize,

    /// Caption text width
    #[serde(default = "default_text_width")]
    pub text_width: u32,

    /// Top of the caption block before overflow correction
    #[serde(default = "default_position_y")]
    pub position_y: u32,

    /// Vertical gap between the two rows
    #[serde(default = "default_line_gap")]
    pub line_gap: u32,

    /// Space kept free below the caption block
    #[serde(default = "default_bottom_margin")]
    pub bottom_margin: u32,

    #[serde(default = "default_pad_x")]
    pub pad_x: u32,

    #[serde(default = "default_pad_y")]
    pub pad_y: u32,

    /// Horizontal shift applied to centered rows
    #[serde(default)]
    pub horizontal_offset: i32,

    /// Line height as a multiple of the font size
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f64,

    /// Opacity of the box behind each row
    #[serde(default = "default_box_opacity")]
    pub box_opacity: f64,

    #[serde(default = "default_stroke_top")]
    pub stroke_top: u32,

    #[serde(default = "default_stroke_bottom")]
    pub stroke_bottom: u32,

    /// Prefix narrator captions with the narrator name
    #[serde(default)]
    pub show_narrator_label: bool,

    /// Keep narrator captions exactly centered, ignoring `horizontal_offset`
    #[serde(default = "default_true")]
    pub center_narrator_text: bool,

    #[serde(default)]
    pub speaker_names: SpeakerNames,

    #[serde(default)]
    pub fonts: FontConfig,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            font_size_top: None,
            font_size_bottom: None,
            min_font_size: default_min_font_size(),
            shrink_ratio: default_shrink_ratio(),
            max_fit_iterations: default_max_fit_iterations(),
            max_lines: default_max_lines(),
            cjk_wrap_chars: default_cjk_wrap_chars(),
            text_width: default_text_width(),
            position_y: default_position_y(),
            line_gap: default_line_gap(),
            bottom_margin: default_bottom_margin(),
            pad_x: default_pad_x(),
            pad_y: default_pad_y(),
            horizontal_offset: 0,
            line_spacing: default_line_spacing(),
            box_opacity: default_box_opacity(),
            stroke_top: default_stroke_top(),
            stroke_bottom: default_stroke_bottom(),
            show_narrator_label: false,
            center_narrator_text: true,
            speaker_names: SpeakerNames::default(),
            fonts: FontConfig::default(),
        }
    }
}

impl CaptionConfig {
    /// Top row font size for a canvas, honoring the override
    pub fn top_font_size(&self, canvas: &Canvas) -> u32 {
        self.font_size_top
            .unwrap_or_else(|| scale_px(DEFAULT_FONT_SIZE_TOP, canvas.vertical_scale()))
    }

    /// Bottom row font size for a canvas, honoring the override
    pub fn bottom_font_size(&self, canvas: &Canvas) -> u32 {
        self.font_size_bottom
            .unwrap_or_else(|| scale_px(DEFAULT_FONT_SIZE_BOTTOM, canvas.vertical_scale()))
    }

    /// Shrink ratio clamped to a sane range
    pub fn effective_shrink_ratio(&self) -> f64 {
        self.shrink_ratio.clamp(0.5, 0.99)
    }
}

/// External tool settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// Timeout for render and join invocations
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for probe invocations
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Extra attempts after a failed invocation
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff between attempts, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Codec settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EncodingConfig {
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_crf")]
    pub crf: u32,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Padding color used by the contain fit
    #[serde(default = "default_pad_color")]
    pub pad_color: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            preset: default_preset(),
            crf: default_crf(),
            pixel_format: default_pixel_format(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            pad_color: default_pad_color(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Reference canvas the pixel defaults are expressed in
pub const REFERENCE_WIDTH: f64 = 1920.0;
pub const REFERENCE_HEIGHT: f64 = 1080.0;

const DEFAULT_FONT_SIZE_TOP: u32 = 75;
const DEFAULT_FONT_SIZE_BOTTOM: u32 = 70;

/// Scale a reference pixel value, never below 1
pub fn scale_px(value: u32, scale: f64) -> u32 {
    ((value as f64 * scale).round() as u32).max(1)
}

fn default_canvas_width() -> u32 {
    1920
}

fn default_canvas_height() -> u32 {
    1080
}

fn default_chunk_size() -> usize {
    40
}

fn default_max_workers() -> usize {
    2
}

fn default_rows() -> usize {
    2
}

fn default_fps() -> u32 {
    30
}

fn default_duration_tolerance_secs() -> f64 {
    0.05
}

fn default_chunk_epsilon_secs() -> f64 {
    crate::timeline::DEFAULT_CHUNK_EPSILON
}

fn default_narrator_name() -> String {
    "N".to_string()
}

fn default_speaker_a_name() -> String {
    "A".to_string()
}

fn default_speaker_b_name() -> String {
    "B".to_string()
}

fn default_min_font_size() -> u32 {
    28
}

fn default_shrink_ratio() -> f64 {
    0.9
}

fn default_max_fit_iterations() -> u32 {
    12
}

fn default_max_lines() -> usize {
    3
}

fn default_cjk_wrap_chars() -> usize {
    16
}

fn default_text_width() -> u32 {
    1500
}

fn default_position_y() -> u32 {
    880
}

fn default_line_gap() -> u32 {
    26
}

fn default_bottom_margin() -> u32 {
    30
}

fn default_pad_x() -> u32 {
    22
}

fn default_pad_y() -> u32 {
    16
}

fn default_line_spacing() -> f64 {
    1.2
}

fn default_box_opacity() -> f64 {
    0.55
}

fn default_stroke_top() -> u32 {
    8
}

fn default_stroke_bottom() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_timeout_secs() -> u64 {
    900 // a 40-line segment renders well within 15 minutes
}

fn default_probe_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_preset() -> String {
    "veryfast".to_string()
}

fn default_crf() -> u32 {
    20
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

fn default_pad_color() -> String {
    "black".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let render = &self.render;
        if render.chunk_size == 0 {
            return Err(anyhow!("chunk_size must be at least 1"));
        }
        if render.max_workers == 0 {
            return Err(anyhow!("max_workers must be at least 1"));
        }
        if !(1..=2).contains(&render.rows) {
            return Err(anyhow!("rows must be 1 or 2, got {}", render.rows));
        }
        if render.canvas.width == 0 || render.canvas.height == 0 {
            return Err(anyhow!("canvas dimensions must be positive, got {}", render.canvas));
        }
        if render.fps == 0 {
            return Err(anyhow!("fps must be positive"));
        }
        if !(render.duration_tolerance_secs >= 0.0) || !(render.chunk_epsilon_secs >= 0.0) {
            return Err(anyhow!("duration tolerances must be non-negative"));
        }

        let captions = &self.captions;
        if captions.min_font_size == 0 {
            return Err(anyhow!("min_font_size must be positive"));
        }
        if !(captions.shrink_ratio > 0.0 && captions.shrink_ratio < 1.0) {
            return Err(anyhow!("shrink_ratio must be between 0 and 1, got {}", captions.shrink_ratio));
        }
        if captions.max_lines == 0 || captions.cjk_wrap_chars == 0 {
            return Err(anyhow!("max_lines and cjk_wrap_chars must be at least 1"));
        }
        if captions.font_size_top == Some(0) || captions.font_size_bottom == Some(0) {
            return Err(anyhow!("font size overrides must be positive"));
        }

        if self.tools.timeout_secs == 0 || self.tools.probe_timeout_secs == 0 {
            return Err(anyhow!("tool timeouts must be positive"));
        }

        Ok(())
    }
}
