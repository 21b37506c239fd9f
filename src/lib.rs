/*!
 * # chunkreel - chunked, caption-synchronized video assembly
 *
 * Turns a script of timed spoken lines, one continuous narration track and a
 * background image into a single video with captions aligned to the audio.
 *
 * ## Features
 *
 * - Strict validation of the timed-line script
 * - Cumulative timeline with zero-length chunk and line dropping
 * - Concurrent per-chunk audio slicing and segment rendering
 * - Script-aware caption layout for Latin, CJK and Hangul text with
 *   automatic font-size fitting
 * - Canvas normalization (cover or contain) of mismatching segments
 * - Stream-copy concatenation with a verified re-encode fallback
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `script`: Timed-line parsing and validation
 * - `timeline`: Duration accumulation and chunk partitioning
 * - `layout`: Caption layout:
 *   - `layout::text`: Sanitizing, script detection and glyph metrics
 *   - `layout::wrap`: Script-aware wrapping and truncation
 *   - `layout::fonts`: Per-script font fallback chain
 *   - `layout::engine`: Fitting and placement
 * - `media`: Media stages and the ffmpeg backend:
 *   - `media::audio`: Narration slicing
 *   - `media::compositor`: Segment planning and filter graphs
 *   - `media::unifier`: Canvas normalization
 *   - `media::concat`: Final join with fallback
 *   - `media::ffmpeg`: ffmpeg/ffprobe command lines
 *   - `media::runner`: Process execution with timeout and retry
 * - `workspace`: Scoped temporary directory of a run
 * - `issues`: Non-fatal issue collection
 * - `app_controller`: Run orchestration
 * - `app_config`: Configuration management
 * - `file_utils`: File system operations
 * - `errors`: Error taxonomy and exit codes
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod issues;
pub mod layout;
pub mod media;
pub mod script;
pub mod timeline;
pub mod workspace;

// Re-export main types for easier usage
pub use app_config::{Canvas, Config, FitMode};
pub use app_controller::{Controller, RenderRequest, RunSummary};
pub use errors::PipelineError;
pub use layout::{CaptionBlock, LayoutEngine};
pub use media::{JoinStrategy, MediaBackend, MediaInfo};
pub use script::{Line, Speaker};
pub use timeline::{Chunk, Timeline};
