/*!
 * ffmpeg/ffprobe implementation of the media backend.
 *
 * Command lines are produced by plain functions so they can be checked
 * without running anything; [`FfmpegBackend`] only adds the timeouts and
 * hands them to the [`ProcessRunner`].
 */

use async_trait::async_trait;
use log::debug;
use serde_json::{Value, from_str};
use std::path::Path;
use std::time::Duration;

use super::compositor::{CaptionStyle, build_filter_graph};
use super::runner::{Invocation, ProcessRunner};
use super::unifier::fit_filter;
use super::{MediaBackend, MediaInfo, SegmentPlan};
use crate::app_config::{Canvas, Config, EncodingConfig, ToolConfig};
use crate::errors::PipelineError;

fn seconds(value: f64) -> String {
    format!("{:.6}", value.max(0.0))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn quiet_prefix() -> Vec<String> {
    ["-y", "-hide_banner", "-loglevel", "error"].iter().map(|s| s.to_string()).collect()
}

fn video_encoding_args(encoding: &EncodingConfig, fps: u32) -> Vec<String> {
    vec![
        "-c:v".to_string(),
        encoding.video_codec.clone(),
        "-preset".to_string(),
        encoding.preset.clone(),
        "-crf".to_string(),
        encoding.crf.to_string(),
        "-pix_fmt".to_string(),
        encoding.pixel_format.clone(),
        "-r".to_string(),
        fps.to_string(),
    ]
}

fn audio_encoding_args(encoding: &EncodingConfig) -> Vec<String> {
    vec![
        "-c:a".to_string(),
        encoding.audio_codec.clone(),
        "-b:a".to_string(),
        encoding.audio_bitrate.clone(),
    ]
}

/// ffprobe arguments returning format and streams as JSON
pub fn probe_args(path: &Path) -> Vec<String> {
    let mut args: Vec<String> = ["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    args.push(path_arg(path));
    args
}

/// Parse ffprobe JSON output
pub fn parse_probe_output(stdout: &str) -> Result<MediaInfo, PipelineError> {
    let json: Value = from_str(stdout)?;

    let as_seconds = |v: &Value| -> Option<f64> {
        v.as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| v.as_f64())
            .filter(|d| d.is_finite() && *d >= 0.0)
    };

    let streams = json.get("streams").and_then(|s| s.as_array()).cloned().unwrap_or_default();
    let find_stream = |kind: &str| streams.iter().find(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some(kind));

    let duration_secs = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(as_seconds)
        .or_else(|| {
            streams
                .iter()
                .filter_map(|s| s.get("duration").and_then(as_seconds))
                .reduce(f64::max)
        })
        .ok_or_else(|| PipelineError::Io("probe output has no duration".to_string()))?;

    let video = find_stream("video");
    let dimension = |key: &str| -> Option<u32> {
        video
            .and_then(|v| v.get(key))
            .and_then(|d| d.as_u64())
            .map(|d| d as u32)
    };
    let codec = |stream: Option<&Value>| -> Option<String> {
        stream
            .and_then(|s| s.get("codec_name"))
            .and_then(|c| c.as_str())
            .map(|c| c.to_string())
    };

    Ok(MediaInfo {
        duration_secs,
        width: dimension("width"),
        height: dimension("height"),
        video_codec: codec(video),
        audio_codec: codec(find_stream("audio")),
    })
}

/// Stream-copy a time window out of an audio file
pub fn slice_audio_args(source: &Path, start: f64, duration: f64, output: &Path) -> Vec<String> {
    let mut args = quiet_prefix();
    args.extend([
        "-ss".to_string(),
        seconds(start),
        "-t".to_string(),
        seconds(duration),
        "-i".to_string(),
        path_arg(source),
        "-vn".to_string(),
        "-acodec".to_string(),
        "copy".to_string(),
        path_arg(output),
    ]);
    args
}

/// Render a segment from a looped background, the chunk audio and the caption graph
pub fn render_args(plan: &SegmentPlan, canvas: &Canvas, encoding: &EncodingConfig, fps: u32, style: &CaptionStyle) -> Vec<String> {
    let graph = build_filter_graph(plan, canvas, style, &encoding.pad_color, &encoding.pixel_format);

    let mut args = quiet_prefix();
    args.extend([
        "-loop".to_string(),
        "1".to_string(),
        "-framerate".to_string(),
        fps.to_string(),
        "-i".to_string(),
        path_arg(&plan.background),
        "-i".to_string(),
        path_arg(&plan.audio),
        "-filter_complex".to_string(),
        graph,
        "-map".to_string(),
        "[v]".to_string(),
        "-map".to_string(),
        "1:a:0".to_string(),
    ]);
    args.extend(video_encoding_args(encoding, fps));
    args.extend(audio_encoding_args(encoding));
    args.extend([
        "-t".to_string(),
        seconds(plan.duration_secs),
        "-movflags".to_string(),
        "+faststart".to_string(),
        path_arg(&plan.output),
    ]);
    args
}

/// Re-encode a segment onto the canvas geometry
pub fn normalize_args(input: &Path, output: &Path, canvas: &Canvas, encoding: &EncodingConfig, fps: u32) -> Vec<String> {
    let mut args = quiet_prefix();
    args.extend([
        "-i".to_string(),
        path_arg(input),
        "-vf".to_string(),
        format!("{},setsar=1", fit_filter(canvas, &encoding.pad_color)),
    ]);
    args.extend(video_encoding_args(encoding, fps));
    args.extend(audio_encoding_args(encoding));
    args.extend(["-movflags".to_string(), "+faststart".to_string(), path_arg(output)]);
    args
}

/// Join a concat list without re-encoding
pub fn concat_copy_args(list_file: &Path, output: &Path) -> Vec<String> {
    let mut args = quiet_prefix();
    args.extend([
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        path_arg(list_file),
        "-c".to_string(),
        "copy".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        path_arg(output),
    ]);
    args
}

/// Join a concat list with a full re-encode
pub fn concat_reencode_args(list_file: &Path, output: &Path, encoding: &EncodingConfig, fps: u32) -> Vec<String> {
    let mut args = quiet_prefix();
    args.extend([
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        path_arg(list_file),
    ]);
    args.extend(video_encoding_args(encoding, fps));
    args.extend(audio_encoding_args(encoding));
    args.extend(["-movflags".to_string(), "+faststart".to_string(), path_arg(output)]);
    args
}

/// Media backend driving the ffmpeg command-line tools
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    tools: ToolConfig,
    encoding: EncodingConfig,
    fps: u32,
    style: CaptionStyle,
    runner: ProcessRunner,
}

impl FfmpegBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            tools: config.tools.clone(),
            encoding: config.encoding.clone(),
            fps: config.render.fps,
            style: CaptionStyle::from_config(&config.captions),
            runner: ProcessRunner::from_config(&config.tools),
        }
    }

    fn ffmpeg(&self, args: Vec<String>) -> Invocation {
        Invocation::new(&self.tools.ffmpeg_path, args, Duration::from_secs(self.tools.timeout_secs))
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, PipelineError> {
        let invocation = Invocation::new(
            &self.tools.ffprobe_path,
            probe_args(path),
            Duration::from_secs(self.tools.probe_timeout_secs),
        )
        .capturing_stdout();
        let stdout = self.runner.run(&invocation).await?;
        let info = parse_probe_output(&String::from_utf8_lossy(&stdout))?;
        debug!("Probed {}: {:?}", path.display(), info);
        Ok(info)
    }

    async fn slice_audio(&self, source: &Path, start: f64, duration: f64, output: &Path) -> Result<(), PipelineError> {
        self.runner
            .run(&self.ffmpeg(slice_audio_args(source, start, duration, output)))
            .await
            .map(|_| ())
    }

    async fn render_segment(&self, plan: &SegmentPlan, canvas: &Canvas) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(&plan.text_dir).await?;
        for (path, text) in plan.caption_files() {
            tokio::fs::write(&path, text).await?;
        }

        self.runner
            .run(&self.ffmpeg(render_args(plan, canvas, &self.encoding, self.fps, &self.style)))
            .await
            .map(|_| ())
    }

    async fn normalize_segment(&self, input: &Path, output: &Path, canvas: &Canvas) -> Result<(), PipelineError> {
        self.runner
            .run(&self.ffmpeg(normalize_args(input, output, canvas, &self.encoding, self.fps)))
            .await
            .map(|_| ())
    }

    async fn concat_stream_copy(&self, list_file: &Path, output: &Path) -> Result<(), PipelineError> {
        self.runner
            .run(&self.ffmpeg(concat_copy_args(list_file, output)))
            .await
            .map(|_| ())
    }

    async fn concat_reencode(&self, list_file: &Path, output: &Path) -> Result<(), PipelineError> {
        self.runner
            .run(&self.ffmpeg(concat_reencode_args(list_file, output, &self.encoding, self.fps)))
            .await
            .map(|_| ())
    }
}
