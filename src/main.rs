// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use chunkreel::app_config::{self, CanvasSize, Config, FitMode};
use chunkreel::app_controller::{Controller, RenderRequest, prepare_output_path};
use chunkreel::errors::{EXIT_GENERIC, EXIT_OK, PipelineError};

/// CLI Wrapper for FitMode to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliFitMode {
    Cover,
    Contain,
}

impl From<CliFitMode> for FitMode {
    fn from(cli_fit: CliFitMode) -> Self {
        match cli_fit {
            CliFitMode::Cover => FitMode::Cover,
            CliFitMode::Contain => FitMode::Contain,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a captioned video (default command)
    Render(RenderArgs),

    /// Generate shell completions for chunkreel
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct RenderArgs {
    /// JSON array of [speaker, row1, row2..., duration] records
    #[arg(value_name = "LINES_JSON")]
    lines: PathBuf,

    /// Continuous narration audio
    #[arg(value_name = "NARRATION_AUDIO")]
    narration: PathBuf,

    /// Background image
    #[arg(value_name = "BACKGROUND_IMAGE")]
    background: PathBuf,

    #[command(flatten)]
    options: RenderOptions,
}

#[derive(Args, Debug, Clone)]
struct RenderOptions {
    /// Output video path
    #[arg(short, long, default_value = "output/final.mp4")]
    out: PathBuf,

    /// Maximum number of lines per rendered segment
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Number of caption rows (1 or 2)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    rows: Option<u8>,

    /// Top row font size in pixels
    #[arg(long)]
    font_size_top: Option<u32>,

    /// Bottom row font size in pixels
    #[arg(long)]
    font_size_bottom: Option<u32>,

    /// Output canvas as WxH (e.g. 1920x1080)
    #[arg(long)]
    canvas_size: Option<CanvasSize>,

    /// How the background fills the canvas
    #[arg(long, value_enum)]
    bg_fit: Option<CliFitMode>,

    /// Prefix narrator captions with the narrator name
    #[arg(long)]
    show_narrator_label: bool,

    /// Keep narrator captions exactly centered
    #[arg(long)]
    center_narrator_text: Option<bool>,

    /// Maximum number of chunks rendered concurrently
    #[arg(short, long)]
    workers: Option<usize>,

    /// Keep the temporary working directory
    #[arg(long)]
    keep_artifacts: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "chunkreel.json")]
    config: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// chunkreel - chunked, caption-synchronized video assembly
///
/// Renders a narrated video with time-aligned captions from a script of timed
/// lines, one narration track and a background image.
#[derive(Parser, Debug)]
#[command(name = "chunkreel")]
#[command(version)]
#[command(about = "Chunked, caption-synchronized video assembly")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "chunkreel renders a narrated video with captions aligned to the audio.

EXAMPLES:
    chunkreel lines.json voice.mp3 bg.png                     # Render to output/final.mp4
    chunkreel render lines.json voice.mp3 bg.png -o out.mp4   # Explicit subcommand
    chunkreel lines.json voice.mp3 bg.png --rows 1            # Single caption row
    chunkreel lines.json voice.mp3 bg.png --canvas-size 1080x1920 --bg-fit contain
    chunkreel lines.json voice.mp3 bg.png -w 4 --keep-artifacts
    chunkreel completions bash > chunkreel.bash               # Generate bash completions

CONFIGURATION:
    Configuration is stored in chunkreel.json by default. You can specify a
    different file with --config. If the file doesn't exist, a default one
    is created automatically. Command line options override the file.

EXIT CODES:
    0  success
    2  invalid input or configuration
    3  every chunk had zero length
    4  an external tool failed or timed out")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON array of [speaker, row1, row2..., duration] records
    #[arg(value_name = "LINES_JSON")]
    lines: Option<PathBuf>,

    /// Continuous narration audio
    #[arg(value_name = "NARRATION_AUDIO")]
    narration: Option<PathBuf>,

    /// Background image
    #[arg(value_name = "BACKGROUND_IMAGE")]
    background: Option<PathBuf>,

    #[command(flatten)]
    options: RenderOptions,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();

    let result = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "chunkreel", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Render(args)) => run_render(args).await,
        None => match (cli.lines, cli.narration, cli.background) {
            (Some(lines), Some(narration), Some(background)) => {
                run_render(RenderArgs {
                    lines,
                    narration,
                    background,
                    options: cli.options,
                })
                .await
            }
            _ => Err(anyhow!(
                "LINES_JSON, NARRATION_AUDIO and BACKGROUND_IMAGE are required when no subcommand is specified"
            )),
        },
    };

    let code = match result {
        Ok(()) => EXIT_OK,
        Err(e) => {
            error!("{:#}", e);
            e.downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(EXIT_GENERIC)
        }
    };
    log::logger().flush();
    std::process::exit(code);
}

/// Load the config file, writing a default one when it does not exist
fn load_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        let config: Config =
            serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))?;
        Ok(config)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();

        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        Ok(config)
    }
}

/// Apply command line overrides on top of the loaded config
fn apply_overrides(config: &mut Config, options: &RenderOptions) {
    if let Some(chunk_size) = options.chunk_size {
        config.render.chunk_size = chunk_size;
    }
    if let Some(rows) = options.rows {
        config.render.rows = rows as usize;
    }
    if let Some(size) = options.font_size_top {
        config.captions.font_size_top = Some(size);
    }
    if let Some(size) = options.font_size_bottom {
        config.captions.font_size_bottom = Some(size);
    }
    if let Some(canvas) = options.canvas_size {
        config.render.canvas.width = canvas.width;
        config.render.canvas.height = canvas.height;
    }
    if let Some(fit) = &options.bg_fit {
        config.render.canvas.fit = fit.clone().into();
    }
    if options.show_narrator_label {
        config.captions.show_narrator_label = true;
    }
    if let Some(center) = options.center_narrator_text {
        config.captions.center_narrator_text = center;
    }
    if let Some(workers) = options.workers {
        config.render.max_workers = workers;
    }
    if options.keep_artifacts {
        config.render.keep_artifacts = true;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_render(args: RenderArgs) -> Result<()> {
    let options = &args.options;

    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let mut config = load_config(&options.config).map_err(|e| PipelineError::Config(format!("{:#}", e)))?;
    apply_overrides(&mut config, options);

    // Validate the configuration after loading and overriding
    config
        .validate()
        .map_err(|e| PipelineError::Config(format!("Configuration validation failed: {}", e)))?;
    log::set_max_level(level_filter(&config.log_level));

    let request = RenderRequest {
        lines_path: args.lines.clone(),
        narration_path: args.narration.clone(),
        background_path: args.background.clone(),
        output_path: prepare_output_path(&options.out)?,
    };

    info!(
        "🚀 chunkreel: {} canvas ({}), {} row(s), {} line(s) per chunk, {} worker(s)",
        config.render.canvas,
        config.render.canvas.fit,
        config.render.rows,
        config.render.chunk_size,
        config.render.max_workers
    );

    let controller = Controller::with_config(config)?;
    let summary = controller.run(&request).await?;

    if let Some(dir) = &summary.artifacts_dir {
        info!("Artifacts: {}", dir.display());
    }

    Ok(())
}
