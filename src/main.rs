// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use linetrans::app_config::{self, TranslatorConfig};
use linetrans::app_controller::Controller;

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

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an ID:::Text file (default command)
    Translate(TranslateArgs),

    /// List the models offered by the endpoint
    Models(ModelsArgs),

    /// Generate shell completions for linetrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by the default command and `translate`
#[derive(Args, Debug, Clone)]
struct TranslateOptions {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config_path: PathBuf,

    /// Output file (default: tran.txt next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long)]
    base_url: Option<String>,

    /// API key (never written to the config file)
    #[arg(long, env = "LINETRANS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Number of workers
    #[arg(short, long)]
    threads: Option<usize>,

    /// Units per request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Seconds each worker waits between requests
    #[arg(long)]
    delay: Option<f64>,

    /// Stream responses token by token
    #[arg(long, conflicts_with = "no_stream")]
    stream: bool,

    /// Wait for whole responses
    #[arg(long)]
    no_stream: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input file in ID:::Text format
    #[arg(value_name = "INPUT")]
    input_path: PathBuf,

    #[command(flatten)]
    options: TranslateOptions,
}

#[derive(Args, Debug)]
struct ModelsArgs {
    /// Configuration file path (read for the base URL)
    #[arg(short, long, default_value = "config.json")]
    config_path: PathBuf,

    /// Base URL of the OpenAI-compatible API
    #[arg(long)]
    base_url: Option<String>,

    /// API key
    #[arg(long, env = "LINETRANS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

/// linetrans - batch translation of ID:::Text localization files
///
/// Splits the file across workers, sends batches of lines to an OpenAI-compatible
/// chat-completion API and writes the translated file atomically.
#[derive(Parser, Debug)]
#[command(name = "linetrans")]
#[command(version)]
#[command(about = "Batch translator for ID:::Text localization files")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "linetrans translates line-delimited localization files through an OpenAI-compatible chat API.

EXAMPLES:
    linetrans temp.txt                              # Translate using config.json
    linetrans -t 4 -b 40 temp.txt                   # Four workers, 40 lines per request
    linetrans -m gpt-4o-mini --base-url https://api.openai.com/v1 temp.txt
    linetrans --no-stream -o out/tran.txt temp.txt  # Buffered responses, custom output
    linetrans models                                # List models of the configured endpoint
    linetrans completions bash > linetrans.bash     # Generate bash completions

CONFIGURATION:
    Settings are stored in config.json by default. If the file doesn't exist, a
    default one is created. The API key is read from --api-key or the
    LINETRANS_API_KEY environment variable and is never saved.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input file in ID:::Text format
    #[arg(value_name = "INPUT")]
    input_path: Option<PathBuf>,

    #[command(flatten)]
    options: TranslateOptions,
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
        // the logger itself accepts everything; `set_max_level` does the filtering
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌",
            Level::Warn => "🚧",
            Level::Info => " ",
            Level::Debug => "🔍",
            Level::Trace => "📋",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
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
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "linetrans", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Models(args)) => run_models(args).await,
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => {
            let input_path = cli.input_path.ok_or_else(|| {
                anyhow!("INPUT is required when no subcommand is specified")
            })?;
            run_translate(TranslateArgs {
                input_path,
                options: cli.options,
            })
            .await
        }
    }
}

/// Load the config file, or write a default one when it is missing
fn load_or_create_config(config_path: &Path) -> Result<TranslatorConfig> {
    if config_path.exists() {
        TranslatorConfig::load(config_path)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path.display());
        let config = TranslatorConfig::default();
        config
            .save(config_path)
            .context("Failed to write default config")?;
        Ok(config)
    }
}

/// Apply command line overrides on top of the file configuration
fn apply_overrides(config: &mut TranslatorConfig, options: &TranslateOptions) {
    if let Some(output) = &options.output {
        config.output_file = Some(output.clone());
    }
    if let Some(model) = &options.model {
        config.model = model.clone();
    }
    if let Some(base_url) = &options.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(api_key) = &options.api_key {
        config.api_key = api_key.clone();
    }
    if let Some(threads) = options.threads {
        config.threads = threads;
    }
    if let Some(batch_size) = options.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(delay) = options.delay {
        config.delay = delay;
    }
    if options.stream {
        config.stream = true;
    }
    if options.no_stream {
        config.stream = false;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let options = args.options;

    // If log level is set via command line, apply it immediately
    if let Some(cli_level) = &options.log_level {
        let level: app_config::LogLevel = cli_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = load_or_create_config(&options.config_path)?;

    // Remember the last input like the settings form did
    let input_display = args.input_path.display().to_string();
    if config.last_file != input_display {
        config.last_file = input_display;
        if let Err(e) = config.save(&options.config_path) {
            warn!("Could not update last_file in config: {:#}", e);
        }
    }

    apply_overrides(&mut config, &options);
    config.validate().context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }
    if config.api_key.is_empty() {
        warn!("No API key set (--api-key or LINETRANS_API_KEY); requests go out unauthenticated");
    }

    info!("🚀 linetrans: {} @ {}", config.model, config.base_url);

    let controller = Arc::new(Controller::with_progress_bars());
    let stopper = Arc::clone(&controller);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight requests...");
            stopper.stop_translation();
        }
    });

    let summary = controller.start_translation(config, &args.input_path).await?;

    for line in summary.summary().lines() {
        info!("{}", line);
    }
    for warning in summary.warnings.iter().take(10) {
        warn!("{}", warning);
    }
    if summary.warnings.len() > 10 {
        warn!("... and {} more validation warnings", summary.warnings.len() - 10);
    }
    if summary.failed_batches > 0 {
        error!("{} batches fell back to source text", summary.failed_batches);
    }
    Ok(())
}

async fn run_models(args: ModelsArgs) -> Result<()> {
    let config = if args.config_path.exists() {
        TranslatorConfig::load(&args.config_path)?
    } else {
        TranslatorConfig::default()
    };
    let base_url = args.base_url.unwrap_or(config.base_url);
    let api_key = args.api_key.unwrap_or_default();

    let controller = Controller::new();
    let models = controller.fetch_models(&base_url, &api_key).await?;
    let mut stdout = std::io::stdout();
    for model in models {
        writeln!(stdout, "{}", model)?;
    }
    Ok(())
}
