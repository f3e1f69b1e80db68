#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, warn};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use srtlingo::app_config::{self, Config, TranslationProvider};
use srtlingo::app_controller::{self, Controller};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
    #[value(name = "deepseek")]
    DeepSeek,
    Mock,
    Auto,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
            CliTranslationProvider::DeepSeek => TranslationProvider::DeepSeek,
            CliTranslationProvider::Mock => TranslationProvider::Mock,
            CliTranslationProvider::Auto => TranslationProvider::Auto,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
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
    /// Translate subtitle files (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for srtlingo
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct TranslateArgs {
    /// Input subtitle file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code or name (e.g., 'en', 'auto')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code or name (e.g., 'es', 'French')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Directory for translated files (default: next to each input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Maximum concurrent requests per file
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Walk subdirectories when the input is a directory
    #[arg(short, long)]
    recursive: bool,
}

/// srtlingo - subtitle translation with AI providers
#[derive(Parser, Debug)]
#[command(name = "srtlingo")]
#[command(version)]
#[command(about = "Idempotent SRT subtitle translation with AI providers")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "srtlingo translates SRT subtitle files with AI providers.

Outputs are named after a fingerprint of the input content, so re-running on
unchanged files does nothing. A lock file keeps two runs from working on the
same scope at once.

EXAMPLES:
    srtlingo movie.srt                           # Translate using default config
    srtlingo -p openai -m gpt-4o-mini movie.srt  # Use specific provider and model
    srtlingo -s en -t es movie.srt               # Translate from English to Spanish
    srtlingo -j 8 -o out/ /subs/                 # Whole directory, 8 requests at a time
    srtlingo completions bash > srtlingo.bash    # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file
    doesn't exist, a default one will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible)
    deepseek  - DeepSeek API (requires API key)
    mock      - Offline provider that tags text, for dry runs
    auto      - First of openai, deepseek, anthropic with an API key, else mock")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: Option<TranslateArgs>,
}

// @struct: Custom logger implementation, filtered by log::max_level so the level can change after init
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::decoration(record.level());
            let _ = writeln!(std::io::stderr(), "\x1B[{}m{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();
    let args = match (cli.command, cli.translate) {
        (Some(Commands::Completions { shell }), _) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "srtlingo", &mut std::io::stdout());
            return ExitCode::SUCCESS;
        }
        (Some(Commands::Translate(args)), _) | (None, Some(args)) => args,
        (None, None) => {
            error!("INPUT_PATH is required when no subcommand is specified");
            return ExitCode::from(2);
        }
    };

    match run_translate(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every file was translated or already up to date
async fn run_translate(options: TranslateArgs) -> Result<bool> {
    if let Some(level) = options.log_level {
        log::set_max_level(app_config::LogLevel::from(level).into());
    }

    let mut config = load_or_create_config(&options.config_path)?;
    apply_overrides(&mut config, &options);

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.into());
    }

    let controller = Controller::with_config(config)?;
    let cancel = CancellationToken::new();
    app_controller::cancel_on_ctrl_c(cancel.clone());

    let summary = controller.run(&options.input_path, cancel).await?;
    Ok(summary.is_success())
}

fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path).with_context(|| format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        return serde_json::from_reader(reader).with_context(|| format!("Failed to parse config file: {}", config_path));
    }

    warn!("Config file not found at '{}', creating default config.", config_path);
    let config = Config::default();
    let config_json = serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
    std::fs::write(config_path, config_json)
        .with_context(|| format!("Failed to write default config to file: {}", config_path))?;
    Ok(config)
}

// Override config with CLI options if provided
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    // Model and concurrency overrides apply to the provider actually used
    config.translation.resolve_auto_provider();
    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    if let Some(concurrency) = options.concurrency {
        config.translation.active_provider_config_mut().concurrent_requests = concurrency;
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(output_dir) = &options.output_dir {
        config.pipeline.output_dir = Some(output_dir.clone());
    }
    if options.recursive {
        config.pipeline.recursive = true;
    }
    if let Some(log_level) = options.log_level {
        config.log_level = log_level.into();
    }
}
