// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::File;
use std::io::BufReader;
use std::io::Write;
use std::path::{Path, PathBuf};

use transcript_pdf::app_config::{self, Config};
use transcript_pdf::app_controller::Controller;
use transcript_pdf::file_utils::FileManager;
use transcript_pdf::pdf::ChromiumEngine;
use transcript_pdf::source::{ApiSource, FileSource, SampleSource, TranscriptSource};

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
    /// Generate shell completions for transcript-pdf
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// transcript-pdf - two-page academic transcript generator
///
/// Fetches one student's transcript record, lays it out over two HTML pages,
/// prints both pages with headless Chromium and merges them into one PDF.
#[derive(Parser, Debug)]
#[command(name = "transcript-pdf")]
#[command(version)]
#[command(about = "Render an academic transcript record to a two-page PDF")]
#[command(long_about = "transcript-pdf fetches a transcript record, renders both transcript pages with headless Chromium and merges them into output_<student id>.pdf.

EXAMPLES:
    transcript-pdf                                  # Fetch from the API configured in conf.json
    transcript-pdf --input record.json              # Use a saved API payload
    transcript-pdf --sample 50 --output-dir out/    # Layout check with 50 generated subjects
    transcript-pdf --keep-pages --force-overwrite   # Also keep page1_/page2_ files, replace output
    transcript-pdf completions bash > transcript-pdf.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Read the record from a JSON file instead of the API
    #[arg(short, long, value_name = "JSON", conflicts_with = "sample")]
    input: Option<PathBuf>,

    /// Generate a sample record with this many subjects
    #[arg(long, value_name = "N")]
    sample: Option<usize>,

    /// Directory for the generated files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write each page as its own PDF
    #[arg(short, long)]
    keep_pages: bool,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Chromium executable to use
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
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
        let logger = Box::new(CustomLogger::new(level));
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
        // chromiumoxide reports every unknown DevTools event at debug level
        if metadata.target().starts_with("chromiumoxide") && metadata.level() > Level::Warn {
            return false;
        }
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

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once; the level is adjusted after loading the config
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "transcript-pdf", &mut std::io::stdout());
        return Ok(());
    }

    run_generate(cli).await
}

async fn run_generate(options: CommandLineOptions) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level_filter(&config_log_level));
    }

    let mut config = load_or_create_config(&options.config, options.log_level.clone())?;

    // Override config with CLI options if provided
    if let Some(output_dir) = &options.output_dir {
        config.output.directory = output_dir.clone();
    }
    if options.keep_pages {
        config.output.keep_pages = true;
    }
    if let Some(chrome) = &options.chrome {
        config.browser.executable_path = Some(chrome.clone());
    }

    config.validate().context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(level_filter(&config.log_level));
    }

    let source: Box<dyn TranscriptSource> = if let Some(count) = options.sample {
        Box::new(SampleSource::new(count))
    } else if let Some(input) = &options.input {
        if !FileManager::file_exists(input) {
            return Err(anyhow!("Input file does not exist: {:?}", input));
        }
        Box::new(FileSource::new(input.clone()))
    } else if config.has_api_source() {
        Box::new(ApiSource::new(&config.source).context("Failed to create API client")?)
    } else {
        return Err(anyhow!(
            "No record source: set source.api_url in {} or pass --input / --sample",
            options.config
        ));
    };

    let browser_config = config.browser.clone();
    let browser_config = &browser_config;
    let controller = Controller::with_config(config)
        .force_overwrite(options.force_overwrite)
        .show_progress(true);

    match controller
        .run(source.as_ref(), move || ChromiumEngine::launch(browser_config))
        .await
    {
        Ok(outcome) => {
            for path in &outcome.page_paths {
                info!("Kept page document {:?}", path);
            }
            Ok(())
        }
        Err(err) => {
            error!("Transcript generation failed at stage '{}': {}", err.stage(), err);
            Err(anyhow::Error::new(err).context("No transcript was written"))
        }
    }
}

fn load_or_create_config(config_path: &str, log_level: Option<CliLogLevel>) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    // Update log level in config if specified via command line
    if let Some(log_level) = log_level {
        config.log_level = log_level.into();
    }

    Ok(config)
}
