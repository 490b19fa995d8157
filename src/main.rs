// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use crate::app_controller::Controller;
use crate::orchestrator::BatchPass;

mod app_config;
mod app_controller;
mod backup;
mod codec;
mod consistency;
mod context;
mod errors;
mod file_utils;
mod language_utils;
mod orchestrator;
mod placeholder;
mod project;
mod providers;
mod wordwrap;

/// CLI wrapper for LogLevel to implement ValueEnum
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

/// CLI wrapper for BatchPass to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliBatchPass {
    Names,
    Database,
    Dialogue,
    Full,
}

impl From<CliBatchPass> for BatchPass {
    fn from(cli_pass: CliBatchPass) -> Self {
        match cli_pass {
            CliBatchPass::Names => BatchPass::Names,
            CliBatchPass::Database => BatchPass::Database,
            CliBatchPass::Dialogue => BatchPass::Dialogue,
            CliBatchPass::Full => BatchPass::Full,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract translatable text into the project state file
    Extract {
        /// Game project directory (contains data/ or www/data/)
        #[arg(value_name = "PROJECT_DIR")]
        project_dir: PathBuf,
    },

    /// Translate queued units through the configured provider
    Translate {
        /// Game project directory
        #[arg(value_name = "PROJECT_DIR")]
        project_dir: PathBuf,

        /// Which slice of the project to translate
        #[arg(long, value_enum, default_value = "full")]
        pass: CliBatchPass,

        /// Concurrent translation workers
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Improve grammar and flow of existing translations
    Polish {
        /// Game project directory
        #[arg(value_name = "PROJECT_DIR")]
        project_dir: PathBuf,
    },

    /// Re-flow translated dialogue to the message-window width
    Wrap {
        /// Game project directory
        #[arg(value_name = "PROJECT_DIR")]
        project_dir: PathBuf,
    },

    /// Write translations back into the game data files
    Export {
        /// Game project directory
        #[arg(value_name = "PROJECT_DIR")]
        project_dir: PathBuf,

        /// Fail on units or files the data tree no longer matches,
        /// instead of skipping them
        #[arg(long)]
        strict: bool,
    },

    /// Show translation progress counts
    Stats {
        /// Game project directory
        #[arg(value_name = "PROJECT_DIR")]
        project_dir: PathBuf,
    },

    /// Generate shell completions for gamemtl
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// gamemtl - RPG Maker game translation tool
///
/// Extracts translatable text from RPG Maker MV/MZ projects, translates
/// it through a local LLM, and writes the result back into the game.
#[derive(Parser, Debug)]
#[command(name = "gamemtl")]
#[command(version)]
#[command(about = "LLM-powered RPG Maker game translation tool")]
#[command(long_about = "gamemtl extracts translatable text from RPG Maker MV/MZ data files,
translates it through a local Ollama server, and writes it back.

EXAMPLES:
    gamemtl extract ~/games/mygame              # Build the project state
    gamemtl translate ~/games/mygame            # Translate everything
    gamemtl translate --pass names ~/games/mygame  # Names first, feeds the glossary
    gamemtl wrap ~/games/mygame                 # Re-flow dialogue lines
    gamemtl export ~/games/mygame               # Write back (snapshots originals)
    gamemtl stats ~/games/mygame                # Progress counts
    gamemtl completions bash > gamemtl.bash     # Shell completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a
    different file with --config-path. If the config file doesn't exist,
    a default one is created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Model name to use for translation
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Source language code (e.g. 'ja')
    #[arg(short, long, global = true)]
    source_language: Option<String>,

    /// Target language code (e.g. 'en')
    #[arg(short, long, global = true)]
    target_language: Option<String>,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// Colored stderr logger with millisecond timestamps
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
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
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let color = Self::color_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{color}{now} {}\x1B[0m", record.args());
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

/// Load the configuration file (creating a default one if absent) and
/// apply command-line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let config_path = &cli.config_path;
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?
    } else {
        log::warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    if let Some(model) = &cli.model {
        let provider_str = config.translation.provider.to_lowercase_string();
        if let Some(provider_config) = config
            .translation
            .available_providers
            .iter_mut()
            .find(|p| p.provider_type == provider_str)
        {
            provider_config.model = model.clone();
        }
    }
    if let Some(source_lang) = &cli.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &cli.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info level until the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "gamemtl", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = load_config(&cli)?;
    if let Commands::Translate { workers: Some(workers), .. } = &cli.command {
        config.batch.workers = *workers;
    }
    log::set_max_level(level_filter(&config.log_level));

    let controller = Controller::with_config(config)?;
    match cli.command {
        Commands::Extract { project_dir } => {
            let state = controller.open_project(&project_dir)?;
            let stats = state.stats();
            info!(
                "Project state ready: {} units ({} already translated, {} skipped)",
                stats.total, stats.translated + stats.reviewed, stats.skipped
            );
        }
        Commands::Translate { project_dir, pass, .. } => {
            controller.translate(&project_dir, pass.into()).await?;
        }
        Commands::Polish { project_dir } => {
            controller.polish(&project_dir).await?;
        }
        Commands::Wrap { project_dir } => {
            let report = controller.wrap(&project_dir)?;
            for id in &report.overflowing {
                log::warn!("Overflows message box: {}", id);
            }
        }
        Commands::Export { project_dir, strict } => {
            controller.export(&project_dir, strict)?;
        }
        Commands::Stats { project_dir } => {
            let stats = controller.stats(&project_dir)?;
            println!("Total units:   {}", stats.total);
            println!("Translated:    {}", stats.translated);
            println!("Reviewed:      {}", stats.reviewed);
            println!("Untranslated:  {}", stats.untranslated);
            println!("Skipped:       {}", stats.skipped);
            println!("Failed:        {}", stats.failed);
        }
        Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}
