use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;

mod cli;
mod commands;
mod config;
mod event;
mod handler;
mod hook;
mod policy;
mod secret;
mod server;
mod store;

use cli::{Cli, Commands};
use config::{Config, LogLevel};

fn setup_logging(config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose { LogLevel::Debug } else { config.log_level };

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(level.as_filter());
    }

    match &config.log_file {
        Some(log_file) => {
            if let Some(parent) = log_file.parent() {
                fs::create_dir_all(parent).context("Failed to create log directory")?;
            }
            let target = Box::new(
                fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(log_file)
                    .context("Failed to open log file")?,
            );
            builder.target(env_logger::Target::Pipe(target));
        }
        None => {
            builder.target(env_logger::Target::Stderr);
        }
    }

    builder.init();

    info!(
        "Log level: {:?} (from {})",
        level,
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, mut config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve { bind, hooks_dir } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(hooks_dir) = hooks_dir {
                config.hooks.dir = hooks_dir;
            }
            commands::serve::run(&config)
        }
        Commands::Hooks { format } => commands::hooks::run(cli::OutputFormat::resolve(format), &config),
        Commands::Check { repository, pusher, tag } => {
            commands::check::run(repository.as_deref(), pusher.as_deref(), tag.as_deref(), &config)
        }
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config, cli.verbose).context("Failed to setup logging")?;

    info!("Starting dockhook with config from: {:?}", cli.config);

    run(cli, config)?;

    Ok(())
}
