#![warn(clippy::all)]
use clap::Parser;
use commands::Commands;
use config::Config;
use logging::Logging;
use prelude::*;
use std::path::PathBuf;

mod commands;
mod config;
mod document;
mod logging;
mod metadata;
mod prelude;

/// Convert and inspect vpc and instance records
#[derive(Parser)]
#[command(name = "cloudmeta", author, version, about, long_about = None)]
pub struct Cli {
    /// Use this config file instead of ~/.config/cloudmeta/cloudmeta.config.json
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Verbose
    #[arg(short, long, global = true, default_value_t)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

fn main() -> Result<()> {
    let Cli { config, verbose, command } = Cli::parse();
    Logging::try_init(verbose)?;
    let cfg = match config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .wrap_err("Can't load config")?;
    command.into_executable(cfg).exec()
}
