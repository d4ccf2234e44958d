//! hotbridge - development build-and-bridge server.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use hotbridge::{
    cli::{self, Cli, Commands},
    config::{BridgeConfig, init_config},
    core,
};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = init_config(BridgeConfig::load(cli)?);

    match &cli.command {
        Commands::Build { .. } => cli::build::build_module(&config),
        Commands::Serve { .. } => cli::serve::serve_module(),
        Commands::Check => cli::check::check_project(&config),
    }
}
