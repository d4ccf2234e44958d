//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::{net::IpAddr, path::PathBuf};

use crate::config::BuildProfile;

/// Build-and-bridge server for a live-swapped wasm rendering module
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: hotbridge.toml)
    #[arg(short = 'C', long, default_value = "hotbridge.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile the module and generate its bindings once
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Watch the module, rebuild on change and notify running sessions
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port serving the generated artifacts
        #[arg(short, long)]
        port: Option<u16>,

        /// Port of the session WebSocket
        #[arg(long)]
        ws_port: Option<u16>,

        /// Enable file watching for auto-rebuild
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },

    /// Validate the config and report resolved paths and toolchain
    #[command(visible_alias = "c")]
    Check,
}

/// Build variant override shared by Build and Serve.
///
/// Without either flag the environment mode decides.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ProfileArgs {
    /// Build the optimized variant
    #[arg(short, long, conflicts_with = "debug")]
    pub release: bool,

    /// Build the debug variant
    #[arg(short, long)]
    pub debug: bool,
}

impl ProfileArgs {
    pub const fn profile(&self) -> Option<BuildProfile> {
        match (self.release, self.debug) {
            (true, _) => Some(BuildProfile::Release),
            (_, true) => Some(BuildProfile::Debug),
            _ => None,
        }
    }
}

#[allow(unused)]
impl Cli {
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
    pub const fn is_check(&self) -> bool {
        matches!(self.command, Commands::Check)
    }
}
