//! `hotbridge check`: resolved configuration and toolchain report.

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::{
    build::{bindgen_command, compile_command, compiled_wasm_path},
    config::{BridgeConfig, ConfigDiagnostics},
    log,
};

/// Print what `serve` would watch, run and produce.
///
/// Loading already rejected an invalid config, so only warnings remain here.
pub fn check_project(config: &BridgeConfig) -> Result<()> {
    let profile = config.build.profile();

    log!("check"; "config   {}", config.config_path.display());
    log!("check"; "root     {}", config.module.root.display());
    log!("check"; "out_dir  {}", config.module.out_dir.display());
    for ignored in &config.module.ignore {
        log!("check"; "ignore   {}", ignored.display());
    }
    log!("check"; "artifact {} ({})", config.artifact_name(), profile.dir_name());
    log!("check"; "wasm     {}", compiled_wasm_path(config, profile).display());

    for command in [
        compile_command(config, profile),
        bindgen_command(config, profile),
    ] {
        let program = command.argv.first().map(String::as_str).unwrap_or_default();
        let found = which::which(program).is_ok();
        let mark = if found {
            "✓".green().to_string()
        } else {
            "✗".red().to_string()
        };
        log!("check"; "{} {}: {}", mark, command.stage, command.display());
    }

    let mut diag = ConfigDiagnostics::new();
    config.collect_diagnostics(&mut diag);
    if diag.warnings().is_empty() {
        log!("check"; "ok");
    } else {
        log!("check"; "ok with {} warning(s)", diag.warnings().len());
    }
    Ok(())
}
