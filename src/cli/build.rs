//! One-shot `hotbridge build`.

use anyhow::{Result, bail};

use crate::{
    build::{ProcessToolchain, build_now, write_raw_diagnostics},
    config::BridgeConfig,
    log,
};

/// Run both toolchain stages once.
///
/// The failing stage's diagnostics go to stderr unmodified; the command then
/// exits nonzero.
pub fn build_module(config: &BridgeConfig) -> Result<()> {
    let toolchain = ProcessToolchain::from_config(config);
    log!("build"; "{} ({})", config.artifact_name(), config.build.profile().dir_name());

    let result = build_now(config, &toolchain);
    match &result.outcome {
        Ok(artifacts) => {
            log!(
                "build";
                "{} artifact{} in {} ({}ms)",
                artifacts.len(),
                if artifacts.len() == 1 { "" } else { "s" },
                config.module.out_dir.display(),
                result.elapsed.as_millis()
            );
            Ok(())
        }
        Err(err) => {
            write_raw_diagnostics(err);
            bail!("{}", err)
        }
    }
}
