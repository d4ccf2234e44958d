use std::path::PathBuf;

use crate::config::BridgeConfig;
use crate::utils::path::is_under;

/// Everything the watcher has to cover for `config`.
///
/// The module root contains the ignored subtrees; their events are dropped
/// by classification rather than by not watching them.
pub(crate) fn collect_watch_paths(config: &BridgeConfig) -> Vec<PathBuf> {
    let module = &config.module;
    let mut paths = vec![module.root.clone()];

    // out_dir may live outside the module tree (e.g. in the web app)
    let _ = std::fs::create_dir_all(&module.out_dir);
    if !is_under(&module.out_dir, &module.root) {
        paths.push(module.out_dir.clone());
    }

    if config.config_path.exists() && !is_under(&config.config_path, &module.root) {
        paths.push(config.config_path.clone());
    }

    paths
}
