//! Global config with atomic reload support.
//!
//! Uses `arc-swap` for lock-free reads and atomic config replacement.
//! This enables hot-reloading of `hotbridge.toml` during serve mode.

use crate::config::BridgeConfig;
use anyhow::Result;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::{Arc, LazyLock};

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<BridgeConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(BridgeConfig::default()));

/// Hash of the config file content the current config was loaded from.
static CONFIG_HASH: Mutex<Option<blake3::Hash>> = Mutex::new(None);

#[inline]
pub fn cfg() -> Arc<BridgeConfig> {
    CONFIG.load_full()
}

/// Reload config from disk if content changed.
///
/// Returns `Ok(true)` if config was updated, `Ok(false)` if unchanged.
/// On a parse or validation error the previous config stays active.
pub fn reload_config() -> Result<bool> {
    let c = cfg();

    let content = std::fs::read(&c.config_path)?;
    let new_hash = blake3::hash(&content);
    if *CONFIG_HASH.lock() == Some(new_hash) {
        return Ok(false);
    }

    let new_config = match c.cli {
        Some(cli) => BridgeConfig::load(cli)?,
        None => BridgeConfig::open(&c.config_path)?,
    };
    CONFIG.store(Arc::new(new_config));
    *CONFIG_HASH.lock() = Some(new_hash);

    Ok(true)
}

#[inline]
pub fn init_config(config: BridgeConfig) -> Arc<BridgeConfig> {
    if let Ok(content) = std::fs::read(&config.config_path) {
        *CONFIG_HASH.lock() = Some(blake3::hash(&content));
    }

    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}
