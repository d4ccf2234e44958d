//! FileSystem Actor
//!
//! Watches the module tree and routes debounced changes.
//! Implements the "Watcher-First" pattern: the watcher is attached before
//! the initial build, so nothing changed during that build is lost.
//!
//! Architecture:
//! ```text
//! Watcher → Debouncer (batching) → reconcile → ChangeClassifier ─┬─▶ BuildActor  (source)
//!                                                                ├─▶ ReloadActor (generated output)
//!                                                                └─▶ config reload
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use super::messages::{BuildMsg, ReloadMsg};
use super::coordinator::collect_watch_paths;
use crate::config::BridgeConfig;
use crate::reload::ChangeClassifier;

// Pure timing and deduplication.
mod debouncer;
// Batch reconciliation and routing.
mod router;
// Shared fs event types.
mod types;
// Watch root attach/re-attach lifecycle.
mod watch_roots;

#[cfg(test)]
mod tests;

use debouncer::Debouncer;
use router::{Routed, events_to_messages, log_events, reconcile};
use watch_roots::WatchRoots;

/// FileSystem Actor - watches for file changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    build_tx: mpsc::Sender<BuildMsg>,
    reload_tx: mpsc::Sender<ReloadMsg>,
    debouncer: Debouncer,
    classifier: ChangeClassifier,
}

impl FsActor {
    /// Create a new FsActor; the watcher starts immediately.
    ///
    /// Events buffer in the notify channel until [`Self::run`] drains them.
    pub fn new(
        paths: Vec<PathBuf>,
        build_tx: mpsc::Sender<BuildMsg>,
        reload_tx: mpsc::Sender<ReloadMsg>,
        config: &BridgeConfig,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        // Missing roots are re-attached once they appear
        let mut watch_roots = WatchRoots::new(paths);
        watch_roots.attach_existing(&mut watcher)?;

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            build_tx,
            reload_tx,
            debouncer: Debouncer::new(),
            classifier: ChangeClassifier::from_config(config),
        })
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            build_tx,
            reload_tx,
            mut debouncer,
            mut classifier,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // notify delivers on its own thread; bridge into the runtime
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => debouncer.add_event(&event),
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    watch_roots.maintain(&mut watcher);

                    let Some(raw) = debouncer.take_if_ready() else {
                        continue;
                    };
                    let Some(events) = reconcile(raw) else {
                        continue;
                    };
                    log_events(&events);

                    let routed = events_to_messages(&events, &classifier);
                    if routed.config_changed {
                        if let Some(config) = reload_config() {
                            classifier = ChangeClassifier::from_config(&config);
                            watch_roots.set_desired(collect_watch_paths(&config), &mut watcher);
                            if build_tx.send(BuildMsg::ConfigChanged(config)).await.is_err() {
                                break;
                            }
                        }
                    }
                    if dispatch(routed, &build_tx, &reload_tx).await.is_err() {
                        break;
                    }
                }
            }
        }
        crate::debug!("watch"; "stopped");
    }
}

/// Returns `Err(())` once a downstream actor shut down
async fn dispatch(
    routed: Routed,
    build_tx: &mpsc::Sender<BuildMsg>,
    reload_tx: &mpsc::Sender<ReloadMsg>,
) -> Result<(), ()> {
    if let Some(msg) = routed.reload {
        reload_tx.send(msg).await.map_err(|_| ())?;
    }
    if let Some(msg) = routed.build {
        build_tx.send(msg).await.map_err(|_| ())?;
    }
    Ok(())
}

/// Re-read `hotbridge.toml`. `None` when unchanged or invalid (the previous
/// config stays active in both cases).
fn reload_config() -> Option<Arc<BridgeConfig>> {
    match crate::config::reload_config() {
        Ok(true) => {
            crate::log!("config"; "reloaded hotbridge.toml");
            Some(crate::config::cfg())
        }
        Ok(false) => None,
        Err(e) => {
            crate::logger::status_error("config reload failed, keeping previous config", &format!("{e:#}"));
            None
        }
    }
}
