use std::path::PathBuf;

use rustc_hash::FxHashMap;

use super::types::{ChangeKind, DebouncedEvents};
use crate::actor::messages::{BuildMsg, ReloadMsg};
use crate::reload::ChangeClassifier;

/// Where one debounced batch has to go.
#[derive(Debug, Default)]
pub(super) struct Routed {
    /// `hotbridge.toml` changed; the actor reloads config itself
    pub(super) config_changed: bool,
    pub(super) build: Option<BuildMsg>,
    pub(super) reload: Option<ReloadMsg>,
}

/// Reconcile event kinds with what is on disk now and drop directory noise.
///
/// The watcher may report stale events: Created for a file already gone
/// again, or Removed for a file an atomic save put right back.
pub(super) fn reconcile(raw: FxHashMap<PathBuf, ChangeKind>) -> Option<DebouncedEvents> {
    let mut events: Vec<_> = raw
        .into_iter()
        .filter_map(|(path, kind)| {
            let exists = path.exists();
            let kind = match kind {
                ChangeKind::Created if !exists => {
                    crate::debug!("watch"; "discard created (gone): {}", path.display());
                    return None;
                }
                ChangeKind::Modified if !exists => ChangeKind::Removed,
                ChangeKind::Removed if exists => ChangeKind::Modified,
                kind => kind,
            };
            // Directory mtime updates say nothing about the files inside
            if kind == ChangeKind::Modified && path.is_dir() {
                return None;
            }
            Some((path, kind))
        })
        .collect();

    if events.is_empty() {
        return None;
    }
    events.sort_by(|a, b| a.0.cmp(&b.0));
    Some(DebouncedEvents(events))
}

pub(super) fn log_events(events: &DebouncedEvents) {
    for (path, kind) in &events.0 {
        crate::debug!("watch"; "{}: {}", kind.label(), path.display());
    }
}

/// Classify a batch and turn it into actor messages.
///
/// Generated output never reaches the build actor: the toolchain rewrites it
/// on every build, and rebuilding on those writes would loop forever.
pub(super) fn events_to_messages(events: &DebouncedEvents, classifier: &ChangeClassifier) -> Routed {
    let classified = classifier.classify_changes(&events.paths());

    if classified.irrelevant > 0 {
        crate::debug!("watch"; "ignored {} irrelevant paths", classified.irrelevant);
    }

    Routed {
        config_changed: classified.config_changed,
        build: (!classified.source.is_empty()).then(|| BuildMsg::SourceChanged(classified.source)),
        reload: (!classified.generated.is_empty())
            .then(|| ReloadMsg::OutputChanged(classified.generated)),
    }
}
