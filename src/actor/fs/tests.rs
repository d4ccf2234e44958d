use std::path::PathBuf;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tempfile::TempDir;

use super::debouncer::{BATCH_MS, Debouncer, is_temp_file};
use super::router::{events_to_messages, reconcile};
use super::types::{ChangeKind, DebouncedEvents};
use crate::actor::messages::{BuildMsg, ReloadMsg};
use crate::config::{BridgeConfig, test_open_config};
use crate::reload::ChangeClassifier;

fn make_config() -> (TempDir, BridgeConfig) {
    let temp = TempDir::new().unwrap();
    let config = test_open_config(temp.path(), "[module]\nroot = \"engine\"\n");
    std::fs::create_dir_all(&config.module.out_dir).unwrap();
    (temp, config)
}

fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn metadata_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::WriteTime,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

fn batch(entries: Vec<(PathBuf, ChangeKind)>) -> DebouncedEvents {
    DebouncedEvents(entries)
}

// ============================================================================
// Debouncer
// ============================================================================

#[test]
fn test_debouncer_empty() {
    let debouncer = Debouncer::new();
    assert!(!debouncer.is_ready());
    assert_eq!(debouncer.sleep_duration(), Duration::from_secs(86400));
}

#[test]
fn test_event_routing_by_kind() {
    let mut debouncer = Debouncer::new();

    debouncer.add_event(&make_event(vec!["/tmp/a.rs"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/b.rs"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/c.rs"], remove_kind()));

    assert_eq!(debouncer.changes.len(), 3);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/a.rs")], ChangeKind::Created);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/b.rs")], ChangeKind::Modified);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/c.rs")], ChangeKind::Removed);
}

#[test]
fn test_metadata_events_ignored() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/lib.rs"], metadata_kind()));
    assert!(debouncer.changes.is_empty());
    assert!(debouncer.last_event.is_none());
}

#[test]
fn test_temp_files_ignored() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(
        vec!["/tmp/.lib.rs.swp", "/tmp/lib.rs~", "/tmp/x.tmp", "/tmp/#lib.rs#"],
        modify_kind(),
    ));
    assert!(debouncer.changes.is_empty());

    assert!(is_temp_file(std::path::Path::new("/tmp/.hidden")));
    assert!(!is_temp_file(std::path::Path::new("/tmp/lib.rs")));
}

#[test]
fn test_dedup_rules() {
    let mut debouncer = Debouncer::new();

    // first wins
    debouncer.add_event(&make_event(vec!["/tmp/a.rs"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.rs"], modify_kind()));
    // restored
    debouncer.add_event(&make_event(vec!["/tmp/b.rs"], remove_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/b.rs"], create_kind()));
    // deleted
    debouncer.add_event(&make_event(vec!["/tmp/c.rs"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/c.rs"], remove_kind()));
    // appeared and vanished
    debouncer.add_event(&make_event(vec!["/tmp/d.rs"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/d.rs"], remove_kind()));

    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/a.rs")], ChangeKind::Created);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/b.rs")], ChangeKind::Created);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/c.rs")], ChangeKind::Removed);
    assert!(!debouncer.changes.contains_key(&PathBuf::from("/tmp/d.rs")));
}

#[test]
fn test_batch_ready_after_quiet_window() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.rs"], modify_kind()));

    assert!(!debouncer.is_ready());
    assert!(debouncer.take_if_ready().is_none());
    assert!(debouncer.sleep_duration() <= Duration::from_millis(BATCH_MS));

    std::thread::sleep(Duration::from_millis(BATCH_MS + 10));
    let taken = debouncer.take_if_ready().unwrap();
    assert_eq!(taken.len(), 1);
    assert!(debouncer.changes.is_empty());
    assert!(debouncer.take_if_ready().is_none());
}

// ============================================================================
// Reconcile
// ============================================================================

#[test]
fn test_reconcile_against_disk() {
    let temp = TempDir::new().unwrap();
    let present = temp.path().join("present.rs");
    let gone = temp.path().join("gone.rs");
    std::fs::write(&present, "fn a() {}").unwrap();

    let mut raw = FxHashMap::default();
    raw.insert(present.clone(), ChangeKind::Removed);
    raw.insert(gone.clone(), ChangeKind::Modified);
    raw.insert(temp.path().join("flash.rs"), ChangeKind::Created);
    raw.insert(temp.path().to_path_buf(), ChangeKind::Modified);

    let events = reconcile(raw).unwrap();
    assert_eq!(
        events.0,
        vec![(gone, ChangeKind::Removed), (present, ChangeKind::Modified)]
    );
}

#[test]
fn test_reconcile_empty_batch() {
    let temp = TempDir::new().unwrap();
    let mut raw = FxHashMap::default();
    raw.insert(temp.path().join("flash.rs"), ChangeKind::Created);
    assert!(reconcile(raw).is_none());
}

// ============================================================================
// Routing
// ============================================================================

#[test]
fn test_source_change_goes_to_build() {
    let (_temp, config) = make_config();
    let classifier = ChangeClassifier::from_config(&config);
    let lib = config.module.root.join("src/lib.rs");

    let routed = events_to_messages(&batch(vec![(lib.clone(), ChangeKind::Modified)]), &classifier);

    assert!(!routed.config_changed);
    assert!(routed.reload.is_none());
    match routed.build {
        Some(BuildMsg::SourceChanged(paths)) => assert_eq!(paths, vec![lib]),
        other => panic!("expected SourceChanged, got {other:?}"),
    }
}

#[test]
fn test_generated_output_never_triggers_build() {
    let (_temp, config) = make_config();
    let classifier = ChangeClassifier::from_config(&config);
    let wasm = config.module.out_dir.join("engine_bg.wasm");

    let routed = events_to_messages(&batch(vec![(wasm.clone(), ChangeKind::Modified)]), &classifier);

    assert!(routed.build.is_none());
    match routed.reload {
        Some(ReloadMsg::OutputChanged(paths)) => assert_eq!(paths, vec![wasm]),
        other => panic!("expected OutputChanged, got {other:?}"),
    }
}

#[test]
fn test_irrelevant_and_config_paths() {
    let (temp, config) = make_config();
    let classifier = ChangeClassifier::from_config(&config);

    let routed = events_to_messages(
        &batch(vec![
            (config.module.root.join("target/debug/engine.d"), ChangeKind::Modified),
            (temp.path().join("web/main.ts"), ChangeKind::Modified),
            (config.config_path.clone(), ChangeKind::Modified),
        ]),
        &classifier,
    );

    assert!(routed.config_changed);
    assert!(routed.build.is_none());
    assert!(routed.reload.is_none());
}

#[test]
fn test_mixed_batch_splits() {
    let (_temp, config) = make_config();
    let classifier = ChangeClassifier::from_config(&config);

    let routed = events_to_messages(
        &batch(vec![
            (config.module.root.join("src/lib.rs"), ChangeKind::Modified),
            (config.module.out_dir.join("engine.js"), ChangeKind::Created),
        ]),
        &classifier,
    );

    assert!(matches!(routed.build, Some(BuildMsg::SourceChanged(ref p)) if p.len() == 1));
    assert!(matches!(routed.reload, Some(ReloadMsg::OutputChanged(ref p)) if p.len() == 1));
}
