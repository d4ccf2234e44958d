//! Reload Module
//!
//! Decides what a running session must do when generated output changes,
//! and carries that decision to the browser.
//!
//! # Architecture
//!
//! ```text
//! FsActor ──▶ BuildActor ──▶ ReloadActor ──▶ WsActor ──▶ Browser
//!  (watch)      (cargo +      (manifest,      (broadcast)
//!               bindgen)      decision)  └──▶ in-process hosts (broadcast channel)
//! ```
//!
//! # Modules
//!
//! - `classify` - ChangeClassifier: source / generated / irrelevant
//! - `decide` - HotReloadCoordinator: live swap vs full reload
//! - `manifest` - Content hashes of generated artifacts
//! - `message` - WebSocket message protocol
//! - `server` - WebSocket acceptor

pub mod classify;
pub mod decide;
pub mod manifest;
pub mod message;
pub mod server;

pub use classify::{ChangeCategory, ChangeClassifier, ClassifiedChanges};
pub use decide::{CoordinatorPhase, HotReloadCoordinator, ReloadEvent};
pub use manifest::{ArtifactChanges, ArtifactKind, ArtifactManifest, ContentHash};
pub use message::HotReloadMessage;
