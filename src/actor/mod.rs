//! Actor System for the development server
//!
//! Message-passing concurrency for serve mode:
//!
//! ```text
//! FsActor --> BuildActor --> ReloadActor --> WsActor
//! (watch)     (cargo +       (live swap /   (broadcast)
//!              bindgen)       full reload)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - File system watcher, batching and classification
//! - `build` - Debounce schedule and off-thread builds
//! - `reload` - Live swap vs full reload decisions
//! - `ws` - WebSocket broadcast
//! - `coordinator` - Wires up and runs actors

pub mod build;
pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod reload;
pub mod ws;

pub use coordinator::Coordinator;
