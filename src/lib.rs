//! hotbridge - build-and-bridge server for a live-swapped wasm rendering module.
//!
//! The binary watches the module's source tree, rebuilds it with cargo and
//! wasm-bindgen, and tells running sessions whether the new artifacts can be
//! swapped in place or need a full reload. The [`module`] layer is the
//! in-session half: it owns the single live instance and serializes calls
//! and swaps against it.

pub mod actor;
pub mod build;
pub mod cli;
pub mod config;
pub mod core;
pub mod logger;
pub mod module;
pub mod reload;
pub mod utils;
