//! Shared utilities.
//!
//! - [`exec`]: external command builder (toolchain invocation)
//! - [`mime`]: content types for served artifacts
//! - [`path`]: filesystem path normalization

pub mod exec;
pub mod mime;
pub mod path;
