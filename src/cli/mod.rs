//! Command-line interface module.

mod args;
pub mod build;
pub mod check;
pub mod serve;

pub use args::{Cli, Commands, ProfileArgs};
