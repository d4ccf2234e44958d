//! Configuration section definitions.
//!
//! Each module corresponds to a section in `hotbridge.toml`:
//!
//! | Module   | TOML Section | Purpose                                  |
//! |----------|--------------|------------------------------------------|
//! | `module` | `[module]`   | Module source tree and generated output  |
//! | `build`  | `[build]`    | Debounce window, toolchain commands      |
//! | `serve`  | `[serve]`    | Artifact server and session channel      |

mod build;
mod module;
mod serve;

pub use build::{BuildProfile, BuildSectionConfig};
pub use module::ModuleConfig;
pub use serve::ServeConfig;
