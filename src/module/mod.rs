//! Hosting the compiled rendering module inside a session.
//!
//! - [`SessionContext`] hands out the single [`DrawingSurface`]
//! - [`ModuleLifecycle`] creates and releases instances, strictly one at a time
//! - [`CommandQueue`] serializes every call (and every swap) in submission order
//! - [`ModuleHost::start`] wires the three together for generation 0
//!
//! The module itself sits behind [`ModuleBinding`] / [`ModuleFactory`].

mod binding;
mod error;
mod host;
mod lifecycle;
mod queue;
mod surface;
mod types;


pub use binding::{ModuleBinding, ModuleFactory};
pub use error::{LifecycleError, ModuleError, OperationError};
pub use host::ModuleHost;
pub use lifecycle::{CreateFailure, InstanceSlot, LiveInstance, ModuleLifecycle};
pub use queue::CommandQueue;
pub use surface::{DrawingSurface, RestartHook, SessionContext};
pub use types::{
    CompilationMessage, CompilationMessageKind, FrameTime, MaterialInfo, ModelInfo,
    ShaderCompiledCallback, ShaderInfo, SourceLocation, TextureInfo, Transform,
};
