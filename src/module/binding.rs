//! The narrow surface the lifecycle depends on.
//!
//! The compiled module is an external collaborator. Hosts implement these
//! traits over whatever actually loads the generated artifacts (a JS bridge,
//! a wasm runtime, a test double).

use std::future::Future;
use std::path::PathBuf;

use super::types::{FrameTime, ModelInfo, ShaderCompiledCallback, ShaderInfo, TextureInfo};
use super::{DrawingSurface, ModuleError};

/// One instance of the compiled module.
///
/// Every method may suspend; the queue never calls two of them concurrently.
pub trait ModuleBinding: Send + 'static {
    /// Bind to `surface` and start rendering. Device negotiation happens here.
    fn run(&mut self, surface: &DrawingSurface)
    -> impl Future<Output = Result<(), ModuleError>> + Send;

    /// Release externally visible resources (device, context). The instance
    /// must not touch the surface afterwards.
    fn stop(&mut self) -> impl Future<Output = Result<(), ModuleError>> + Send;

    /// Dispose of the instance.
    fn free(self);

    fn update_models(
        &mut self,
        models: Vec<ModelInfo>,
    ) -> impl Future<Output = Result<(), ModuleError>> + Send;

    fn update_shader(
        &mut self,
        shader: ShaderInfo,
    ) -> impl Future<Output = Result<(), ModuleError>> + Send;

    fn remove_shader(&mut self, id: String)
    -> impl Future<Output = Result<(), ModuleError>> + Send;

    fn update_texture(
        &mut self,
        texture: TextureInfo,
    ) -> impl Future<Output = Result<(), ModuleError>> + Send;

    fn remove_texture(&mut self, id: String)
    -> impl Future<Output = Result<(), ModuleError>> + Send;

    fn set_on_shader_compiled(
        &mut self,
        callback: Option<ShaderCompiledCallback>,
    ) -> impl Future<Output = Result<(), ModuleError>> + Send;

    fn set_threshold_factor(
        &mut self,
        factor: f32,
    ) -> impl Future<Output = Result<(), ModuleError>> + Send;

    fn set_hot_value(&mut self, value: f32)
    -> impl Future<Output = Result<(), ModuleError>> + Send;

    fn focus_on(&mut self, position: [f32; 3])
    -> impl Future<Output = Result<(), ModuleError>> + Send;

    fn get_frame_time(&mut self) -> impl Future<Output = Result<FrameTime, ModuleError>> + Send;
}

/// Constructs module instances from a set of generated artifacts.
pub trait ModuleFactory: Send + 'static {
    type Binding: ModuleBinding;

    /// Load `artifacts` and construct (but do not run) an instance.
    fn instantiate(
        &mut self,
        artifacts: &[PathBuf],
        generation: u64,
    ) -> impl Future<Output = Result<Self::Binding, ModuleError>> + Send;
}
