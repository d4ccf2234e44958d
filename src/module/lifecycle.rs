//! Creation and teardown of the single live module instance.
//!
//! The drawing surface moves *into* [`ModuleLifecycle::create_instance`] and
//! only comes back out of [`ModuleLifecycle::release_instance`]. Constructing
//! instance N+1 therefore needs instance N's teardown to have finished: there
//! is no other way to obtain the surface.

use std::path::PathBuf;
use std::sync::Arc;

use super::binding::{ModuleBinding, ModuleFactory};
use super::{DrawingSurface, LifecycleError, SessionContext};

/// A running instance together with the surface it renders into.
pub struct LiveInstance<B> {
    pub(crate) binding: B,
    surface: DrawingSurface,
    generation: u64,
}

impl<B> LiveInstance<B> {
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }
}

/// Creation failed; the surface is handed back for the next attempt.
pub struct CreateFailure {
    pub surface: DrawingSurface,
    pub error: LifecycleError,
}

/// What the session currently holds.
pub enum InstanceSlot<B> {
    Live(LiveInstance<B>),
    /// No instance (a swap failed); the surface waits for the next one.
    Vacant(DrawingSurface),
}

impl<B> InstanceSlot<B> {
    pub fn generation(&self) -> Option<u64> {
        match self {
            Self::Live(instance) => Some(instance.generation),
            Self::Vacant(_) => None,
        }
    }
}

/// Owns the factory and performs the ordered create / release / swap steps.
pub struct ModuleLifecycle<F> {
    factory: F,
    session: Arc<SessionContext>,
}

impl<F: ModuleFactory> ModuleLifecycle<F> {
    pub fn new(factory: F, session: Arc<SessionContext>) -> Self {
        Self { factory, session }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Construct and run an instance bound to `surface`.
    pub async fn create_instance(
        &mut self,
        surface: DrawingSurface,
        artifacts: &[PathBuf],
        generation: u64,
    ) -> Result<LiveInstance<F::Binding>, CreateFailure> {
        let mut binding = match self.factory.instantiate(artifacts, generation).await {
            Ok(binding) => binding,
            Err(source) => {
                return Err(CreateFailure {
                    surface,
                    error: LifecycleError::Instantiate { generation, source },
                });
            }
        };

        if let Err(source) = binding.run(&surface).await {
            // Half-started instance may hold device resources
            if let Err(e) = binding.stop().await {
                crate::debug!("module"; "stop after failed run: {}", e);
            }
            binding.free();
            return Err(CreateFailure {
                surface,
                error: LifecycleError::Instantiate { generation, source },
            });
        }

        crate::debug!("module"; "generation {} running on {:?}", generation, surface);
        Ok(LiveInstance {
            binding,
            surface,
            generation,
        })
    }

    /// Stop then free `instance`, returning its surface once teardown is done.
    pub async fn release_instance(&mut self, instance: LiveInstance<F::Binding>) -> DrawingSurface {
        let LiveInstance {
            mut binding,
            surface,
            generation,
        } = instance;

        if let Err(e) = binding.stop().await {
            // Teardown still completes; the binding is discarded regardless
            crate::log!("module"; "generation {} failed to stop cleanly: {}", generation, e);
        }
        binding.free();
        crate::debug!("module"; "generation {} released", generation);
        surface
    }

    /// Replace whatever `slot` holds with a fresh instance of `generation`.
    ///
    /// On failure the slot ends up vacant (the old instance is already gone)
    /// and the session is asked to restart.
    pub async fn swap(
        &mut self,
        slot: InstanceSlot<F::Binding>,
        artifacts: &[PathBuf],
        generation: u64,
    ) -> (InstanceSlot<F::Binding>, Result<(), LifecycleError>) {
        let surface = match slot {
            InstanceSlot::Live(instance) => self.release_instance(instance).await,
            InstanceSlot::Vacant(surface) => surface,
        };

        match self.create_instance(surface, artifacts, generation).await {
            Ok(instance) => (InstanceSlot::Live(instance), Ok(())),
            Err(CreateFailure { surface, error }) => {
                self.session.request_restart(&error.to_string());
                (InstanceSlot::Vacant(surface), Err(error))
            }
        }
    }
}
