use std::path::PathBuf;
use std::sync::Arc;

use super::binding::ModuleFactory;
use super::lifecycle::{CreateFailure, InstanceSlot, ModuleLifecycle};
use super::queue::CommandQueue;
use super::{LifecycleError, SessionContext};

/// Entry point for hosting the compiled module in a session.
pub struct ModuleHost;

impl ModuleHost {
    /// Acquire the session's surface, start generation 0 from `artifacts`
    /// and return the queue that serializes every later call.
    ///
    /// On failure the session's restart hook has already been invoked.
    pub async fn start<F: ModuleFactory>(
        session: Arc<SessionContext>,
        factory: F,
        artifacts: &[PathBuf],
    ) -> Result<CommandQueue, LifecycleError> {
        let surface = session.acquire_surface()?;
        let mut lifecycle = ModuleLifecycle::new(factory, Arc::clone(&session));

        match lifecycle.create_instance(surface, artifacts, 0).await {
            Ok(instance) => Ok(CommandQueue::spawn(lifecycle, InstanceSlot::Live(instance))),
            Err(CreateFailure { error, .. }) => {
                session.request_restart(&error.to_string());
                Err(error)
            }
        }
    }
}
