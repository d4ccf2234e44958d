//! Module layer errors.

use thiserror::Error;

/// Opaque failure reported by the compiled module itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ModuleError(pub String);

impl ModuleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A single queued call did not complete. Later calls are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("module rejected the call: {0}")]
    Rejected(#[from] ModuleError),

    /// The last swap left the session without a running instance.
    #[error("no live module instance")]
    NoInstance,

    #[error("command queue is shut down")]
    QueueClosed,

    /// The worker answered with a reply of the wrong kind.
    #[error("worker sent the wrong reply to `{0}`")]
    UnexpectedReply(&'static str),
}

/// Instance lifecycle failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The drawing surface was requested twice. Fatal for the session.
    #[error("drawing surface acquired twice; the session must restart")]
    SurfaceReacquired,

    #[error("module generation {generation} failed to start: {source}")]
    Instantiate {
        generation: u64,
        #[source]
        source: ModuleError,
    },

    #[error("command queue is shut down")]
    Closed,
}
