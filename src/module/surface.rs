//! Session context and the drawing surface it hands out once.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::LifecycleError;

/// Invoked with a reason when the session must be restarted from scratch.
pub type RestartHook = Box<dyn Fn(&str) + Send + Sync>;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// The single graphical output target of a session.
///
/// Neither `Clone` nor `Copy`: whoever holds it owns the
/// surface, and a module instance only gets it by value.
pub struct DrawingSurface {
    session_id: u64,
    target: String,
    width: u32,
    height: u32,
}

impl DrawingSurface {
    pub const fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Host-side name of the target (e.g. a canvas element id).
    pub fn target(&self) -> &str {
        &self.target
    }

    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl fmt::Debug for DrawingSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DrawingSurface(#{} {} {}x{})",
            self.session_id, self.target, self.width, self.height
        )
    }
}

/// Per-session state, owned explicitly instead of living in globals.
pub struct SessionContext {
    id: u64,
    target: String,
    width: u32,
    height: u32,
    surface_issued: AtomicBool,
    restart: RestartHook,
}

impl SessionContext {
    /// A session rendering into `target`. Restart requests are logged until
    /// a hook is installed with [`Self::with_restart_hook`].
    pub fn new(target: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            target: target.into(),
            width,
            height,
            surface_issued: AtomicBool::new(false),
            restart: Box::new(|reason| crate::log!("error"; "session restart required: {}", reason)),
        }
    }

    pub fn with_restart_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.restart = Box::new(hook);
        self
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Hand out the drawing surface. Succeeds exactly once per session.
    ///
    /// A second call means two owners would share a surface the module
    /// assumes is exclusive; the session is restarted instead.
    pub fn acquire_surface(&self) -> Result<DrawingSurface, LifecycleError> {
        if self.surface_issued.swap(true, Ordering::SeqCst) {
            self.request_restart("drawing surface acquired twice");
            return Err(LifecycleError::SurfaceReacquired);
        }
        Ok(DrawingSurface {
            session_id: self.id,
            target: self.target.clone(),
            width: self.width,
            height: self.height,
        })
    }

    pub fn surface_issued(&self) -> bool {
        self.surface_issued.load(Ordering::SeqCst)
    }

    /// Ask the host to restart the whole session.
    pub fn request_restart(&self, reason: &str) {
        crate::debug!("module"; "session #{} restart: {}", self.id, reason);
        (self.restart)(reason);
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("surface_issued", &self.surface_issued())
            .finish_non_exhaustive()
    }
}
