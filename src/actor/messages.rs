//! Actor Message Definitions
//!
//! ```text
//! FsActor --SourceChanged--> BuildActor --BuildSucceeded--> ReloadActor --Broadcast--> WsActor
//!    |                                                         ^
//!    +------------------------OutputChanged--------------------+
//! ```

use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::build::BuildError;
use crate::config::BridgeConfig;
use crate::reload::HotReloadMessage;

// =============================================================================
// BuildActor Messages
// =============================================================================

/// Messages to Build Actor
#[derive(Debug)]
pub enum BuildMsg {
    /// Module sources changed; (re)arm the debounce window
    SourceChanged(Vec<PathBuf>),
    /// `hotbridge.toml` was reloaded; rebuild right away and force a full reload
    ConfigChanged(Arc<BridgeConfig>),
    /// Build immediately, skipping the quiet window (initial build)
    BuildNow,
    /// Shutdown
    Shutdown,
}

// =============================================================================
// ReloadActor Messages
// =============================================================================

/// Messages to Reload Actor
#[derive(Debug)]
pub enum ReloadMsg {
    /// A build began writing into `out_dir`
    BuildStarted,
    /// A build finished successfully with the full artifact listing
    BuildSucceeded {
        artifacts: Vec<PathBuf>,
        out_dir: PathBuf,
        elapsed: Duration,
        /// The session reloads regardless of what changed (config reload)
        full_reload: Option<String>,
    },
    /// A build failed; the running session stays untouched
    BuildFailed(BuildError),
    /// Generated files changed on disk (our own echoes included)
    OutputChanged(Vec<PathBuf>),
    /// Shutdown
    Shutdown,
}

// =============================================================================
// WsActor Messages
// =============================================================================

/// Messages to WebSocket Actor
pub enum WsMsg {
    /// Send a protocol message to every client
    Broadcast(HotReloadMessage),
    /// Build failure overlay (also kept for clients connecting later)
    Error(String),
    /// Clear error overlay (build succeeded after a failure)
    ClearError,
    /// Add client
    AddClient(TcpStream),
    /// Shutdown
    Shutdown,
}
