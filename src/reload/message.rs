//! Session Message Protocol
//!
//! JSON messages pushed to attached browser sessions over WebSocket.
//!
//! # Message Types
//!
//! - `connected`: sent once per connection
//! - `custom` / `special-update`: discard module state and reload
//! - `custom` / `module-swap`: re-instantiate the module from new artifacts
//! - `custom` / `clear-error`: the build recovered, hide the overlay
//! - `error`: build failure overlay

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::decide::ReloadEvent;

/// Event name of a full reload request.
pub const SPECIAL_UPDATE: &str = "special-update";
/// Event name of a live module swap.
pub const MODULE_SWAP: &str = "module-swap";
/// Event name that clears the error overlay.
pub const CLEAR_ERROR: &str = "clear-error";

/// URL prefix under which generated artifacts are served.
pub const ARTIFACT_PREFIX: &str = "/pkg";

/// Message sent over WebSocket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HotReloadMessage {
    /// Connection established
    Connected,

    /// Application-level event
    Custom {
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },

    /// Build failure (display overlay, keep running)
    Error { err: ErrorPayload },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

impl HotReloadMessage {
    pub fn connected() -> Self {
        Self::Connected
    }

    /// Full reload with a human-readable reason
    pub fn special_update(reason: impl Into<String>) -> Self {
        Self::Custom {
            event: SPECIAL_UPDATE.into(),
            data: Some(json!({ "reason": reason.into() })),
        }
    }

    /// Live swap of generation `generation`, artifacts given as URLs
    pub fn module_swap(generation: u64, artifact_urls: Vec<String>) -> Self {
        Self::Custom {
            event: MODULE_SWAP.into(),
            data: Some(json!({ "generation": generation, "artifacts": artifact_urls })),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            err: ErrorPayload {
                message: message.into(),
            },
        }
    }

    pub fn clear_error() -> Self {
        Self::Custom {
            event: CLEAR_ERROR.into(),
            data: None,
        }
    }

    /// Translate a coordinator event, artifact paths relative to `out_dir`
    pub fn from_event(event: &ReloadEvent, out_dir: &Path) -> Self {
        match event {
            ReloadEvent::LiveSwap {
                generation,
                artifacts,
            } => Self::module_swap(
                *generation,
                artifacts
                    .iter()
                    .filter_map(|p| artifact_url(out_dir, p))
                    .collect(),
            ),
            ReloadEvent::FullReload { reason } => Self::special_update(reason.clone()),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| format!(r#"{{"type":"custom","event":"{SPECIAL_UPDATE}"}}"#))
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}

/// `/pkg/<relative path>` for an artifact inside `out_dir`.
pub fn artifact_url(out_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(out_dir).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(format!("{ARTIFACT_PREFIX}/{}", parts.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_connected_json() {
        assert_eq!(HotReloadMessage::connected().to_json(), r#"{"type":"connected"}"#);
    }

    #[test]
    fn test_special_update_json() {
        let json = HotReloadMessage::special_update("engine.d.ts changed").to_json();
        assert_eq!(
            json,
            r#"{"type":"custom","event":"special-update","data":{"reason":"engine.d.ts changed"}}"#
        );
    }

    #[test]
    fn test_error_json() {
        let json = HotReloadMessage::error("compile stage failed").to_json();
        assert_eq!(
            json,
            r#"{"type":"error","err":{"message":"compile stage failed"}}"#
        );
    }

    #[test]
    fn test_clear_error_has_no_data() {
        let json = HotReloadMessage::clear_error().to_json();
        assert_eq!(json, r#"{"type":"custom","event":"clear-error"}"#);
        assert_eq!(
            HotReloadMessage::from_json(&json),
            Some(HotReloadMessage::clear_error())
        );
    }

    #[test]
    fn test_from_live_swap_event() {
        let out = PathBuf::from("/app/engine/pkg");
        let event = ReloadEvent::LiveSwap {
            generation: 4,
            artifacts: vec![out.join("engine.js"), out.join("snippets/a/inline0.js")],
        };

        let json = HotReloadMessage::from_event(&event, &out).to_json();
        assert_eq!(
            json,
            r#"{"type":"custom","event":"module-swap","data":{"generation":4,"artifacts":["/pkg/engine.js","/pkg/snippets/a/inline0.js"]}}"#
        );
    }

    #[test]
    fn test_artifact_url_outside_out_dir() {
        assert!(artifact_url(Path::new("/pkg"), Path::new("/other/x.js")).is_none());
    }
}
