//! Payloads exchanged with the compiled module.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Placement of a model in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    /// Euler angles in radians.
    pub rotation: [f32; 3],
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialInfo {
    pub color: [f32; 3],
    pub emissive: [f32; 3],
    pub roughness: f32,
    pub metallic: f32,
    pub diffuse_texture: Option<String>,
    pub texture_scale: [f32; 2],
}

impl Default for MaterialInfo {
    fn default() -> Self {
        Self {
            color: [1.0; 3],
            emissive: [0.0; 3],
            roughness: 0.5,
            metallic: 0.0,
            diffuse_texture: None,
            texture_scale: [1.0; 2],
        }
    }
}

/// One model of the scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub transform: Transform,
    pub material: MaterialInfo,
    pub shader_id: String,
    pub instance_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderInfo {
    pub id: String,
    pub label: String,
    pub code: String,
}

/// Decoded RGBA8 texture.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureInfo {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl fmt::Debug for TextureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureInfo")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data", &format_args!("[{} bytes]", self.data.len()))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilationMessageKind {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line_number: u32,
    pub line_position: u32,
    pub offset: u32,
    pub length: u32,
}

/// Shader compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationMessage {
    pub message: String,
    pub kind: CompilationMessageKind,
    pub location: Option<SourceLocation>,
}

/// Called with a shader id and its diagnostics after every compile.
pub type ShaderCompiledCallback = Arc<dyn Fn(&str, &[CompilationMessage]) + Send + Sync>;

/// Frame timing averages, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameTime {
    pub avg_delta_time: f32,
    pub avg_gpu_time: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_debug_hides_bytes() {
        let texture = TextureInfo {
            id: "albedo".into(),
            width: 2,
            height: 2,
            data: vec![255; 16],
        };
        let debug = format!("{texture:?}");
        assert!(debug.contains("[16 bytes]"));
        assert!(!debug.contains("255"));
    }

    #[test]
    fn test_compilation_message_json() {
        let message = CompilationMessage {
            message: "unknown identifier `colr`".into(),
            kind: CompilationMessageKind::Error,
            location: Some(SourceLocation {
                line_number: 3,
                line_position: 9,
                offset: 41,
                length: 4,
            }),
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains(r#""kind":"error""#));
    }
}
