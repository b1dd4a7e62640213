use std::path::{Path, PathBuf};

use crate::error::GraphicsError;

use super::{Graphics, Quad, RenderTarget, ShaderId, ShaderStage, TextureId};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Clear,
    ClearDepth,
    Quad(Quad),
    Bind(RenderTarget),
    Reset,
    Present,
    Capture(PathBuf),
}

/// Graphics double that records every call and fakes resource loading.
#[derive(Debug, Default)]
pub(crate) struct RecordingGraphics {
    pub calls: Vec<Call>,
    pub loaded: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

impl RecordingGraphics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes later loads of `path` fail.
    pub fn with_missing(mut self, path: impl Into<PathBuf>) -> Self {
        self.missing.push(path.into());
        self
    }

    pub fn quads(&self) -> Vec<Quad> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Quad(quad) => Some(*quad),
                _ => None,
            })
            .collect()
    }

    fn load(&mut self, path: &Path) -> Option<u32> {
        if self.missing.iter().any(|missing| missing == path) {
            return None;
        }
        self.loaded.push(path.to_path_buf());
        Some(self.loaded.len() as u32 - 1)
    }
}

impl Graphics for RecordingGraphics {
    fn clear_framebuffer(&mut self) {
        self.calls.push(Call::Clear);
    }

    fn clear_depth_stencil(&mut self) {
        self.calls.push(Call::ClearDepth);
    }

    fn draw_fullscreen_quad(&mut self, quad: &Quad) {
        self.calls.push(Call::Quad(*quad));
    }

    fn bind_render_target(&mut self, target: RenderTarget) {
        self.calls.push(Call::Bind(target));
    }

    fn load_texture(&mut self, path: &Path) -> Result<TextureId, GraphicsError> {
        self.load(path).map(TextureId).ok_or_else(|| GraphicsError::Texture {
            path: path.to_path_buf(),
            reason: "not found".into(),
        })
    }

    fn load_shader(&mut self, path: &Path, _stage: ShaderStage) -> Result<ShaderId, GraphicsError> {
        self.load(path).map(ShaderId).ok_or_else(|| GraphicsError::Shader {
            path: path.to_path_buf(),
            reason: "not found".into(),
        })
    }

    fn reset_state(&mut self) {
        self.calls.push(Call::Reset);
    }

    fn present_frame(&mut self) -> Result<(), GraphicsError> {
        self.calls.push(Call::Present);
        Ok(())
    }

    fn capture_frame_to_file(&mut self, path: &Path) -> Result<(), GraphicsError> {
        self.calls.push(Call::Capture(path.to_path_buf()));
        Ok(())
    }
}
