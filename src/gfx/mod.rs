//! Narrow interface to the rendering collaborator.
//!
//! The scheduler never talks to a graphics API directly. Parts and effects
//! draw through [`Graphics`], which a GPU backend or the bundled
//! [`SoftwareGraphics`] rasterizer implements.

mod software;
#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::path::Path;

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::GraphicsError;

pub use software::SoftwareGraphics;

/// Destination of a part's draw calls.
///
/// The discriminants are part of the script format: `t0`..`t3` select the
/// offscreen textures by index and `fb` selects the default framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RenderTarget {
    Tex0 = 0,
    Tex1 = 1,
    Tex2 = 2,
    Tex3 = 3,
    Framebuffer = 4,
}

impl RenderTarget {
    pub const OFFSCREEN: [RenderTarget; 4] = [
        RenderTarget::Tex0,
        RenderTarget::Tex1,
        RenderTarget::Tex2,
        RenderTarget::Tex3,
    ];

    /// Offscreen texture index, or `None` for the framebuffer.
    pub fn texture_index(self) -> Option<usize> {
        match self {
            RenderTarget::Framebuffer => None,
            other => Some(other as usize),
        }
    }

    pub fn from_texture_index(index: usize) -> Option<Self> {
        Self::OFFSCREEN.get(index).copied()
    }

    /// Parses `fb` or `t0`..`t3`.
    pub fn parse(token: &str) -> Option<Self> {
        if token == "fb" {
            return Some(RenderTarget::Framebuffer);
        }
        let digit = token.strip_prefix('t')?;
        if digit.len() != 1 {
            return None;
        }
        let index = digit.parse::<usize>().ok()?;
        Self::from_texture_index(index)
    }
}

impl Default for RenderTarget {
    fn default() -> Self {
        RenderTarget::Framebuffer
    }
}

impl fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.texture_index() {
            Some(index) => write!(f, "t{index}"),
            None => f.write_str("fb"),
        }
    }
}

/// Handle to a texture loaded through [`Graphics::load_texture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Handle to a shader loaded through [`Graphics::load_shader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Texture sampled by a quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureRef {
    /// One of the standing offscreen render targets.
    Target(RenderTarget),
    Loaded(TextureId),
}

/// Time-derived uniforms handed to an overlay shader.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShaderParams {
    pub seconds: f32,
    pub progress: f32,
    pub ease: f32,
    pub ease_sin: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderBinding {
    pub shader: ShaderId,
    pub params: ShaderParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Source-over blending weighted by the quad alpha.
    #[default]
    Alpha,
    /// Replaces the destination color with its complement.
    Invert,
}

/// A screen-aligned quad in normalized coordinates (0,0 bottom-left, 1,1 top-right).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub min: Vec2,
    pub max: Vec2,
    pub color: Vec4,
    pub texture: Option<TextureRef>,
    pub shader: Option<ShaderBinding>,
    pub blend: BlendMode,
}

impl Quad {
    /// Full-screen quad of a single color.
    pub fn fullscreen(color: Vec4) -> Self {
        Self {
            min: Vec2::ZERO,
            max: Vec2::ONE,
            color,
            texture: None,
            shader: None,
            blend: BlendMode::Alpha,
        }
    }

    pub fn with_texture(mut self, texture: Option<TextureRef>) -> Self {
        self.texture = texture;
        self
    }

    pub fn with_shader(mut self, shader: Option<ShaderBinding>) -> Self {
        self.shader = shader;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }
}

/// Rendering operations consumed by parts, effects and the playback driver.
pub trait Graphics {
    /// Clears the color of the currently bound target.
    fn clear_framebuffer(&mut self);

    fn clear_depth_stencil(&mut self);

    fn draw_fullscreen_quad(&mut self, quad: &Quad);

    fn bind_render_target(&mut self, target: RenderTarget);

    fn load_texture(&mut self, path: &Path) -> Result<TextureId, GraphicsError>;

    fn load_shader(&mut self, path: &Path, stage: ShaderStage) -> Result<ShaderId, GraphicsError>;

    /// Drops transient per-part state (lights, materials) after a part draws.
    fn reset_state(&mut self) {}

    fn present_frame(&mut self) -> Result<(), GraphicsError>;

    fn capture_frame_to_file(&mut self, path: &Path) -> Result<(), GraphicsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_target_tokens() {
        assert_eq!(RenderTarget::parse("fb"), Some(RenderTarget::Framebuffer));
        assert_eq!(RenderTarget::parse("t0"), Some(RenderTarget::Tex0));
        assert_eq!(RenderTarget::parse("t3"), Some(RenderTarget::Tex3));
        assert_eq!(RenderTarget::parse("t4"), None);
        assert_eq!(RenderTarget::parse("t"), None);
        assert_eq!(RenderTarget::parse("t01"), None);
        assert_eq!(RenderTarget::parse("FB"), None);
        assert_eq!(RenderTarget::parse("x1"), None);
    }

    #[test]
    fn render_target_ordering_is_stable() {
        assert_eq!(RenderTarget::Tex0 as u8, 0);
        assert_eq!(RenderTarget::Tex3 as u8, 3);
        assert_eq!(RenderTarget::Framebuffer as u8, 4);
        assert_eq!(RenderTarget::Tex2.texture_index(), Some(2));
        assert_eq!(RenderTarget::Framebuffer.texture_index(), None);
        assert_eq!(RenderTarget::Tex1.to_string(), "t1");
        assert_eq!(RenderTarget::Framebuffer.to_string(), "fb");
    }
}
