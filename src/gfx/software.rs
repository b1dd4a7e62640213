use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use glam::{Vec2, Vec4};
use log::debug;

use crate::error::GraphicsError;

use super::{
    BlendMode, Graphics, Quad, RenderTarget, ShaderId, ShaderStage, TextureId, TextureRef,
};

const TARGET_COUNT: usize = RenderTarget::Framebuffer as usize + 1;

#[derive(Debug, Clone)]
struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
}

impl Surface {
    fn filled(width: u32, height: u32, color: Vec4) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; (width as usize) * (height as usize)],
        }
    }

    /// Nearest-neighbour lookup; `uv` has its origin at the bottom-left.
    fn sample(&self, uv: Vec2) -> Vec4 {
        if self.pixels.is_empty() {
            return Vec4::ONE;
        }
        let x = ((uv.x * self.width as f32) as i64).clamp(0, self.width as i64 - 1) as usize;
        let y = (((1.0 - uv.y) * self.height as f32) as i64).clamp(0, self.height as i64 - 1)
            as usize;
        self.pixels[y * self.width as usize + x]
    }
}

/// Headless CPU rasterizer with one RGBA surface per render target.
///
/// Shaders are validated and tracked but not executed; quads that carry a
/// shader are composited with their plain color and texture.
#[derive(Debug)]
pub struct SoftwareGraphics {
    width: u32,
    height: u32,
    clear_color: Vec4,
    surfaces: Vec<Surface>,
    bound: RenderTarget,
    textures: Vec<Surface>,
    texture_paths: HashMap<PathBuf, TextureId>,
    shaders: Vec<(PathBuf, ShaderStage)>,
    frames_presented: u64,
    quads_drawn: u64,
}

impl SoftwareGraphics {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let clear_color = Vec4::new(0.0, 0.0, 0.0, 1.0);
        Self {
            width,
            height,
            clear_color,
            surfaces: (0..TARGET_COUNT)
                .map(|_| Surface::filled(width, height, clear_color))
                .collect(),
            bound: RenderTarget::Framebuffer,
            textures: Vec::new(),
            texture_paths: HashMap::new(),
            shaders: Vec::new(),
            frames_presented: 0,
            quads_drawn: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bound_target(&self) -> RenderTarget {
        self.bound
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn quads_drawn(&self) -> u64 {
        self.quads_drawn
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Reads one pixel; `y` counts rows from the top.
    pub fn pixel(&self, target: RenderTarget, x: u32, y: u32) -> Option<Vec4> {
        let surface = &self.surfaces[target as usize];
        if x >= surface.width || y >= surface.height {
            return None;
        }
        surface
            .pixels
            .get(y as usize * surface.width as usize + x as usize)
            .copied()
    }
}

impl Graphics for SoftwareGraphics {
    fn clear_framebuffer(&mut self) {
        let color = self.clear_color;
        self.surfaces[self.bound as usize].pixels.fill(color);
    }

    fn clear_depth_stencil(&mut self) {}

    fn draw_fullscreen_quad(&mut self, quad: &Quad) {
        self.quads_drawn += 1;
        if quad.max.x <= quad.min.x || quad.max.y <= quad.min.y {
            return;
        }
        let bound = self.bound as usize;
        match quad.texture {
            Some(TextureRef::Target(source)) if source == self.bound => {
                // Sampling the surface being written needs its pre-draw content.
                let snapshot = self.surfaces[bound].clone();
                composite(&mut self.surfaces[bound], quad, Some(&snapshot));
            }
            Some(TextureRef::Target(source)) => {
                let (target, texture) = split_pair(&mut self.surfaces, bound, source as usize);
                composite(target, quad, Some(texture));
            }
            Some(TextureRef::Loaded(TextureId(id))) => {
                composite(&mut self.surfaces[bound], quad, self.textures.get(id as usize));
            }
            None => composite(&mut self.surfaces[bound], quad, None),
        }
    }

    fn bind_render_target(&mut self, target: RenderTarget) {
        self.bound = target;
    }

    fn load_texture(&mut self, path: &Path) -> Result<TextureId, GraphicsError> {
        if let Some(id) = self.texture_paths.get(path) {
            return Ok(*id);
        }
        let image = image::open(path)
            .map_err(|err| GraphicsError::Texture {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        let pixels = image
            .pixels()
            .map(|p| Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0)
            .collect();
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(Surface {
            width,
            height,
            pixels,
        });
        self.texture_paths.insert(path.to_path_buf(), id);
        debug!("loaded texture {} ({width}x{height})", path.display());
        Ok(id)
    }

    fn load_shader(&mut self, path: &Path, stage: ShaderStage) -> Result<ShaderId, GraphicsError> {
        let source = fs::read_to_string(path).map_err(|err| GraphicsError::Shader {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        if source.trim().is_empty() {
            return Err(GraphicsError::Shader {
                path: path.to_path_buf(),
                reason: "shader source is empty".into(),
            });
        }
        let id = ShaderId(self.shaders.len() as u32);
        self.shaders.push((path.to_path_buf(), stage));
        debug!("loaded {stage:?} shader {}", path.display());
        Ok(id)
    }

    fn reset_state(&mut self) {
        self.bound = RenderTarget::Framebuffer;
    }

    fn present_frame(&mut self) -> Result<(), GraphicsError> {
        self.frames_presented += 1;
        Ok(())
    }

    fn capture_frame_to_file(&mut self, path: &Path) -> Result<(), GraphicsError> {
        let surface = &self.surfaces[RenderTarget::Framebuffer as usize];
        let bytes: Vec<u8> = surface
            .pixels
            .iter()
            .flat_map(|pixel| pixel.to_array())
            .map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        image::save_buffer(
            path,
            &bytes,
            surface.width,
            surface.height,
            image::ColorType::Rgba8,
        )
        .map_err(|err| GraphicsError::Capture {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }
}

/// Blends `quad` into `target`, sampling `texture` when present.
fn composite(target: &mut Surface, quad: &Quad, texture: Option<&Surface>) {
    let size = quad.max - quad.min;
    let (width, height) = (target.width, target.height);
    for row in 0..height {
        let ny = 1.0 - (row as f32 + 0.5) / height as f32;
        if ny < quad.min.y || ny > quad.max.y {
            continue;
        }
        for col in 0..width {
            let nx = (col as f32 + 0.5) / width as f32;
            if nx < quad.min.x || nx > quad.max.x {
                continue;
            }
            let index = row as usize * width as usize + col as usize;
            let dst = target.pixels[index];
            target.pixels[index] = match quad.blend {
                BlendMode::Invert => Vec4::new(1.0 - dst.x, 1.0 - dst.y, 1.0 - dst.z, dst.w),
                BlendMode::Alpha => {
                    let uv = (Vec2::new(nx, ny) - quad.min) / size;
                    let texel = texture.map(|surface| surface.sample(uv)).unwrap_or(Vec4::ONE);
                    let src = quad.color * texel;
                    let alpha = src.w.clamp(0.0, 1.0);
                    let rgb = src.truncate() * alpha + dst.truncate() * (1.0 - alpha);
                    rgb.extend(alpha + dst.w * (1.0 - alpha))
                }
            };
        }
    }
}

/// Mutable `write` and shared `read` entries of `surfaces`; the indices differ.
fn split_pair(surfaces: &mut [Surface], write: usize, read: usize) -> (&mut Surface, &Surface) {
    if write < read {
        let (low, high) = surfaces.split_at_mut(read);
        (&mut low[write], &high[0])
    } else {
        let (low, high) = surfaces.split_at_mut(write);
        (&mut high[0], &low[read])
    }
}
