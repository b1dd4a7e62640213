use std::f64::consts::PI;

use glam::Vec4;

use crate::clock::Millis;
use crate::gfx::{BlendMode, Graphics, Quad, ShaderBinding, ShaderId, ShaderParams, TextureRef};

/// Half-open activity window `[start, start + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectWindow {
    pub start: Millis,
    pub duration: Millis,
}

impl EffectWindow {
    pub fn new(start: Millis, duration: Millis) -> Self {
        Self { start, duration }
    }

    /// Exclusive end; saturates at the end of the time range.
    pub fn end(&self) -> Millis {
        self.start.saturating_add(self.duration)
    }

    pub fn contains(&self, time: Millis) -> bool {
        self.start <= time && time < self.end()
    }

    /// Normalized position of `time` in the window; `0.0` at the start.
    pub fn progress(&self, time: Millis) -> f32 {
        if self.duration <= 0 {
            return 0.0;
        }
        ((time - self.start) as f64 / self.duration as f64) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectKind {
    Negative,
    Flash {
        color: Vec4,
    },
    /// Blends from one color (and optional texture) to another.
    Fade {
        from: Vec4,
        from_texture: Option<TextureRef>,
        to: Vec4,
        to_texture: Option<TextureRef>,
    },
    Overlay {
        texture: TextureRef,
        shader: Option<ShaderId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageEffect {
    pub window: EffectWindow,
    pub kind: EffectKind,
}

impl ImageEffect {
    pub fn new(window: EffectWindow, kind: EffectKind) -> Self {
        Self { window, kind }
    }

    /// Script name of the effect kind.
    pub fn name(&self) -> &'static str {
        match self.kind {
            EffectKind::Negative => "neg",
            EffectKind::Flash { .. } => "flash",
            EffectKind::Fade { .. } => "fade",
            EffectKind::Overlay { .. } => "overlay",
        }
    }

    pub fn is_active(&self, time: Millis) -> bool {
        self.window.contains(time)
    }

    pub fn is_expired(&self, time: Millis) -> bool {
        time >= self.window.end()
    }

    /// Draws the effect if `time` falls inside its window. Returns whether it drew.
    pub fn apply(&self, time: Millis, gfx: &mut dyn Graphics) -> bool {
        if !self.is_active(time) {
            return false;
        }
        match self.kind {
            EffectKind::Negative => {
                gfx.draw_fullscreen_quad(&Quad::fullscreen(Vec4::ONE).with_blend(BlendMode::Invert));
            }
            EffectKind::Flash { color } => {
                let opacity = flash_opacity(self.window, time);
                let color = color.truncate().extend(color.w * opacity);
                gfx.draw_fullscreen_quad(&Quad::fullscreen(color));
            }
            EffectKind::Fade {
                from,
                from_texture,
                to,
                to_texture,
            } => {
                let progress = self.window.progress(time);
                let color = fade_color(from, to, progress);
                gfx.draw_fullscreen_quad(&Quad::fullscreen(color).with_texture(from_texture));
                if to_texture.is_some() {
                    let layer = color.truncate().extend(color.w * progress);
                    gfx.draw_fullscreen_quad(&Quad::fullscreen(layer).with_texture(to_texture));
                }
            }
            EffectKind::Overlay { texture, shader } => {
                let shader = shader.map(|shader| ShaderBinding {
                    shader,
                    params: overlay_params(self.window, time),
                });
                gfx.draw_fullscreen_quad(
                    &Quad::fullscreen(Vec4::ONE)
                        .with_texture(Some(texture))
                        .with_shader(shader),
                );
            }
        }
        true
    }
}

/// Flash pulse: `cos(pi * (t - mid) / duration)`, 1 at the window midpoint
/// and 0 at both edges.
pub fn flash_opacity(window: EffectWindow, time: Millis) -> f32 {
    if window.duration <= 0 {
        return 0.0;
    }
    let mid = window.start as f64 + window.duration as f64 / 2.0;
    let phase = PI * (time as f64 - mid) / window.duration as f64;
    phase.cos().max(0.0) as f32
}

/// Linear blend `from + (to - from) * t`, channel by channel (alpha included).
pub fn fade_color(from: Vec4, to: Vec4, t: f32) -> Vec4 {
    from + (to - from) * t
}

/// Uniforms for an overlay shader at `time`.
pub fn overlay_params(window: EffectWindow, time: Millis) -> ShaderParams {
    let progress = window.progress(time);
    let ease = if (0.25..=0.75).contains(&progress) {
        1.0
    } else {
        (2.0 * std::f32::consts::PI * progress).sin().abs()
    };
    ShaderParams {
        seconds: (time - window.start) as f32 / 1000.0,
        progress,
        ease,
        ease_sin: (std::f32::consts::PI * progress).sin(),
    }
}
