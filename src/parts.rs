//! Built-in part variants that can be declared in a demo manifest.

use std::f32::consts::TAU;

use anyhow::Result;
use glam::Vec4;

use crate::clock::Millis;
use crate::gfx::{Graphics, Quad};
use crate::part::{FrameContext, Part};

/// Fills its target with a constant color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidPart {
    pub color: Vec4,
}

impl SolidPart {
    pub fn new(color: Vec4) -> Self {
        Self { color }
    }
}

impl Part for SolidPart {
    fn render(&mut self, gfx: &mut dyn Graphics, _frame: &FrameContext) -> Result<()> {
        gfx.draw_fullscreen_quad(&Quad::fullscreen(self.color));
        Ok(())
    }
}

/// Color whose brightness oscillates with `period`, measured from the
/// part's own start time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulsePart {
    pub color: Vec4,
    pub period: Millis,
}

impl PulsePart {
    pub const DEFAULT_PERIOD: Millis = 1_000;

    pub fn new(color: Vec4, period: Millis) -> Self {
        Self { color, period }
    }

    pub fn brightness(&self, elapsed: Millis) -> f32 {
        if self.period <= 0 {
            return 1.0;
        }
        let phase = elapsed as f32 / self.period as f32;
        0.5 + 0.5 * (TAU * phase).sin()
    }
}

impl Part for PulsePart {
    fn render(&mut self, gfx: &mut dyn Graphics, frame: &FrameContext) -> Result<()> {
        let level = self.brightness(frame.elapsed);
        let color = (self.color.truncate() * level).extend(self.color.w);
        gfx.draw_fullscreen_quad(&Quad::fullscreen(color));
        Ok(())
    }
}
