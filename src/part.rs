use anyhow::Result;

use crate::clock::Millis;
use crate::gfx::{Graphics, RenderTarget};

/// Timing handed to a part on every frame it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    /// Virtual time of the frame.
    pub time: Millis,
    /// Time since the part was last started.
    pub elapsed: Millis,
}

/// A named rendering segment that can be started and stopped by the script.
///
/// Implementations only draw; target binding and clearing are handled by the
/// registry around each call.
pub trait Part: Send {
    fn render(&mut self, gfx: &mut dyn Graphics, frame: &FrameContext) -> Result<()>;
}

impl<F> Part for F
where
    F: FnMut(&mut dyn Graphics, &FrameContext) -> Result<()> + Send,
{
    fn render(&mut self, gfx: &mut dyn Graphics, frame: &FrameContext) -> Result<()> {
        self(gfx, frame)
    }
}

/// Scheduler-owned settings of a registered part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartSettings {
    pub render_target: RenderTarget,
    pub clear_before_draw: bool,
}

/// Lifecycle position of a part name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartStatus {
    Registered,
    Running { start_time: Millis },
}

impl PartStatus {
    pub fn is_running(self) -> bool {
        matches!(self, PartStatus::Running { .. })
    }
}
