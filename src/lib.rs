//! Timeline-driven demo playback engine.
//!
//! A demo is a set of named parts plus a line-oriented command script that
//! starts, stops and reconfigures them and schedules full-screen image
//! effects against a virtual clock. Rendering goes through the narrow
//! [`gfx::Graphics`] interface so the engine runs headless in tests and in
//! offline capture; a GPU backend is left to the embedding application.

pub mod clock;
pub mod controls;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod fx;
pub mod gfx;
pub mod manifest;
pub mod part;
pub mod parts;
pub mod registry;
pub mod scheduler;
pub mod script;
pub mod shared;

pub use clock::{Clock, ClockState, ManualTimeSource, Millis, SystemTimeSource, TimeSource};
pub use controls::{run_controls, spawn_stdin_controls, ControlAction};
pub use dispatch::{CommandOutcome, CommandTable, DispatchContext, Handler};
pub use driver::{CaptureSettings, FrameStatus, PlaybackMode, Player, RunSummary};
pub use error::{
    CommandError, DispatchError, EffectError, GraphicsError, RegistryError, RunError, ScriptError,
};
pub use fx::{EffectId, EffectKind, EffectTimeline, EffectWindow, ImageEffect};
pub use gfx::{Graphics, Quad, RenderTarget, SoftwareGraphics};
pub use manifest::{Manifest, PartKind, PartSpec, Settings};
pub use part::{FrameContext, Part, PartSettings, PartStatus};
pub use parts::{PulsePart, SolidPart};
pub use registry::PartRegistry;
pub use scheduler::{DrainReport, DrainStatus, Scheduler};
pub use script::{CommandKind, ScriptCommand, ScriptReader, ScriptSource};
pub use shared::SharedScheduler;
