//! Time-windowed full-screen image effects and the timeline that owns them.

mod effect;
mod parse;
mod timeline;

pub use effect::{fade_color, flash_opacity, overlay_params, EffectKind, EffectWindow, ImageEffect};
pub use parse::{parse_effect, AssetResolver};
pub use timeline::{EffectId, EffectTimeline};
