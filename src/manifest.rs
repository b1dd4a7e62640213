use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec4;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::gfx::RenderTarget;
use crate::part::{Part, PartSettings};
use crate::parts::{PulsePart, SolidPart};
use crate::registry::PartRegistry;
use crate::script::literal::parse_timestamp;

/// Demo description loaded before the script starts: playback settings and
/// the parts the script refers to by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Manifest {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub parts: Vec<PartSpec>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let xml = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::from_xml(&xml).with_context(|| format!("invalid manifest {}", path.display()))
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid manifest XML")?;
        let root = document.root_element();
        if !root.has_tag_name("demo") {
            bail!("expected <demo> root element, found <{}>", root.tag_name().name());
        }

        let settings = match root.children().find(|n| n.has_tag_name("settings")) {
            Some(node) => Settings::from_node(&node)?,
            None => Settings::default(),
        };

        let mut parts = Vec::new();
        for node in root.children().filter(|n| n.has_tag_name("part")) {
            let name = required_text(&node, "name")?;
            let part = PartSpec::from_node(name.clone(), &node)
                .with_context(|| format!("invalid part `{name}`"))?;
            parts.push(part);
        }

        Ok(Self { settings, parts })
    }

    /// Builds every declared part and registers it with its settings.
    pub fn register_parts(&self, registry: &mut PartRegistry) -> Result<usize> {
        for part in &self.parts {
            registry
                .add_boxed(part.name.clone(), part.build(), part.settings())
                .with_context(|| format!("failed to register part `{}`", part.name))?;
        }
        Ok(self.parts.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: f32,
    #[serde(default)]
    pub prune_effects: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            prune_effects: false,
        }
    }
}

impl Settings {
    fn from_node(node: &Node<'_, '_>) -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            width: parse_number(optional_text(node, "width"), defaults.width)?,
            height: parse_number(optional_text(node, "height"), defaults.height)?,
            fps: parse_number(optional_text(node, "fps"), defaults.fps)?,
            prune_effects: parse_flag(optional_text(node, "prune-effects"), defaults.prune_effects)?,
        };
        if settings.width == 0 || settings.height == 0 {
            bail!("resolution must be non-zero, got {}x{}", settings.width, settings.height);
        }
        if !(settings.fps.is_finite() && settings.fps > 0.0) {
            bail!("fps must be positive, got {}", settings.fps);
        }
        Ok(settings)
    }
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    360
}

fn default_fps() -> f32 {
    30.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    #[default]
    Solid,
    Pulse,
}

impl PartKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "solid" => Some(PartKind::Solid),
            "pulse" => Some(PartKind::Pulse),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PartKind::Solid => "solid",
            PartKind::Pulse => "pulse",
        }
    }
}

/// Part entry as written in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSpec {
    pub name: String,
    #[serde(default)]
    pub kind: PartKind,
    #[serde(default = "default_color")]
    pub color: Vec4,
    #[serde(default)]
    pub target: RenderTarget,
    #[serde(default)]
    pub clear: bool,
    #[serde(default = "default_period")]
    pub period: Millis,
}

impl PartSpec {
    fn from_node(name: String, node: &Node<'_, '_>) -> Result<Self> {
        let kind = match optional_text(node, "kind") {
            Some(kind) => {
                PartKind::parse(&kind).ok_or_else(|| anyhow!("unknown part kind `{kind}`"))?
            }
            None => PartKind::default(),
        };
        let target = match optional_text(node, "target") {
            Some(target) => RenderTarget::parse(&target)
                .ok_or_else(|| anyhow!("invalid render target `{target}`"))?,
            None => RenderTarget::default(),
        };
        let period = match optional_text(node, "period") {
            Some(period) => {
                parse_timestamp(&period).ok_or_else(|| anyhow!("invalid period `{period}`"))?
            }
            None => default_period(),
        };
        Ok(Self {
            name,
            kind,
            color: parse_color(optional_text(node, "color"), default_color())?,
            target,
            clear: parse_flag(optional_text(node, "clear"), false)?,
            period,
        })
    }

    pub fn settings(&self) -> PartSettings {
        PartSettings {
            render_target: self.target,
            clear_before_draw: self.clear,
        }
    }

    pub fn build(&self) -> Box<dyn Part> {
        match self.kind {
            PartKind::Solid => Box::new(SolidPart::new(self.color)),
            PartKind::Pulse => Box::new(PulsePart::new(self.color, self.period)),
        }
    }
}

fn default_color() -> Vec4 {
    Vec4::ONE
}

fn default_period() -> Millis {
    PulsePart::DEFAULT_PERIOD
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_number<T>(value: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value
            .parse::<T>()
            .map_err(|err| anyhow!("failed to parse `{value}`: {err}")),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref() {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(anyhow!("expected true or false, found `{other}`")),
        None => Ok(default),
    }
}

/// Parses `r g b [a]` with 0-255 components.
fn parse_color(value: Option<String>, default: Vec4) -> Result<Vec4> {
    let Some(value) = value else {
        return Ok(default);
    };
    let components = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("invalid color component `{component}`: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    match components[..] {
        [r, g, b] => Ok(Vec4::new(r, g, b, 255.0) / 255.0),
        [r, g, b, a] => Ok(Vec4::new(r, g, b, a) / 255.0),
        _ => Err(anyhow!("color needs 3 or 4 components, found {}", components.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::PartStatus;

    const SAMPLE: &str = r#"
    <demo>
        <settings>
            <width>320</width>
            <height>200</height>
            <fps>25</fps>
            <prune-effects>true</prune-effects>
        </settings>
        <part>
            <name>intro</name>
            <color>255 128 0</color>
        </part>
        <part>
            <name>glow</name>
            <kind>pulse</kind>
            <color>0 0 255 128</color>
            <target>t2</target>
            <clear>true</clear>
            <period>2s</period>
        </part>
    </demo>
    "#;

    #[test]
    fn parse_manifest_populates_settings_and_parts() {
        let manifest = Manifest::from_xml(SAMPLE).unwrap();
        assert_eq!(
            manifest.settings,
            Settings {
                width: 320,
                height: 200,
                fps: 25.0,
                prune_effects: true,
            }
        );
        assert_eq!(manifest.parts.len(), 2);

        let intro = &manifest.parts[0];
        assert_eq!(intro.kind, PartKind::Solid);
        assert_eq!(intro.color, Vec4::new(1.0, 128.0 / 255.0, 0.0, 1.0));
        assert_eq!(intro.target, RenderTarget::Framebuffer);
        assert!(!intro.clear);

        let glow = &manifest.parts[1];
        assert_eq!(glow.kind, PartKind::Pulse);
        assert_eq!(glow.color.w, 128.0 / 255.0);
        assert_eq!(glow.target, RenderTarget::Tex2);
        assert!(glow.clear);
        assert_eq!(glow.period, 2_000);
    }

    #[test]
    fn settings_default_when_absent() {
        let manifest = Manifest::from_xml("<demo/>").unwrap();
        assert_eq!(manifest.settings, Settings::default());
        assert_eq!(manifest.settings.width, 640);
        assert_eq!(manifest.settings.height, 360);
        assert_eq!(manifest.settings.fps, 30.0);
        assert!(manifest.parts.is_empty());
    }

    #[test]
    fn missing_name_is_an_error() {
        let bad = "<demo><part><kind>solid</kind></part></demo>";
        assert!(Manifest::from_xml(bad).is_err());
    }

    #[test]
    fn bad_values_are_reported() {
        for bad in [
            "<demo><part><name>a</name><kind>spiral</kind></part></demo>",
            "<demo><part><name>a</name><target>t9</target></part></demo>",
            "<demo><part><name>a</name><color>1 2</color></part></demo>",
            "<demo><part><name>a</name><clear>yes</clear></part></demo>",
            "<demo><settings><fps>0</fps></settings></demo>",
            "<scene/>",
        ] {
            assert!(Manifest::from_xml(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn manifest_survives_a_json_round_trip() {
        let manifest = Manifest::from_xml(SAMPLE).unwrap();
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"prune-effects\":true"), "{json}");
        assert!(json.contains("\"kind\":\"pulse\""), "{json}");
        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn serde_fills_the_same_defaults_as_xml() {
        let from_json: Manifest = serde_json::from_str(r#"{"parts":[{"name":"intro"}]}"#).unwrap();
        let from_xml = Manifest::from_xml("<demo><part><name>intro</name></part></demo>").unwrap();
        assert_eq!(from_json, from_xml);
        assert_eq!(from_json.parts[0].period, PulsePart::DEFAULT_PERIOD);
    }

    #[test]
    fn registered_parts_carry_their_settings() {
        let manifest = Manifest::from_xml(SAMPLE).unwrap();
        let mut registry = PartRegistry::new();
        assert_eq!(manifest.register_parts(&mut registry).unwrap(), 2);
        let glow = registry.get("glow").unwrap();
        assert_eq!(glow.settings().render_target, RenderTarget::Tex2);
        assert!(glow.settings().clear_before_draw);
        assert_eq!(glow.status(), PartStatus::Registered);
        assert!(registry.contains("intro"));
    }
}
