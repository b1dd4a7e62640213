use std::path::{Path, PathBuf};

use glam::Vec4;

use crate::clock::Millis;
use crate::error::EffectError;
use crate::gfx::{Graphics, RenderTarget, ShaderStage, TextureRef};
use crate::script::literal::{parse_color, parse_timestamp};

use super::effect::{EffectKind, EffectWindow, ImageEffect};

/// Resolves asset names from a script relative to the script's directory.
#[derive(Debug, Clone, Default)]
pub struct AssetResolver {
    base: Option<PathBuf>,
}

impl AssetResolver {
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    pub fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        match &self.base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Texture argument before any file is touched.
#[derive(Debug, Clone, PartialEq)]
enum TextureToken {
    Target(RenderTarget),
    File(String),
}

impl TextureToken {
    fn parse(token: &str) -> Result<Self, EffectError> {
        if let Some(register) = token.strip_prefix('t') {
            if !register.is_empty() && register.bytes().all(|b| b.is_ascii_digit()) {
                return RenderTarget::parse(token)
                    .map(TextureToken::Target)
                    .ok_or_else(|| EffectError::InvalidTextureRegister(token.to_string()));
            }
        }
        Ok(TextureToken::File(token.to_string()))
    }

    /// Like `parse`, but `0` and `-` stand for "no texture".
    fn parse_optional(token: &str) -> Result<Option<Self>, EffectError> {
        match token {
            "0" | "-" => Ok(None),
            other => Self::parse(other).map(Some),
        }
    }

    fn load(
        &self,
        gfx: &mut dyn Graphics,
        resolver: &AssetResolver,
    ) -> Result<TextureRef, EffectError> {
        match self {
            TextureToken::Target(target) => Ok(TextureRef::Target(*target)),
            TextureToken::File(name) => Ok(TextureRef::Loaded(
                gfx.load_texture(&resolver.resolve(name))?,
            )),
        }
    }
}

/// Effect description after syntax checks, before resources are loaded.
enum Draft {
    Negative,
    Flash {
        color: Vec4,
    },
    Fade {
        from: Vec4,
        from_texture: Option<TextureToken>,
        to: Vec4,
        to_texture: Option<TextureToken>,
    },
    Overlay {
        texture: TextureToken,
        shader: Option<String>,
    },
}

struct Args<'a> {
    tokens: std::iter::Peekable<std::slice::Iter<'a, String>>,
}

impl<'a> Args<'a> {
    fn new(tokens: &'a [String]) -> Self {
        Self {
            tokens: tokens.iter().peekable(),
        }
    }

    fn next(&mut self) -> Option<&'a str> {
        self.tokens.next().map(String::as_str)
    }

    fn require(&mut self, what: &'static str) -> Result<&'a str, EffectError> {
        self.next().ok_or(EffectError::MissingArgument(what))
    }

    fn time(&mut self, what: &'static str) -> Result<Millis, EffectError> {
        let token = self.require(what)?;
        parse_timestamp(token).ok_or_else(|| EffectError::InvalidTime {
            what,
            value: token.to_string(),
        })
    }

    fn color(&mut self, what: &'static str) -> Result<Vec4, EffectError> {
        let token = self.require(what)?;
        parse_color(token).ok_or_else(|| EffectError::InvalidColor(token.to_string()))
    }

    /// Consumes the next token unless it is a color literal.
    fn optional_texture(&mut self) -> Result<Option<TextureToken>, EffectError> {
        match self.tokens.peek() {
            Some(token) if !token.starts_with('<') => {
                let token = self.require("texture")?;
                TextureToken::parse_optional(token)
            }
            _ => Ok(None),
        }
    }

    fn finish(mut self) -> Result<(), EffectError> {
        match self.next() {
            Some(extra) => Err(EffectError::TrailingArgument(extra.to_string())),
            None => Ok(()),
        }
    }
}

/// Builds an effect from `FX` arguments: `<kind> <start> <duration> ...`.
///
/// Sub-schemas after the window:
/// - `neg`
/// - `flash [color]`
/// - `fade <color1> [texture1] <color2> [texture2]`
/// - `overlay <texture> [shader]`
///
/// All arguments are validated before any texture or shader is loaded.
pub fn parse_effect(
    args: &[String],
    gfx: &mut dyn Graphics,
    resolver: &AssetResolver,
) -> Result<ImageEffect, EffectError> {
    let mut args = Args::new(args);
    let kind = args.require("effect kind")?;
    let kind = kind.to_ascii_lowercase();
    if !matches!(kind.as_str(), "neg" | "flash" | "fade" | "overlay") {
        return Err(EffectError::UnknownKind(kind));
    }
    let start = args.time("start time")?;
    let duration = args.time("duration")?;
    if duration == 0 {
        return Err(EffectError::InvalidTime {
            what: "duration",
            value: "0".into(),
        });
    }
    if start.checked_add(duration).is_none() {
        return Err(EffectError::InvalidTime {
            what: "effect window",
            value: format!("{start}+{duration}"),
        });
    }
    let window = EffectWindow::new(start, duration);

    let draft = match kind.as_str() {
        "neg" => Draft::Negative,
        "flash" => {
            let color = match args.next() {
                Some(token) => {
                    parse_color(token).ok_or_else(|| EffectError::InvalidColor(token.to_string()))?
                }
                None => Vec4::ONE,
            };
            Draft::Flash { color }
        }
        "fade" => {
            let from = args.color("first color")?;
            let from_texture = args.optional_texture()?;
            let to = args.color("second color")?;
            let to_texture = args.optional_texture()?;
            Draft::Fade {
                from,
                from_texture,
                to,
                to_texture,
            }
        }
        _ => {
            let texture = TextureToken::parse(args.require("texture")?)?;
            let shader = args.next().map(str::to_string);
            Draft::Overlay { texture, shader }
        }
    };
    args.finish()?;

    let kind = match draft {
        Draft::Negative => EffectKind::Negative,
        Draft::Flash { color } => EffectKind::Flash { color },
        Draft::Fade {
            from,
            from_texture,
            to,
            to_texture,
        } => EffectKind::Fade {
            from,
            from_texture: from_texture
                .map(|token| token.load(gfx, resolver))
                .transpose()?,
            to,
            to_texture: to_texture
                .map(|token| token.load(gfx, resolver))
                .transpose()?,
        },
        Draft::Overlay { texture, shader } => EffectKind::Overlay {
            texture: texture.load(gfx, resolver)?,
            shader: shader
                .map(|name| gfx.load_shader(&resolver.resolve(&name), ShaderStage::Fragment))
                .transpose()?,
        },
    };
    Ok(ImageEffect::new(window, kind))
}
