use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::script::CommandKind;

/// Failure to open or read the command script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("unable to open script {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read script line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// Failure reported by the graphics collaborator.
#[derive(Debug, Error)]
pub enum GraphicsError {
    #[error("unable to load texture {path}: {reason}")]
    Texture { path: PathBuf, reason: String },
    #[error("unable to load shader {path}: {reason}")]
    Shader { path: PathBuf, reason: String },
    #[error("unable to capture frame to {path}: {reason}")]
    Capture { path: PathBuf, reason: String },
    #[error("unable to present frame: {0}")]
    Present(String),
}

/// Part registry contract violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("part name must not be empty")]
    EmptyName,
    #[error("no part named `{0}` is registered")]
    UnknownPart(String),
    #[error("part `{0}` is not running")]
    NotRunning(String),
}

/// Failure to build an image effect from `FX` arguments.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("unknown effect kind `{0}`")]
    UnknownKind(String),
    #[error("missing {0} argument")]
    MissingArgument(&'static str),
    #[error("invalid {what} `{value}`")]
    InvalidTime { what: &'static str, value: String },
    #[error("malformed color literal `{0}`")]
    InvalidColor(String),
    #[error("texture register `{0}` is out of range (expected t0..t3)")]
    InvalidTextureRegister(String),
    #[error("unexpected trailing argument `{0}`")]
    TrailingArgument(String),
    #[error(transparent)]
    Resource(#[from] GraphicsError),
}

/// Semantic failure of a single dispatched command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{command} expects {expected}")]
    Arity {
        command: CommandKind,
        expected: &'static str,
    },
    #[error("invalid render target `{0}` (expected fb or t0..t3)")]
    InvalidRenderTarget(String),
    #[error("invalid boolean `{0}` (expected true or false)")]
    InvalidBoolean(String),
    #[error("no handler registered for {0}")]
    NoHandler(CommandKind),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Effect(#[from] EffectError),
}

/// A command kind declared in the keyword table without a handler.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no handler registered for {0}")]
    MissingHandler(CommandKind),
}

/// Run-level failures surfaced to the embedding application.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Graphics(#[from] GraphicsError),
    #[error("script ended without an END command after {frames} frame(s)")]
    ScriptExhausted { frames: u64 },
    #[error("frame rate must be positive, got {0}")]
    InvalidFrameRate(f32),
    #[error("capture directory {path}: {source}")]
    CaptureDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
