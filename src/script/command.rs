use std::fmt;

use crate::clock::Millis;

/// Command keywords understood by the script reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    StartPart,
    EndPart,
    RenamePart,
    SetRenderTarget,
    SetClear,
    End,
    Effect,
}

impl CommandKind {
    pub const ALL: [CommandKind; 7] = [
        CommandKind::StartPart,
        CommandKind::EndPart,
        CommandKind::RenamePart,
        CommandKind::SetRenderTarget,
        CommandKind::SetClear,
        CommandKind::End,
        CommandKind::Effect,
    ];

    /// Resolves a keyword, ignoring ASCII case.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let kind = match keyword.to_ascii_uppercase().as_str() {
            "START_PART" => CommandKind::StartPart,
            "END_PART" => CommandKind::EndPart,
            "RENAME_PART" => CommandKind::RenamePart,
            "SET_RTARGET" => CommandKind::SetRenderTarget,
            "SET_CLEAR" => CommandKind::SetClear,
            "END" => CommandKind::End,
            "FX" => CommandKind::Effect,
            _ => return None,
        };
        Some(kind)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            CommandKind::StartPart => "START_PART",
            CommandKind::EndPart => "END_PART",
            CommandKind::RenamePart => "RENAME_PART",
            CommandKind::SetRenderTarget => "SET_RTARGET",
            CommandKind::SetClear => "SET_CLEAR",
            CommandKind::End => "END",
            CommandKind::Effect => "FX",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One parsed script line. Immutable once produced by the reader.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCommand {
    pub due_time: Millis,
    pub kind: CommandKind,
    pub args: Vec<String>,
    /// 1-based source line, for diagnostics.
    pub line: usize,
}

impl ScriptCommand {
    /// First argument: the part or effect the command addresses.
    pub fn target_name(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

impl fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.due_time, self.kind)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
