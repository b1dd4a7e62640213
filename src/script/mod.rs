//! Line-oriented demo script: keywords, literals and the lookahead reader.

mod command;
pub mod literal;
mod reader;

pub use command::{CommandKind, ScriptCommand};
pub use reader::{ReadOutcome, ScriptReader, ScriptSource};
