use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{trace, warn};

use crate::clock::Millis;
use crate::error::ScriptError;

use super::command::{CommandKind, ScriptCommand};
use super::literal::{parse_timestamp, tokenize};

const COMMENT_MARKER: char = ';';

/// Where a script comes from; kept so the script can be reopened from the top.
#[derive(Debug, Clone)]
pub enum ScriptSource {
    File(PathBuf),
    Inline(Arc<str>),
}

impl ScriptSource {
    pub fn inline(text: impl Into<Arc<str>>) -> Self {
        ScriptSource::Inline(text.into())
    }

    pub fn open(&self) -> Result<ScriptReader<Box<dyn BufRead + Send>>, ScriptError> {
        let reader: Box<dyn BufRead + Send> = match self {
            ScriptSource::File(path) => {
                let file = File::open(path).map_err(|source| ScriptError::Open {
                    path: path.clone(),
                    source,
                })?;
                Box::new(BufReader::new(file))
            }
            ScriptSource::Inline(text) => Box::new(Cursor::new(text.as_bytes().to_vec())),
        };
        Ok(ScriptReader::new(reader))
    }

    /// Directory that relative asset names in the script resolve against.
    pub fn base_dir(&self) -> Option<&Path> {
        match self {
            ScriptSource::File(path) => path.parent(),
            ScriptSource::Inline(_) => None,
        }
    }
}

/// Result of asking the reader for the next command.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Command(ScriptCommand),
    /// The next command is scheduled after the requested time; it stays buffered.
    NotYet,
    EndOfScript,
}

enum Line {
    Skip,
    Invalid(&'static str),
    Command(ScriptCommand),
}

/// Pull-based script reader with single-command lookahead.
pub struct ScriptReader<R> {
    input: R,
    buffer: String,
    line_no: usize,
    pending: Option<ScriptCommand>,
}

impl<R: BufRead> ScriptReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            buffer: String::new(),
            line_no: 0,
            pending: None,
        }
    }

    /// Number of physical lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    /// Returns the next command if it is due at `current_time`.
    ///
    /// A command scheduled later than `current_time` is kept buffered and
    /// `NotYet` is returned, so asking again with a later time yields it.
    pub fn next_command(&mut self, current_time: Millis) -> Result<ReadOutcome, ScriptError> {
        let Some(due_time) = self.peek_due_time()? else {
            return Ok(ReadOutcome::EndOfScript);
        };
        if due_time > current_time {
            return Ok(ReadOutcome::NotYet);
        }
        match self.pending.take() {
            Some(command) => Ok(ReadOutcome::Command(command)),
            None => Ok(ReadOutcome::EndOfScript),
        }
    }

    /// Due time of the buffered command, reading ahead if needed.
    pub fn peek_due_time(&mut self) -> Result<Option<Millis>, ScriptError> {
        if self.pending.is_none() {
            self.pending = self.read_command()?;
        }
        Ok(self.pending.as_ref().map(|command| command.due_time))
    }

    fn read_command(&mut self) -> Result<Option<ScriptCommand>, ScriptError> {
        loop {
            self.buffer.clear();
            let read = self
                .input
                .read_line(&mut self.buffer)
                .map_err(|source| ScriptError::Read {
                    line: self.line_no + 1,
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            match parse_line(&self.buffer, self.line_no) {
                Line::Skip => continue,
                Line::Invalid(reason) => {
                    warn!(
                        "script line {}: {reason}, skipping `{}`",
                        self.line_no,
                        self.buffer.trim_end()
                    );
                }
                Line::Command(command) => {
                    trace!("script line {}: {command}", self.line_no);
                    return Ok(Some(command));
                }
            }
        }
    }
}

fn parse_line(raw: &str, line: usize) -> Line {
    let text = match raw.find(COMMENT_MARKER) {
        Some(index) => &raw[..index],
        None => raw,
    };
    let mut tokens = tokenize(text).into_iter();
    let Some(stamp) = tokens.next() else {
        return Line::Skip;
    };
    let Some(due_time) = parse_timestamp(&stamp) else {
        return Line::Invalid("no recognizable timestamp");
    };
    let Some(keyword) = tokens.next() else {
        return Line::Invalid("missing command keyword");
    };
    let Some(kind) = CommandKind::from_keyword(&keyword) else {
        return Line::Invalid("unknown command keyword");
    };
    let args: Vec<String> = tokens.collect();
    if kind == CommandKind::End && !args.is_empty() {
        return Line::Invalid("END takes no arguments");
    }
    Line::Command(ScriptCommand {
        due_time,
        kind,
        args,
        line,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn reader(text: &str) -> ScriptReader<Cursor<Vec<u8>>> {
        ScriptReader::new(Cursor::new(text.as_bytes().to_vec()))
    }

    fn expect_command(outcome: ReadOutcome) -> ScriptCommand {
        match outcome {
            ReadOutcome::Command(command) => command,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let mut reader = reader("; header\n\n   \n0 START_PART intro ; go\n");
        let command = expect_command(reader.next_command(0).unwrap());
        assert_eq!(command.kind, CommandKind::StartPart);
        assert_eq!(command.args, vec!["intro"]);
        assert_eq!(command.line, 4);
        assert_eq!(reader.next_command(0).unwrap(), ReadOutcome::EndOfScript);
    }

    #[test]
    fn future_commands_are_not_consumed() {
        let mut reader = reader("2s end_part intro\n");
        assert_eq!(reader.next_command(0).unwrap(), ReadOutcome::NotYet);
        assert_eq!(reader.next_command(1999).unwrap(), ReadOutcome::NotYet);
        let command = expect_command(reader.next_command(2000).unwrap());
        assert_eq!(command.due_time, 2000);
        assert_eq!(command.kind, CommandKind::EndPart);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = "abc START_PART x\n\
                    100\n\
                    100 JUMP x\n\
                    100 END now\n\
                    200 set_clear intro true\n";
        let mut reader = reader(text);
        let command = expect_command(reader.next_command(500).unwrap());
        assert_eq!(command.kind, CommandKind::SetClear);
        assert_eq!(command.line, 5);
    }

    #[test]
    fn many_invalid_lines_do_not_recurse() {
        let mut text = "; filler\n".repeat(200_000);
        text.push_str("5 END\n");
        let mut reader = reader(&text);
        let command = expect_command(reader.next_command(5).unwrap());
        assert_eq!(command.kind, CommandKind::End);
    }

    #[test]
    fn dispatched_times_never_exceed_requested_time() {
        let text = "0 START_PART a\n10 END_PART a\n10 START_PART b\n35 FX neg 35 10\n90 END\n";
        let mut reader = reader(text);
        let mut seen = Vec::new();
        for now in (0..=100).step_by(7) {
            loop {
                match reader.next_command(now).unwrap() {
                    ReadOutcome::Command(command) => {
                        assert!(command.due_time <= now);
                        seen.push(command.due_time);
                    }
                    ReadOutcome::NotYet | ReadOutcome::EndOfScript => break,
                }
            }
        }
        assert_eq!(seen, vec![0, 10, 10, 35, 90]);
    }

    proptest! {
        #[test]
        fn lookahead_never_dispatches_early_and_loses_nothing(
            entries in prop::collection::vec((0i64..50, any::<bool>()), 0..40),
            steps in prop::collection::vec(1i64..60, 1..80),
        ) {
            let mut text = String::new();
            let mut expected = Vec::new();
            let mut due = 0;
            for (index, (delta, commented)) in entries.iter().enumerate() {
                due += delta;
                if *commented {
                    text.push_str("; note\n\n");
                }
                text.push_str(&format!("{due} START_PART p{index}\n"));
                expected.push((due, format!("p{index}")));
            }

            let mut reader = reader(&text);
            let mut seen = Vec::new();
            let mut now = 0;
            let drain = |reader: &mut ScriptReader<Cursor<Vec<u8>>>, now: Millis| {
                let mut batch = Vec::new();
                while let ReadOutcome::Command(command) = reader.next_command(now).unwrap() {
                    batch.push(command);
                }
                batch
            };
            for step in &steps {
                for command in drain(&mut reader, now) {
                    prop_assert!(command.due_time <= now, "{} due after {now}", command.due_time);
                    seen.push((command.due_time, command.args[0].clone()));
                }
                now += step;
            }
            seen.extend(
                drain(&mut reader, Millis::MAX)
                    .into_iter()
                    .map(|command| (command.due_time, command.args[0].clone())),
            );
            prop_assert_eq!(seen, expected);
            prop_assert_eq!(reader.next_command(Millis::MAX).unwrap(), ReadOutcome::EndOfScript);
        }
    }

    #[test]
    fn peeking_reports_the_buffered_time() {
        let mut reader = reader("750 END\n");
        assert_eq!(reader.peek_due_time().unwrap(), Some(750));
        assert_eq!(reader.peek_due_time().unwrap(), Some(750));
        expect_command(reader.next_command(750).unwrap());
        assert_eq!(reader.peek_due_time().unwrap(), None);
    }

    #[test]
    fn missing_file_fails_to_open() {
        let source = ScriptSource::File(PathBuf::from("/definitely/not/here.script"));
        assert!(matches!(source.open(), Err(ScriptError::Open { .. })));
    }
}
