use std::io::BufRead;

use log::{debug, error, info, warn};

use crate::clock::{Clock, Millis};
use crate::dispatch::{CommandOutcome, CommandTable, DispatchContext};
use crate::error::{CommandError, EffectError, ScriptError};
use crate::fx::{AssetResolver, EffectTimeline};
use crate::gfx::Graphics;
use crate::registry::PartRegistry;
use crate::script::{CommandKind, ReadOutcome, ScriptReader, ScriptSource};

/// How a drain pass stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// The next command is scheduled later.
    Pending,
    /// An `END` command was dispatched.
    Ended,
    /// The script ran out of lines without an `END`.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub due_time: Millis,
    pub kind: CommandKind,
    pub succeeded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub dispatched: Vec<DispatchRecord>,
    pub status: DrainStatus,
}

impl DrainReport {
    pub fn failures(&self) -> usize {
        self.dispatched.iter().filter(|record| !record.succeeded).count()
    }
}

type Reader = ScriptReader<Box<dyn BufRead + Send>>;

/// Owns every piece of demo state: the clock, the parts, the effects and the
/// script being played.
pub struct Scheduler {
    clock: Clock,
    registry: PartRegistry,
    effects: EffectTimeline,
    table: CommandTable,
    source: Option<ScriptSource>,
    script: Option<Reader>,
    assets: AssetResolver,
    ended: bool,
}

impl Scheduler {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            registry: PartRegistry::new(),
            effects: EffectTimeline::new(),
            table: CommandTable::standard(),
            source: None,
            script: None,
            assets: AssetResolver::default(),
            ended: false,
        }
    }

    pub fn with_table(mut self, table: CommandTable) -> Self {
        self.table = table;
        self
    }

    /// Opens a script for playback and resets the clock.
    ///
    /// On failure the previous script, if any, stays loaded.
    pub fn load_script(&mut self, source: ScriptSource) -> Result<(), ScriptError> {
        let reader = source.open()?;
        self.assets = AssetResolver::new(source.base_dir());
        self.script = Some(reader);
        self.source = Some(source);
        self.ended = false;
        self.clock.reset();
        info!("script loaded; clock reset");
        Ok(())
    }

    /// Reopens the current script from its first line without touching the
    /// clock. Running parts are stopped and effects cleared so that the next
    /// drain replays every command up to the current time.
    pub fn restart_script(&mut self) -> Result<(), ScriptError> {
        let Some(source) = &self.source else {
            return Ok(());
        };
        self.script = Some(source.open()?);
        self.registry.stop_all();
        self.effects.clear();
        self.ended = false;
        debug!("script restarted at {} ms", self.clock.elapsed_ms());
        Ok(())
    }

    pub fn has_script(&self) -> bool {
        self.script.is_some()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Current clock time.
    pub fn now(&self) -> Millis {
        self.clock.elapsed_ms()
    }

    pub fn registry(&self) -> &PartRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PartRegistry {
        &mut self.registry
    }

    pub fn effects(&self) -> &EffectTimeline {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectTimeline {
        &mut self.effects
    }

    pub fn seek_forward(&mut self, ms: Millis) {
        self.clock.seek_forward(ms);
    }

    /// Moves the clock back and replays the script up to the new time.
    pub fn seek_back(&mut self, ms: Millis) -> Result<(), ScriptError> {
        self.clock.seek_back(ms);
        self.restart_script()
    }

    /// Dispatches every command due at `time`.
    ///
    /// Command failures are logged and do not stop the drain. Draining halts
    /// after an `END` command; later calls report `Ended` without reading.
    pub fn drain(
        &mut self,
        time: Millis,
        gfx: &mut dyn Graphics,
    ) -> Result<DrainReport, ScriptError> {
        let mut dispatched = Vec::new();
        if self.ended {
            return Ok(DrainReport {
                dispatched,
                status: DrainStatus::Ended,
            });
        }
        let Some(script) = self.script.as_mut() else {
            return Ok(DrainReport {
                dispatched,
                status: DrainStatus::Exhausted,
            });
        };

        let status = loop {
            let command = match script.next_command(time)? {
                ReadOutcome::Command(command) => command,
                ReadOutcome::NotYet => break DrainStatus::Pending,
                ReadOutcome::EndOfScript => break DrainStatus::Exhausted,
            };
            let mut ctx = DispatchContext {
                registry: &mut self.registry,
                effects: &mut self.effects,
                gfx: &mut *gfx,
                assets: &self.assets,
                time,
            };
            let result = self.table.dispatch(&command, &mut ctx);
            dispatched.push(DispatchRecord {
                due_time: command.due_time,
                kind: command.kind,
                succeeded: result.is_ok(),
            });
            match result {
                Ok(CommandOutcome::Continue) => {
                    debug!("{time} ms: dispatched `{command}`");
                }
                Ok(CommandOutcome::EndOfDemo) => {
                    info!("{time} ms: END reached on line {}", command.line);
                    self.ended = true;
                    break DrainStatus::Ended;
                }
                Err(err @ CommandError::Effect(EffectError::Resource(_))) => {
                    error!("line {}: `{command}` failed: {err}", command.line);
                }
                Err(err) => {
                    warn!("line {}: `{command}` failed: {err}", command.line);
                }
            }
        };
        Ok(DrainReport { dispatched, status })
    }

    /// Renders the running parts; see [`PartRegistry::render_running`].
    pub fn render_parts(&mut self, time: Millis, gfx: &mut dyn Graphics) -> usize {
        self.registry.render_running(time, gfx)
    }

    pub fn apply_effects(&mut self, time: Millis, gfx: &mut dyn Graphics) -> usize {
        self.effects.apply(time, gfx)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("clock", &self.clock)
            .field("registry", &self.registry)
            .field("effects", &self.effects)
            .field("source", &self.source)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}
