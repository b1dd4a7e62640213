use std::collections::HashMap;

use log::debug;

use crate::clock::Millis;
use crate::error::{CommandError, DispatchError};
use crate::fx::{parse_effect, AssetResolver, EffectTimeline};
use crate::gfx::{Graphics, RenderTarget};
use crate::registry::PartRegistry;
use crate::script::literal::parse_bool;
use crate::script::{CommandKind, ScriptCommand};

/// What the driver should do after a command was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    EndOfDemo,
}

/// Mutable scheduler state a handler may touch.
pub struct DispatchContext<'a> {
    pub registry: &'a mut PartRegistry,
    pub effects: &'a mut EffectTimeline,
    pub gfx: &'a mut dyn Graphics,
    pub assets: &'a AssetResolver,
    /// Virtual time of the frame draining the command.
    pub time: Millis,
}

pub type Handler =
    Box<dyn Fn(&ScriptCommand, &mut DispatchContext<'_>) -> Result<CommandOutcome, CommandError> + Send>;

/// Command kind to handler mapping, complete by construction.
pub struct CommandTable {
    handlers: HashMap<CommandKind, Handler>,
}

impl CommandTable {
    /// Builds a table, failing if any command kind has no handler.
    pub fn from_handlers(
        handlers: impl IntoIterator<Item = (CommandKind, Handler)>,
    ) -> Result<Self, DispatchError> {
        let handlers: HashMap<_, _> = handlers.into_iter().collect();
        if let Some(kind) = CommandKind::ALL
            .into_iter()
            .find(|kind| !handlers.contains_key(kind))
        {
            return Err(DispatchError::MissingHandler(kind));
        }
        Ok(Self { handlers })
    }

    /// The built-in handlers for every script keyword.
    pub fn standard() -> Self {
        Self::from_handlers(standard_handlers())
            .expect("standard handlers cover every command kind")
    }

    /// Replaces the handler for one command kind.
    pub fn set_handler(&mut self, kind: CommandKind, handler: Handler) {
        self.handlers.insert(kind, handler);
    }

    pub fn dispatch(
        &self,
        command: &ScriptCommand,
        ctx: &mut DispatchContext<'_>,
    ) -> Result<CommandOutcome, CommandError> {
        match self.handlers.get(&command.kind) {
            Some(handler) => handler(command, ctx),
            None => Err(CommandError::NoHandler(command.kind)),
        }
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTable")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn standard_handlers() -> Vec<(CommandKind, Handler)> {
    vec![
        (CommandKind::StartPart, Box::new(start_part) as Handler),
        (CommandKind::EndPart, Box::new(end_part) as Handler),
        (CommandKind::RenamePart, Box::new(rename_part) as Handler),
        (CommandKind::SetRenderTarget, Box::new(set_render_target) as Handler),
        (CommandKind::SetClear, Box::new(set_clear) as Handler),
        (CommandKind::End, Box::new(end) as Handler),
        (CommandKind::Effect, Box::new(effect) as Handler),
    ]
}

fn expect_args<'c>(
    command: &'c ScriptCommand,
    count: usize,
    expected: &'static str,
) -> Result<&'c [String], CommandError> {
    if command.args.len() == count {
        Ok(&command.args)
    } else {
        Err(CommandError::Arity {
            command: command.kind,
            expected,
        })
    }
}

fn start_part(
    command: &ScriptCommand,
    ctx: &mut DispatchContext<'_>,
) -> Result<CommandOutcome, CommandError> {
    let args = expect_args(command, 1, "a part name")?;
    ctx.registry.start(&args[0], ctx.time)?;
    Ok(CommandOutcome::Continue)
}

fn end_part(
    command: &ScriptCommand,
    ctx: &mut DispatchContext<'_>,
) -> Result<CommandOutcome, CommandError> {
    let args = expect_args(command, 1, "a part name")?;
    ctx.registry.stop(&args[0])?;
    Ok(CommandOutcome::Continue)
}

fn rename_part(
    command: &ScriptCommand,
    ctx: &mut DispatchContext<'_>,
) -> Result<CommandOutcome, CommandError> {
    let args = expect_args(command, 2, "a part name and a new name")?;
    ctx.registry.rename(&args[0], &args[1])?;
    Ok(CommandOutcome::Continue)
}

fn set_render_target(
    command: &ScriptCommand,
    ctx: &mut DispatchContext<'_>,
) -> Result<CommandOutcome, CommandError> {
    let args = expect_args(command, 2, "a part name and a render target")?;
    let target = RenderTarget::parse(&args[1])
        .ok_or_else(|| CommandError::InvalidRenderTarget(args[1].clone()))?;
    ctx.registry.set_render_target(&args[0], target)?;
    Ok(CommandOutcome::Continue)
}

fn set_clear(
    command: &ScriptCommand,
    ctx: &mut DispatchContext<'_>,
) -> Result<CommandOutcome, CommandError> {
    let args = expect_args(command, 2, "a part name and true|false")?;
    let clear =
        parse_bool(&args[1]).ok_or_else(|| CommandError::InvalidBoolean(args[1].clone()))?;
    ctx.registry.set_clear(&args[0], clear)?;
    Ok(CommandOutcome::Continue)
}

fn end(
    command: &ScriptCommand,
    _ctx: &mut DispatchContext<'_>,
) -> Result<CommandOutcome, CommandError> {
    expect_args(command, 0, "no arguments")?;
    Ok(CommandOutcome::EndOfDemo)
}

fn effect(
    command: &ScriptCommand,
    ctx: &mut DispatchContext<'_>,
) -> Result<CommandOutcome, CommandError> {
    let effect = parse_effect(&command.args, ctx.gfx, ctx.assets)?;
    let name = effect.name();
    let window = effect.window;
    let id = ctx.effects.add(effect);
    debug!(
        "added {name} effect {id:?} for [{}, {}) ms",
        window.start,
        window.end()
    );
    Ok(CommandOutcome::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EffectError, RegistryError};
    use crate::gfx::testing::RecordingGraphics;
    use crate::part::{FrameContext, PartStatus};

    struct Fixture {
        registry: PartRegistry,
        effects: EffectTimeline,
        gfx: RecordingGraphics,
        assets: AssetResolver,
        table: CommandTable,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = PartRegistry::new();
            registry
                .add("intro", |_: &mut dyn Graphics, _: &FrameContext| -> anyhow::Result<()> {
                    Ok(())
                })
                .unwrap();
            Self {
                registry,
                effects: EffectTimeline::new(),
                gfx: RecordingGraphics::new(),
                assets: AssetResolver::default(),
                table: CommandTable::standard(),
            }
        }

        fn run(&mut self, kind: CommandKind, args: &[&str]) -> Result<CommandOutcome, CommandError> {
            let command = ScriptCommand {
                due_time: 0,
                kind,
                args: args.iter().map(|arg| arg.to_string()).collect(),
                line: 1,
            };
            let mut ctx = DispatchContext {
                registry: &mut self.registry,
                effects: &mut self.effects,
                gfx: &mut self.gfx,
                assets: &self.assets,
                time: 320,
            };
            self.table.dispatch(&command, &mut ctx)
        }
    }

    #[test]
    fn incomplete_tables_are_rejected() {
        let mut handlers = standard_handlers();
        handlers.retain(|(kind, _)| *kind != CommandKind::SetClear);
        assert_eq!(
            CommandTable::from_handlers(handlers).err(),
            Some(DispatchError::MissingHandler(CommandKind::SetClear))
        );
    }

    #[test]
    fn start_and_end_part() {
        let mut fx = Fixture::new();
        assert_eq!(fx.run(CommandKind::StartPart, &["intro"]).unwrap(), CommandOutcome::Continue);
        assert_eq!(
            fx.registry.get("intro").unwrap().status(),
            PartStatus::Running { start_time: 320 }
        );
        fx.run(CommandKind::EndPart, &["intro"]).unwrap();
        assert!(matches!(
            fx.run(CommandKind::EndPart, &["intro"]),
            Err(CommandError::Registry(RegistryError::NotRunning(_)))
        ));
        assert!(matches!(
            fx.run(CommandKind::StartPart, &["ghost"]),
            Err(CommandError::Registry(RegistryError::UnknownPart(_)))
        ));
        assert!(matches!(
            fx.run(CommandKind::StartPart, &[]),
            Err(CommandError::Arity { .. })
        ));
    }

    #[test]
    fn render_target_tokens_are_validated() {
        let mut fx = Fixture::new();
        fx.run(CommandKind::SetRenderTarget, &["intro", "t3"]).unwrap();
        assert_eq!(
            fx.registry.get("intro").unwrap().settings().render_target,
            RenderTarget::Tex3
        );
        fx.run(CommandKind::SetRenderTarget, &["intro", "fb"]).unwrap();
        for bad in ["t4", "tex0", "framebuffer", "3"] {
            assert!(matches!(
                fx.run(CommandKind::SetRenderTarget, &["intro", bad]),
                Err(CommandError::InvalidRenderTarget(_))
            ));
        }
        assert_eq!(
            fx.registry.get("intro").unwrap().settings().render_target,
            RenderTarget::Framebuffer
        );
    }

    #[test]
    fn clear_flag_accepts_only_true_or_false() {
        let mut fx = Fixture::new();
        fx.run(CommandKind::SetClear, &["intro", "true"]).unwrap();
        assert!(fx.registry.get("intro").unwrap().settings().clear_before_draw);
        assert!(matches!(
            fx.run(CommandKind::SetClear, &["intro", "yes"]),
            Err(CommandError::InvalidBoolean(_))
        ));
        assert!(fx.registry.get("intro").unwrap().settings().clear_before_draw);
    }

    #[test]
    fn rename_requires_existing_part() {
        let mut fx = Fixture::new();
        fx.run(CommandKind::RenamePart, &["intro", "opening"]).unwrap();
        assert!(fx.registry.contains("opening"));
        assert!(fx.run(CommandKind::RenamePart, &["intro", "again"]).is_err());
    }

    #[test]
    fn effects_are_registered_or_rejected_whole() {
        let mut fx = Fixture::new();
        fx.run(CommandKind::Effect, &["flash", "0", "500"]).unwrap();
        assert_eq!(fx.effects.len(), 1);
        assert!(matches!(
            fx.run(CommandKind::Effect, &["wobble", "0", "500"]),
            Err(CommandError::Effect(EffectError::UnknownKind(_)))
        ));
        assert!(fx.run(CommandKind::Effect, &["fade", "0", "500", "<1,1>"]).is_err());
        assert_eq!(fx.effects.len(), 1);
    }

    #[test]
    fn end_stops_the_demo() {
        let mut fx = Fixture::new();
        assert_eq!(fx.run(CommandKind::End, &[]).unwrap(), CommandOutcome::EndOfDemo);
        assert!(fx.run(CommandKind::End, &["now"]).is_err());
    }

    #[test]
    fn handlers_can_be_replaced() {
        let mut fx = Fixture::new();
        fx.table.set_handler(
            CommandKind::End,
            Box::new(
                |_: &ScriptCommand,
                 _: &mut DispatchContext<'_>|
                 -> Result<CommandOutcome, CommandError> { Ok(CommandOutcome::Continue) },
            ),
        );
        assert_eq!(fx.run(CommandKind::End, &[]).unwrap(), CommandOutcome::Continue);
    }
}
