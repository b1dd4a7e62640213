use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;

use demosys::{
    spawn_stdin_controls, CaptureSettings, Clock, Manifest, PlaybackMode, Player, RunError,
    RunSummary, Scheduler, ScriptSource, SharedScheduler, SoftwareGraphics,
};

/// Plays a demo script against its manifest, live or as captured frames.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command script to play
    script: PathBuf,

    /// Demo manifest declaring settings and parts
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Render offline and write one PNG per frame into this directory
    #[arg(long, value_name = "DIR")]
    capture: Option<PathBuf>,

    /// Frames per second (overrides the manifest)
    #[arg(long)]
    fps: Option<f32>,

    /// Output width (overrides the manifest)
    #[arg(long)]
    width: Option<u32>,

    /// Output height (overrides the manifest)
    #[arg(long)]
    height: Option<u32>,

    /// Stop after this many frames even without END
    #[arg(long)]
    max_frames: Option<u64>,

    /// Read playback controls from stdin (p, +ms, -ms, q) in live mode
    #[arg(long)]
    controls: bool,
}

const EXIT_FAILURE: i32 = 1;
const EXIT_EXHAUSTED: i32 = 2;

fn main() {
    env_logger::init();
    match run() {
        Ok(summary) => {
            println!(
                "Rendered {} frame(s), last time {} ms",
                summary.frames, summary.last_time
            );
        }
        Err(err) => {
            eprintln!("Error: {err:?}");
            let code = match err.downcast_ref::<RunError>() {
                Some(RunError::ScriptExhausted { .. }) => EXIT_EXHAUSTED,
                _ => EXIT_FAILURE,
            };
            std::process::exit(code);
        }
    }
}

fn run() -> Result<RunSummary> {
    let cli = Cli::parse();
    let manifest = match &cli.manifest {
        Some(path) => Manifest::load(path)?,
        None => Manifest::default(),
    };
    let mut settings = manifest.settings;
    settings.width = cli.width.unwrap_or(settings.width);
    settings.height = cli.height.unwrap_or(settings.height);
    settings.fps = cli.fps.unwrap_or(settings.fps);

    println!("Loaded manifest with {} part(s)", manifest.parts.len());
    for part in &manifest.parts {
        println!(" - {} ({})", part.name, part.kind.as_str());
    }

    // Capture mode switches the working directory, so the script and its
    // assets are pinned to absolute paths first.
    let script = fs::canonicalize(&cli.script)
        .with_context(|| format!("failed to open script {}", cli.script.display()))?;
    let mut scheduler = Scheduler::new(Clock::system());
    scheduler.effects_mut().set_auto_prune(settings.prune_effects);
    manifest.register_parts(scheduler.registry_mut())?;
    scheduler
        .load_script(ScriptSource::File(script))
        .context("failed to load script")?;
    let scheduler = SharedScheduler::new(scheduler);

    let mode = match cli.capture {
        Some(out_dir) => PlaybackMode::Capture(CaptureSettings {
            out_dir,
            fps: settings.fps,
        }),
        None => PlaybackMode::Live { fps: settings.fps },
    };
    let gfx = SoftwareGraphics::new(settings.width, settings.height);
    let mut player = Player::new(scheduler.clone(), gfx, mode.clone()).with_max_frames(cli.max_frames);

    if cli.controls {
        match mode {
            // The control thread blocks on stdin and is left behind on exit.
            PlaybackMode::Live { .. } => {
                spawn_stdin_controls(scheduler, player.stop_handle());
            }
            PlaybackMode::Capture(_) => warn!("--controls is ignored in capture mode"),
        }
    }

    Ok(player.run()?)
}
