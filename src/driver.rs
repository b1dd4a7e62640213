use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::clock::Millis;
use crate::error::RunError;
use crate::gfx::{Graphics, RenderTarget};
use crate::scheduler::DrainStatus;
use crate::shared::SharedScheduler;

/// Offline rendering settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub out_dir: PathBuf,
    pub fps: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackMode {
    /// Frame time comes from the scheduler clock; frames are paced to `fps`.
    Live { fps: f32 },
    /// Frame time is `frame_index * 1000 / fps`; every frame is written to disk.
    Capture(CaptureSettings),
}

impl PlaybackMode {
    pub fn fps(&self) -> f32 {
        match self {
            PlaybackMode::Live { fps } => *fps,
            PlaybackMode::Capture(settings) => settings.fps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Continue,
    /// The frame dispatched `END`.
    Finished,
    /// The script ran out of commands without `END`.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub last_time: Millis,
    /// False when the run was stopped from outside before `END`.
    pub ended: bool,
}

/// Deterministic time of a captured frame.
pub fn capture_frame_time(frame_index: u64, fps: f32) -> Millis {
    (frame_index as f64 * 1000.0 / fps as f64).floor() as Millis
}

/// Per-frame loop: drain due commands, render running parts, apply effects,
/// present, and in capture mode write the frame to disk.
pub struct Player<G> {
    scheduler: SharedScheduler,
    gfx: G,
    mode: PlaybackMode,
    frame_index: u64,
    last_time: Millis,
    max_frames: Option<u64>,
    stop: Arc<AtomicBool>,
}

impl<G: Graphics> Player<G> {
    pub fn new(scheduler: SharedScheduler, gfx: G, mode: PlaybackMode) -> Self {
        Self {
            scheduler,
            gfx,
            mode,
            frame_index: 0,
            last_time: 0,
            max_frames: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stops the run after `limit` frames even without `END`.
    pub fn with_max_frames(mut self, limit: Option<u64>) -> Self {
        self.max_frames = limit;
        self
    }

    /// Flag that ends [`run`](Self::run) after the current frame when raised.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn scheduler(&self) -> &SharedScheduler {
        &self.scheduler
    }

    pub fn graphics(&self) -> &G {
        &self.gfx
    }

    pub fn into_graphics(self) -> G {
        self.gfx
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Renders one frame and reports whether the run should go on.
    pub fn step(&mut self) -> Result<FrameStatus, RunError> {
        let status = {
            let mut scheduler = self.scheduler.lock();
            let time = match &self.mode {
                PlaybackMode::Live { .. } => scheduler.now(),
                PlaybackMode::Capture(settings) => {
                    capture_frame_time(self.frame_index, settings.fps)
                }
            };
            let report = scheduler.drain(time, &mut self.gfx)?;

            self.gfx.bind_render_target(RenderTarget::Framebuffer);
            self.gfx.clear_framebuffer();
            self.gfx.clear_depth_stencil();
            let parts = scheduler.render_parts(time, &mut self.gfx);
            let effects = scheduler.apply_effects(time, &mut self.gfx);
            debug!(
                "frame {} at {time} ms: {} command(s), {parts} part(s), {effects} effect(s)",
                self.frame_index,
                report.dispatched.len()
            );
            self.last_time = time;
            report.status
        };

        self.gfx.present_frame()?;
        if let PlaybackMode::Capture(settings) = &self.mode {
            let path = settings.out_dir.join(frame_file_name(self.frame_index));
            self.gfx.capture_frame_to_file(&path)?;
        }
        self.frame_index += 1;

        Ok(match status {
            DrainStatus::Pending => FrameStatus::Continue,
            DrainStatus::Ended => FrameStatus::Finished,
            DrainStatus::Exhausted => FrameStatus::Exhausted,
        })
    }

    /// Plays until `END`, script exhaustion, the frame limit or a stop request.
    pub fn run(&mut self) -> Result<RunSummary, RunError> {
        let fps = self.mode.fps();
        let interval = frame_interval(fps)?;
        match self.mode.clone() {
            PlaybackMode::Live { .. } => {
                self.scheduler.lock().clock_mut().start();
                let result = self.run_frames(Some(interval));
                self.scheduler.lock().clock_mut().stop();
                result
            }
            PlaybackMode::Capture(settings) => {
                fs::create_dir_all(&settings.out_dir).map_err(|source| RunError::CaptureDir {
                    path: settings.out_dir.clone(),
                    source,
                })?;
                let out_dir = fs::canonicalize(&settings.out_dir).map_err(|source| {
                    RunError::CaptureDir {
                        path: settings.out_dir.clone(),
                        source,
                    }
                })?;
                self.mode = PlaybackMode::Capture(CaptureSettings {
                    out_dir: out_dir.clone(),
                    fps,
                });
                let _cwd = WorkingDirGuard::enter(&out_dir)?;
                info!("capturing frames to {}", out_dir.display());
                self.run_frames(None)
            }
        }
    }

    fn run_frames(&mut self, pacing: Option<Duration>) -> Result<RunSummary, RunError> {
        loop {
            let started = Instant::now();
            let status = self.step()?;
            match status {
                FrameStatus::Finished => return Ok(self.summary(true)),
                FrameStatus::Exhausted => {
                    warn!("script exhausted without END after {} frame(s)", self.frame_index);
                    return Err(RunError::ScriptExhausted {
                        frames: self.frame_index,
                    });
                }
                FrameStatus::Continue => {}
            }
            if self.stop.load(Ordering::Acquire)
                || self.max_frames.is_some_and(|limit| self.frame_index >= limit)
            {
                info!("playback stopped after {} frame(s)", self.frame_index);
                return Ok(self.summary(false));
            }
            if let Some(interval) = pacing {
                if let Some(remaining) = interval.checked_sub(started.elapsed()) {
                    thread::sleep(remaining);
                }
            }
        }
    }

    fn summary(&self, ended: bool) -> RunSummary {
        RunSummary {
            frames: self.frame_index,
            last_time: self.last_time,
            ended,
        }
    }
}

/// Time between frames; rejects rates whose interval is not representable.
fn frame_interval(fps: f32) -> Result<Duration, RunError> {
    if !(fps.is_finite() && fps > 0.0) {
        return Err(RunError::InvalidFrameRate(fps));
    }
    Duration::try_from_secs_f32(1.0 / fps).map_err(|_| RunError::InvalidFrameRate(fps))
}

pub fn frame_file_name(frame_index: u64) -> String {
    format!("frame_{frame_index:05}.png")
}

/// Switches the process working directory and restores it on drop.
struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    fn enter(dir: &Path) -> Result<Self, RunError> {
        let to_err = |source| RunError::CaptureDir {
            path: dir.to_path_buf(),
            source,
        };
        let previous = env::current_dir().map_err(to_err)?;
        env::set_current_dir(dir).map_err(to_err)?;
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(err) = env::set_current_dir(&self.previous) {
            warn!(
                "failed to restore working directory {}: {err}",
                self.previous.display()
            );
        }
    }
}
