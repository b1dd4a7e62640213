//! Interactive playback controls read from a line-based input (stdin).

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{info, warn};

use crate::clock::Millis;
use crate::error::ScriptError;
use crate::scheduler::Scheduler;
use crate::shared::SharedScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    TogglePause,
    SeekForward(Millis),
    SeekBack(Millis),
    Quit,
}

impl ControlAction {
    /// Parses `p`, `q`, `+<ms>` or `-<ms>` (surrounding whitespace ignored).
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        match line {
            "p" | "pause" => return Some(ControlAction::TogglePause),
            "q" | "quit" => return Some(ControlAction::Quit),
            _ => {}
        }
        if let Some(amount) = line.strip_prefix('+') {
            return amount.trim().parse().ok().map(ControlAction::SeekForward);
        }
        if let Some(amount) = line.strip_prefix('-') {
            return amount.trim().parse().ok().map(ControlAction::SeekBack);
        }
        None
    }

    /// Applies the action to the scheduler. `Quit` is left to the caller.
    pub fn apply(self, scheduler: &mut Scheduler) -> Result<(), ScriptError> {
        match self {
            ControlAction::TogglePause => {
                let clock = scheduler.clock_mut();
                if clock.is_running() {
                    clock.stop();
                } else {
                    clock.start();
                }
            }
            ControlAction::SeekForward(ms) => scheduler.seek_forward(ms),
            ControlAction::SeekBack(ms) => scheduler.seek_back(ms)?,
            ControlAction::Quit => {}
        }
        Ok(())
    }
}

/// Reads control lines until input ends, `q` arrives or `stop` is raised.
pub fn run_controls<R: BufRead>(input: R, scheduler: &SharedScheduler, stop: &AtomicBool) {
    for line in input.lines() {
        if stop.load(Ordering::Acquire) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("control input failed: {err}");
                break;
            }
        };
        let Some(action) = ControlAction::parse(&line) else {
            if !line.trim().is_empty() {
                warn!("unknown control `{}` (use p, q, +ms, -ms)", line.trim());
            }
            continue;
        };
        if action == ControlAction::Quit {
            stop.store(true, Ordering::Release);
            break;
        }
        let result = scheduler.with(|scheduler| {
            action.apply(scheduler)?;
            Ok::<_, ScriptError>(scheduler.now())
        });
        match result {
            Ok(now) => info!("{action:?} -> {now} ms"),
            Err(err) => warn!("{action:?} failed: {err}"),
        }
    }
}

/// Spawns a thread feeding stdin lines to [`run_controls`].
pub fn spawn_stdin_controls(scheduler: SharedScheduler, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        run_controls(stdin.lock(), &scheduler, &stop);
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::clock::{Clock, ManualTimeSource};
    use crate::script::ScriptSource;

    #[test]
    fn parses_control_lines() {
        assert_eq!(ControlAction::parse(" p "), Some(ControlAction::TogglePause));
        assert_eq!(ControlAction::parse("q"), Some(ControlAction::Quit));
        assert_eq!(ControlAction::parse("+250"), Some(ControlAction::SeekForward(250)));
        assert_eq!(ControlAction::parse("- 1000"), Some(ControlAction::SeekBack(1000)));
        assert_eq!(ControlAction::parse("+abc"), None);
        assert_eq!(ControlAction::parse("jump"), None);
    }

    #[test]
    fn controls_drive_the_shared_clock() {
        let time = ManualTimeSource::new();
        let mut scheduler = Scheduler::new(Clock::new(time.clone()));
        scheduler
            .load_script(ScriptSource::inline("0 END\n"))
            .unwrap();
        let shared = SharedScheduler::new(scheduler);
        let stop = AtomicBool::new(false);

        run_controls(Cursor::new("p\n+2000\nbogus\n-500\nq\n+99999\n"), &shared, &stop);

        assert!(stop.load(Ordering::Acquire));
        let scheduler = shared.lock();
        assert!(scheduler.clock().is_running());
        assert_eq!(scheduler.now(), 1_500);
    }
}
