use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Milliseconds on the virtual timeline. Negative values are legal.
pub type Millis = i64;

/// Source of wall-clock milliseconds for a [`Clock`].
pub trait TimeSource: Send {
    fn now_ms(&self) -> Millis;
}

/// Monotonic wall time measured from the moment the source was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// Hand-driven time source. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    now: Arc<AtomicI64>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: Millis) {
        self.now.store(ms, Ordering::Release);
    }

    pub fn advance(&self, ms: Millis) {
        self.now.fetch_add(ms, Ordering::AcqRel);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Running,
    Paused,
    Reset,
}

/// Resettable, pausable, seekable virtual clock.
///
/// While running, elapsed time is `now - start_mark`. While paused or freshly
/// reset it stays frozen at `stop_mark - start_mark`. Seeking moves
/// `start_mark`, so it shifts the elapsed value in every state.
pub struct Clock {
    source: Box<dyn TimeSource>,
    start_mark: Millis,
    stop_mark: Millis,
    state: ClockState,
}

impl Clock {
    pub fn new(source: impl TimeSource + 'static) -> Self {
        let now = source.now_ms();
        Self {
            source: Box::new(source),
            start_mark: now,
            stop_mark: now,
            state: ClockState::Reset,
        }
    }

    pub fn system() -> Self {
        Self::new(SystemTimeSource::new())
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn reset(&mut self) {
        let now = self.source.now_ms();
        self.start_mark = now;
        self.stop_mark = now;
        self.state = ClockState::Reset;
    }

    /// Resumes counting from the frozen value without a jump.
    pub fn start(&mut self) {
        if self.state == ClockState::Running {
            return;
        }
        let frozen = self.stop_mark - self.start_mark;
        self.start_mark = self.source.now_ms() - frozen;
        self.state = ClockState::Running;
    }

    pub fn stop(&mut self) {
        if self.state != ClockState::Running {
            return;
        }
        self.stop_mark = self.source.now_ms();
        self.state = ClockState::Paused;
    }

    pub fn seek_forward(&mut self, ms: Millis) {
        self.start_mark -= ms;
    }

    pub fn seek_back(&mut self, ms: Millis) {
        self.start_mark += ms;
    }

    pub fn elapsed_ms(&self) -> Millis {
        match self.state {
            ClockState::Running => self.source.now_ms() - self.start_mark,
            ClockState::Paused | ClockState::Reset => self.stop_mark - self.start_mark,
        }
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("state", &self.state)
            .field("elapsed_ms", &self.elapsed_ms())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_clock() -> (ManualTimeSource, Clock) {
        let source = ManualTimeSource::new();
        source.set(10_000);
        let clock = Clock::new(source.clone());
        (source, clock)
    }

    #[test]
    fn reset_clock_is_frozen_at_zero() {
        let (source, clock) = manual_clock();
        source.advance(500);
        assert_eq!(clock.state(), ClockState::Reset);
        assert_eq!(clock.elapsed_ms(), 0);
    }

    #[test]
    fn stop_and_start_do_not_jump() {
        let (source, mut clock) = manual_clock();
        clock.start();
        source.advance(300);
        clock.stop();
        assert_eq!(clock.elapsed_ms(), 300);
        source.advance(1_000);
        assert_eq!(clock.elapsed_ms(), 300);
        clock.start();
        assert_eq!(clock.elapsed_ms(), 300);
        source.advance(50);
        assert_eq!(clock.elapsed_ms(), 350);
    }

    #[test]
    fn seeking_shifts_elapsed_in_any_state() {
        let (source, mut clock) = manual_clock();
        clock.seek_forward(2_000);
        assert_eq!(clock.elapsed_ms(), 2_000);
        clock.start();
        source.advance(100);
        clock.seek_back(600);
        assert_eq!(clock.elapsed_ms(), 1_500);
    }

    #[test]
    fn seeking_back_past_zero_goes_negative() {
        let (_source, mut clock) = manual_clock();
        clock.seek_back(250);
        assert_eq!(clock.elapsed_ms(), -250);
    }

    #[test]
    fn reset_discards_progress() {
        let (source, mut clock) = manual_clock();
        clock.start();
        source.advance(700);
        clock.reset();
        assert_eq!(clock.elapsed_ms(), 0);
        assert!(!clock.is_running());
    }
}
