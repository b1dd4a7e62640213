use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::scheduler::Scheduler;

/// Scheduler handle that can be shared with a control thread.
///
/// A single lock guards the whole scheduler, so a frame that holds the guard
/// drains and renders without another thread mutating parts or effects in
/// between.
#[derive(Debug)]
pub struct SharedScheduler {
    inner: Arc<Mutex<Scheduler>>,
}

impl Clone for SharedScheduler {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedScheduler {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            inner: Arc::new(Mutex::new(scheduler)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Scheduler> {
        self.inner.lock()
    }

    /// Runs `f` with exclusive access to the scheduler.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Scheduler) -> R,
    {
        f(&mut *self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::clock::{Clock, ManualTimeSource};

    #[test]
    fn clones_share_one_scheduler() {
        let shared = SharedScheduler::new(Scheduler::new(Clock::new(ManualTimeSource::new())));
        let remote = shared.clone();
        thread::spawn(move || remote.with(|scheduler| scheduler.seek_forward(1_500)))
            .join()
            .unwrap();
        assert_eq!(shared.lock().now(), 1_500);
    }
}
