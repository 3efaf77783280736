//! `std`-backed scheduling for `imtree-core`.
//!
//! Listeners only ever leave a note on the [`StdScheduler`]; the
//! [`FrameLoop`] polls it on its own thread and runs the pass.

mod frame_loop;

pub use frame_loop::{FrameLoop, LoopConfig};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use imtree_core::{Clock, Runtime, RuntimeScheduler};

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Counts frame requests until the loop collects them.
///
/// Any number of requests between two polls collapse into one pass; the count
/// is only kept for diagnostics.
#[derive(Default)]
pub struct StdScheduler {
    pending: AtomicU64,
    waker: RwLock<Option<Waker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runtime whose dirty-flag transitions land on `scheduler`.
    pub fn runtime(scheduler: &Arc<Self>) -> Runtime {
        Runtime::new(Arc::clone(scheduler) as Arc<dyn RuntimeScheduler>)
    }

    pub fn pending_requests(&self) -> u64 {
        self.pending.load(Ordering::Acquire)
    }

    /// Returns how many requests arrived since the last call and resets the
    /// count.
    pub fn take_requests(&self) -> u64 {
        self.pending.swap(0, Ordering::AcqRel)
    }

    /// `waker` runs on whichever thread raised the request, after it has been
    /// counted.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        let mut slot = self.waker.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(waker));
    }

    pub fn clear_waker(&self) {
        let mut slot = self.waker.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let has_waker = self
            .waker
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false);
        f.debug_struct("StdScheduler")
            .field("pending", &self.pending_requests())
            .field("has_waker", &has_waker)
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_frame(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        // Clone out so the waker never runs under the lock.
        let waker = self
            .waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(wake) = waker {
            wake();
        }
    }
}

/// Monotonic wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: Instant) -> Duration {
        since.elapsed()
    }
}
