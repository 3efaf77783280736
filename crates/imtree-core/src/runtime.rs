use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::platform::RuntimeScheduler;

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    dirty: Cell<bool>,
    frame: Cell<u64>,
    in_pass: Cell<bool>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            // The very first pass always runs.
            dirty: Cell::new(true),
            frame: Cell::new(0),
            in_pass: Cell::new(false),
        }
    }

    fn request_rerender(&self) {
        self.dirty.set(true);
        self.scheduler.schedule_frame();
    }

    fn begin_pass(&self) -> u64 {
        assert!(
            !self.in_pass.replace(true),
            "a reconciliation pass is already in progress on this runtime"
        );
        let frame = self.frame.get() + 1;
        self.frame.set(frame);
        self.dirty.set(false);
        frame
    }
}

/// Shared state between a reconciler and the native listeners it installs:
/// the dirty flag, the frame counter and the host scheduler.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Number of the most recently started pass; 0 before the first one.
    pub fn frame(&self) -> u64 {
        self.inner.frame.get()
    }

    pub fn is_in_pass(&self) -> bool {
        self.inner.in_pass.get()
    }

    pub fn request_rerender(&self) {
        self.inner.request_rerender();
    }

    pub(crate) fn begin_pass(&self) -> u64 {
        self.inner.begin_pass()
    }

    pub(crate) fn end_pass(&self) {
        self.inner.in_pass.set(false);
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("dirty", &self.is_dirty())
            .field("frame", &self.frame())
            .field("in_pass", &self.is_in_pass())
            .finish()
    }
}

/// Ignores frame requests. For reconcilers driven by explicit
/// [`Reconciler::frame`](crate::Reconciler::frame) calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}

#[cfg(test)]
pub(crate) use test_scheduler::TestScheduler;


/// Weak reference to a [`Runtime`], held by listeners so that a dropped
/// reconciler does not stay alive through its own event callbacks.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn request_rerender(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.request_rerender();
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.dirty.get())
            .unwrap_or(false)
    }

    pub fn frame(&self) -> u64 {
        self.0
            .upgrade()
            .map(|inner| inner.frame.get())
            .unwrap_or(0)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Runtimes of the passes running on this thread, innermost last, plus the
/// one that ran most recently so listeners firing between passes still find
/// it.
#[derive(Default)]
struct RuntimeStack {
    active: Vec<RuntimeHandle>,
    last: Option<RuntimeHandle>,
}

thread_local! {
    static RUNTIMES: RefCell<RuntimeStack> = RefCell::new(RuntimeStack::default());
}

fn current_runtime_handle() -> Option<RuntimeHandle> {
    RUNTIMES.with(|runtimes| {
        let runtimes = runtimes.borrow();
        runtimes.active.last().or(runtimes.last.as_ref()).cloned()
    })
}

pub(crate) fn push_active_runtime(handle: &RuntimeHandle) {
    RUNTIMES.with(|runtimes| {
        let mut runtimes = runtimes.borrow_mut();
        runtimes.active.push(handle.clone());
        runtimes.last = Some(handle.clone());
    });
}

pub(crate) fn pop_active_runtime() {
    RUNTIMES.with(|runtimes| {
        runtimes.borrow_mut().active.pop();
    });
}

/// Raise the dirty flag of the innermost active runtime, or of the most
/// recently active one when called between passes.
///
/// This is the escape hatch for state that changes outside of any hook.
pub fn request_rerender() {
    match current_runtime_handle() {
        Some(handle) => handle.request_rerender(),
        None => panic!("no runtime available to request a rerender"),
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
