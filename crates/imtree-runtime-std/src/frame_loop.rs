use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use imtree_core::{
    Clock, Cursor, FrameReport, FrameTimings, Host, NodeId, Reconciler, ViewError,
    DEFAULT_TIMING_WINDOW,
};

use crate::{StdClock, StdScheduler};

type View = Box<dyn FnMut(&mut Cursor<'_>) -> Result<(), ViewError>>;

/// Knobs for [`FrameLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Sleep between two dirty checks in [`FrameLoop::run_for`] and
    /// [`FrameLoop::run_until`].
    pub poll_interval: Duration,
    /// Number of pass durations kept for [`FrameLoop::timings`].
    pub timing_window: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(4),
            timing_window: DEFAULT_TIMING_WINDOW,
        }
    }
}

impl LoopConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timing_window(mut self, timing_window: usize) -> Self {
        self.timing_window = timing_window;
        self
    }
}

/// Owns a reconciler and its view and runs a pass whenever one is wanted.
///
/// Listeners never run a pass themselves; they only raise the runtime's
/// dirty flag. The loop picks that up on its next [`tick`](Self::tick).
pub struct FrameLoop<H: Host> {
    reconciler: Reconciler<H>,
    scheduler: Arc<StdScheduler>,
    clock: StdClock,
    view: View,
    config: LoopConfig,
    timings: FrameTimings,
    failed_frames: usize,
}

impl<H: Host> FrameLoop<H> {
    pub fn new(host: H, root: NodeId, view: impl FnMut(&mut Cursor<'_>) + 'static) -> Self {
        Self::with_config(host, root, LoopConfig::default(), view)
    }

    pub fn with_config(
        host: H,
        root: NodeId,
        config: LoopConfig,
        mut view: impl FnMut(&mut Cursor<'_>) + 'static,
    ) -> Self {
        Self::fallible(host, root, config, move |cursor| {
            view(cursor);
            Ok(())
        })
    }

    /// A loop whose view may fail. Failed passes are logged and counted; the
    /// loop keeps running.
    pub fn fallible(
        host: H,
        root: NodeId,
        config: LoopConfig,
        view: impl FnMut(&mut Cursor<'_>) -> Result<(), ViewError> + 'static,
    ) -> Self {
        let scheduler = Arc::new(StdScheduler::new());
        let runtime = StdScheduler::runtime(&scheduler);
        let reconciler = Reconciler::with_runtime(host, root, runtime);
        Self {
            reconciler,
            scheduler,
            clock: StdClock,
            view: Box::new(view),
            config,
            timings: FrameTimings::with_capacity(config.timing_window),
            failed_frames: 0,
        }
    }

    pub fn set_error_handler(
        &mut self,
        handler: impl FnMut(&mut Cursor<'_>, &dyn Error) + 'static,
    ) {
        self.reconciler.set_error_handler(handler);
    }

    pub fn config(&self) -> LoopConfig {
        self.config
    }

    /// Shared with anything that wants to wake the loop's thread.
    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn reconciler(&self) -> &Reconciler<H> {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut Reconciler<H> {
        &mut self.reconciler
    }

    pub fn host(&self) -> &H {
        self.reconciler.host()
    }

    /// Mutable host access, e.g. to deliver native events between ticks.
    pub fn host_mut(&mut self) -> &mut H {
        self.reconciler.host_mut()
    }

    pub fn timings(&self) -> &FrameTimings {
        &self.timings
    }

    pub fn failed_frames(&self) -> usize {
        self.failed_frames
    }

    pub fn last_report(&self) -> Option<FrameReport> {
        self.reconciler.last_report()
    }

    /// Runs a pass if a frame was requested or the reconciler is dirty and
    /// returns whether it did.
    pub fn tick(&mut self) -> bool {
        let requests = self.scheduler.take_requests();
        if requests == 0 && !self.reconciler.is_dirty() {
            return false;
        }
        if requests > 1 {
            log::trace!("{requests} frame requests coalesced into one pass");
        }
        self.render();
        true
    }

    /// Runs a pass unconditionally.
    pub fn render(&mut self) {
        let view = &mut self.view;
        let started = self.clock.now();
        let result = self.reconciler.try_frame(|cursor| view(cursor));
        self.timings.record(self.clock.elapsed(started));
        if let Err(err) = result {
            self.failed_frames += 1;
            log::error!(
                "frame {} failed: {err}",
                self.reconciler.current_frame()
            );
        }
    }

    /// Ticks until `duration` has elapsed and returns how many passes ran.
    pub fn run_for(&mut self, duration: Duration) -> usize {
        let deadline = Instant::now() + duration;
        let mut frames = 0;
        loop {
            if self.tick() {
                frames += 1;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(self.config.poll_interval.min(deadline - now));
        }
        frames
    }

    /// Ticks until `done` returns true and returns how many passes ran.
    pub fn run_until(&mut self, mut done: impl FnMut(&Self) -> bool) -> usize {
        let mut frames = 0;
        loop {
            if self.tick() {
                frames += 1;
            }
            if done(self) {
                break;
            }
            thread::sleep(self.config.poll_interval);
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::time::Duration;

    use imtree_core::{Host, MemoryHost};

    use super::{FrameLoop, LoopConfig};

    #[derive(Debug)]
    struct Offline;

    impl fmt::Display for Offline {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("offline")
        }
    }

    impl std::error::Error for Offline {}

    fn host() -> (MemoryHost, usize) {
        let mut host = MemoryHost::new();
        let root = host.create_element("root");
        (host, root)
    }

    fn fast() -> LoopConfig {
        LoopConfig::default().with_poll_interval(Duration::from_millis(1))
    }

    #[test]
    fn config_defaults() {
        let config = LoopConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(4));
        assert_eq!(config.timing_window, 1000);
        assert_eq!(config.with_timing_window(10).timing_window, 10);
    }

    #[test]
    fn tick_renders_only_when_wanted() {
        let (host, root) = host();
        let mut frame_loop = FrameLoop::with_config(host, root, fast(), |c| {
            c.element("button");
            if c.fired("click") {
                c.set_attribute("data-clicked", "yes");
            }
        });

        assert!(frame_loop.tick());
        assert!(!frame_loop.tick());

        let button = frame_loop.host().children(root)[0];
        frame_loop.host_mut().dispatch(button, "click", &());
        assert!(frame_loop.tick());
        assert_eq!(frame_loop.host().attribute(button, "data-clicked"), Some("yes"));

        // The hook expires one frame later, but nothing asks for that frame.
        assert!(!frame_loop.tick());
        frame_loop.reconciler().request_rerender();
        assert!(frame_loop.tick());
        assert_eq!(frame_loop.host().attribute(button, "data-clicked"), None);
        assert_eq!(frame_loop.timings().len(), 3);
    }

    #[test]
    fn run_until_stops_once_the_predicate_holds() {
        let (host, root) = host();
        let mut frame_loop = FrameLoop::with_config(host, root, fast(), |c| {
            c.element("counter");
            let count: u32 = c.state("count", 0);
            c.set_state("count", count + 1);
            if count < 4 {
                c.request_rerender();
            }
            c.set_attribute("data-count", &count.to_string());
        });

        let frames = frame_loop.run_until(|frame_loop| !frame_loop.reconciler().is_dirty());

        assert_eq!(frames, 5);
        let counter = frame_loop.host().children(root)[0];
        assert_eq!(frame_loop.host().attribute(counter, "data-count"), Some("4"));
        assert!(frame_loop.timings().stats().is_some());
    }

    #[test]
    fn run_for_renders_the_first_frame_and_idles() {
        let (host, root) = host();
        let mut frame_loop = FrameLoop::with_config(host, root, fast(), |c| {
            c.text("idle");
        });

        let frames = frame_loop.run_for(Duration::from_millis(10));

        assert_eq!(frames, 1);
        assert_eq!(frame_loop.host().dump(root), "<root>idle</root>");
    }

    #[test]
    fn failing_view_is_counted_and_the_loop_continues() {
        let (host, root) = host();
        let mut attempts = 0;
        let mut frame_loop = FrameLoop::fallible(host, root, fast(), move |c| {
            attempts += 1;
            if attempts == 1 {
                return Err(Offline.into());
            }
            c.text("online");
            Ok(())
        });
        frame_loop.set_error_handler(|c, error| {
            c.text(&format!("error: {error}"));
        });

        assert!(frame_loop.tick());
        assert_eq!(frame_loop.failed_frames(), 1);
        assert_eq!(frame_loop.host().dump(root), "<root>error: offline</root>");

        frame_loop.reconciler().request_rerender();
        assert!(frame_loop.tick());
        assert_eq!(frame_loop.failed_frames(), 1);
        assert_eq!(frame_loop.host().dump(root), "<root>online</root>");
    }
}
