//! The frame driver.
//!
//! A [`Reconciler`] owns the host tree, the side tables and the runtime. Each
//! call to [`Reconciler::frame`] is one reconciliation pass: the view runs
//! top to bottom against a fresh [`Cursor`] and the host tree is patched to
//! match what it declared.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::cursor::{Cursor, FrameReport};
use crate::host::{Host, NodeError, NodeId};
use crate::runtime::{DefaultScheduler, Runtime, RuntimeHandle};
use crate::tree::TreeState;

pub type ViewError = Box<dyn Error>;

type ErrorHandler = Box<dyn FnMut(&mut Cursor<'_>, &dyn Error)>;

#[derive(Debug)]
pub enum FrameError {
    /// A host primitive failed. The pass still ran to the end.
    Host(NodeError),
    /// The view returned an error. `recovered` is true if the error handler
    /// rendered a fallback in its place.
    View { error: ViewError, recovered: bool },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Host(err) => write!(f, "host error: {err}"),
            FrameError::View {
                error,
                recovered: true,
            } => write!(f, "view failed and was replaced by its fallback: {error}"),
            FrameError::View {
                error,
                recovered: false,
            } => write!(f, "view failed: {error}"),
        }
    }
}

impl Error for FrameError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FrameError::Host(err) => Some(err),
            FrameError::View { error, .. } => Some(error.as_ref()),
        }
    }
}

impl From<NodeError> for FrameError {
    fn from(err: NodeError) -> Self {
        FrameError::Host(err)
    }
}

/// Resets the runtime's in-pass marker even if the view panics.
struct PassGuard {
    runtime: Runtime,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.runtime.end_pass();
    }
}

pub struct Reconciler<H: Host> {
    host: H,
    tree: TreeState,
    runtime: Runtime,
    root: NodeId,
    error_handler: Option<ErrorHandler>,
    last_report: Option<FrameReport>,
}

impl<H: Host> Reconciler<H> {
    /// Reconciles the children of `root`, which must be an element in
    /// `host`. Nothing is ever written to `root` itself.
    pub fn new(host: H, root: NodeId) -> Self {
        Self::with_runtime(host, root, Runtime::new(Arc::new(DefaultScheduler)))
    }

    pub fn with_runtime(host: H, root: NodeId, runtime: Runtime) -> Self {
        Self {
            host,
            tree: TreeState::new(),
            runtime,
            root,
            error_handler: None,
            last_report: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn tree(&self) -> &TreeState {
        &self.tree
    }

    pub fn stable_node(&self, id: &str) -> Option<NodeId> {
        self.tree.stable_node(id)
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn is_dirty(&self) -> bool {
        self.runtime.is_dirty()
    }

    pub fn current_frame(&self) -> u64 {
        self.runtime.frame()
    }

    pub fn request_rerender(&self) {
        self.runtime.request_rerender();
    }

    pub fn last_report(&self) -> Option<FrameReport> {
        self.last_report
    }

    /// Installs a fallback view rendered in place of a view that failed.
    pub fn set_error_handler(
        &mut self,
        handler: impl FnMut(&mut Cursor<'_>, &dyn Error) + 'static,
    ) {
        self.error_handler = Some(Box::new(handler));
    }

    pub fn clear_error_handler(&mut self) {
        self.error_handler = None;
    }

    /// Runs one pass, dirty or not.
    pub fn frame(
        &mut self,
        view: impl FnOnce(&mut Cursor<'_>),
    ) -> Result<FrameReport, FrameError> {
        self.try_frame(|cursor| {
            view(cursor);
            Ok(())
        })
    }

    /// Runs one pass if anything asked for one since the last.
    pub fn render_if_dirty(
        &mut self,
        view: impl FnOnce(&mut Cursor<'_>),
    ) -> Result<Option<FrameReport>, FrameError> {
        if !self.runtime.is_dirty() {
            return Ok(None);
        }
        self.frame(view).map(Some)
    }

    /// Runs one pass with a fallible view.
    ///
    /// # Panics
    ///
    /// Panics if a pass is already running on this reconciler's runtime.
    pub fn try_frame(
        &mut self,
        view: impl FnOnce(&mut Cursor<'_>) -> Result<(), ViewError>,
    ) -> Result<FrameReport, FrameError> {
        let frame = self.runtime.begin_pass();
        let _pass = PassGuard {
            runtime: self.runtime.clone(),
        };
        let handle = self.runtime.handle();

        let mut cursor = Cursor::new(
            &mut self.host,
            &mut self.tree,
            handle.clone(),
            self.root,
            frame,
        );
        let outcome = cursor.install(view);
        let (report, fault, view_error) = match outcome {
            Ok(()) => {
                let (report, fault) = cursor.finish();
                (report, fault, None)
            }
            Err(error) => {
                log::error!("view failed during frame {frame}: {error}");
                let (partial, fault) = cursor.abandon();
                match self.error_handler.as_mut() {
                    Some(handler) => {
                        let mut fallback =
                            Cursor::new(&mut self.host, &mut self.tree, handle, self.root, frame);
                        fallback.install(|cursor| handler(cursor, error.as_ref()));
                        let (mut report, late) = fallback.finish();
                        report.absorb(partial);
                        (report, fault.or(late), Some((error, true)))
                    }
                    None => (partial, fault, Some((error, false))),
                }
            }
        };

        self.last_report = Some(report);
        log::trace!(
            "frame {frame}: {} created, {} replaced, {} detached, {} reused, {} text, {} attribute writes",
            report.created,
            report.replaced,
            report.detached,
            report.reused,
            report.text_updates,
            report.attribute_writes
        );

        if let Some((error, recovered)) = view_error {
            return Err(FrameError::View { error, recovered });
        }
        match fault {
            Some(err) => Err(FrameError::Host(err)),
            None => Ok(report),
        }
    }
}

impl<H: Host + fmt::Debug> fmt::Debug for Reconciler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("host", &self.host)
            .field("root", &self.root)
            .field("runtime", &self.runtime)
            .field("tracked_nodes", &self.tree.tracked_nodes())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
