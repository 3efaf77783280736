use std::any::Any;

use imtree_core::{
    Cursor, FrameError, FrameReport, Host, HostOp, MemoryHost, NodeId, NodeKind, Reconciler,
    ViewError,
};

type Content = Box<dyn FnMut(&mut Cursor<'_>) -> Result<(), ViewError>>;

/// Passes [`ViewHarness::pump_until_idle`] runs before giving up on a view
/// that asks for a rerender every frame.
pub const MAX_IDLE_PASSES: usize = 64;

/// Headless harness for exercising views in tests.
///
/// Owns a [`MemoryHost`] with a `<root>` element and a reconciler over it,
/// stores the view so it can be re-run, and offers lookups and event
/// delivery for assertions.
pub struct ViewHarness {
    reconciler: Reconciler<MemoryHost>,
    content: Option<Content>,
}

impl ViewHarness {
    pub fn new() -> Self {
        let mut host = MemoryHost::new();
        let root = host.create_element("root");
        Self {
            reconciler: Reconciler::new(host, root),
            content: None,
        }
    }

    /// Installs `content` and renders it once.
    pub fn set_content(
        &mut self,
        mut content: impl FnMut(&mut Cursor<'_>) + 'static,
    ) -> Result<FrameReport, FrameError> {
        self.set_fallible_content(move |cursor| {
            content(cursor);
            Ok(())
        })
    }

    pub fn set_fallible_content(
        &mut self,
        content: impl FnMut(&mut Cursor<'_>) -> Result<(), ViewError> + 'static,
    ) -> Result<FrameReport, FrameError> {
        self.content = Some(Box::new(content));
        self.rerender()
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Runs the installed content once more, dirty or not.
    ///
    /// # Panics
    ///
    /// Panics if no content is installed.
    pub fn rerender(&mut self) -> Result<FrameReport, FrameError> {
        let Some(content) = self.content.as_mut() else {
            panic!("ViewHarness has no content; call set_content first");
        };
        self.reconciler.try_frame(|cursor| content(cursor))
    }

    /// Renders until the runtime is no longer dirty and returns how many
    /// passes ran.
    ///
    /// # Panics
    ///
    /// Panics if the view is still dirty after [`MAX_IDLE_PASSES`] passes.
    pub fn pump_until_idle(&mut self) -> Result<usize, FrameError> {
        let mut passes = 0;
        while self.reconciler.is_dirty() {
            assert!(
                passes < MAX_IDLE_PASSES,
                "view requested a rerender on each of {MAX_IDLE_PASSES} passes"
            );
            self.rerender()?;
            passes += 1;
        }
        Ok(passes)
    }

    /// Delivers `event` to `node` and returns how many listeners ran.
    pub fn dispatch(&mut self, node: NodeId, event: &str, payload: &dyn Any) -> usize {
        self.reconciler.host_mut().dispatch(node, event, payload)
    }

    /// Delivers `event` to the first element with `tag` and pumps until idle.
    ///
    /// # Panics
    ///
    /// Panics if there is no such element or nothing listens for `event`.
    pub fn fire(
        &mut self,
        tag: &str,
        event: &str,
        payload: &dyn Any,
    ) -> Result<usize, FrameError> {
        let Some(node) = self.find_by_tag(tag) else {
            panic!("no <{tag}> in {}", self.html());
        };
        let listeners = self.dispatch(node, event, payload);
        assert!(listeners > 0, "nothing listens for `{event}` on <{tag}>");
        self.pump_until_idle()
    }

    pub fn root(&self) -> NodeId {
        self.reconciler.root()
    }

    pub fn host(&self) -> &MemoryHost {
        self.reconciler.host()
    }

    pub fn host_mut(&mut self) -> &mut MemoryHost {
        self.reconciler.host_mut()
    }

    pub fn reconciler(&self) -> &Reconciler<MemoryHost> {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut Reconciler<MemoryHost> {
        &mut self.reconciler
    }

    pub fn last_report(&self) -> Option<FrameReport> {
        self.reconciler.last_report()
    }

    /// Markup of everything under the root.
    pub fn html(&self) -> String {
        let host = self.host();
        host.children(self.root())
            .into_iter()
            .map(|child| host.dump(child))
            .collect()
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        self.host_mut().take_ops()
    }

    /// Elements under the root in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        let host = self.host();
        let mut found = Vec::new();
        let mut pending: Vec<NodeId> = host.children(self.root()).into_iter().rev().collect();
        while let Some(node) = pending.pop() {
            if host.kind(node).is_ok_and(|kind| kind.is_element()) {
                found.push(node);
            }
            pending.extend(host.children(node).into_iter().rev());
        }
        found
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find_all_by_tag(tag).into_iter().next()
    }

    pub fn find_all_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|node| self.host().tag(*node) == Some(tag))
            .collect()
    }

    pub fn find_by_attribute(&self, name: &str, value: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|node| self.host().attribute(*node, name) == Some(value))
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let host = self.host();
        let mut text = String::new();
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            match host.kind(current) {
                Ok(NodeKind::Text { content }) => text.push_str(content),
                Ok(NodeKind::Element { .. }) => {
                    pending.extend(host.children(current).into_iter().rev());
                }
                Err(_) => {}
            }
        }
        text
    }
}

impl Default for ViewHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// [`ViewHarness`].
pub fn run_test_view<R>(f: impl FnOnce(&mut ViewHarness) -> R) -> R {
    let mut harness = ViewHarness::new();
    f(&mut harness)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_reports_content_and_markup() {
        run_test_view(|harness| {
            assert!(!harness.has_content());

            harness
                .set_content(|c| {
                    c.enter_container("p");
                    c.text("hello ");
                    c.enter_container("b");
                    c.text("world");
                    c.leave_container();
                    c.leave_container();
                })
                .expect("install content");

            assert!(harness.has_content());
            assert_eq!(harness.html(), "<p>hello <b>world</b></p>");
            let paragraph = harness.find_by_tag("p").expect("paragraph");
            assert_eq!(harness.text_content(paragraph), "hello world");
            assert_eq!(harness.elements().len(), 2);
        });
    }

    #[test]
    fn pump_until_idle_follows_rerender_requests() {
        let mut harness = ViewHarness::new();
        harness
            .set_content(|c| {
                c.element("ticker");
                let ticks: u8 = c.state("ticks", 0);
                if c.set_state("ticks", ticks.saturating_add(1)) && ticks < 2 {
                    c.request_rerender();
                }
            })
            .expect("install content");

        assert_eq!(harness.pump_until_idle().expect("pump"), 2);
        assert_eq!(harness.pump_until_idle().expect("pump"), 0);
    }

    #[test]
    #[should_panic(expected = "no content")]
    fn rerender_without_content_panics() {
        let mut harness = ViewHarness::new();
        let _ = harness.rerender();
    }
}
