//! The reconciliation cursor.
//!
//! A [`Cursor`] walks the children of one parent at a time, in lock-step
//! with the calls the view makes. Everything behind the cursor was declared
//! this frame; everything in front of it is left over from an earlier frame.
//! Each request either reuses the node under the cursor (same kind and tag),
//! replaces it, or appends a new one when the cursor is past the end. Leaving
//! a container drops whatever is still in front of the cursor.

use std::rc::Rc;

use indexmap::IndexSet;

use crate::context;
use crate::element_state::ElementState;
use crate::hooks::{self, Extractor, FIRED_KEY};
use crate::host::{Host, NodeError, NodeId, NodeKind};
use crate::runtime::RuntimeHandle;
use crate::tree::TreeState;

/// What one pass did to the host tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub created: usize,
    pub replaced: usize,
    pub detached: usize,
    pub reused: usize,
    pub text_updates: usize,
    pub attribute_writes: usize,
}

impl FrameReport {
    pub(crate) fn absorb(&mut self, other: FrameReport) {
        self.created += other.created;
        self.replaced += other.replaced;
        self.detached += other.detached;
        self.reused += other.reused;
        self.text_updates += other.text_updates;
        self.attribute_writes += other.attribute_writes;
    }

    /// True if the pass created, replaced or detached nothing.
    pub fn is_structurally_idle(&self) -> bool {
        self.created == 0 && self.replaced == 0 && self.detached == 0
    }
}

/// Where to pick up again after leaving a container.
#[derive(Clone, Copy)]
struct Resume {
    parent: NodeId,
    /// Sibling that followed the container when it was entered.
    next: Option<NodeId>,
}

pub struct Cursor<'a> {
    host: &'a mut dyn Host,
    tree: &'a mut TreeState,
    runtime: RuntimeHandle,
    frame: u64,
    root: NodeId,
    parent: NodeId,
    open: Vec<Resume>,
    /// Next node to consider; `None` means append mode.
    pos: Option<NodeId>,
    last_touched: Option<NodeId>,
    removals: IndexSet<NodeId>,
    /// Nodes written through an explicit target; flushed at frame end.
    revisits: IndexSet<NodeId>,
    report: FrameReport,
    fault: Option<NodeError>,
}

impl<'a> Cursor<'a> {
    pub fn new(
        host: &'a mut dyn Host,
        tree: &'a mut TreeState,
        runtime: RuntimeHandle,
        root: NodeId,
        frame: u64,
    ) -> Self {
        let pos = host.first_child(root);
        Self {
            host,
            tree,
            runtime,
            frame,
            root,
            parent: root,
            open: Vec::new(),
            pos,
            last_touched: None,
            removals: IndexSet::new(),
            revisits: IndexSet::new(),
            report: FrameReport {
                frame,
                ..FrameReport::default()
            },
            fault: None,
        }
    }

    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Whether something asked for another pass since this one started.
    pub fn is_dirty(&self) -> bool {
        self.runtime.is_dirty()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node whose children are being reconciled.
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn last_touched(&self) -> Option<NodeId> {
        self.last_touched
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.clone()
    }

    pub fn report(&self) -> FrameReport {
        self.report
    }

    fn record<T>(&mut self, result: Result<T, NodeError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                log::error!("host operation failed during frame {}: {err}", self.frame);
                self.fault.get_or_insert(err);
                None
            }
        }
    }

    /// Steps over nodes flagged with [`mark_removed`](Self::mark_removed) so
    /// the siblings after them keep matching by position.
    fn skip_removed(&mut self) {
        while let Some(node) = self.pos {
            if !self.removals.contains(&node) {
                break;
            }
            self.pos = self.host.next_sibling(node);
        }
    }

    fn touch(&mut self, node: NodeId) {
        if self.last_touched == Some(node) {
            return;
        }
        if let Some(previous) = self.last_touched.replace(node) {
            self.flush(previous);
        }
    }

    fn flush(&mut self, node: NodeId) {
        if self.host.kind(node).is_err() {
            return;
        }
        let frame = self.frame;
        let result = match self.tree.existing_meta_mut(node) {
            Some(meta) => meta.attrs.flush(node, &mut *self.host, frame),
            None => return,
        };
        if let Some(writes) = self.record(result) {
            self.report.attribute_writes += writes;
        }
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.report.created += 1;
        self.host.create_element(tag)
    }

    fn replace(&mut self, old: NodeId, new: NodeId) {
        let result = self.host.replace(old, new);
        if self.record(result).is_some() {
            self.report.replaced += 1;
            self.tree.discard(&mut *self.host, old);
        }
    }

    fn detach(&mut self, node: NodeId) {
        let result = self.host.detach(node);
        if self.record(result).is_some() {
            self.report.detached += 1;
            self.tree.discard(&mut *self.host, node);
        }
    }

    /// Looks up the node registered for `id`, creating and registering one if
    /// there is none or the registered one has a different tag.
    fn stable_element(&mut self, tag: &str, id: &str) -> NodeId {
        if let Some(node) = self.tree.stable_node(id) {
            if self.host.kind(node).is_ok_and(|kind| kind.is_tag(tag)) {
                return node;
            }
            log::debug!("stable id `{id}` re-registered as <{tag}>");
        }
        let node = self.create_element(tag);
        if let Some(previous) = self.tree.register_stable(id, node) {
            if self.host.parent(previous).is_none() {
                self.tree.discard(&mut *self.host, previous);
            }
        }
        node
    }

    fn resolve_element(&mut self, tag: &str, stable_id: Option<&str>) -> NodeId {
        self.skip_removed();
        let Some(existing) = self.pos else {
            let node = match stable_id {
                Some(id) => self.stable_element(tag, id),
                None => self.create_element(tag),
            };
            let result = self.host.append_child(self.parent, node);
            self.record(result);
            return node;
        };

        if let Some(id) = stable_id {
            let node = self.stable_element(tag, id);
            if node == existing {
                self.report.reused += 1;
            } else {
                self.replace(existing, node);
            }
            return node;
        }

        if self.host.kind(existing).is_ok_and(|kind| kind.is_tag(tag)) {
            self.report.reused += 1;
            return existing;
        }
        let node = self.create_element(tag);
        self.replace(existing, node);
        node
    }

    fn enter(&mut self, tag: &str, stable_id: Option<&str>) -> NodeId {
        let node = self.resolve_element(tag, stable_id);
        self.touch(node);
        self.open.push(Resume {
            parent: self.parent,
            next: self.host.next_sibling(node),
        });
        self.parent = node;
        self.pos = self.host.first_child(node);
        node
    }

    /// Resolves an element with `tag` at the cursor and descends into it.
    pub fn enter_container(&mut self, tag: &str) -> NodeId {
        self.enter(tag, None)
    }

    /// Like [`enter_container`](Self::enter_container), but always uses the
    /// node registered under `id`, moving it here if it lives elsewhere.
    pub fn enter_container_with_id(&mut self, tag: &str, id: &str) -> NodeId {
        self.enter(tag, Some(id))
    }

    /// Detaches every node from the cursor to the end of the current parent,
    /// except those already queued for removal.
    fn prune_tail(&mut self) {
        let mut current = self.pos.take();
        let mut pruned = 0;
        while let Some(node) = current {
            current = self.host.next_sibling(node);
            if self.removals.contains(&node) {
                continue;
            }
            self.detach(node);
            pruned += 1;
        }
        if pruned > 0 {
            log::debug!(
                "frame {}: pruned {pruned} stale node(s) under {}",
                self.frame,
                self.parent
            );
        }
    }

    /// Closes the current container and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is at the root, i.e. there is no matching
    /// [`enter_container`](Self::enter_container).
    pub fn leave_container(&mut self) -> NodeId {
        let Some(resume) = self.open.last().copied() else {
            panic!("leave_container called without a matching enter_container");
        };
        self.prune_tail();
        self.open.pop();
        let exited = self.parent;
        self.parent = resume.parent;
        if self.host.parent(exited) == Some(resume.parent) {
            self.pos = self.host.next_sibling(exited);
            return exited;
        }
        // The host moved or dropped the container; carry on after where it
        // used to be so the rest of the parent still lines up.
        self.record::<()>(Err(NodeError::Detached { id: exited }));
        self.pos = resume
            .next
            .filter(|next| self.host.parent(*next) == Some(resume.parent));
        exited
    }

    /// Runs `content` inside a container and closes it afterwards.
    pub fn container<R>(&mut self, tag: &str, content: impl FnOnce(&mut Self) -> R) -> R {
        self.enter_container(tag);
        let result = content(self);
        self.leave_container();
        result
    }

    /// A leaf element: enter and immediately leave. The element stays the
    /// target of following attribute and hook calls.
    pub fn element(&mut self, tag: &str) -> NodeId {
        self.enter_container(tag);
        self.leave_container()
    }

    pub fn element_with_id(&mut self, tag: &str, id: &str) -> NodeId {
        self.enter_container_with_id(tag, id);
        self.leave_container()
    }

    /// Resolves a text node at the cursor. An existing text node is updated
    /// in place, and only if its content differs.
    pub fn text(&mut self, content: &str) -> NodeId {
        self.skip_removed();
        let Some(existing) = self.pos else {
            self.report.created += 1;
            let node = self.host.create_text(content);
            let result = self.host.append_child(self.parent, node);
            self.record(result);
            return node;
        };

        let unchanged = match self.host.kind(existing) {
            Ok(NodeKind::Text { content: current }) => Some(current == content),
            _ => None,
        };
        match unchanged {
            Some(true) => {
                self.report.reused += 1;
                self.pos = self.host.next_sibling(existing);
                existing
            }
            Some(false) => {
                let result = self.host.set_text(existing, content);
                if self.record(result).is_some() {
                    self.report.text_updates += 1;
                }
                self.pos = self.host.next_sibling(existing);
                existing
            }
            None => {
                self.report.created += 1;
                let node = self.host.create_text(content);
                self.replace(existing, node);
                self.pos = self.host.next_sibling(node);
                node
            }
        }
    }

    fn target(&self, target: Option<NodeId>) -> NodeId {
        match target.or(self.last_touched) {
            Some(node) => node,
            None => panic!("no element has been entered during frame {}", self.frame),
        }
    }

    /// Attribute state of `target`, queuing it for an end-of-frame flush when
    /// it is not the element currently being written to.
    fn attrs_for(&mut self, target: Option<NodeId>) -> (NodeId, u64) {
        let node = self.target(target);
        if Some(node) != self.last_touched {
            self.revisits.insert(node);
        }
        (node, self.frame)
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.set_attribute_on(None, name, value);
    }

    /// Records `name=value` for `target` (or the last touched element). The
    /// host is written at flush time, and only if the value changed.
    pub fn set_attribute_on(&mut self, target: Option<NodeId>, name: &str, value: &str) {
        let (node, frame) = self.attrs_for(target);
        self.tree.meta_mut(node).attrs.set(frame, name, value);
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.get_attribute_on(None, name)
    }

    /// The value recorded this visit, or else the last committed value.
    pub fn get_attribute_on(&self, target: Option<NodeId>, name: &str) -> Option<String> {
        let node = self.target(target);
        self.tree
            .meta(node)
            .and_then(|meta| meta.attrs.get(name))
            .map(str::to_owned)
    }

    pub fn append_class(&mut self, name: &str) {
        self.append_class_on(None, name);
    }

    pub fn append_class_on(&mut self, target: Option<NodeId>, name: &str) {
        let (node, frame) = self.attrs_for(target);
        self.tree.meta_mut(node).attrs.append_class(frame, name);
    }

    pub fn append_style(&mut self, fragment: &str) {
        self.append_style_on(None, fragment);
    }

    pub fn append_style_on(&mut self, target: Option<NodeId>, fragment: &str) {
        let (node, frame) = self.attrs_for(target);
        self.tree.meta_mut(node).attrs.append_style(frame, fragment);
    }

    /// Appends a single `key:value;` declaration to the pending style.
    pub fn style_property(&mut self, key: &str, value: &str) {
        self.append_style_on(None, &format!("{key}:{value};"));
    }

    pub fn set_style(&mut self, fragment: &str) {
        self.set_style_on(None, fragment);
    }

    pub fn set_style_on(&mut self, target: Option<NodeId>, fragment: &str) {
        let (node, frame) = self.attrs_for(target);
        self.tree.meta_mut(node).attrs.set_style(frame, fragment);
    }

    /// Value derived from the last `event` on the last touched element, if
    /// it fired since the previous frame.
    ///
    /// `key` identifies the hook across frames; the getter passed with the
    /// first registration is the one the listener keeps.
    pub fn hook<E, T>(
        &mut self,
        event: &str,
        key: &str,
        getter: impl Fn(&E) -> T + 'static,
    ) -> Option<T>
    where
        E: 'static,
        T: Clone + 'static,
    {
        self.hook_on(None, event, key, getter)
    }

    pub fn hook_on<E, T>(
        &mut self,
        target: Option<NodeId>,
        event: &str,
        key: &str,
        getter: impl Fn(&E) -> T + 'static,
    ) -> Option<T>
    where
        E: 'static,
        T: Clone + 'static,
    {
        let node = self.target(target);
        self.read_hook(node, event, key, || hooks::typed(event, getter))
    }

    /// Whether `event` fired on the last touched element since the previous
    /// frame.
    pub fn fired(&mut self, event: &str) -> bool {
        self.fired_on(None, event)
    }

    pub fn fired_on(&mut self, target: Option<NodeId>, event: &str) -> bool {
        let node = self.target(target);
        self.read_hook::<bool>(node, event, FIRED_KEY, hooks::presence)
            .unwrap_or(false)
    }

    fn read_hook<T: Clone + 'static>(
        &mut self,
        node: NodeId,
        event: &str,
        key: &str,
        extractor: impl FnOnce() -> Extractor,
    ) -> Option<T> {
        let existing = self.tree.meta_mut(node).hooks.find(event, key);
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let slot = self.tree.meta_mut(node).hooks.register(event, key);
                let listener =
                    hooks::listener(Rc::downgrade(&slot), self.runtime.clone(), extractor());
                let result = self.host.add_listener(node, event, listener);
                self.record(result);
                log::trace!("hook `{event}`/`{key}` registered on node {node}");
                slot
            }
        };
        let value = slot.borrow().read::<T>(self.frame);
        value
    }

    /// Queues `node` for detachment after the structural pass. Until then the
    /// cursor steps over it as if it were already gone.
    pub fn mark_removed(&mut self, node: NodeId) {
        self.removals.insert(node);
    }

    pub fn request_rerender(&self) {
        self.runtime.request_rerender();
    }

    pub fn element_state(&mut self) -> &mut ElementState {
        self.element_state_on(None)
    }

    pub fn element_state_on(&mut self, target: Option<NodeId>) -> &mut ElementState {
        let node = self.target(target);
        &mut self.tree.meta_mut(node).state
    }

    /// Reads `key` from the last touched element's state bag, storing
    /// `default` first if it is missing.
    pub fn state<T: Clone + 'static>(&mut self, key: &str, default: T) -> T {
        self.element_state()
            .get_or_insert_with(key, || default)
            .clone()
    }

    /// Stores `value` under `key` and reports whether it differs from what
    /// was there.
    pub fn set_state<T: PartialEq + 'static>(&mut self, key: &str, value: T) -> bool {
        let state = self.element_state();
        let changed = state.get::<T>(key) != Some(&value);
        state.insert(key, value);
        changed
    }

    /// Makes this cursor the ambient one for the duration of `f`, so the free
    /// functions in the crate root reach it without it being passed down.
    pub fn install<R>(&mut self, f: impl FnOnce(&mut Cursor<'a>) -> R) -> R {
        let _guard = context::push(self);
        f(self)
    }

    /// Ends the pass: flushes attribute state, closes containers the view
    /// left open, prunes stale tails up to the root and applies the deferred
    /// removals.
    pub(crate) fn finish(mut self) -> (FrameReport, Option<NodeError>) {
        if let Some(node) = self.last_touched {
            self.flush(node);
        }
        for node in std::mem::take(&mut self.revisits) {
            self.flush(node);
        }

        let mut closed = 0;
        while !self.open.is_empty() {
            self.leave_container();
            closed += 1;
        }
        if closed > 0 {
            log::debug!("frame {}: closed {closed} open container(s)", self.frame);
        }
        self.prune_tail();
        self.apply_removals();
        (self.report, self.fault)
    }

    /// Ends a pass whose view failed: pending attribute writes are dropped
    /// and nothing is pruned, but deferred removals still happen so the next
    /// pass does not revisit them.
    pub(crate) fn abandon(mut self) -> (FrameReport, Option<NodeError>) {
        let pending = self.last_touched.into_iter().chain(self.revisits.drain(..));
        for node in pending.collect::<Vec<_>>() {
            if let Some(meta) = self.tree.existing_meta_mut(node) {
                meta.attrs.discard_pending();
            }
        }
        self.apply_removals();
        (self.report, self.fault)
    }

    fn apply_removals(&mut self) {
        let removals = std::mem::take(&mut self.removals);
        if removals.is_empty() {
            return;
        }
        let mut removed = 0;
        for node in removals {
            if self.host.parent(node).is_none() {
                continue;
            }
            self.detach(node);
            removed += 1;
        }
        log::debug!("frame {}: removed {removed} marked node(s)", self.frame);
    }
}

#[cfg(test)]
#[path = "tests/cursor_tests.rs"]
mod tests;
