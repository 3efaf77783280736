//! Engine-private metadata kept beside the host tree.
//!
//! Nothing is stored on host nodes themselves. Each touched node gets a
//! [`NodeMeta`] in a side table keyed by its id; nodes requested through a
//! stable id are additionally recorded in a registry so they can be moved
//! back into the tree with their children and metadata intact.

use crate::attributes::AttributeState;
use crate::collections::{HashMap, HashSet};
use crate::element_state::ElementState;
use crate::hooks::HookList;
use crate::host::{Host, NodeId};

#[derive(Default)]
pub(crate) struct NodeMeta {
    pub(crate) attrs: AttributeState,
    pub(crate) hooks: HookList,
    pub(crate) state: ElementState,
}

#[derive(Default)]
pub struct TreeState {
    meta: HashMap<NodeId, NodeMeta>,
    stable: HashMap<String, NodeId>,
    stable_nodes: HashSet<NodeId>,
}

impl TreeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn meta_mut(&mut self, node: NodeId) -> &mut NodeMeta {
        self.meta.entry(node).or_default()
    }

    pub(crate) fn existing_meta_mut(&mut self, node: NodeId) -> Option<&mut NodeMeta> {
        self.meta.get_mut(&node)
    }

    pub(crate) fn meta(&self, node: NodeId) -> Option<&NodeMeta> {
        self.meta.get(&node)
    }

    /// Node registered under `id`, if any.
    pub fn stable_node(&self, id: &str) -> Option<NodeId> {
        self.stable.get(id).copied()
    }

    pub fn is_stable(&self, node: NodeId) -> bool {
        self.stable_nodes.contains(&node)
    }

    /// Registers `node` under `id` and returns the node it displaced.
    pub(crate) fn register_stable(&mut self, id: &str, node: NodeId) -> Option<NodeId> {
        let previous = self.stable.insert(id.to_owned(), node);
        if let Some(previous) = previous {
            self.stable_nodes.remove(&previous);
        }
        self.stable_nodes.insert(node);
        previous
    }

    /// Number of nodes that currently carry metadata.
    pub fn tracked_nodes(&self) -> usize {
        self.meta.len()
    }

    /// Number of hooks registered on `node`.
    pub fn hook_count(&self, node: NodeId) -> usize {
        self.meta(node).map(|meta| meta.hooks.len()).unwrap_or(0)
    }

    /// Forgets a subtree that has just been detached for good and lets the
    /// host release it.
    ///
    /// Stable nodes inside the subtree are cut loose first so they survive
    /// with their own descendants; a stable root is left untouched.
    pub(crate) fn discard(&mut self, host: &mut dyn Host, root: NodeId) {
        if self.is_stable(root) {
            return;
        }
        let mut survivors = Vec::new();
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            if node != root && self.is_stable(node) {
                survivors.push(node);
                continue;
            }
            self.meta.remove(&node);
            let mut child = host.first_child(node);
            while let Some(current) = child {
                pending.push(current);
                child = host.next_sibling(current);
            }
        }
        for node in survivors {
            if let Err(err) = host.detach(node) {
                log::error!("failed to rescue stable node {node}: {err}");
            }
        }
        host.release(root);
    }
}
