//! In-memory [`Host`] used by tests, benches and headless applications.

use std::any::Any;
use std::fmt::{self, Write as _};

use indexmap::IndexMap;

use crate::host::{Host, Listener, NodeError, NodeId, NodeKind};

/// A mutation performed on a [`MemoryHost`], in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    CreateElement { id: NodeId, tag: String },
    CreateText { id: NodeId },
    SetText { id: NodeId },
    Append { parent: NodeId, child: NodeId },
    Replace { old: NodeId, new: NodeId },
    Detach { id: NodeId },
    SetAttribute { id: NodeId, name: String },
    RemoveAttribute { id: NodeId, name: String },
    Listen { id: NodeId, event: String },
}

impl HostOp {
    /// Creates, replacements and detaches; everything that changes the shape
    /// of the tree rather than the content of a node.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            HostOp::CreateElement { .. }
                | HostOp::CreateText { .. }
                | HostOp::Replace { .. }
                | HostOp::Detach { .. }
        )
    }

    pub fn is_create(&self) -> bool {
        matches!(self, HostOp::CreateElement { .. } | HostOp::CreateText { .. })
    }
}

enum NodeData {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
}

struct MemoryNode {
    data: NodeData,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    listeners: Vec<(String, Listener)>,
}

impl MemoryNode {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev: None,
            next: None,
            listeners: Vec::new(),
        }
    }
}

/// Arena-backed tree with doubly linked siblings.
///
/// Ids are never reused: a released node leaves an empty slot behind, so a
/// stale id can only ever produce [`NodeError::Missing`].
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
    ops: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, id: NodeId) -> Result<&MemoryNode, NodeError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(NodeError::Missing { id })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, NodeError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(NodeError::Missing { id })
    }

    fn insert(&mut self, node: MemoryNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(node));
        id
    }

    fn attributes_mut(&mut self, id: NodeId) -> Result<&mut IndexMap<String, String>, NodeError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes),
            NodeData::Text(_) => Err(NodeError::NotAnElement { id }),
        }
    }

    fn ensure_element(&self, id: NodeId) -> Result<(), NodeError> {
        match self.node(id)?.data {
            NodeData::Element { .. } => Ok(()),
            NodeData::Text(_) => Err(NodeError::NotAnElement { id }),
        }
    }

    /// Fails if `child` is `parent` or one of its ancestors.
    fn ensure_acyclic(&self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        let mut current = Some(parent);
        while let Some(id) = current {
            if id == child {
                return Err(NodeError::Cycle { parent, child });
            }
            current = self.node(id)?.parent;
        }
        Ok(())
    }

    fn unlink(&mut self, id: NodeId) -> Result<(), NodeError> {
        let (parent, prev, next) = {
            let node = self.node(id)?;
            (node.parent, node.prev, node.next)
        };
        let Some(parent) = parent else {
            return Ok(());
        };
        match prev {
            Some(prev) => self.node_mut(prev)?.next = next,
            None => self.node_mut(parent)?.first_child = next,
        }
        match next {
            Some(next) => self.node_mut(next)?.prev = prev,
            None => self.node_mut(parent)?.last_child = prev,
        }
        let node = self.node_mut(id)?;
        node.parent = None;
        node.prev = None;
        node.next = None;
        Ok(())
    }

    /// Invokes every listener registered on `node` for `event`.
    ///
    /// Returns how many listeners ran. Events do not bubble.
    pub fn dispatch(&mut self, node: NodeId, event: &str, payload: &dyn Any) -> usize {
        let Ok(target) = self.node_mut(node) else {
            return 0;
        };
        let mut invoked = 0;
        for (name, listener) in target.listeners.iter_mut() {
            if name == event {
                listener(payload);
                invoked += 1;
            }
        }
        invoked
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Number of live (unreleased) nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).ok()?.data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).ok()?.data {
            NodeData::Text(content) => Some(content.as_str()),
            NodeData::Element { .. } => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id).ok()?.data {
            NodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    pub fn attribute_names(&self, id: NodeId) -> Vec<&str> {
        match self.node(id).map(|node| &node.data) {
            Ok(NodeData::Element { attributes, .. }) => {
                attributes.keys().map(String::as_str).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        let mut current = self.first_child(id);
        while let Some(child) = current {
            children.push(child);
            current = self.next_sibling(child);
        }
        children
    }

    pub fn listener_count(&self, id: NodeId) -> usize {
        self.node(id).map(|node| node.listeners.len()).unwrap_or(0)
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Serializes the subtree under `root` as compact HTML-like text.
    pub fn dump(&self, root: NodeId) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root);
        output
    }

    fn dump_node(&self, output: &mut String, id: NodeId) {
        let Ok(node) = self.node(id) else {
            output.push_str("<!missing>");
            return;
        };
        match &node.data {
            NodeData::Text(content) => output.push_str(content),
            NodeData::Element { tag, attributes } => {
                let _ = write!(output, "<{tag}");
                for (name, value) in attributes {
                    let _ = write!(output, " {name}=\"{value}\"");
                }
                output.push('>');
                for child in self.children(id) {
                    self.dump_node(output, child);
                }
                let _ = write!(output, "</{tag}>");
            }
        }
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHost")
            .field("live_nodes", &self.len())
            .field("ops", &self.ops.len())
            .finish()
    }
}

impl Host for MemoryHost {
    fn create_element(&mut self, tag: &str) -> NodeId {
        let id = self.insert(MemoryNode::new(NodeData::Element {
            tag: tag.to_owned(),
            attributes: IndexMap::new(),
        }));
        self.ops.push(HostOp::CreateElement {
            id,
            tag: tag.to_owned(),
        });
        id
    }

    fn create_text(&mut self, content: &str) -> NodeId {
        let id = self.insert(MemoryNode::new(NodeData::Text(content.to_owned())));
        self.ops.push(HostOp::CreateText { id });
        id
    }

    fn kind(&self, node: NodeId) -> Result<NodeKind<'_>, NodeError> {
        Ok(match &self.node(node)?.data {
            NodeData::Element { tag, .. } => NodeKind::Element { tag: tag.as_str() },
            NodeData::Text(content) => NodeKind::Text {
                content: content.as_str(),
            },
        })
    }

    fn set_text(&mut self, node: NodeId, content: &str) -> Result<(), NodeError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Text(existing) => {
                existing.clear();
                existing.push_str(content);
            }
            NodeData::Element { .. } => return Err(NodeError::NotAnElement { id: node }),
        }
        self.ops.push(HostOp::SetText { id: node });
        Ok(())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok()?.parent
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok()?.first_child
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok()?.next
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.ensure_element(parent)?;
        self.node(child)?;
        self.ensure_acyclic(parent, child)?;
        self.unlink(child)?;
        let last = self.node(parent)?.last_child;
        match last {
            Some(last) => self.node_mut(last)?.next = Some(child),
            None => self.node_mut(parent)?.first_child = Some(child),
        }
        self.node_mut(parent)?.last_child = Some(child);
        let node = self.node_mut(child)?;
        node.parent = Some(parent);
        node.prev = last;
        self.ops.push(HostOp::Append { parent, child });
        Ok(())
    }

    fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), NodeError> {
        if old == new {
            return Ok(());
        }
        let parent = self.node(old)?.parent.ok_or(NodeError::Detached { id: old })?;
        self.node(new)?;
        self.ensure_acyclic(parent, new)?;
        self.unlink(new)?;
        let (prev, next) = {
            let node = self.node(old)?;
            (node.prev, node.next)
        };
        match prev {
            Some(prev) => self.node_mut(prev)?.next = Some(new),
            None => self.node_mut(parent)?.first_child = Some(new),
        }
        match next {
            Some(next) => self.node_mut(next)?.prev = Some(new),
            None => self.node_mut(parent)?.last_child = Some(new),
        }
        {
            let node = self.node_mut(new)?;
            node.parent = Some(parent);
            node.prev = prev;
            node.next = next;
        }
        {
            let node = self.node_mut(old)?;
            node.parent = None;
            node.prev = None;
            node.next = None;
        }
        self.ops.push(HostOp::Replace { old, new });
        Ok(())
    }

    fn detach(&mut self, node: NodeId) -> Result<(), NodeError> {
        if self.node(node)?.parent.is_none() {
            return Err(NodeError::Detached { id: node });
        }
        self.unlink(node)?;
        self.ops.push(HostOp::Detach { id: node });
        Ok(())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), NodeError> {
        self.attributes_mut(node)?
            .insert(name.to_owned(), value.to_owned());
        self.ops.push(HostOp::SetAttribute {
            id: node,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), NodeError> {
        self.attributes_mut(node)?.shift_remove(name);
        self.ops.push(HostOp::RemoveAttribute {
            id: node,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn add_listener(
        &mut self,
        node: NodeId,
        event: &str,
        listener: Listener,
    ) -> Result<(), NodeError> {
        self.node_mut(node)?
            .listeners
            .push((event.to_owned(), listener));
        self.ops.push(HostOp::Listen {
            id: node,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn release(&mut self, node: NodeId) {
        if self.unlink(node).is_err() {
            return;
        }
        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            let Some(slot) = self.nodes.get_mut(id) else {
                continue;
            };
            if let Some(released) = slot.take() {
                let mut child = released.first_child;
                while let Some(current) = child {
                    child = self
                        .nodes
                        .get(current)
                        .and_then(Option::as_ref)
                        .and_then(|n| n.next);
                    pending.push(current);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;
