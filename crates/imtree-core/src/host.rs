//! The contract between the reconciler and the retained tree it patches.
//!
//! The reconciler never owns display nodes. Everything it knows about the
//! tree it learns through [`Host`], and every structural change it makes goes
//! back through it. The trait is object safe so a [`Cursor`](crate::Cursor)
//! can hold `&mut dyn Host` and be installed as the ambient cursor.

use std::any::Any;
use std::fmt;

pub type NodeId = usize;

/// Callback registered with the host for one native event on one node.
///
/// Payloads are opaque to the host contract; hooks downcast them to the type
/// their getter expects.
pub type Listener = Box<dyn FnMut(&dyn Any) + 'static>;

/// What a node is, borrowed from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Element { tag: &'a str },
    Text { content: &'a str },
}

impl NodeKind<'_> {
    pub fn is_element(&self) -> bool {
        matches!(self, NodeKind::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, NodeKind::Text { .. })
    }

    /// Returns true if this is an element with the given tag.
    pub fn is_tag(&self, wanted: &str) -> bool {
        matches!(self, NodeKind::Element { tag } if *tag == wanted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    Missing { id: NodeId },
    NotAnElement { id: NodeId },
    Detached { id: NodeId },
    Cycle { parent: NodeId, child: NodeId },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Missing { id } => write!(f, "node {id} missing"),
            NodeError::NotAnElement { id } => write!(f, "node {id} is not an element"),
            NodeError::Detached { id } => write!(f, "node {id} is not attached to a parent"),
            NodeError::Cycle { parent, child } => {
                write!(f, "cannot place node {child} under its own descendant {parent}")
            }
        }
    }
}

impl std::error::Error for NodeError {}

/// Primitives the reconciler needs from a retained tree.
pub trait Host {
    fn create_element(&mut self, tag: &str) -> NodeId;

    fn create_text(&mut self, content: &str) -> NodeId;

    fn kind(&self, node: NodeId) -> Result<NodeKind<'_>, NodeError>;

    /// Overwrites the payload of a text node.
    fn set_text(&mut self, node: NodeId, content: &str) -> Result<(), NodeError>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn first_child(&self, node: NodeId) -> Option<NodeId>;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// Appends `child` as the last child of `parent`, moving it if it is
    /// currently attached somewhere else.
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError>;

    /// Puts `new` in the slot occupied by `old` and detaches `old`.
    fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), NodeError>;

    fn detach(&mut self, node: NodeId) -> Result<(), NodeError>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), NodeError>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), NodeError>;

    fn add_listener(
        &mut self,
        node: NodeId,
        event: &str,
        listener: Listener,
    ) -> Result<(), NodeError>;

    /// Called once a detached subtree will never be referenced by the
    /// reconciler again.
    fn release(&mut self, _node: NodeId) {}
}
