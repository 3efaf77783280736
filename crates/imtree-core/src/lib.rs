#![doc = r"Immediate-mode reconciliation of a retained node tree."]

pub mod context;
pub mod cursor;
pub mod element_state;
pub mod host;
pub mod memory;
pub mod platform;
pub mod reconciler;
pub mod runtime;
pub mod timing;
pub mod tree;

mod attributes;
mod collections;
mod hooks;

pub use context::{with_current_cursor, with_current_cursor_opt};
pub use cursor::{Cursor, FrameReport};
pub use element_state::ElementState;
pub use host::{Host, Listener, NodeError, NodeId, NodeKind};
pub use memory::{HostOp, MemoryHost};
pub use platform::{Clock, RuntimeScheduler};
pub use reconciler::{FrameError, Reconciler, ViewError};
pub use runtime::{request_rerender, DefaultScheduler, Runtime, RuntimeHandle};
pub use timing::{FrameTimeStats, FrameTimings, DEFAULT_TIMING_WINDOW};
pub use tree::TreeState;

#[cfg(test)]
pub(crate) use runtime::TestScheduler;

// Ambient forms of the cursor operations. Each one resolves the innermost
// installed cursor and panics with "no cursor installed" outside a pass.

pub fn enter_container(tag: &str) -> NodeId {
    with_current_cursor(|cursor| cursor.enter_container(tag))
}

pub fn enter_container_with_id(tag: &str, id: &str) -> NodeId {
    with_current_cursor(|cursor| cursor.enter_container_with_id(tag, id))
}

pub fn leave_container() -> NodeId {
    with_current_cursor(|cursor| cursor.leave_container())
}

/// Emits a container and runs `content` inside it.
pub fn container<R>(tag: &str, content: impl FnOnce() -> R) -> R {
    enter_container(tag);
    let result = content();
    leave_container();
    result
}

pub fn element(tag: &str) -> NodeId {
    with_current_cursor(|cursor| cursor.element(tag))
}

pub fn element_with_id(tag: &str, id: &str) -> NodeId {
    with_current_cursor(|cursor| cursor.element_with_id(tag, id))
}

pub fn text(content: &str) -> NodeId {
    with_current_cursor(|cursor| cursor.text(content))
}

pub fn set_attribute(name: &str, value: &str) {
    with_current_cursor(|cursor| cursor.set_attribute(name, value));
}

pub fn get_attribute(name: &str) -> Option<String> {
    with_current_cursor(|cursor| cursor.get_attribute(name))
}

pub fn append_class(name: &str) {
    with_current_cursor(|cursor| cursor.append_class(name));
}

pub fn append_style(fragment: &str) {
    with_current_cursor(|cursor| cursor.append_style(fragment));
}

pub fn set_style(fragment: &str) {
    with_current_cursor(|cursor| cursor.set_style(fragment));
}

pub fn style_property(key: &str, value: &str) {
    with_current_cursor(|cursor| cursor.style_property(key, value));
}

pub fn hook<E, T>(event: &str, key: &str, getter: impl Fn(&E) -> T + 'static) -> Option<T>
where
    E: 'static,
    T: Clone + 'static,
{
    with_current_cursor(|cursor| cursor.hook(event, key, getter))
}

pub fn fired(event: &str) -> bool {
    with_current_cursor(|cursor| cursor.fired(event))
}

pub fn mark_removed(node: NodeId) {
    with_current_cursor(|cursor| cursor.mark_removed(node));
}

pub fn with_element_state<R>(f: impl FnOnce(&mut ElementState) -> R) -> R {
    with_current_cursor(|cursor| f(cursor.element_state()))
}

pub fn state<T: Clone + 'static>(key: &str, default: T) -> T {
    with_current_cursor(|cursor| cursor.state(key, default))
}

pub fn set_state<T: PartialEq + 'static>(key: &str, value: T) -> bool {
    with_current_cursor(|cursor| cursor.set_state(key, value))
}

pub fn current_frame() -> u64 {
    with_current_cursor(|cursor| cursor.current_frame())
}

pub fn last_touched() -> Option<NodeId> {
    with_current_cursor(|cursor| cursor.last_touched())
}

pub fn is_dirty() -> bool {
    with_current_cursor(|cursor| cursor.is_dirty())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
