//! Shadow copy of what the reconciler last wrote to each element.
//!
//! Writes made during a frame land in a pending buffer. Flushing compares the
//! buffer with the committed copy and only touches the host for differences:
//! committed keys missing from the buffer are removed, changed keys are
//! written, and the class and style strings are written only if they differ.

use indexmap::IndexMap;

use crate::host::{Host, NodeError, NodeId};

pub(crate) const CLASS: &str = "class";
pub(crate) const STYLE: &str = "style";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Pending {
    attributes: IndexMap<String, String>,
    /// `None` until the class is written this visit.
    class: Option<String>,
    style: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct AttributeState {
    committed: IndexMap<String, String>,
    committed_class: String,
    committed_style: String,
    pending: Option<Pending>,
    flushed_frame: Option<u64>,
}

impl AttributeState {
    /// Pending buffer for `frame`.
    ///
    /// A node written to again after it was already flushed this frame starts
    /// from what was committed, so the second flush only adds to the first.
    fn pending_mut(&mut self, frame: u64) -> &mut Pending {
        if self.pending.is_none() {
            let seed = if self.flushed_frame == Some(frame) {
                Pending {
                    attributes: self.committed.clone(),
                    class: Some(self.committed_class.clone()),
                    style: Some(self.committed_style.clone()),
                }
            } else {
                Pending::default()
            };
            self.pending = Some(seed);
        }
        self.pending.get_or_insert_with(Pending::default)
    }

    pub(crate) fn set(&mut self, frame: u64, name: &str, value: &str) {
        match name {
            CLASS => self.pending_mut(frame).class = Some(value.to_owned()),
            STYLE => self.pending_mut(frame).style = Some(value.to_owned()),
            _ => {
                self.pending_mut(frame)
                    .attributes
                    .insert(name.to_owned(), value.to_owned());
            }
        }
    }

    pub(crate) fn append_class(&mut self, frame: u64, name: &str) {
        let class = self.pending_mut(frame).class.get_or_insert_with(String::new);
        if !class.is_empty() {
            class.push(' ');
        }
        class.push_str(name);
    }

    pub(crate) fn append_style(&mut self, frame: u64, fragment: &str) {
        self.pending_mut(frame)
            .style
            .get_or_insert_with(String::new)
            .push_str(fragment);
    }

    pub(crate) fn set_style(&mut self, frame: u64, fragment: &str) {
        self.pending_mut(frame).style = Some(fragment.to_owned());
    }

    /// The value written this visit, or else the last committed one.
    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        fn non_empty(value: &str) -> Option<&str> {
            (!value.is_empty()).then_some(value)
        }
        let pending = self.pending.as_ref();
        match name {
            CLASS => match pending.and_then(|pending| pending.class.as_deref()) {
                Some(class) => non_empty(class),
                None => non_empty(&self.committed_class),
            },
            STYLE => match pending.and_then(|pending| pending.style.as_deref()) {
                Some(style) => non_empty(style),
                None => non_empty(&self.committed_style),
            },
            _ => pending
                .and_then(|pending| pending.attributes.get(name))
                .or_else(|| self.committed.get(name))
                .map(String::as_str),
        }
    }

    pub(crate) fn discard_pending(&mut self) {
        self.pending = None;
    }

    /// Applies the pending buffer to `node` and returns how many host writes
    /// it took.
    ///
    /// A node visited without any writes is flushed with an empty buffer,
    /// which removes everything it had. Flushing twice in one frame without
    /// new writes in between is a no-op.
    pub(crate) fn flush(
        &mut self,
        node: NodeId,
        host: &mut dyn Host,
        frame: u64,
    ) -> Result<usize, NodeError> {
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None if self.flushed_frame == Some(frame) => return Ok(0),
            None => Pending::default(),
        };
        self.flushed_frame = Some(frame);
        let mut writes = 0;

        let stale: Vec<String> = self
            .committed
            .keys()
            .filter(|key| !pending.attributes.contains_key(key.as_str()))
            .cloned()
            .collect();
        for key in stale {
            host.remove_attribute(node, &key)?;
            self.committed.shift_remove(&key);
            writes += 1;
        }

        for (key, value) in pending.attributes {
            if self.committed.get(&key) == Some(&value) {
                continue;
            }
            host.set_attribute(node, &key, &value)?;
            self.committed.insert(key, value);
            writes += 1;
        }

        let class = pending.class.unwrap_or_default();
        if sync_string(host, node, CLASS, &mut self.committed_class, class)? {
            writes += 1;
        }
        let style = pending.style.unwrap_or_default();
        if sync_string(host, node, STYLE, &mut self.committed_style, style)? {
            writes += 1;
        }
        Ok(writes)
    }
}

fn sync_string(
    host: &mut dyn Host,
    node: NodeId,
    name: &str,
    committed: &mut String,
    pending: String,
) -> Result<bool, NodeError> {
    if *committed == pending {
        return Ok(false);
    }
    if pending.is_empty() {
        host.remove_attribute(node, name)?;
    } else {
        host.set_attribute(node, name, &pending)?;
    }
    *committed = pending;
    Ok(true)
}

#[cfg(test)]
#[path = "tests/attributes_tests.rs"]
mod tests;
