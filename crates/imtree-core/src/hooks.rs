//! Per-node event hooks.
//!
//! A hook is identified by its event name and a caller-chosen key, so a hook
//! declared afresh every frame finds the entry registered by the first frame
//! instead of piling up listeners. Each entry owns one native listener. The
//! listener caches the derived value, stamps the frame it fired in and marks
//! the runtime dirty; [`HookSlot::read`] only reports the value during the
//! frame right after that stamp.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::collections::hook_fingerprint;
use crate::host::Listener;
use crate::runtime::RuntimeHandle;

/// Key used by [`Cursor::fired`](crate::Cursor::fired), which only cares
/// whether the event happened.
pub(crate) const FIRED_KEY: &str = "\u{0}fired";

pub(crate) type Extractor = Box<dyn Fn(&dyn Any) -> Option<Box<dyn Any>>>;

pub(crate) struct HookSlot {
    /// `event`/`key`, for diagnostics.
    label: String,
    fired_frame: Option<u64>,
    value: Option<Box<dyn Any>>,
}

impl HookSlot {
    /// The cached value if the listener fired since the previous pass.
    pub(crate) fn read<T: Clone + 'static>(&self, frame: u64) -> Option<T> {
        let previous = frame.checked_sub(1)?;
        if self.fired_frame != Some(previous) {
            return None;
        }
        let value = self.value.as_ref()?.downcast_ref::<T>().cloned();
        if value.is_none() {
            log::warn!(
                "hook `{}` holds a value that is not a {}; its key was reused with another type",
                self.label,
                std::any::type_name::<T>()
            );
        }
        value
    }

    #[cfg(test)]
    pub(crate) fn fired_frame(&self) -> Option<u64> {
        self.fired_frame
    }
}

struct HookEntry {
    fingerprint: u64,
    event: String,
    key: String,
    slot: Rc<RefCell<HookSlot>>,
}

#[derive(Default)]
pub(crate) struct HookList {
    entries: Vec<HookEntry>,
}

impl HookList {
    pub(crate) fn find(&self, event: &str, key: &str) -> Option<Rc<RefCell<HookSlot>>> {
        let fingerprint = hook_fingerprint(event, key);
        self.entries
            .iter()
            .find(|entry| {
                entry.fingerprint == fingerprint && entry.event == event && entry.key == key
            })
            .map(|entry| Rc::clone(&entry.slot))
    }

    pub(crate) fn register(&mut self, event: &str, key: &str) -> Rc<RefCell<HookSlot>> {
        let slot = Rc::new(RefCell::new(HookSlot {
            label: format!("{event}/{key}"),
            fired_frame: None,
            value: None,
        }));
        self.entries.push(HookEntry {
            fingerprint: hook_fingerprint(event, key),
            event: event.to_owned(),
            key: key.to_owned(),
            slot: Rc::clone(&slot),
        });
        slot
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Builds the native listener for one hook entry.
///
/// The listener holds the slot weakly: once the node's metadata is dropped
/// the listener stays registered with the host but does nothing.
pub(crate) fn listener(
    slot: Weak<RefCell<HookSlot>>,
    runtime: RuntimeHandle,
    extract: Extractor,
) -> Listener {
    Box::new(move |payload: &dyn Any| {
        let Some(slot) = slot.upgrade() else {
            return;
        };
        let Some(value) = extract(payload) else {
            return;
        };
        {
            let mut slot = slot.borrow_mut();
            slot.value = Some(value);
            slot.fired_frame = Some(runtime.frame());
        }
        runtime.request_rerender();
    })
}

/// Extractor that downcasts the payload to `E` and applies `getter`.
pub(crate) fn typed<E, T>(event: &str, getter: impl Fn(&E) -> T + 'static) -> Extractor
where
    E: 'static,
    T: 'static,
{
    let event = event.to_owned();
    Box::new(move |payload: &dyn Any| match payload.downcast_ref::<E>() {
        Some(payload) => Some(Box::new(getter(payload)) as Box<dyn Any>),
        None => {
            log::warn!(
                "`{event}` payload is not a {}; hook ignored the event",
                std::any::type_name::<E>()
            );
            None
        }
    })
}

/// Extractor for hooks that only record that the event happened.
pub(crate) fn presence() -> Extractor {
    Box::new(|_: &dyn Any| Some(Box::new(true) as Box<dyn Any>))
}

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod tests;
