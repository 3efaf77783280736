//! Frame-persistent, per-node bag of application data.

use std::any::Any;
use std::fmt;

use crate::collections::HashMap;

/// Arbitrary keyed values attached to one node.
///
/// The bag lives as long as the node is kept by the reconciler, so view code
/// can stash counters or cached results on an element and find them again on
/// the next pass.
#[derive(Default)]
pub struct ElementState {
    values: HashMap<String, Box<dyn Any>>,
}

impl ElementState {
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key)?.downcast_mut::<T>()
    }

    /// Returns the value under `key`, creating it with `init` if the key is
    /// absent or holds a value of another type.
    pub fn get_or_insert_with<T: 'static>(
        &mut self,
        key: &str,
        init: impl FnOnce() -> T,
    ) -> &mut T {
        let present = self
            .values
            .get(key)
            .is_some_and(|value| value.downcast_ref::<T>().is_some());
        if !present {
            if self.values.contains_key(key) {
                log::warn!(
                    "element state `{key}` replaced by a value of type {}",
                    std::any::type_name::<T>()
                );
            }
            self.values.insert(key.to_owned(), Box::new(init()));
        }
        match self.values.get_mut(key).and_then(|value| value.downcast_mut::<T>()) {
            Some(value) => value,
            None => unreachable!("element state `{key}` was just inserted"),
        }
    }

    pub fn insert<T: 'static>(&mut self, key: &str, value: T) {
        self.values.insert(key.to_owned(), Box::new(value));
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
