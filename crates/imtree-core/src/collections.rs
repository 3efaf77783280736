//! Maps and hashing behind the side tables.
//!
//! `hashbrown` with `ahash` by default; the `std-hash` feature swaps both for
//! their standard library counterparts.

use std::hash::{Hash, Hasher};

#[cfg(feature = "std-hash")]
pub(crate) use std::collections::{HashMap, HashSet};
#[cfg(feature = "std-hash")]
type Fingerprinter = std::collections::hash_map::DefaultHasher;

#[cfg(not(feature = "std-hash"))]
pub(crate) use hashbrown::{HashMap, HashSet};
#[cfg(not(feature = "std-hash"))]
type Fingerprinter = ahash::AHasher;

/// Fingerprint of a hook registration: the event name plus the caller's key.
pub(crate) fn hook_fingerprint(event: &str, key: &str) -> u64 {
    let mut hasher = Fingerprinter::default();
    event.hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}
