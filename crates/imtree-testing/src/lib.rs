//! Testing utilities and harness for imtree views.

pub mod harness;

pub use harness::*;

pub mod prelude {
    pub use crate::harness::*;
    pub use imtree_core::{Cursor, FrameError, FrameReport, Host, HostOp, NodeId};
}
