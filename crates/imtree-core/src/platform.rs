//! Platform abstraction traits for the reconciler's runtime services.
//!
//! The core never decides *when* a pass runs. It raises the dirty flag and
//! tells the host's scheduler that a frame is wanted; the host loop polls
//! and runs the pass on its own paint-aligned turn.

/// Receives frame requests from the runtime.
///
/// `schedule_frame` may be called from inside native event listeners, so
/// implementations must only record the request and return; they must never
/// run a reconciliation pass synchronously. They must be safe to share with
/// threads that only want to wake the host loop.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host schedule a new pass.
    fn schedule_frame(&self);
}

/// Provides timing information for frame statistics.
pub trait Clock: Send + Sync {
    /// Instant type produced by this clock implementation.
    type Instant: Copy + Send + Sync;

    /// Returns the current instant.
    fn now(&self) -> Self::Instant;

    /// Returns the time elapsed since `since`.
    fn elapsed(&self, since: Self::Instant) -> std::time::Duration;
}
