//! Lifecycle state of the pool.
//!
//! The state moves `Stopped -> Running` on start, `Running -> Stopping` on stop,
//! and `Stopping -> Stopped` once the last pool thread has exited.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a [`WorkerPool`](crate::WorkerPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolState {
    /// No pool thread is alive. The pool can be configured and started.
    Stopped,
    /// Workers and the sampler are live and items are accepted.
    Running,
    /// Cancellation fired; pool threads are winding down.
    Stopping,
}

impl PoolState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => PoolState::Running,
            2 => PoolState::Stopping,
            _ => PoolState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            PoolState::Stopped => 0,
            PoolState::Running => 1,
            PoolState::Stopping => 2,
        }
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolState::Stopped => write!(f, "stopped"),
            PoolState::Running => write!(f, "running"),
            PoolState::Stopping => write!(f, "stopping"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn new(state: PoolState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub(crate) fn load(&self) -> PoolState {
        PoolState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves `from -> to`. Returns the observed state on failure.
    pub(crate) fn transition(&self, from: PoolState, to: PoolState) -> Result<(), PoolState> {
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(PoolState::from_u8)
    }
}
