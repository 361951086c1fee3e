//! Channel-backed coordination primitives used by the pool.
//!
//! All three primitives are thin wrappers over `crossbeam::channel`:
//! - [`AdmissionGate`]: a bounded channel whose occupancy is the number of
//!   outstanding items. Acquiring blocks while it is full.
//! - [`ReadySignal`]: an unbounded MPMC channel of unit tokens. Each token wakes
//!   exactly one receiving worker.
//! - [`CancelSource`] / [`Cancellation`]: a zero-capacity channel that is never
//!   sent on. Dropping the sender disconnects every receiver at once.

use std::sync::Mutex;
use std::time::Duration;

use crossbeam::channel::{self, select, Receiver, Sender, TryRecvError};

use crate::errors::PoolError;
use crate::pool::PoolState;

/// Bounds the number of outstanding (queued + in-flight) items.
#[derive(Debug)]
pub(crate) struct AdmissionGate {
    slots: Sender<()>,
    taken: Receiver<()>,
}

impl AdmissionGate {
    /// Creates a gate with `limit` free slots. `limit` must be non-zero.
    pub(crate) fn new(limit: usize) -> Self {
        let (slots, taken) = channel::bounded(limit);
        Self { slots, taken }
    }

    /// Blocks until a slot is free, or fails once `cancel` fires.
    pub(crate) fn acquire(&self, cancel: &Cancellation) -> Result<(), PoolError> {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        select! {
            send(self.slots, ()) -> res => res.map_err(|_| cancelled()),
            recv(cancel.rx) -> _ => Err(cancelled()),
        }
    }

    /// Like [`acquire`](Self::acquire) but gives up after `timeout`.
    pub(crate) fn acquire_timeout(
        &self,
        cancel: &Cancellation,
        timeout: Duration,
    ) -> Result<(), PoolError> {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        select! {
            send(self.slots, ()) -> res => res.map_err(|_| cancelled()),
            recv(cancel.rx) -> _ => Err(cancelled()),
            default(timeout) => Err(PoolError::AdmissionTimeout(timeout)),
        }
    }

    /// Frees one slot. Releasing an empty gate is a no-op.
    pub(crate) fn release(&self) {
        let _ = self.taken.try_recv();
    }

    /// Number of slots currently held.
    #[cfg(test)]
    fn in_use(&self) -> usize {
        self.slots.len()
    }
}

fn cancelled() -> PoolError {
    PoolError::InvalidState {
        expected: PoolState::Running,
        actual: PoolState::Stopping,
    }
}

/// Counting wake-up signal between producers and idle workers.
#[derive(Debug, Clone)]
pub(crate) struct ReadySignal {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl ReadySignal {
    pub(crate) fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    /// Releases one unit, waking at most one worker.
    pub(crate) fn notify_one(&self) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(());
    }

    /// Takes back one unit that no worker consumed yet.
    pub(crate) fn revoke_one(&self) -> bool {
        self.rx.try_recv().is_ok()
    }

    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

/// Owner side of a cancellation context.
#[derive(Debug)]
pub(crate) struct CancelSource {
    tx: Mutex<Option<Sender<()>>>,
    rx: Receiver<()>,
}

impl CancelSource {
    pub(crate) fn new() -> Self {
        let (tx, rx) = channel::bounded(0);
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Returns a receiver-side token bound to this source.
    pub(crate) fn token(&self) -> Cancellation {
        Cancellation {
            rx: self.rx.clone(),
        }
    }

    /// Fires cancellation. Returns `false` if it had already fired.
    pub(crate) fn cancel(&self) -> bool {
        match self.tx.lock() {
            Ok(mut guard) => guard.take().is_some(),
            Err(poisoned) => poisoned.into_inner().take().is_some(),
        }
    }
}

/// Cheap, clonable view of a cancellation context.
#[derive(Debug, Clone)]
pub(crate) struct Cancellation {
    rx: Receiver<()>,
}

impl Cancellation {
    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver that becomes ready (disconnected) once cancellation fires.
    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}
