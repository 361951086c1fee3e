//! Worker and sampler thread bodies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, select, Sender};

use super::state::{AtomicState, PoolState};
use super::task::{report, run_isolated, Callback, ErrorHandler};
use crate::metrics::PoolMetrics;
use crate::queue::WorkQueue;
use crate::sync::{AdmissionGate, Cancellation, ReadySignal};

pub(crate) struct WorkerHandle {
    name: String,
    thread: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn new(name: String, thread: thread::JoinHandle<()>) -> Self {
        Self {
            name,
            thread: Some(thread),
        }
    }

    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!(thread = %self.name, "pool thread panicked outside of a callback");
            }
        }
    }
}

/// Everything a worker loop needs for one run of the pool.
pub(crate) struct WorkerContext<T> {
    pub(crate) queue: Arc<WorkQueue<T>>,
    pub(crate) metrics: Arc<PoolMetrics>,
    pub(crate) gate: Option<Arc<AdmissionGate>>,
    pub(crate) ready: ReadySignal,
    pub(crate) cancel: Cancellation,
    pub(crate) callback: Callback<T>,
    pub(crate) on_error: Option<ErrorHandler>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopKind {
    Worker,
    Sampler,
}

/// Tracks one live pool thread. Dropping the last guard of a stopping pool
/// moves it to `Stopped`; dropping the exit sender lets `dispose` observe it.
pub(crate) struct LoopGuard {
    kind: LoopKind,
    metrics: Arc<PoolMetrics>,
    state: Arc<AtomicState>,
    live_loops: Arc<AtomicUsize>,
    _exit: Sender<()>,
}

impl LoopGuard {
    pub(crate) fn new(
        kind: LoopKind,
        metrics: Arc<PoolMetrics>,
        state: Arc<AtomicState>,
        live_loops: Arc<AtomicUsize>,
        exit: Sender<()>,
    ) -> Self {
        live_loops.fetch_add(1, Ordering::AcqRel);
        if kind == LoopKind::Worker {
            metrics.on_worker_started();
        }
        Self {
            kind,
            metrics,
            state,
            live_loops,
            _exit: exit,
        }
    }
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        if self.kind == LoopKind::Worker {
            self.metrics.on_worker_stopped();
        }
        if self.live_loops.fetch_sub(1, Ordering::AcqRel) == 1
            && self
                .state
                .transition(PoolState::Stopping, PoolState::Stopped)
                .is_ok()
        {
            tracing::debug!("worker pool stopped");
        }
    }
}

/// Worker thread main loop
pub(crate) fn worker_loop<T>(id: usize, ctx: WorkerContext<T>, guard: LoopGuard) {
    let _guard = guard;

    loop {
        select! {
            recv(ctx.ready.receiver()) -> unit => {
                if unit.is_err() {
                    break;
                }
            }
            recv(ctx.cancel.receiver()) -> _ => break,
        }

        if ctx.cancel.is_cancelled() {
            break;
        }

        // A signal unit can outlive its item when `clear` races a worker.
        let Some(item) = ctx.queue.pop() else {
            continue;
        };

        ctx.metrics.backlog.begin();
        let outcome = run_isolated(&ctx.callback, item);

        if let Err(error) = outcome {
            tracing::debug!(worker = id, %error, "item callback failed");
            ctx.metrics.on_item_failed();
            report(ctx.on_error.as_ref(), error);
        }

        ctx.metrics.on_item_finished();
        if let Some(gate) = &ctx.gate {
            gate.release();
        }
    }

    tracing::trace!(worker = id, "worker exited");
}

/// Closes one throughput interval per tick until cancelled.
pub(crate) fn sampler_loop(
    metrics: Arc<PoolMetrics>,
    cancel: Cancellation,
    interval: Duration,
    guard: LoopGuard,
) {
    let _guard = guard;
    let ticker = channel::tick(interval);

    loop {
        select! {
            recv(ticker) -> _ => {
                let processed = metrics.throughput.sample();
                tracing::trace!(processed, "throughput sample");
            }
            recv(cancel.receiver()) -> _ => break,
        }
    }
}
