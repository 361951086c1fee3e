pub mod builder;
pub mod state;
mod task;
mod worker;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::errors::{BoxError, CallbackError, PoolError};
use crate::metrics::{PoolMetrics, PoolStats};
use crate::queue::WorkQueue;
use crate::sync::{AdmissionGate, CancelSource, Cancellation, ReadySignal};
use builder::{PoolConfig, WorkerPoolBuilder};
pub use state::PoolState;
use state::AtomicState;
use task::{Callback, ErrorHandler};
use worker::{sampler_loop, worker_loop, LoopGuard, LoopKind, WorkerContext, WorkerHandle};

/// How often `wait_all` re-checks for drain.
const WAIT_TICK: Duration = Duration::from_millis(5);

/// Resources created by one `start` and released by the matching shutdown.
struct Run {
    cancel: CancelSource,
    token: Cancellation,
    gate: Option<Arc<AdmissionGate>>,
    ready: ReadySignal,
    handles: Vec<WorkerHandle>,
    exited: Receiver<()>,
}

impl Run {
    /// Waits until every pool thread of this run has dropped its exit sender.
    fn wait_exit(&self, timeout: Duration) -> Result<(), PoolError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.exited.recv_deadline(deadline) {
                Ok(()) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
                Err(RecvTimeoutError::Timeout) => return Err(PoolError::ShutdownTimeout(timeout)),
            }
        }
    }

    fn join(&mut self) {
        for handle in &mut self.handles {
            handle.join();
        }
    }
}

/// A fixed-size pool of worker threads draining a stream of items of type `T`.
///
/// Items are handed to a single callback. Producers call [`enqueue`](Self::enqueue),
/// which blocks while the configured queue limit of outstanding items is reached.
/// Callback failures, both `Err` returns and panics, are counted and forwarded
/// to the optional error handler; they never stop a worker.
///
/// Configuration methods take `&mut self` and are only valid while the pool is
/// stopped. Everything else takes `&self`, so a started pool can be shared
/// between producer threads.
pub struct WorkerPool<T: Send + 'static> {
    config: PoolConfig,
    callback: Callback<T>,
    on_error: Option<ErrorHandler>,
    queue: Arc<WorkQueue<T>>,
    metrics: Arc<PoolMetrics>,
    state: Arc<AtomicState>,
    live_loops: Arc<AtomicUsize>,
    run: Option<Run>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Creates a stopped pool with `4 × num_cpus` workers.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::from_parts(PoolConfig::default(), task::infallible(callback), None)
    }

    /// Creates a stopped pool with an explicit worker count.
    pub fn with_workers<F>(callback: F, num_workers: usize) -> Result<Self, PoolError>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        WorkerPoolBuilder::new(callback)
            .num_workers(num_workers)
            .build()
    }

    /// Returns a builder for an infallible callback.
    pub fn builder<F>(callback: F) -> WorkerPoolBuilder<T>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        WorkerPoolBuilder::new(callback)
    }

    /// Returns a builder for a callback that reports failure through `Err`.
    pub fn fallible<F, E>(callback: F) -> WorkerPoolBuilder<T>
    where
        F: Fn(T) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        WorkerPoolBuilder::fallible(callback)
    }

    pub(crate) fn from_parts(
        config: PoolConfig,
        callback: Callback<T>,
        on_error: Option<ErrorHandler>,
    ) -> Self {
        Self {
            config,
            callback,
            on_error,
            queue: Arc::new(WorkQueue::new()),
            metrics: Arc::new(PoolMetrics::new()),
            state: Arc::new(AtomicState::new(PoolState::Stopped)),
            live_loops: Arc::new(AtomicUsize::new(0)),
            run: None,
        }
    }

    /// Limits the number of outstanding (queued + in-flight) items. 0 means
    /// unlimited. Only allowed while stopped; takes effect on the next start.
    pub fn limit_queue(&mut self, limit: usize) -> Result<(), PoolError> {
        self.ensure_stopped()?;
        self.config.queue_limit = limit;
        Ok(())
    }

    /// Registers the handler for per-item failures. Only allowed while stopped.
    ///
    /// The handler may run on several workers at once.
    pub fn on_error<H>(&mut self, handler: H) -> Result<(), PoolError>
    where
        H: Fn(CallbackError) + Send + Sync + 'static,
    {
        self.ensure_stopped()?;
        self.on_error = Some(Arc::new(handler));
        Ok(())
    }

    fn ensure_stopped(&self) -> Result<(), PoolError> {
        match self.state.load() {
            PoolState::Stopped => Ok(()),
            actual => Err(PoolError::InvalidState {
                expected: PoolState::Stopped,
                actual,
            }),
        }
    }

    /// Spawns the workers and the sampler. A no-op unless the pool is stopped.
    ///
    /// Restarting a pool that was stopped resets every counter and discards
    /// any backlog the previous run left behind. While the pool is still
    /// `Stopping` this returns `Ok(())` without starting anything, so wait for
    /// [`state`](Self::state) to report `Stopped` before restarting.
    pub fn start(&mut self) -> Result<(), PoolError> {
        if self.state.load() != PoolState::Stopped {
            return Ok(());
        }

        if let Some(mut previous) = self.run.take() {
            previous.join();
        }
        let stale = self.drain_queue();
        if stale > 0 {
            tracing::debug!(discarded = stale, "discarded backlog left by previous run");
        }
        self.metrics.reset();

        let cancel = CancelSource::new();
        let token = cancel.token();
        let gate = (self.config.queue_limit > 0)
            .then(|| Arc::new(AdmissionGate::new(self.config.queue_limit)));
        let (exit_tx, exited) = channel::bounded(0);

        self.state
            .transition(PoolState::Stopped, PoolState::Running)
            .map_err(|actual| PoolError::InvalidState {
                expected: PoolState::Stopped,
                actual,
            })?;

        let mut run = Run {
            cancel,
            token,
            gate,
            ready: ReadySignal::new(),
            handles: Vec::with_capacity(self.config.num_workers + 1),
            exited,
        };
        let spawned = self.spawn_loops(&mut run, exit_tx);
        self.run = Some(run);

        if let Err(e) = spawned {
            self.stop();
            return Err(e);
        }

        tracing::debug!(
            workers = self.config.num_workers,
            queue_limit = self.config.queue_limit,
            "worker pool started"
        );
        Ok(())
    }

    fn spawn_loops(&self, run: &mut Run, exit: Sender<()>) -> Result<(), PoolError> {
        for id in 0..self.config.num_workers {
            let ctx = WorkerContext {
                queue: Arc::clone(&self.queue),
                metrics: Arc::clone(&self.metrics),
                gate: run.gate.clone(),
                ready: run.ready.clone(),
                cancel: run.token.clone(),
                callback: Arc::clone(&self.callback),
                on_error: self.on_error.clone(),
            };
            let guard = self.loop_guard(LoopKind::Worker, exit.clone());
            let name = format!("{}-worker-{}", self.config.thread_name, id);
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(id, ctx, guard))?;
            run.handles.push(WorkerHandle::new(name, handle));
        }

        let metrics = Arc::clone(&self.metrics);
        let token = run.token.clone();
        let interval = self.config.sample_interval;
        let guard = self.loop_guard(LoopKind::Sampler, exit);
        let name = format!("{}-sampler", self.config.thread_name);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || sampler_loop(metrics, token, interval, guard))?;
        run.handles.push(WorkerHandle::new(name, handle));

        Ok(())
    }

    fn loop_guard(&self, kind: LoopKind, exit: Sender<()>) -> LoopGuard {
        LoopGuard::new(
            kind,
            Arc::clone(&self.metrics),
            Arc::clone(&self.state),
            Arc::clone(&self.live_loops),
            exit,
        )
    }

    /// Signals every pool thread to exit and returns immediately.
    ///
    /// Items already inside the callback run to completion; queued items stay
    /// queued until [`clear`](Self::clear), a restart or dispose.
    pub fn stop(&self) {
        if self
            .state
            .transition(PoolState::Running, PoolState::Stopping)
            .is_err()
        {
            return;
        }
        if let Some(run) = &self.run {
            run.cancel.cancel();
        }
        // Covers a start that failed before any thread was alive.
        if self.live_loops.load(Ordering::Acquire) == 0 {
            let _ = self
                .state
                .transition(PoolState::Stopping, PoolState::Stopped);
        }
        tracing::debug!(enqueued = self.enqueued(), "worker pool stopping");
    }

    /// Stops the pool, waits up to the configured shutdown timeout for its
    /// threads and releases every resource. Equivalent to dropping the pool.
    pub fn dispose(self) {
        drop(self);
    }

    fn shutdown(&mut self) {
        self.stop();
        let Some(mut run) = self.run.take() else {
            return;
        };

        match run.wait_exit(self.config.shutdown_timeout) {
            Ok(()) => run.join(),
            Err(error) => {
                // Threads still inside a callback are detached, not killed.
                tracing::warn!(%error, "worker pool shutdown incomplete");
            }
        }

        let discarded = self.drain_queue();
        if discarded > 0 {
            tracing::debug!(discarded, "dropped unprocessed items on dispose");
        }
    }

    /// Admits one item, blocking while the queue limit is reached.
    ///
    /// Fails with `InvalidState` if the pool is not running, including when it
    /// stops while this call is blocked on admission.
    pub fn enqueue(&self, item: T) -> Result<(), PoolError> {
        let run = self.live_run()?;
        if let Some(gate) = &run.gate {
            gate.acquire(&run.token)?;
        }
        self.push(run, item);
        Ok(())
    }

    /// Enqueues `Some` items; `None` is silently ignored, whatever the state.
    pub fn enqueue_opt(&self, item: Option<T>) -> Result<(), PoolError> {
        match item {
            Some(item) => self.enqueue(item),
            None => Ok(()),
        }
    }

    /// Like [`enqueue`](Self::enqueue) but gives up with `AdmissionTimeout` if
    /// no slot frees up within `timeout`.
    pub fn enqueue_timeout(&self, item: T, timeout: Duration) -> Result<(), PoolError> {
        let run = self.live_run()?;
        if let Some(gate) = &run.gate {
            gate.acquire_timeout(&run.token, timeout)?;
        }
        self.push(run, item);
        Ok(())
    }

    /// Enqueues every item in order, stopping at the first error.
    pub fn enqueue_all<I>(&self, items: I) -> Result<(), PoolError>
    where
        I: IntoIterator<Item = T>,
    {
        items.into_iter().try_for_each(|item| self.enqueue(item))
    }

    fn live_run(&self) -> Result<&Run, PoolError> {
        match (&self.run, self.state.load()) {
            (Some(run), PoolState::Running) => Ok(run),
            (_, actual) => Err(PoolError::InvalidState {
                expected: PoolState::Running,
                actual,
            }),
        }
    }

    fn push(&self, run: &Run, item: T) {
        self.metrics.backlog.admit();
        self.queue.push(item);
        run.ready.notify_one();
    }

    /// Discards every queued item without running it and returns how many
    /// were dropped. Each discarded item frees its admission slot.
    pub fn clear(&self) -> usize {
        let mut discarded = 0;
        while self.queue.pop().is_some() {
            self.metrics.backlog.discard();
            if let Some(run) = &self.run {
                run.ready.revoke_one();
                if let Some(gate) = &run.gate {
                    gate.release();
                }
            }
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!(discarded, "cleared queued items");
        }
        discarded
    }

    fn drain_queue(&self) -> usize {
        let mut discarded = 0;
        while self.queue.pop().is_some() {
            discarded += 1;
        }
        discarded
    }

    /// Blocks until nothing is queued or in flight. Does not stop the pool.
    pub fn wait_all(&self) -> Result<(), PoolError> {
        self.wait_all_with(|_| {})
    }

    /// Like [`wait_all`](Self::wait_all), calling `on_tick` with a fresh
    /// snapshot on every poll while work remains.
    ///
    /// Fails with `InvalidState` if the pool stops while work is outstanding,
    /// since that work would never drain.
    pub fn wait_all_with<F>(&self, mut on_tick: F) -> Result<(), PoolError>
    where
        F: FnMut(&PoolStats),
    {
        loop {
            let stats = self.stats();
            if stats.outstanding() == 0 {
                return Ok(());
            }
            if stats.state != PoolState::Running {
                return Err(PoolError::InvalidState {
                    expected: PoolState::Running,
                    actual: stats.state,
                });
            }
            on_tick(&stats);
            thread::sleep(WAIT_TICK);
        }
    }

    /// [`wait_all`](Self::wait_all) followed by [`stop`](Self::stop).
    pub fn wait_all_and_stop(&self) -> Result<(), PoolError> {
        self.wait_all()?;
        self.stop();
        Ok(())
    }

    /// [`wait_all_with`](Self::wait_all_with) followed by [`stop`](Self::stop).
    pub fn wait_all_and_stop_with<F>(&self, on_tick: F) -> Result<(), PoolError>
    where
        F: FnMut(&PoolStats),
    {
        self.wait_all_with(on_tick)?;
        self.stop();
        Ok(())
    }

    /// Admitted items that have not started.
    pub fn enqueued(&self) -> usize {
        self.metrics.backlog.load().0
    }

    /// Items currently inside the callback.
    pub fn currently_processing(&self) -> usize {
        self.metrics.backlog.load().1
    }

    /// Worker threads currently alive.
    pub fn workers(&self) -> usize {
        self.metrics.active_workers()
    }

    pub fn processed(&self) -> usize {
        self.metrics.processed()
    }

    pub fn failed(&self) -> usize {
        self.metrics.failed()
    }

    /// Items finished in the last completed sampling interval, or the live
    /// count of the current interval before the first sample.
    pub fn processed_last_second(&self) -> usize {
        self.metrics.throughput.last()
    }

    /// Mean of the non-zero samples in the rolling window.
    pub fn processed_per_second_average(&self) -> f64 {
        self.metrics.throughput.average()
    }

    /// Configured queue limit, 0 when unlimited.
    pub fn queue_limit(&self) -> usize {
        self.config.queue_limit
    }

    pub fn state(&self) -> PoolState {
        self.state.load()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Reads every counter. Queued and in-flight counts come from a single
    /// atomic load and are consistent with each other.
    pub fn stats(&self) -> PoolStats {
        let (enqueued, currently_processing) = self.metrics.backlog.load();
        PoolStats {
            state: self.state.load(),
            enqueued,
            currently_processing,
            workers: self.metrics.active_workers(),
            processed: self.metrics.processed(),
            failed: self.metrics.failed(),
            processed_last_second: self.metrics.throughput.last(),
            processed_per_second_average: self.metrics.throughput.average(),
            queue_limit: self.config.queue_limit,
        }
    }
}

impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
