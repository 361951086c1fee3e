//! Pool configuration and the fluent builder.

use std::marker::PhantomData;
use std::time::Duration;

use super::task::{self, Callback, ErrorHandler};
use super::WorkerPool;
use crate::errors::{BoxError, CallbackError, PoolError};

/// Workers spawned per logical CPU when no explicit count is given.
pub const WORKERS_PER_CPU: usize = 4;

/// Static configuration of a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads spawned on start.
    pub num_workers: usize,
    /// Maximum outstanding (queued + in-flight) items, 0 for unlimited.
    pub queue_limit: usize,
    /// Upper bound on how long dispose waits for pool threads to exit.
    pub shutdown_timeout: Duration,
    /// Length of one throughput sampling interval.
    pub sample_interval: Duration,
    /// Prefix for the names of pool threads.
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: WORKERS_PER_CPU * num_cpus::get(),
            queue_limit: 0,
            shutdown_timeout: Duration::from_secs(5),
            sample_interval: Duration::from_secs(1),
            thread_name: "threadlord".to_string(),
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.num_workers == 0 {
            return Err(PoolError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.sample_interval.is_zero() {
            return Err(PoolError::InvalidConfig(
                "sample interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`WorkerPool`].
///
/// ```rust
/// use threadlord::WorkerPoolBuilder;
///
/// let mut pool = WorkerPoolBuilder::new(|n: u64| {
///     let _ = n * 2;
/// })
/// .num_workers(2)
/// .queue_limit(16)
/// .build()
/// .unwrap();
///
/// pool.start().unwrap();
/// pool.enqueue(21).unwrap();
/// pool.wait_all_and_stop().unwrap();
/// assert_eq!(pool.processed(), 1);
/// ```
pub struct WorkerPoolBuilder<T> {
    config: PoolConfig,
    callback: Callback<T>,
    on_error: Option<ErrorHandler>,
    _item: PhantomData<fn(T)>,
}

impl<T: Send + 'static> WorkerPoolBuilder<T> {
    /// Starts a builder for an infallible callback. Panics inside it still count
    /// as failures.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::with_callback(task::infallible(callback))
    }

    /// Starts a builder for a callback that reports failure through `Err`.
    pub fn fallible<F, E>(callback: F) -> Self
    where
        F: Fn(T) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::with_callback(task::fallible(callback))
    }

    fn with_callback(callback: Callback<T>) -> Self {
        Self {
            config: PoolConfig::default(),
            callback,
            on_error: None,
            _item: PhantomData,
        }
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.config.num_workers = n;
        self
    }

    /// Limits outstanding items. 0 means unlimited.
    pub fn queue_limit(mut self, limit: usize) -> Self {
        self.config.queue_limit = limit;
        self
    }

    pub fn on_error<H>(mut self, handler: H) -> Self
    where
        H: Fn(CallbackError) + Send + Sync + 'static,
    {
        self.on_error = Some(std::sync::Arc::new(handler));
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.config.sample_interval = interval;
        self
    }

    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name = prefix.into();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and creates a stopped pool.
    pub fn build(self) -> Result<WorkerPool<T>, PoolError> {
        self.config.validate()?;
        Ok(WorkerPool::from_parts(
            self.config,
            self.callback,
            self.on_error,
        ))
    }
}
