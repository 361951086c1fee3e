//! # Macros for `threadlord`

/// Logs the current statistics of a worker pool as one `tracing` event.
///
/// # Example
/// ```rust
/// use threadlord::{log_stats, WorkerPool};
///
/// let pool = WorkerPool::with_workers(|_: u8| {}, 1).unwrap();
/// log_stats!(pool);
/// ```
#[macro_export]
macro_rules! log_stats {
    ($pool:expr) => {{
        let stats = $pool.stats();
        $crate::__tracing::info!(
            state = %stats.state,
            enqueued = stats.enqueued,
            currently_processing = stats.currently_processing,
            workers = stats.workers,
            processed = stats.processed,
            failed = stats.failed,
            processed_last_second = stats.processed_last_second,
            processed_per_second_average = stats.processed_per_second_average,
            queue_limit = stats.queue_limit,
            "worker pool stats"
        );
    }};
}
