//! # threadlord
//!
//! `threadlord` is a bounded, self-throttling worker pool: producers push a
//! continuous stream of items and a fixed set of worker threads drains them
//! through a single callback.
//!
//! ## Features
//! - Fixed number of worker threads, `4 × num_cpus` by default.
//! - Optional queue limit that blocks producers while too much work is outstanding.
//! - Per-item error isolation: `Err` returns and panics are counted, never fatal.
//! - Live counters and a rolling one-second throughput average.
//! - Cooperative shutdown with a bounded wait on dispose.
//!
//! ## Usage
//!
//! ### Basic Usage
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use threadlord::WorkerPool;
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//!
//! let mut pool = WorkerPool::with_workers(
//!     move |_item: u32| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     },
//!     4,
//! )
//! .unwrap();
//!
//! pool.start().unwrap();
//! for i in 0..100 {
//!     pool.enqueue(i).unwrap();
//! }
//! pool.wait_all_and_stop().unwrap();
//!
//! assert_eq!(seen.load(Ordering::SeqCst), 100);
//! assert_eq!(pool.processed(), 100);
//! ```
//!
//! ### Backpressure
//! ```rust
//! use threadlord::WorkerPool;
//!
//! let mut pool = WorkerPool::with_workers(|_: u32| {}, 2).unwrap();
//! pool.limit_queue(8).unwrap();
//! pool.start().unwrap();
//!
//! // Blocks whenever 8 items are queued or running.
//! pool.enqueue_all(0..64).unwrap();
//! pool.wait_all_and_stop().unwrap();
//! ```
//!
//! ### Handling Failures
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use threadlord::WorkerPool;
//!
//! let errors = Arc::new(AtomicUsize::new(0));
//! let seen = Arc::clone(&errors);
//!
//! let mut pool = WorkerPool::fallible(|n: i32| {
//!     if n < 0 {
//!         return Err(format!("negative input {n}"));
//!     }
//!     Ok(())
//! })
//! .num_workers(2)
//! .on_error(move |_err| {
//!     seen.fetch_add(1, Ordering::SeqCst);
//! })
//! .build()
//! .unwrap();
//!
//! pool.start().unwrap();
//! pool.enqueue_all([1, -1, 2, -2]).unwrap();
//! pool.wait_all_and_stop().unwrap();
//!
//! assert_eq!(pool.failed(), 2);
//! assert_eq!(errors.load(Ordering::SeqCst), 2);
//! ```

mod errors;
#[macro_use]
mod macros;
pub mod metrics;
pub mod pool;
mod queue;
mod sync;

pub use errors::{BoxError, CallbackError, PoolError};
pub use metrics::PoolStats;
pub use pool::builder::{PoolConfig, WorkerPoolBuilder};
pub use pool::{PoolState, WorkerPool};

#[doc(hidden)]
pub use tracing as __tracing;
