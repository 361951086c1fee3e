//! Error types for the worker pool.
//!
//! This module defines the errors surfaced synchronously to callers of the pool
//! (`PoolError`) and the per-item failures that are contained inside the pool and
//! only forwarded to the registered error handler (`CallbackError`).

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

use crate::pool::PoolState;

/// Boxed error type returned by fallible item callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The operation is not allowed in the pool's current lifecycle state.
    #[error("pool is {actual}, operation requires {expected}")]
    InvalidState {
        expected: PoolState,
        actual: PoolState,
    },

    /// The pool was configured with values it cannot run with.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No admission slot became free before the deadline.
    #[error("no admission slot became available within {0:?}")]
    AdmissionTimeout(Duration),

    /// Worker loops did not exit within the bounded shutdown wait.
    #[error("worker loops did not exit within {0:?}")]
    ShutdownTimeout(Duration),

    /// The operating system refused to spawn a pool thread.
    #[error("failed to spawn pool thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A failure of the user callback for a single item.
///
/// These never cross the pool boundary except through the error handler
/// registered with [`WorkerPool::on_error`](crate::WorkerPool::on_error).
#[derive(Debug, Error)]
pub enum CallbackError {
    /// A fallible callback returned `Err`.
    #[error("callback failed: {0}")]
    Failed(BoxError),

    /// The callback panicked.
    #[error("callback panicked: {0}")]
    Panicked(String),
}

impl CallbackError {
    /// Builds a `Panicked` error from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        CallbackError::Panicked(panic_message(payload.as_ref()))
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, CallbackError::Panicked(_))
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
