//! Item callback and error handler plumbing.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::errors::{panic_message, BoxError, CallbackError};

/// The per-item callback, shared by every worker.
pub(crate) type Callback<T> = Arc<dyn Fn(T) -> Result<(), BoxError> + Send + Sync + 'static>;

/// Receives every per-item failure. May be called from several workers at once.
pub(crate) type ErrorHandler = Arc<dyn Fn(CallbackError) + Send + Sync + 'static>;

pub(crate) fn infallible<T, F>(f: F) -> Callback<T>
where
    T: 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    Arc::new(move |item: T| -> Result<(), BoxError> {
        f(item);
        Ok(())
    })
}

pub(crate) fn fallible<T, F, E>(f: F) -> Callback<T>
where
    T: 'static,
    F: Fn(T) -> Result<(), E> + Send + Sync + 'static,
    E: Into<BoxError> + 'static,
{
    Arc::new(move |item: T| -> Result<(), BoxError> { f(item).map_err(Into::into) })
}

/// Runs the callback for one item, turning both `Err` and panics into a
/// `CallbackError`.
pub(crate) fn run_isolated<T>(callback: &Callback<T>, item: T) -> Result<(), CallbackError> {
    match catch_unwind(AssertUnwindSafe(|| callback(item))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(CallbackError::Failed(e)),
        Err(payload) => Err(CallbackError::from_panic(payload)),
    }
}

/// Forwards a failure to the handler. A panicking handler is logged and swallowed.
pub(crate) fn report(handler: Option<&ErrorHandler>, error: CallbackError) {
    let Some(handler) = handler else {
        return;
    };
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(error))) {
        tracing::error!(panic = %panic_message(payload.as_ref()), "error handler panicked");
    }
}
