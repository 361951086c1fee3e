//! Lock-free FIFO holding admitted items that have not started yet.

use crossbeam::queue::SegQueue;

pub(crate) struct WorkQueue<T> {
    inner: SegQueue<T>,
}

impl<T> WorkQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: SegQueue::new(),
        }
    }

    pub(crate) fn push(&self, item: T) {
        self.inner.push(item);
    }

    pub(crate) fn pop(&self) -> Option<T> {
        self.inner.pop()
    }
}
