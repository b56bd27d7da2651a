//! Microtask Queue
//!
//! Deferred work (asynchronous effects, deferred store patches) is pushed
//! onto a per-thread FIFO queue instead of running inline.
//!
//! # Contract
//!
//! A queued task never runs inside the call that queued it. Tasks run at the
//! next checkpoint on the same thread, in the order they were queued:
//!
//! - [`flush_microtasks`] drains the queue synchronously, including tasks
//!   queued by the tasks it runs.
//! - [`tick`] drains the queue and then yields to the tokio scheduler, which
//!   is the natural checkpoint inside async code.
//!
//! # Implementation
//!
//! The queue lives in thread-local storage. Reactivity is single-threaded
//! cooperative, so each thread drains only the work it scheduled itself.

use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::trace;

type Task = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
}

/// Schedule `task` to run at the next checkpoint on this thread.
pub fn queue_microtask<F>(task: F)
where
    F: FnOnce() + 'static,
{
    QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// Number of tasks waiting on this thread.
pub fn pending_microtasks() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

/// Run queued tasks until the queue is empty.
///
/// Returns the number of tasks that ran. The queue borrow is released before
/// each task runs, so tasks are free to queue more work.
pub fn flush_microtasks() -> usize {
    let mut ran = 0;
    while let Some(task) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) {
        task();
        ran += 1;
    }
    if ran > 0 {
        trace!(ran, "flushed microtasks");
    }
    ran
}

/// Drain the microtask queue, then yield to the async runtime.
pub async fn tick() {
    flush_microtasks();
    tokio::task::yield_now().await;
}
