use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;
use thiserror::Error;

/// A [`Resolver`] was dropped without producing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deferred value was abandoned before it resolved")]
pub struct Abandoned;

type Continuation<T> = Box<dyn FnOnce(Result<T, Abandoned>) + Send>;

struct Shared<T> {
    settled: bool,
    outcome: Option<Result<T, Abandoned>>,
    continuation: Option<Continuation<T>>,
}

/// A value that becomes available on a later turn.
pub struct Pending<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

/// Producer half of a [`Pending`] value.
pub struct Resolver<T> {
    shared: Option<Arc<Mutex<Shared<T>>>>,
}

impl<T: Send + 'static> Pending<T> {
    /// Creates an unresolved value together with the handle that resolves it.
    pub fn channel() -> (Pending<T>, Resolver<T>) {
        let shared = Arc::new(Mutex::new(Shared {
            settled: false,
            outcome: None,
            continuation: None,
        }));
        (
            Pending {
                shared: Arc::clone(&shared),
            },
            Resolver {
                shared: Some(shared),
            },
        )
    }

    /// Creates a value that is already resolved.
    pub fn ready(value: T) -> Pending<T> {
        let (pending, resolver) = Self::channel();
        resolver.resolve(value);
        pending
    }

    pub fn is_settled(&self) -> bool {
        self.shared.lock().settled
    }

    /// Consumes the value if it has settled; otherwise hands it back so a
    /// continuation can still be attached.
    pub fn try_take(self) -> Result<Result<T, Abandoned>, Self> {
        let outcome = self.shared.lock().outcome.take();
        outcome.ok_or(self)
    }

    /// Registers the continuation run once the value settles.
    ///
    /// If the outcome is already available the continuation runs on the
    /// calling thread before `then` returns.
    pub fn then<F>(self, continuation: F)
    where
        F: FnOnce(Result<T, Abandoned>) + Send + 'static,
    {
        let mut guard = self.shared.lock();
        match guard.outcome.take() {
            Some(outcome) => {
                drop(guard);
                continuation(outcome);
            }
            None => guard.continuation = Some(Box::new(continuation)),
        }
    }
}

impl<T> Resolver<T> {
    pub fn resolve(mut self, value: T) {
        if let Some(shared) = self.shared.take() {
            settle(&shared, Ok(value));
        }
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            settle(&shared, Err(Abandoned));
        }
    }
}

fn settle<T>(shared: &Mutex<Shared<T>>, outcome: Result<T, Abandoned>) {
    let mut guard = shared.lock();
    guard.settled = true;
    match guard.continuation.take() {
        Some(continuation) => {
            drop(guard);
            continuation(outcome);
        }
        None => guard.outcome = Some(outcome),
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("settled", &self.shared.lock().settled)
            .finish()
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("live", &self.shared.is_some())
            .finish()
    }
}

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Schedules work for a later turn of the event loop.
pub trait Defer: Send + Sync {
    fn defer(&self, task: Task);
}

impl<T> Defer for Arc<T>
where
    T: Defer + ?Sized,
{
    fn defer(&self, task: Task) {
        (**self).defer(task)
    }
}

/// Single-threaded FIFO task queue. Clones share the same queue.
#[derive(Default)]
pub struct EventLoop {
    queue: Arc<Mutex<VecDeque<Task>>>,
}

impl Clone for EventLoop {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a type-erased scheduling handle onto this queue.
    pub fn handle(&self) -> Arc<dyn Defer> {
        Arc::new(self.clone())
    }

    /// Number of tasks waiting for the next turn.
    pub fn pending_tasks(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs the tasks queued before this call. Tasks they schedule wait
    /// for the next turn.
    pub fn run_once(&self) -> usize {
        let batch = std::mem::take(&mut *self.queue.lock());
        let count = batch.len();
        for task in batch {
            task();
        }
        count
    }

    /// Keeps turning until no task is left.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.run_once();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }
}

impl Defer for EventLoop {
    fn defer(&self, task: Task) {
        let mut queue = self.queue.lock();
        queue.push_back(task);
        trace!("deferred task queued ({} waiting)", queue.len());
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}
