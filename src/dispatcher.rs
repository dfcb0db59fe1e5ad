use crate::imp;
use crate::job_queue::{Job, JobQueue};
use crate::Error;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex};

/// The capabilities a dispatcher needs from the platform's main thread.
///
/// Every backend (and every [`HostRelay`](crate::HostRelay)) implements this.
pub trait MainThread: Send + Sync + 'static {
    /// Whether the calling thread is the main thread. Must be cheap.
    fn is_main_thread(&self) -> bool;

    /// Asks the main thread to drain the bound queue soon.
    ///
    /// Called from any thread, possibly while a wake is already pending.
    /// Wakes may be coalesced as long as the queue is fully drained
    /// once the main thread gets to it.
    fn schedule_wake(&self);
}

impl<T: MainThread> MainThread for Arc<T> {
    fn is_main_thread(&self) -> bool {
        (**self).is_main_thread()
    }

    fn schedule_wake(&self) {
        (**self).schedule_wake()
    }
}

/// Runs jobs on the main thread.
///
/// Jobs run in the order in which they were enqueued, across all
/// producer threads. There is no capacity limit: if the main thread
/// stalls, the queue keeps growing.
pub struct Dispatcher {
    queue: Arc<JobQueue>,
    main_thread: Box<dyn MainThread>,
}

impl Dispatcher {
    /// Creates a dispatcher bound to this platform's native main thread.
    ///
    /// Returns [`Error::Unsupported`] on targets without a native backend.
    pub fn new() -> Result<Self, Error> {
        let queue = Arc::new(JobQueue::new());
        let main_thread = imp::bind(Arc::clone(&queue))?;
        Ok(Self {
            queue,
            main_thread: Box::new(main_thread),
        })
    }

    /// Creates a dispatcher from a custom main-thread binding.
    ///
    /// `bind` receives the queue that the binding has to drain
    /// on the main thread whenever it is woken.
    pub fn with_main_thread<M: MainThread>(bind: impl FnOnce(Arc<JobQueue>) -> M) -> Self {
        let queue = Arc::new(JobQueue::new());
        let main_thread = bind(Arc::clone(&queue));
        Self {
            queue,
            main_thread: Box::new(main_thread),
        }
    }

    /// Enqueues `job` and wakes the main thread. Does not wait for `job` to run.
    pub fn run_async(&self, job: impl FnOnce() + Send + 'static) {
        self.enqueue(Box::new(job));
    }

    /// Runs `job` on the main thread and blocks until it has returned.
    ///
    /// On the main thread itself, `job` runs immediately in place.
    ///
    /// There is no timeout: if the main thread never drains the queue,
    /// this blocks forever.
    ///
    /// # Panics
    /// Panics if `job` was dropped before it returned, i.e. it panicked on the
    /// main thread or the dispatcher was torn down while `job` was still queued.
    pub fn run_sync(&self, job: impl FnOnce() + Send + 'static) {
        if self.is_main_thread() {
            job();
            return;
        }

        let completion = Arc::new(Completion::new());
        let guard = CompletionGuard(Some(Arc::clone(&completion)));
        self.enqueue(Box::new(move || {
            job();
            guard.finish();
        }));

        match completion.wait() {
            State::Finished => {}
            State::Abandoned => {
                panic!("job was dropped on the main thread before it returned")
            }
            State::Pending => unreachable!("wait only returns once the job is settled"),
        }
    }

    /// Runs `job` on the main thread and returns a future that resolves once
    /// `job` has returned.
    ///
    /// On the main thread itself, `job` runs immediately and the returned
    /// future is already complete. The future resolves to [`Canceled`] if
    /// `job` was dropped before it returned.
    ///
    /// [`Canceled`]: futures_channel::oneshot::Canceled
    #[cfg(feature = "future")]
    pub fn run_notify(&self, job: impl FnOnce() + Send + 'static) -> crate::JobDone {
        if self.is_main_thread() {
            job();
            return crate::JobDone::ran();
        }

        let (sender, receiver) = futures_channel::oneshot::channel();
        self.enqueue(Box::new(move || {
            job();
            _ = sender.send(());
        }));
        crate::JobDone::pending(receiver)
    }

    /// Whether the calling thread is the main thread this dispatcher runs jobs on.
    pub fn is_main_thread(&self) -> bool {
        self.main_thread.is_main_thread()
    }

    /// The queue backing this dispatcher.
    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    fn enqueue(&self, job: Job) {
        self.queue.enqueue(job);
        #[cfg(feature = "log")]
        log::trace!("requesting a main thread wake");
        self.main_thread.schedule_wake();
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // The binding may outlive us (e.g. a wake still in flight), the jobs must not.
        let _dropped = self.queue.clear();
        #[cfg(feature = "log")]
        if _dropped > 0 {
            log::warn!("dispatcher dropped with {_dropped} job(s) that never ran");
        }
    }
}

#[cfg(test)]
static_assertions::assert_impl_all!(Dispatcher: Send, Sync);

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Pending,
    Finished,
    Abandoned,
}

/// One-shot completion signal shared between a `run_sync` caller and its job.
struct Completion {
    state: Mutex<State>,
    cond: Condvar,
}

impl Completion {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::Pending),
            cond: Condvar::new(),
        }
    }

    fn settle(&self, state: State) {
        let mut current = self.state.lock().expect("lock poisoned");
        *current = state;
        self.cond.notify_one();
    }

    fn wait(&self) -> State {
        let current = self.state.lock().expect("lock poisoned");
        let current = self
            .cond
            .wait_while(current, |s| *s == State::Pending)
            .expect("lock poisoned");
        *current
    }
}

/// Marks the completion as abandoned unless the job finished.
struct CompletionGuard(Option<Arc<Completion>>);

impl CompletionGuard {
    fn finish(mut self) {
        if let Some(completion) = self.0.take() {
            completion.settle(State::Finished);
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(completion) = self.0.take() {
            completion.settle(State::Abandoned);
        }
    }
}
