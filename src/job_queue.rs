use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::Mutex;

/// A deferred unit of work. Jobs are run at most once and then dropped.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A FIFO queue of [`Job`]s guarded by a single lock.
///
/// The lock is only held while pushing or popping. Jobs always run
/// with the lock released, so a job is free to enqueue more work
/// (or another thread may do so) while the queue is being drained.
#[derive(Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl JobQueue {
    pub const fn new() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends a job to the back of the queue.
    pub fn enqueue(&self, job: Job) {
        self.jobs.lock().expect("lock poisoned").push_back(job);
    }

    /// Runs queued jobs on the calling thread until the queue is empty.
    ///
    /// Jobs enqueued while draining (including by the jobs themselves)
    /// are run in the same pass. Must only be called on the main thread.
    ///
    /// A panicking job is not caught: the panic propagates to the caller
    /// and the remaining jobs stay queued for the next drain.
    ///
    /// Returns the number of jobs that were run.
    pub fn drain(&self) -> usize {
        let mut count = 0;
        let mut jobs = self.jobs.lock().expect("lock poisoned");
        while let Some(job) = jobs.pop_front() {
            drop(jobs);
            job();
            count += 1;
            jobs = self.jobs.lock().expect("lock poisoned");
        }
        #[cfg(feature = "log")]
        if count > 0 {
            log::trace!("drained {count} job(s) on the main thread");
        }
        count
    }

    /// Drops every queued job without running it.
    ///
    /// Returns the number of jobs that were dropped.
    pub fn clear(&self) -> usize {
        let jobs = mem::take(&mut *self.jobs.lock().expect("lock poisoned"));
        // Dropped outside the lock, a job's captures may touch the queue.
        let count = jobs.len();
        drop(jobs);
        count
    }

    /// The number of jobs currently waiting to run.
    pub fn len(&self) -> usize {
        self.jobs.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
static_assertions::assert_impl_all!(JobQueue: Send, Sync);
