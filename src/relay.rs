//! A dispatcher binding for hosts that own the main loop themselves.
//!
//! The relay is a two-way mailbox between native code and the host:
//! * native code asks the host to wake up ([`Host::request_drain`]),
//! * the host, once it is on its main thread, calls back into
//!   [`HostRelay::drain_now`].
//!
//! This is how a dispatcher reaches the main thread on platforms where
//! native code cannot post work to the main loop directly.

use crate::{JobQueue, MainThread};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The host side of a [`HostRelay`].
pub trait Host: Send + Sync + 'static {
    /// Schedules a call to [`HostRelay::drain_now`] on the main thread.
    ///
    /// Called from any thread. The host must call `drain_now` at least once
    /// after every request, on the main thread.
    fn request_drain(&self);

    /// Whether the calling thread is the host's main thread.
    fn is_main_thread(&self) -> bool;
}

/// A [`MainThread`] binding that relays wakes through a [`Host`].
///
/// While a drain is pending, further wakes are coalesced into it.
///
/// ```
/// use main_dispatch::{Dispatcher, Host, HostRelay};
/// use std::sync::Arc;
///
/// struct Inline;
///
/// impl Host for Inline {
///     fn request_drain(&self) {}
///     fn is_main_thread(&self) -> bool {
///         false
///     }
/// }
///
/// let dispatcher = Dispatcher::with_main_thread(|queue| Arc::new(HostRelay::new(queue, Inline)));
/// dispatcher.run_async(|| println!("hello from the main thread"));
/// assert_eq!(1, dispatcher.queue().len());
/// ```
pub struct HostRelay {
    queue: Arc<JobQueue>,
    host: Box<dyn Host>,
    pending: AtomicBool,
    active: AtomicBool,
}

impl HostRelay {
    pub fn new(queue: Arc<JobQueue>, host: impl Host) -> Self {
        Self {
            queue,
            host: Box::new(host),
            pending: AtomicBool::new(false),
            active: AtomicBool::new(true),
        }
    }

    /// Drains the queue. The host calls this on its main thread
    /// in response to [`Host::request_drain`].
    ///
    /// Does nothing once the relay has been [deactivated](Self::deactivate).
    /// Returns the number of jobs that were run.
    pub fn drain_now(&self) -> usize {
        if !self.is_active() {
            return 0;
        }
        debug_assert!(
            self.host.is_main_thread(),
            "drain_now must be called on the main thread"
        );
        // Cleared before draining: anything enqueued from here on is either
        // picked up by this pass or requests a new one.
        self.pending.store(false, Ordering::SeqCst);
        self.queue.drain()
    }

    /// Stops relaying. Pending and future drain requests become no-ops.
    pub fn deactivate(&self) {
        #[cfg(feature = "log")]
        log::debug!("host relay deactivated");
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl MainThread for HostRelay {
    fn is_main_thread(&self) -> bool {
        self.host.is_main_thread()
    }

    fn schedule_wake(&self) {
        if !self.is_active() {
            return;
        }
        if !self.pending.swap(true, Ordering::SeqCst) {
            self.host.request_drain();
        }
    }
}

impl fmt::Debug for HostRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostRelay")
            .field("queue", &self.queue)
            .field("pending", &self.pending)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
static_assertions::assert_impl_all!(HostRelay: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dispatcher;
    use std::sync::atomic::AtomicUsize;

    struct Requests(Arc<AtomicUsize>);

    impl Host for Requests {
        fn request_drain(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn is_main_thread(&self) -> bool {
            true
        }
    }

    fn relay() -> (Arc<HostRelay>, Arc<AtomicUsize>) {
        let requests = Arc::new(AtomicUsize::new(0));
        let relay = Arc::new(HostRelay::new(
            Arc::new(JobQueue::new()),
            Requests(Arc::clone(&requests)),
        ));
        (relay, requests)
    }

    #[test]
    fn coalesces_wakes_while_a_drain_is_pending() {
        let (relay, requests) = relay();
        relay.schedule_wake();
        relay.schedule_wake();
        relay.schedule_wake();
        assert_eq!(1, requests.load(Ordering::SeqCst));

        relay.drain_now();
        relay.schedule_wake();
        assert_eq!(2, requests.load(Ordering::SeqCst));
    }

    #[test]
    fn drain_now_runs_all_queued_jobs() {
        let (relay, _requests) = relay();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let ran = Arc::clone(&ran);
            relay.queue.enqueue(Box::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(3, relay.drain_now());
        assert_eq!(3, ran.load(Ordering::SeqCst));
        assert_eq!(0, relay.drain_now());
    }

    #[test]
    fn wake_requested_from_a_job_is_not_lost() {
        let requests = Arc::new(AtomicUsize::new(0));
        let mut relay = None;
        let dispatcher = Arc::new(Dispatcher::with_main_thread(|queue| {
            let bound = Arc::new(HostRelay::new(queue, Requests(Arc::clone(&requests))));
            relay = Some(Arc::clone(&bound));
            bound
        }));
        let relay = relay.expect("binding was created");

        let inner = Arc::clone(&dispatcher);
        dispatcher.run_async(move || inner.run_async(|| {}));
        assert_eq!(1, requests.load(Ordering::SeqCst));

        // The nested job runs in the same pass, and still asks for a new drain.
        assert_eq!(2, relay.drain_now());
        assert_eq!(2, requests.load(Ordering::SeqCst));
        assert_eq!(0, relay.drain_now());
    }

    #[test]
    fn deactivated_relay_neither_requests_nor_drains() {
        let (relay, requests) = relay();
        relay.queue.enqueue(Box::new(|| {}));
        relay.deactivate();
        assert!(!relay.is_active());

        relay.schedule_wake();
        assert_eq!(0, requests.load(Ordering::SeqCst));
        assert_eq!(0, relay.drain_now());
        assert_eq!(1, relay.queue.len());
    }
}
