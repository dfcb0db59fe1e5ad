//! Stand-ins for a platform main thread, used by the unit tests.

use crate::MainThread;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

// The loop-thread harness is shared with the integration tests.
use crate::{Dispatcher, Host, HostRelay};
#[path = "../tests/common/main_loop.rs"]
mod main_loop;
pub(crate) use main_loop::MainLoop;

/// Counts wakes and never drains; tests drain the queue by hand.
pub(crate) struct FakeMainThread {
    main: Option<ThreadId>,
    wakes: AtomicUsize,
}

impl FakeMainThread {
    /// The calling thread acts as the main thread.
    pub(crate) fn current() -> Self {
        Self {
            main: Some(thread::current().id()),
            wakes: AtomicUsize::new(0),
        }
    }

    /// No thread is the main thread.
    pub(crate) fn nowhere() -> Self {
        Self {
            main: None,
            wakes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn wakes(&self) -> usize {
        self.wakes.load(Ordering::SeqCst)
    }
}

impl MainThread for FakeMainThread {
    fn is_main_thread(&self) -> bool {
        self.main == Some(thread::current().id())
    }

    fn schedule_wake(&self) {
        self.wakes.fetch_add(1, Ordering::SeqCst);
    }
}
