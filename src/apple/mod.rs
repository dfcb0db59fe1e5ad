//! # Apple
//! The main thread services the main dispatch queue (through `NSApplication`,
//! `UIApplication` or `dispatch_main`), so a wake is a block submitted to that
//! queue. Every wake drains the queue once, wakes are not coalesced.

use crate::{Error, JobQueue, MainThread};
use dispatch::Queue;
use objc2_foundation::MainThreadMarker;
use std::sync::Arc;

pub(crate) struct NativeMainThread {
    queue: Arc<JobQueue>,
}

pub(crate) fn bind(queue: Arc<JobQueue>) -> Result<NativeMainThread, Error> {
    Ok(NativeMainThread { queue })
}

impl MainThread for NativeMainThread {
    fn is_main_thread(&self) -> bool {
        MainThreadMarker::new().is_some()
    }

    fn schedule_wake(&self) {
        let queue = Arc::clone(&self.queue);
        Queue::main().exec_async(move || {
            debug_assert!(MainThreadMarker::new().is_some());
            queue.drain();
        });
    }
}
