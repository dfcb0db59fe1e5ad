//! A thread running a minimal event loop that plays the main thread.
//!
//! Shared by the unit tests and the integration tests; the including module
//! brings `Dispatcher`, `Host` and `HostRelay` into scope.

// Not every includer uses every helper.
#![allow(dead_code)]

use super::{Dispatcher, Host, HostRelay};
use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

type Task = Box<dyn FnOnce() + Send>;

/// The loop exits once the `MainLoop` and every dispatcher bound to it are gone.
pub(crate) struct MainLoop {
    tasks: mpsc::Sender<Task>,
    thread_id: ThreadId,
}

impl MainLoop {
    pub(crate) fn spawn() -> Self {
        let (tasks, receiver) = mpsc::channel::<Task>();
        let thread = thread::Builder::new()
            .name("test main thread".to_owned())
            .spawn(move || {
                for task in receiver {
                    task();
                }
            })
            .expect("failed to spawn thread");
        Self {
            tasks,
            thread_id: thread.thread().id(),
        }
    }

    /// Creates a dispatcher whose jobs run on this loop.
    pub(crate) fn dispatcher(&self) -> Dispatcher {
        self.relayed_dispatcher().0
    }

    /// Like [`MainLoop::dispatcher`], also returning the relay
    /// so that tests can drain by hand.
    pub(crate) fn relayed_dispatcher(&self) -> (Dispatcher, Arc<HostRelay>) {
        let tasks = self.tasks.clone();
        let main = self.thread_id;
        let mut relay = None;
        let dispatcher = Dispatcher::with_main_thread(|queue| {
            let bound = Arc::new_cyclic(|weak| {
                HostRelay::new(
                    queue,
                    LoopHost {
                        relay: Weak::clone(weak),
                        tasks,
                        main,
                    },
                )
            });
            relay = Some(Arc::clone(&bound));
            bound
        });
        (dispatcher, relay.expect("binding was created"))
    }

    /// Runs `f` on the loop thread and waits for its result.
    pub(crate) fn block_on<T: Send + 'static>(&self, f: impl FnOnce() -> T + Send + 'static) -> T {
        let (sender, receiver) = mpsc::channel();
        self.tasks
            .send(Box::new(move || {
                _ = sender.send(f());
            }))
            .expect("main loop is gone");
        receiver.recv().expect("main loop task panicked")
    }

    pub(crate) fn thread_id(&self) -> ThreadId {
        self.thread_id
    }
}

struct LoopHost {
    relay: Weak<HostRelay>,
    tasks: mpsc::Sender<Task>,
    main: ThreadId,
}

impl Host for LoopHost {
    fn request_drain(&self) {
        let relay = Weak::clone(&self.relay);
        // The loop is gone if an earlier job panicked on it.
        _ = self.tasks.send(Box::new(move || {
            if let Some(relay) = relay.upgrade() {
                relay.drain_now();
            }
        }));
    }

    fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main
    }
}
