#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![forbid(
    clippy::dbg_macro,
    clippy::missing_safety_doc,
    clippy::unnecessary_safety_comment,
    clippy::unnecessary_safety_doc,
    unsafe_op_in_unsafe_fn
)]
#![deny(clippy::unwrap_used)]

//! Run work on the main thread, from any thread.
//!
//! UI toolkits, script runtimes embedded in apps and most platform APIs
//! insist on being touched from the main (UI) thread only. This crate gives
//! you a [`Dispatcher`] that accepts jobs from any thread and runs them on
//! the main thread in the order they were submitted:
//! * [`Dispatcher::run_async`]: fire and forget.
//! * [`Dispatcher::run_sync`]: block the calling thread until the job has run.
//!   Called on the main thread itself, the job simply runs in place.
//! * [`Dispatcher::run_notify`]: get a future that resolves once the job has run.
//!
//! ## Example
//! ```no_run
//! use main_dispatch::Dispatcher;
//! use std::sync::{Arc, Mutex};
//!
//! # fn main() -> Result<(), main_dispatch::Error> {
//! let dispatcher = Arc::new(Dispatcher::new()?);
//! let counter = Arc::new(Mutex::new(0));
//!
//! let worker = {
//!     let dispatcher = Arc::clone(&dispatcher);
//!     let counter = Arc::clone(&counter);
//!     std::thread::spawn(move || {
//!         let job_counter = Arc::clone(&counter);
//!         dispatcher.run_sync(move || *job_counter.lock().unwrap() += 1);
//!         assert_eq!(1, *counter.lock().unwrap());
//!     })
//! };
//! // ... keep running the platform's main loop here ...
//! # worker.join().unwrap();
//! # Ok(())
//! # }
//! ```
//!
//! ## Platforms
//! * macOS / iOS: jobs are drained from a block submitted to the main dispatch queue.
//! * Windows: jobs are drained by a message hook on the thread that ran the CRT
//!   initialisers, so that thread has to pump messages.
//! * Android: jobs are drained from a `Runnable` posted to the main `Looper`.
//!   The JVM is found through the [`ndk-context`] crate, which has to be
//!   initialized first (`android-activity` and `winit` do this for you).
//! * Everywhere else there is no native backend: [`Dispatcher::new`] returns
//!   [`Error::Unsupported`]. Hosts that own a main loop can plug it in with a
//!   [`HostRelay`].
//!
//! ## Embedding runtimes
//! The [`install`], [`dispatcher`] and [`uninstall`] functions keep one
//! dispatcher per runtime instance, identified by a [`RuntimeId`].
//!
//! ## Caveats
//! * There is no capacity limit and no timeout. If the main thread stops
//!   draining, the queue grows and `run_sync` blocks forever.
//! * Panics in jobs are not caught. Across the native callbacks of the
//!   Windows and Android backends they abort the process.
//! * Dropping a dispatcher drops its queued jobs without running them.
//!
//! [`ndk-context`]: https://docs.rs/ndk-context

mod dispatcher;
pub use dispatcher::*;
mod error;
pub use error::Error;
#[cfg(feature = "future")]
mod job_done;
#[cfg(feature = "future")]
pub use job_done::*;
mod job_queue;
pub use job_queue::*;
mod registry;
pub use registry::*;
mod relay;
pub use relay::*;

#[cfg(any(target_os = "android", target_os = "windows", test))]
mod handles;

#[cfg(test)]
mod test_main_thread;

cfg_if::cfg_if! {
    if #[cfg(target_vendor = "apple")] {
        mod apple;
        use apple as imp;
    } else if #[cfg(windows)] {
        mod windows;
        use windows as imp;
    } else if #[cfg(target_os = "android")] {
        mod android;
        use android as imp;
    } else {
        mod fallback;
        use fallback as imp;
    }
}

/// # Feature Flags
///
/// * `log`: Enable logging.
/// * `future`: Enable [`Dispatcher::run_notify`] and [`JobDone`] (*default*).
#[cfg(doc)]
#[cfg_attr(docsrs, doc(cfg(doc)))]
pub mod feature_flags {}
