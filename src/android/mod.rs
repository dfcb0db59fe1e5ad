//! # Android
//! ## Overview
//! Native code has no way to post work to Android's main `Looper` by itself,
//! so wakes are relayed through a small Java object (`MainDispatchSupport`):
//! * we call its `scheduleDrain()`, which posts a `Runnable` to a `Handler`
//!   on the main looper,
//! * the runnable calls back into our `nativeDrain(long)` on the main thread.
//!
//! The `long` is a handle into a table of queues, so Java never holds a
//! pointer into Rust memory. `Handler.post` does not deduplicate, so we only
//! post while no drain is pending. A drain that still runs twice finds an
//! empty queue the second time.
//!
//! The main thread is the process' initial thread, so telling whether we're
//! on it doesn't need the JVM at all.
//!
//! Like most things that call into Java, we need the JVM, which the
//! [`ndk_context`] crate provides for apps written in Rust and apps
//! written in Java/Kotlin that call into Rust alike.
//!
//! The Java class is compiled to DEX bytecode in our `build.rs`
//! and injected at runtime in the [`support`] module,
//! the same way the [`netwatcher`] crate does it.
//!
//! [`netwatcher`]: https://github.com/thombles/netwatcher

use crate::error::BoxedError;
use crate::handles::{Handle, Handles};
use crate::{Error, JobQueue, MainThread};
use jni::sys::jlong;
use jni::JNIEnv;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use support::{java_vm, HostObject};

// signatures: <https://docs.oracle.com/javase/8/docs/technotes/guides/jni/spec/types.html>

mod support;

static SLOTS: RwLock<Handles<Arc<Slot>>> = RwLock::new(Handles::new());

/// A queue and whether a drain for it is already posted.
struct Slot {
    queue: Arc<JobQueue>,
    pending: AtomicBool,
}

impl Slot {
    fn drain(&self) -> usize {
        // Cleared first: anything enqueued from here on is either
        // picked up by this pass or posts a new drain.
        self.pending.store(false, Ordering::SeqCst);
        self.queue.drain()
    }
}

pub(crate) struct NativeMainThread {
    handle: Handle,
    slot: Arc<Slot>,
    host: HostObject,
}

pub(crate) fn bind(queue: Arc<JobQueue>) -> Result<NativeMainThread, Error> {
    let slot = Arc::new(Slot {
        queue,
        pending: AtomicBool::new(false),
    });
    let handle = SLOTS
        .write()
        .expect("lock poisoned")
        .insert(Arc::clone(&slot))?;
    match with_env(|env| HostObject::new(env, handle.as_raw() as jlong)) {
        Ok(host) => Ok(NativeMainThread { handle, slot, host }),
        Err(e) => {
            _ = SLOTS.write().expect("lock poisoned").remove(handle);
            Err(e.into())
        }
    }
}

impl MainThread for NativeMainThread {
    fn is_main_thread(&self) -> bool {
        is_main_thread()
    }

    fn schedule_wake(&self) {
        if self.slot.pending.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = with_attached_env(|env| self.host.schedule_drain(env)) {
            fatal("failed to wake the main thread", e);
        }
    }
}

impl Drop for NativeMainThread {
    fn drop(&mut self) {
        // Drains that are already posted must not reach a dead handle.
        if let Err(_e) = with_env(|env| self.host.deactivate(env)) {
            #[cfg(feature = "log")]
            log::warn!("failed to deactivate the host object: {_e}");
        }
        if let Ok(mut slots) = SLOTS.write() {
            _ = slots.remove(mem::take(&mut self.handle));
        }
    }
}

fn is_main_thread() -> bool {
    // SAFETY: Neither call has preconditions.
    unsafe { libc::gettid() == libc::getpid() }
}

fn drain_handle(raw: usize) {
    // Cloned out so that no lock is held while jobs run.
    let slot = SLOTS.read().ok().and_then(|slots| slots.get(raw).cloned());
    if let Some(slot) = slot {
        slot.drain();
    }
}

fn with_env<T>(f: impl FnOnce(&mut JNIEnv) -> Result<T, BoxedError>) -> Result<T, BoxedError> {
    let vm = java_vm()?;
    let mut env = vm.attach_current_thread()?;
    f(&mut *env)
}

/// Like [`with_env`], but leaves the thread attached,
/// so later wakes from the same thread skip the attach.
fn with_attached_env<T>(
    f: impl FnOnce(&mut JNIEnv) -> Result<T, BoxedError>,
) -> Result<T, BoxedError> {
    let vm = java_vm()?;
    let mut env = vm.attach_current_thread_permanently()?;
    f(&mut env)
}

fn fatal(what: &str, error: BoxedError) -> ! {
    #[cfg(feature = "log")]
    log::error!("{what}: {error}");
    panic!("{what}: {error}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn spawned_threads_are_not_the_main_thread() {
        assert!(!thread::spawn(is_main_thread).join().unwrap());
    }

    #[test]
    fn drain_clears_the_pending_flag_before_running_jobs() {
        let slot = Arc::new(Slot {
            queue: Arc::new(JobQueue::new()),
            pending: AtomicBool::new(true),
        });
        let seen = Arc::new(AtomicBool::new(true));
        let job_slot = Arc::clone(&slot);
        let job_seen = Arc::clone(&seen);
        slot.queue.enqueue(Box::new(move || {
            job_seen.store(job_slot.pending.load(Ordering::SeqCst), Ordering::SeqCst);
        }));

        assert_eq!(1, slot.drain());
        assert!(!seen.load(Ordering::SeqCst));
        assert!(!slot.pending.load(Ordering::SeqCst));
    }

    #[test]
    fn drains_of_unknown_handles_are_ignored() {
        drain_handle(usize::MAX);
    }
}
