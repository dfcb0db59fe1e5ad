//! # Windows
//! Windows has no run loop we could submit work to from another thread.
//! What it does have is a message queue per thread: a wake posts a
//! registered thread message to the main thread and a `WH_GETMESSAGE` hook
//! drains the queue when the main thread's message loop picks that message up.
//!
//! The main thread is the thread that ran the CRT initialisers.
//! It must run a message loop (`GetMessage`/`PeekMessage`) for jobs to run.

use crate::{Error, JobQueue, MainThread};
use hook::{register_drain_hook, DrainHookGuard};
use main_thread::{is_main_thread, main_thread_id};
use std::sync::Arc;
use windows::Win32::Foundation::LPARAM;
use windows::Win32::UI::WindowsAndMessaging::PostThreadMessageW;

mod hook;
mod main_thread;

pub(crate) struct NativeMainThread {
    hook: DrainHookGuard,
}

pub(crate) fn bind(queue: Arc<JobQueue>) -> Result<NativeMainThread, Error> {
    let hook = register_drain_hook(queue)?;
    Ok(NativeMainThread { hook })
}

impl MainThread for NativeMainThread {
    fn is_main_thread(&self) -> bool {
        is_main_thread()
    }

    fn schedule_wake(&self) {
        let (message, wparam) = self.hook.wake_message();
        // SAFETY: The message carries plain integers, no pointers.
        let result = unsafe { PostThreadMessageW(main_thread_id(), message, wparam, LPARAM(0)) };
        if let Err(_e) = result {
            #[cfg(feature = "log")]
            log::error!("failed to wake the main thread: {_e}");
            panic!("failed to post a wake message to the main thread");
        }
    }
}
