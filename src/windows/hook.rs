//! Sets up a [Windows Hook](https://learn.microsoft.com/en-us/windows/win32/winmsg/about-hooks)
//! on the main thread that intercepts our drain message before it reaches
//! the app's message loop. This saves us from creating a hidden window
//! just to receive messages.
//!
//! Wakes are thread messages (posted with `PostThreadMessageW`) that carry the
//! handle of the queue to drain in their `wParam`. The hook swallows them
//! by turning them into `WM_NULL`.

use crate::error::BoxedError;
use crate::handles::{Handle, Handles};
use crate::windows::main_thread::main_thread_id;
use crate::{Error, JobQueue};
use std::mem;
use std::sync::{Arc, OnceLock, RwLock, Weak};
use windows::core::{w, Owned};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, RegisterWindowMessageW, SetWindowsHookExW, HHOOK, MSG, PM_REMOVE,
    WH_GETMESSAGE, WM_NULL,
};

/// Registers `queue` to be drained by the main thread's hook.
/// The queue is unregistered (and the hook removed, if this was the last queue)
/// when the returned guard is dropped.
pub(crate) fn register_drain_hook(queue: Arc<JobQueue>) -> Result<DrainHookGuard, Error> {
    let message = drain_message().map_err(platform_error)?;
    let hook = register_hook().map_err(platform_error)?;
    let handle = QUEUES.write().expect("lock poisoned").insert(queue)?;
    Ok(DrainHookGuard {
        handle,
        message,
        _hook: hook,
    })
}

pub(crate) struct DrainHookGuard {
    handle: Handle,
    message: u32,
    _hook: Arc<HookHandle>,
}

impl DrainHookGuard {
    /// The message to post to the main thread to drain this queue,
    /// as `(msg, wParam)`.
    pub(crate) fn wake_message(&self) -> (u32, WPARAM) {
        (self.message, WPARAM(self.handle.as_raw()))
    }
}

impl Drop for DrainHookGuard {
    fn drop(&mut self) {
        if let Ok(mut queues) = QUEUES.write() {
            _ = queues.remove(mem::take(&mut self.handle));
        }
    }
}

fn platform_error(error: windows::core::Error) -> Error {
    Error::from(BoxedError::from(error))
}

static QUEUES: RwLock<Handles<Arc<JobQueue>>> = RwLock::new(Handles::new());

static DRAIN_MESSAGE: OnceLock<u32> = OnceLock::new();

fn drain_message() -> Result<u32, windows::core::Error> {
    if let Some(message) = DRAIN_MESSAGE.get() {
        return Ok(*message);
    }
    // SAFETY: The string is a valid, nul-terminated wide string.
    let message = unsafe { RegisterWindowMessageW(w!("main-dispatch.drain")) };
    if message == 0 {
        return Err(windows::core::Error::from_win32());
    }
    // The system hands out the same id for the same name, so racing here is harmless.
    Ok(*DRAIN_MESSAGE.get_or_init(|| message))
}

unsafe extern "system" fn get_message_proc(ncode: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    // Only look at messages that are actually being removed from the queue,
    // a PeekMessage with PM_NOREMOVE would otherwise drain early and twice.
    if ncode >= 0 && wparam.0 as u32 == PM_REMOVE.0 {
        // SAFETY: lParam: A pointer to an MSG structure that contains details about the message.
        let msg = unsafe { &mut *(lparam.0 as *mut MSG) };
        if let Some(queue) = take_drain_message(msg) {
            queue.drain();
        }
    }
    // SAFETY: Forwarding the arguments we were called with.
    unsafe { CallNextHookEx(None, ncode, wparam, lparam) }
}

fn take_drain_message(msg: &mut MSG) -> Option<Arc<JobQueue>> {
    let message = *DRAIN_MESSAGE.get()?;
    if !msg.hwnd.0.is_null() || msg.message != message {
        return None;
    }
    msg.message = WM_NULL;
    // Cloned out so that no lock is held while jobs run.
    let queues = QUEUES.read().ok()?;
    queues.get(msg.wParam.0).cloned()
}

fn register_hook() -> Result<Arc<HookHandle>, windows::core::Error> {
    static WEAK: RwLock<Weak<HookHandle>> = RwLock::new(Weak::new());
    let mut weak = WEAK.write().expect("lock poisoned");

    if let Some(hook) = weak.upgrade() {
        Ok(hook)
    } else {
        // SAFETY:
        // * get_message_proc is a valid fn pointer
        // * we're the owners of the returned handle
        let handle = unsafe {
            Owned::new(SetWindowsHookExW(
                WH_GETMESSAGE,
                Some(get_message_proc),
                None,
                main_thread_id(),
            )?)
        };
        #[cfg(feature = "log")]
        log::debug!("installed drain hook on thread {}", main_thread_id());
        let hook = Arc::new(HookHandle(handle));
        *weak = Arc::downgrade(&hook);
        Ok(hook)
    }
}

pub(crate) struct HookHandle(#[allow(dead_code)] Owned<HHOOK>);

// SAFETY: Only used to free the hook on drop.
unsafe impl Send for HookHandle {}

// SAFETY: Only used to free the hook on drop.
unsafe impl Sync for HookHandle {}
