use windows::Win32::System::Threading::GetCurrentThreadId;

// The CRT initialisation trick is taken from winit, licensed under the Apache 2.0 license.
// <https://github.com/rust-windowing/winit/blob/4e3165f3d81b1ee2771d517103c5883ffa2ee29f/src/platform_impl/windows/event_loop.rs>

/// The id of the thread that ran the CRT initialisers, which for an
/// executable is the thread that goes on to call `main`.
///
/// Windows has no notion of a "main thread" we could query later on,
/// so we record the id of the thread that runs the `.CRT$XCU` initialisers
/// before the entrypoint gets a chance to spawn other threads.
///
/// See <https://docs.microsoft.com/en-us/cpp/c-runtime-library/crt-initialization?view=msvc-160>.
pub(crate) fn main_thread_id() -> u32 {
    static mut MAIN_THREAD_ID: u32 = 0;

    #[used]
    #[allow(non_upper_case_globals)]
    // Runs before the main entrypoint.
    // See: https://doc.rust-lang.org/stable/reference/abi.html#the-link_section-attribute
    #[link_section = ".CRT$XCU"]
    static INIT_MAIN_THREAD_ID: unsafe fn() = {
        unsafe fn initer() {
            unsafe { MAIN_THREAD_ID = GetCurrentThreadId() };
        }
        initer
    };

    // SAFETY: Only written once, before any other code of ours runs.
    unsafe { MAIN_THREAD_ID }
}

pub(crate) fn current_thread_id() -> u32 {
    // SAFETY: No preconditions.
    unsafe { GetCurrentThreadId() }
}

pub(crate) fn is_main_thread() -> bool {
    current_thread_id() == main_thread_id()
}
