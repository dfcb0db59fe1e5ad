use crate::{Dispatcher, Error};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Identifies one instance of an embedding runtime.
///
/// Any stable per-instance value works, typically the address
/// of the runtime object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuntimeId(usize);

impl RuntimeId {
    pub fn from_ptr<T: ?Sized>(runtime: *const T) -> Self {
        RuntimeId(runtime.cast::<()>() as usize)
    }

    pub const fn from_raw(raw: usize) -> Self {
        RuntimeId(raw)
    }
}

static DISPATCHERS: RwLock<BTreeMap<RuntimeId, Arc<Dispatcher>>> = RwLock::new(BTreeMap::new());

/// Installs a dispatcher bound to the platform's main thread for `runtime`.
///
/// Every later call to [`dispatcher`] with the same id reaches the
/// same dispatcher until [`uninstall`] is called.
///
/// ```no_run
/// # fn main() -> Result<(), main_dispatch::Error> {
/// use main_dispatch::RuntimeId;
///
/// # let runtime = 0u8;
/// let id = RuntimeId::from_ptr(&runtime);
/// main_dispatch::install(id)?;
/// // ... later, from any thread:
/// if let Some(dispatcher) = main_dispatch::dispatcher(id) {
///     dispatcher.run_async(|| println!("on the main thread"));
/// }
/// # Ok(())
/// # }
/// ```
pub fn install(runtime: RuntimeId) -> Result<Arc<Dispatcher>, Error> {
    // Binding may be slow (class loading on Android), so it happens unlocked.
    if dispatcher(runtime).is_some() {
        return Err(Error::AlreadyInstalled(runtime));
    }
    let dispatcher = insert(runtime, Dispatcher::new()?)?;
    #[cfg(feature = "log")]
    log::debug!("installed main thread dispatcher for {runtime:?}");
    Ok(dispatcher)
}

/// Installs a custom `dispatcher` for `runtime`,
/// e.g. one built on a [`HostRelay`](crate::HostRelay).
///
/// A rejected `dispatcher` is dropped, together with any jobs it had queued.
pub fn install_with(runtime: RuntimeId, dispatcher: Dispatcher) -> Result<Arc<Dispatcher>, Error> {
    let dispatcher = insert(runtime, dispatcher)?;
    #[cfg(feature = "log")]
    log::debug!("installed custom dispatcher for {runtime:?}");
    Ok(dispatcher)
}

fn insert(runtime: RuntimeId, dispatcher: Dispatcher) -> Result<Arc<Dispatcher>, Error> {
    let mut dispatchers = DISPATCHERS.write().expect("lock poisoned");
    if dispatchers.contains_key(&runtime) {
        drop(dispatchers);
        // Dropping runs the queued jobs' destructors, which may use the registry.
        drop(dispatcher);
        return Err(Error::AlreadyInstalled(runtime));
    }
    let dispatcher = Arc::new(dispatcher);
    dispatchers.insert(runtime, Arc::clone(&dispatcher));
    Ok(dispatcher)
}

/// The dispatcher installed for `runtime`, if any.
pub fn dispatcher(runtime: RuntimeId) -> Option<Arc<Dispatcher>> {
    DISPATCHERS
        .read()
        .expect("lock poisoned")
        .get(&runtime)
        .cloned()
}

/// Removes the dispatcher installed for `runtime`.
///
/// The dispatcher is torn down once the last clone handed out by
/// [`install`] or [`dispatcher`] is dropped. Stop dispatching before that.
pub fn uninstall(runtime: RuntimeId) -> Option<Arc<Dispatcher>> {
    let removed = DISPATCHERS
        .write()
        .expect("lock poisoned")
        .remove(&runtime);
    #[cfg(feature = "log")]
    if removed.is_some() {
        log::debug!("uninstalled dispatcher for {runtime:?}");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_main_thread::FakeMainThread;
    use std::sync::atomic::{AtomicBool, Ordering};

    // The registry is process-wide, so every test uses its own ids.
    fn fake() -> Dispatcher {
        Dispatcher::with_main_thread(|_| FakeMainThread::current())
    }

    #[test]
    fn install_makes_the_dispatcher_reachable() {
        let id = RuntimeId::from_raw(0x1000);
        let installed = install_with(id, fake()).expect("first install");
        let found = dispatcher(id).expect("installed");
        assert!(Arc::ptr_eq(&installed, &found));
        assert!(uninstall(id).is_some());
    }

    #[test]
    fn installing_twice_is_an_error() {
        let id = RuntimeId::from_raw(0x2000);
        let first = install_with(id, fake()).expect("first install");
        let second = install_with(id, fake());
        assert!(matches!(second, Err(Error::AlreadyInstalled(r)) if r == id));
        let found = dispatcher(id).expect("still installed");
        assert!(Arc::ptr_eq(&first, &found));
        assert!(uninstall(id).is_some());
    }

    #[test]
    fn rejected_dispatcher_is_dropped_outside_the_registry_lock() {
        struct LooksUp(RuntimeId, Arc<AtomicBool>);

        impl Drop for LooksUp {
            fn drop(&mut self) {
                // Would deadlock if the registry were still locked.
                let found = dispatcher(self.0).is_some();
                self.1.store(found, Ordering::SeqCst);
            }
        }

        let id = RuntimeId::from_raw(0x6000);
        let first = install_with(id, fake()).expect("first install");

        let saw_installed = Arc::new(AtomicBool::new(false));
        let rejected = Dispatcher::with_main_thread(|_| FakeMainThread::nowhere());
        let captured = LooksUp(id, Arc::clone(&saw_installed));
        rejected.run_async(move || drop(captured));

        let result = install_with(id, rejected);
        assert!(matches!(result, Err(Error::AlreadyInstalled(r)) if r == id));
        assert!(saw_installed.load(Ordering::SeqCst));
        assert!(Arc::ptr_eq(&first, &dispatcher(id).expect("still installed")));
        assert!(uninstall(id).is_some());
    }

    #[test]
    fn runtimes_do_not_share_dispatchers() {
        let a = RuntimeId::from_raw(0x3000);
        let b = RuntimeId::from_raw(0x3001);
        let in_a = install_with(a, fake()).expect("install a");
        let in_b = install_with(b, fake()).expect("install b");
        assert!(!Arc::ptr_eq(&in_a, &in_b));

        in_a.run_async(|| {});
        assert_eq!(1, in_a.queue().len());
        assert_eq!(0, in_b.queue().len());

        assert!(uninstall(a).is_some());
        assert!(dispatcher(a).is_none());
        assert!(dispatcher(b).is_some());
        assert!(uninstall(b).is_some());
    }

    #[test]
    fn uninstall_allows_a_fresh_install() {
        let id = RuntimeId::from_raw(0x4000);
        let first = install_with(id, fake()).expect("first install");
        assert!(uninstall(id).is_some());
        assert!(uninstall(id).is_none());
        let second = install_with(id, fake()).expect("second install");
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(uninstall(id).is_some());
    }

    #[test]
    fn runtime_ids_from_pointers_differ_per_instance() {
        let first = 1u32;
        let second = 2u32;
        assert_ne!(RuntimeId::from_ptr(&first), RuntimeId::from_ptr(&second));
        assert_eq!(RuntimeId::from_ptr(&first), RuntimeId::from_ptr(&first));
    }

    #[cfg(not(any(target_vendor = "apple", windows, target_os = "android")))]
    #[test]
    fn native_install_is_unsupported_without_a_backend() {
        let id = RuntimeId::from_raw(0x5000);
        assert!(matches!(install(id), Err(Error::Unsupported)));
        assert!(dispatcher(id).is_none());
    }
}
