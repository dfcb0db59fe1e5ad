use crate::registry::RuntimeId;
use std::sync::Arc;
use std::{error, fmt};

pub(crate) type BoxedError = Box<dyn error::Error + Send + Sync + 'static>;
pub(crate) type ArcError = Arc<dyn error::Error + Send + Sync + 'static>;

/// Errors reported when creating or installing a [`Dispatcher`](crate::Dispatcher).
///
/// Dispatching itself never fails; these are all reported at the call
/// site that tried to set things up.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// There is no native main-thread backend for this target.
    /// Use [`Dispatcher::with_main_thread`](crate::Dispatcher::with_main_thread)
    /// together with a [`HostRelay`](crate::HostRelay) instead.
    Unsupported,
    /// A dispatcher is already installed for this runtime.
    AlreadyInstalled(RuntimeId),
    /// The platform backend could not be bound to the main thread.
    Platform(ArcError),
    /// The backend ran out of handles for new dispatchers.
    HandlesExhausted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unsupported => {
                f.write_str("no main-thread backend is available on this platform")
            }
            Error::AlreadyInstalled(runtime) => {
                write!(f, "a dispatcher is already installed for {runtime:?}")
            }
            Error::Platform(e) => write!(f, "failed to bind to the main thread: {e}"),
            Error::HandlesExhausted => f.write_str("no more dispatcher handles left"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Platform(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

#[cfg(any(target_os = "android", target_os = "windows", test))]
impl From<crate::handles::OverflowError> for Error {
    fn from(_: crate::handles::OverflowError) -> Self {
        Error::HandlesExhausted
    }
}

impl From<BoxedError> for Error {
    fn from(value: BoxedError) -> Self {
        Error::Platform(ArcError::from(value))
    }
}
