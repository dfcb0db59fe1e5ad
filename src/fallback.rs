use crate::{Error, JobQueue, MainThread};
use std::sync::Arc;

/// There is no native main loop to hook into on this platform.
pub(crate) enum NativeMainThread {}

pub(crate) fn bind(_queue: Arc<JobQueue>) -> Result<NativeMainThread, Error> {
    Err(Error::Unsupported)
}

impl MainThread for NativeMainThread {
    fn is_main_thread(&self) -> bool {
        match *self {}
    }

    fn schedule_wake(&self) {
        match *self {}
    }
}
