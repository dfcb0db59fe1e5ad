use std::{error, fmt};

/// A table of values addressed by plain integer handles.
///
/// Native callbacks (JNI `long`s, Win32 `WPARAM`s) can only carry integers,
/// so the backends park their queues here and pass the handle across
/// the boundary instead of a pointer.
#[derive(Debug)]
pub(crate) struct Handles<T> {
    entries: Vec<Entry<T>>,
    next_handle: usize,
}

impl<T> Handles<T> {
    pub(crate) const fn new() -> Self {
        /// The first handle is 1 and not 0 so that
        /// a zeroed handle never matches anything.
        const FIRST_HANDLE: usize = 1;
        Self {
            entries: Vec::new(),
            next_handle: FIRST_HANDLE,
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> Result<Handle, OverflowError> {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.checked_add(1).ok_or(OverflowError)?;
        self.entries.push(Entry { handle, value });
        Ok(Handle(handle))
    }

    pub(crate) fn get(&self, raw: usize) -> Option<&T> {
        self.entries
            .iter()
            .find(|e| e.handle == raw)
            .map(|e| &e.value)
    }

    pub(crate) fn remove(&mut self, handle: Handle) -> Option<T> {
        let index = self.entries.iter().position(|e| e.handle == handle.0)?;
        Some(self.entries.swap_remove(index).value)
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct OverflowError;

impl fmt::Display for OverflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no more handles left")
    }
}

impl error::Error for OverflowError {}

/// An opaque handle to an entry in [`Handles`].
#[derive(Debug, Default, PartialEq, Eq)]
#[must_use]
pub(crate) struct Handle(usize);

impl Handle {
    pub(crate) fn as_raw(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Entry<T> {
    handle: usize,
    value: T,
}
