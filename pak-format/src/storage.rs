//! The single seekable handle behind a reader.
//!
//! Seeking and reading are never exposed separately: every access is one
//! `read_range` call made while holding the handle's mutex, so concurrent
//! callers cannot interleave a seek with another caller's read.

use std::io::{Read, Seek, SeekFrom};

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Anything a reader can pull archive bytes from.
pub trait Source: Read + Seek + Send {}

impl<T: Read + Seek + Send> Source for T {}

pub(crate) struct Storage {
    handle: Mutex<Option<Box<dyn Source>>>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Storage {
    pub(crate) fn new<S: Source + 'static>(source: S) -> Storage {
        Storage {
            handle: Mutex::new(Some(Box::new(source))),
        }
    }

    /// Reads exactly `len` bytes starting at `offset`.
    pub(crate) fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut guard = self.handle.lock();
        let source = guard.as_mut().ok_or(Error::Closed)?;

        let mut buf = vec![0u8; len];
        source.seek(SeekFrom::Start(offset))?;
        source.read_exact(&mut buf)?;

        tracing::trace!(offset = format_args!("{:#x}", offset), len, "read range");
        Ok(buf)
    }

    /// Current length of the underlying storage.
    pub(crate) fn len(&self) -> Result<u64> {
        let mut guard = self.handle.lock();
        let source = guard.as_mut().ok_or(Error::Closed)?;
        Ok(source.seek(SeekFrom::End(0))?)
    }

    /// Drops the handle. Returns false if it was already closed.
    pub(crate) fn close(&self) -> bool {
        self.handle.lock().take().is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.handle.lock().is_none()
    }
}
