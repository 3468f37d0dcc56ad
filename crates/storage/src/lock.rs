//! RAII file-lock guards over `fs2`.
//!
//! Lock granularity in this system is per-syscall, not per-transaction: a
//! guard spans exactly one read or one write of the backing file, and the
//! `Drop` impl guarantees release even on early return. The store's
//! `update()` path holds a single exclusive guard across its whole
//! read-modify-write span.

use std::fs::File;

use ledgerdesk_core::{Result, StoreError};

/// Holds an OS-level advisory lock on `file` until dropped.
#[derive(Debug)]
pub(crate) struct LockGuard<'a> {
    file: &'a File,
}

impl<'a> LockGuard<'a> {
    /// Block until a shared (read) lock is held.
    pub(crate) fn shared(file: &'a File) -> Result<Self> {
        fs2::FileExt::lock_shared(file)
            .map_err(|e| StoreError::Lock(format!("shared lock: {e}")))?;
        Ok(LockGuard { file })
    }

    /// Block until an exclusive (write) lock is held.
    pub(crate) fn exclusive(file: &'a File) -> Result<Self> {
        fs2::FileExt::lock_exclusive(file)
            .map_err(|e| StoreError::Lock(format!("exclusive lock: {e}")))?;
        Ok(LockGuard { file })
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // unlock failure leaves the lock to die with the file descriptor
        let _ = fs2::FileExt::unlock(self.file);
    }
}
