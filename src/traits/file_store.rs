//! Content operations for file stores.

use std::io::{Read, Write};
use std::time::SystemTime;

use super::ResourceStore;
use crate::{File, ResourceError};

/// Store contract for a single file.
///
/// # Object Safety
///
/// This trait is object-safe and is held as `Arc<dyn FileStore>` by [`File`].
pub trait FileStore: ResourceStore {
    /// Content length in bytes. A created but never written file has size 0.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::DoesNotExist`] if the file is absent
    fn size(&self) -> Result<u64, ResourceError>;

    /// Time of the last modification.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::DoesNotExist`] if the file is absent
    fn last_modified(&self) -> Result<SystemTime, ResourceError>;

    /// Set the modification time to now without changing content.
    fn touch(&self) -> Result<(), ResourceError>;

    /// Open the content for reading.
    ///
    /// The stream is a scoped resource; dropping it releases the backend.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::DoesNotExist`] if the file is absent
    fn open_read(&self) -> Result<Box<dyn Read + Send>, ResourceError>;

    /// Open the content for writing, replacing what was there.
    ///
    /// The file is created if needed; its parent is expected to exist. The
    /// write is complete once the returned writer is flushed or dropped, and
    /// `flush` reports any failure to store the bytes.
    fn open_write(&self) -> Result<Box<dyn Write + Send>, ResourceError>;

    /// Optional fast path for copying `source` into this file.
    ///
    /// Return `Ok(true)` when the copy was handled natively (for example by
    /// sharing a buffer inside the same backend); `Ok(false)` lets the caller
    /// fall back to a stream copy.
    fn write_file(&self, source: &File) -> Result<bool, ResourceError> {
        let _ = source;
        Ok(false)
    }
}
