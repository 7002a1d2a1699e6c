//! The generic file handle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use super::{FileContent, Folder};
use crate::{FileStore, Identity, JailedPath, ResourceError};

/// A file in any backend.
///
/// Cloning is cheap: clones share the same store. Nothing is cached; every
/// query goes to the backend.
///
/// # Example
///
/// ```rust
/// use resourcefs::VirtualFolder;
///
/// # fn main() -> Result<(), resourcefs::ResourceError> {
/// let root = VirtualFolder::new().root();
/// let file = root.get_file("docs/readme.txt");
/// assert!(!file.exists()?);
///
/// file.content().write_str("hello")?;
/// assert_eq!(file.content().read_to_string()?, "hello");
/// assert!(root.get_folder("docs").exists()?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct File {
    store: Arc<dyn FileStore>,
}

impl File {
    /// Wrap a backend store.
    pub fn new<S: FileStore + 'static>(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Wrap an already shared backend store.
    pub fn from_store(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    /// The backend store behind this handle.
    pub fn store(&self) -> &dyn FileStore {
        &*self.store
    }

    /// The jailed path of the file.
    pub fn path(&self) -> &JailedPath {
        self.store.path()
    }

    /// The file name (`""` for a file handle at the root path).
    pub fn name(&self) -> &str {
        self.path().name().unwrap_or("")
    }

    /// The physical object behind this handle.
    pub fn identity(&self) -> Identity {
        self.store.identity()
    }

    /// The containing folder, or `None` at the root.
    pub fn parent(&self) -> Option<Folder> {
        let path = self.path();
        (!path.is_root()).then(|| self.store.folder_at(&path.parent()))
    }

    /// Check whether the file exists right now.
    pub fn exists(&self) -> Result<bool, ResourceError> {
        self.store.exists()
    }

    /// Fail with [`ResourceError::DoesNotExist`] unless the file exists.
    pub fn ensure_exists(&self) -> Result<(), ResourceError> {
        super::ensure_exists(self.store())
    }

    /// Create the file (and its parent folders) unless it exists.
    ///
    /// Existing content is never touched.
    pub fn create_if_missing(&self) -> Result<(), ResourceError> {
        if !self.exists()? {
            super::create_parent_if_missing(self.store())?;
            self.store.create()?;
        }
        Ok(())
    }

    /// Delete the file if it exists.
    pub fn delete(&self) -> Result<(), ResourceError> {
        if self.exists()? {
            self.store.delete()?;
        }
        Ok(())
    }

    /// Rename the file within its folder and return the renamed handle.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::DoesNotExist`] if the file is absent
    /// - [`ResourceError::AlreadyExists`] if `name` is taken in the same folder
    /// - [`ResourceError::InvalidName`] if `name` is not a single segment
    pub fn rename(&self, name: &str) -> Result<File, ResourceError> {
        let target = super::rename(self.store(), name)?;
        Ok(self.store.file_at(&target))
    }

    /// Content length in bytes.
    pub fn size(&self) -> Result<u64, ResourceError> {
        self.ensure_exists()?;
        self.store.size()
    }

    /// Time of the last modification.
    pub fn last_modified(&self) -> Result<SystemTime, ResourceError> {
        self.ensure_exists()?;
        self.store.last_modified()
    }

    /// Update the modification time.
    pub fn touch(&self) -> Result<(), ResourceError> {
        self.ensure_exists()?;
        self.store.touch()
    }

    /// Access the file content.
    pub fn content(&self) -> FileContent<'_> {
        FileContent::new(self)
    }

    /// Move this file into `folder`, keeping its name.
    ///
    /// Works across backends: the content is copied (natively when the
    /// destination supports it, streamed otherwise) and the source is deleted
    /// afterwards. Not atomic.
    pub fn move_to(&self, folder: &Folder) -> Result<File, ResourceError> {
        self.ensure_exists()?;
        let destination = folder.get_file(self.name());
        if destination == *self {
            return Ok(destination);
        }
        debug!(source = %self.path(), destination = %destination.path(), "moving file");
        destination.content().write_file(self)?;
        self.store.delete()?;
        Ok(destination)
    }

    /// Copy this file into `folder`, keeping its name.
    pub fn copy_to(&self, folder: &Folder) -> Result<File, ResourceError> {
        self.ensure_exists()?;
        let destination = folder.get_file(self.name());
        if destination == *self {
            return Ok(destination);
        }
        debug!(source = %self.path(), destination = %destination.path(), "copying file");
        destination.content().write_file(self)?;
        Ok(destination)
    }
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for File {}

impl Hash for File {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("File").field(&self.store).finish()
    }
}
