//! Operations every store supports, for files and folders alike.

use std::any::Any;
use std::fmt;

use crate::{File, Folder, Identity, JailedPath, Resource, ResourceError};

/// Base contract for [`FileStore`](super::FileStore) and
/// [`FolderStore`](super::FolderStore).
///
/// A store owns access to the physical state of exactly one resource. Stores
/// only implement the happy path plus their own low-level failures: the
/// generic layer ([`File`], [`Folder`]) checks existence and occupancy before
/// calling in.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods take `&self`; backends
/// use interior mutability for their state.
///
/// # Object Safety
///
/// This trait is object-safe; resources hold stores as trait objects.
pub trait ResourceStore: Send + Sync + fmt::Debug {
    /// The jailed path of this resource.
    fn path(&self) -> &JailedPath;

    /// The physical object behind this store.
    ///
    /// Handles built independently over the same object must report equal
    /// identities.
    fn identity(&self) -> Identity;

    /// The resource currently at `path`, or `None` when nothing is there.
    ///
    /// # Errors
    ///
    /// Only for unexpected backend failures.
    fn existing_resource_at(&self, path: &JailedPath) -> Result<Option<Resource>, ResourceError>;

    /// A folder handle for `path` in the same backend. Never creates anything.
    fn folder_at(&self, path: &JailedPath) -> Folder;

    /// A file handle for `path` in the same backend. Never creates anything.
    fn file_at(&self, path: &JailedPath) -> File;

    /// Check whether the resource exists, asking the backend every time.
    fn exists(&self) -> Result<bool, ResourceError>;

    /// Rename the resource within its parent.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::DoesNotExist`] if this resource is absent
    /// - [`ResourceError::AlreadyExists`] if `name` is occupied
    fn rename(&self, name: &str) -> Result<(), ResourceError>;

    /// Delete the resource; folders lose their whole subtree.
    fn delete(&self) -> Result<(), ResourceError>;

    /// Create the resource. The parent is expected to exist.
    ///
    /// Creating an existing folder is a no-op; creating an existing file
    /// leaves its content untouched.
    fn create(&self) -> Result<(), ResourceError>;

    /// Downcast support for same-backend fast paths.
    fn as_any(&self) -> &dyn Any;
}
