//! The generic folder handle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::debug;

use super::{File, Find, Resource};
use crate::{FolderStore, Identity, JailedPath, ResourceError, ResourceKind};

/// A folder in any backend.
///
/// Lookups by relative path are resolved with [`JailedPath`] rules from this
/// folder's path, so `..` can climb to ancestors but never out of the
/// backend's root. Looking a resource up never creates it.
///
/// # Example
///
/// ```rust
/// use resourcefs::VirtualFolder;
///
/// # fn main() -> Result<(), resourcefs::ResourceError> {
/// let root = VirtualFolder::new().root();
/// let src = root.get_folder("src");
/// src.get_file("main.rs").content().write_str("fn main() {}")?;
///
/// let dest = root.get_folder("backup");
/// src.copy_to(&dest)?;
/// assert!(dest.get_file("src/main.rs").exists()?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Folder {
    store: Arc<dyn FolderStore>,
}

impl Folder {
    /// Wrap a backend store.
    pub fn new<S: FolderStore + 'static>(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Wrap an already shared backend store.
    pub fn from_store(store: Arc<dyn FolderStore>) -> Self {
        Self { store }
    }

    /// The backend store behind this handle.
    pub fn store(&self) -> &dyn FolderStore {
        &*self.store
    }

    /// The jailed path of the folder.
    pub fn path(&self) -> &JailedPath {
        self.store.path()
    }

    /// The folder name (`""` for the root).
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

    /// Check whether the folder exists right now.
    pub fn exists(&self) -> Result<bool, ResourceError> {
        self.store.exists()
    }

    /// Fail with [`ResourceError::DoesNotExist`] unless the folder exists.
    pub fn ensure_exists(&self) -> Result<(), ResourceError> {
        super::ensure_exists(self.store())
    }

    /// Create the folder and any missing ancestors.
    pub fn create_if_missing(&self) -> Result<(), ResourceError> {
        if !self.exists()? {
            super::create_parent_if_missing(self.store())?;
            self.store.create()?;
        }
        Ok(())
    }

    /// Delete the folder and everything below it, if it exists.
    pub fn delete(&self) -> Result<(), ResourceError> {
        if self.exists()? {
            self.store.delete()?;
        }
        Ok(())
    }

    /// Rename the folder within its parent and return the renamed handle.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::DoesNotExist`] if the folder is absent
    /// - [`ResourceError::AlreadyExists`] if `name` is taken in the same parent
    /// - [`ResourceError::InvalidName`] if `name` is not a single segment
    /// - [`ResourceError::InvalidTarget`] for the root
    pub fn rename(&self, name: &str) -> Result<Folder, ResourceError> {
        let target = super::rename(self.store(), name)?;
        Ok(self.store.folder_at(&target))
    }

    /// A file at `path` relative to this folder. It need not exist.
    pub fn get_file(&self, path: &str) -> File {
        self.store.file_at(&self.path().resolve(path))
    }

    /// A folder at `path` relative to this folder. It need not exist.
    pub fn get_folder(&self, path: &str) -> Folder {
        self.store.folder_at(&self.path().resolve(path))
    }

    /// Whatever currently exists at `path` relative to this folder.
    pub fn get_existing(&self, path: &str) -> Result<Option<Resource>, ResourceError> {
        self.store.existing_resource_at(&self.path().resolve(path))
    }

    /// Returns `true` if anything exists at `path` relative to this folder.
    pub fn has_existing(&self, path: &str) -> Result<bool, ResourceError> {
        Ok(self.get_existing(path)?.is_some())
    }

    /// Immediate children. A missing folder has none.
    pub fn list(&self) -> Result<Vec<Resource>, ResourceError> {
        let path = self.path();
        let children = self
            .store
            .list()?
            .into_iter()
            .map(|entry| {
                let child = path.child(&entry.name);
                match entry.kind {
                    ResourceKind::File => Resource::File(self.store.file_at(&child)),
                    ResourceKind::Folder => Resource::Folder(self.store.folder_at(&child)),
                }
            })
            .collect();
        Ok(children)
    }

    /// Immediate child files.
    pub fn files(&self) -> Result<Vec<File>, ResourceError> {
        Ok(self.list()?.into_iter().filter_map(Resource::into_file).collect())
    }

    /// Immediate child folders.
    pub fn folders(&self) -> Result<Vec<Folder>, ResourceError> {
        Ok(self.list()?.into_iter().filter_map(Resource::into_folder).collect())
    }

    /// All descendants in pre-order. See [`Find`].
    pub fn find(&self) -> Find {
        Find::new(self.clone())
    }

    /// Copy this folder and its subtree into `folder`, keeping its name.
    ///
    /// Copying the root merges its content into `folder`.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::DoesNotExist`] if this folder is absent
    /// - [`ResourceError::InvalidTarget`] if `folder` lies inside this folder
    pub fn copy_to(&self, folder: &Folder) -> Result<Folder, ResourceError> {
        self.ensure_exists()?;
        let destination = folder.get_folder(self.name());
        if destination == *self {
            return Ok(destination);
        }
        let target = destination.identity();
        let source = self.identity();
        if target.origin == source.origin && target.path.starts_with(&source.path) {
            return Err(ResourceError::InvalidTarget {
                path: destination.path().clone(),
                reason: "destination is inside the folder being copied",
            });
        }
        debug!(source = %self.path(), destination = %destination.path(), "copying folder");
        destination.create_if_missing()?;
        for resource in self.find() {
            let resource = resource?;
            let Some(relative) = resource.path().strip_prefix(self.path()) else {
                continue;
            };
            let relative = relative.to_relative_string();
            match resource {
                Resource::Folder(_) => destination.get_folder(&relative).create_if_missing()?,
                Resource::File(file) => destination.get_file(&relative).content().write_file(&file)?,
            }
        }
        Ok(destination)
    }

    /// Move this folder and its subtree into `folder`, keeping its name.
    ///
    /// Implemented as copy then delete; not atomic.
    pub fn move_to(&self, folder: &Folder) -> Result<Folder, ResourceError> {
        let destination = self.copy_to(folder)?;
        if destination != *self {
            self.store.delete()?;
        }
        Ok(destination)
    }
}

impl PartialEq for Folder {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Folder {}

impl Hash for Folder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Folder").field(&self.store).finish()
    }
}
