//! # Stored Resources
//!
//! Backend-agnostic behavior written once against the store traits.
//!
//! ## Overview
//!
//! [`File`] and [`Folder`] wrap an `Arc<dyn FileStore>` / `Arc<dyn FolderStore>`
//! and implement everything a caller sees: existence checks, parent creation,
//! rename collision detection, move, copy and recursive [`find`](Folder::find).
//! A backend only supplies the primitives.
//!
//! ```text
//! Folder::get_file("a/b.txt")
//!     → JailedPath::resolve   (jail enforced here)
//!     → FolderStore::file_at  (backend builds the handle)
//!     → File                  (generic algorithms from here on)
//! ```

mod content;
mod file;
mod find;
mod folder;

pub use content::FileContent;
pub use file::File;
pub use find::{Find, FindIter};
pub use folder::Folder;

use crate::path::{SEPARATORS, has_drive_prefix};
use crate::{JailedPath, ResourceError, ResourceKind, ResourceStore};

/// A file or a folder.
///
/// Equality and hashing follow the backend identity of the underlying object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    /// A file resource.
    File(File),
    /// A folder resource.
    Folder(Folder),
}

impl Resource {
    /// Whether this is a file or a folder.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::File(_) => ResourceKind::File,
            Resource::Folder(_) => ResourceKind::Folder,
        }
    }

    /// The jailed path of the resource.
    pub fn path(&self) -> &JailedPath {
        match self {
            Resource::File(file) => file.path(),
            Resource::Folder(folder) => folder.path(),
        }
    }

    /// The last path segment (`""` for the root).
    pub fn name(&self) -> &str {
        self.path().name().unwrap_or("")
    }

    /// The containing folder, or `None` at the root.
    pub fn parent(&self) -> Option<Folder> {
        match self {
            Resource::File(file) => file.parent(),
            Resource::Folder(folder) => folder.parent(),
        }
    }

    /// Check whether the resource exists right now.
    pub fn exists(&self) -> Result<bool, ResourceError> {
        match self {
            Resource::File(file) => file.exists(),
            Resource::Folder(folder) => folder.exists(),
        }
    }

    /// Delete the resource if it exists.
    pub fn delete(&self) -> Result<(), ResourceError> {
        match self {
            Resource::File(file) => file.delete(),
            Resource::Folder(folder) => folder.delete(),
        }
    }

    /// Returns `true` for files.
    #[inline]
    pub fn is_file(&self) -> bool {
        matches!(self, Resource::File(_))
    }

    /// Returns `true` for folders.
    #[inline]
    pub fn is_folder(&self) -> bool {
        matches!(self, Resource::Folder(_))
    }

    /// Borrow as a file.
    pub fn as_file(&self) -> Option<&File> {
        match self {
            Resource::File(file) => Some(file),
            Resource::Folder(_) => None,
        }
    }

    /// Borrow as a folder.
    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Resource::Folder(folder) => Some(folder),
            Resource::File(_) => None,
        }
    }

    /// Convert into a file.
    pub fn into_file(self) -> Option<File> {
        match self {
            Resource::File(file) => Some(file),
            Resource::Folder(_) => None,
        }
    }

    /// Convert into a folder.
    pub fn into_folder(self) -> Option<Folder> {
        match self {
            Resource::Folder(folder) => Some(folder),
            Resource::File(_) => None,
        }
    }
}

impl From<File> for Resource {
    fn from(file: File) -> Self {
        Resource::File(file)
    }
}

impl From<Folder> for Resource {
    fn from(folder: Folder) -> Self {
        Resource::Folder(folder)
    }
}

// =============================================================================
// Shared algorithms
// =============================================================================

pub(crate) fn ensure_exists<S: ResourceStore + ?Sized>(store: &S) -> Result<(), ResourceError> {
    if store.exists()? {
        Ok(())
    } else {
        Err(ResourceError::does_not_exist(store.path()))
    }
}

pub(crate) fn create_parent_if_missing<S: ResourceStore + ?Sized>(
    store: &S,
) -> Result<(), ResourceError> {
    let path = store.path();
    if path.is_root() {
        return Ok(());
    }
    store.folder_at(&path.parent()).create_if_missing()
}

/// Rename through the store after the generic checks; returns the new path.
pub(crate) fn rename<S: ResourceStore + ?Sized>(
    store: &S,
    name: &str,
) -> Result<JailedPath, ResourceError> {
    validate_name(name)?;
    ensure_exists(store)?;
    let path = store.path();
    if path.is_root() {
        return Err(ResourceError::InvalidTarget {
            path: path.clone(),
            reason: "the root cannot be renamed",
        });
    }
    let target = path.parent().child(name);
    if target == *path {
        return Ok(target);
    }
    if store.existing_resource_at(&target)?.is_some() {
        return Err(ResourceError::already_exists(&target, "rename"));
    }
    store.rename(name)?;
    Ok(target)
}

fn validate_name(name: &str) -> Result<(), ResourceError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name == "." || name == ".." {
        "name is a relative path marker"
    } else if name.contains(SEPARATORS) {
        "name contains a path separator"
    } else if has_drive_prefix(name) {
        "name starts with a drive prefix"
    } else {
        return Ok(());
    };
    Err(ResourceError::InvalidName {
        name: name.to_owned(),
        reason,
    })
}
