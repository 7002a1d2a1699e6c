//! Local disk backend delegating to `std::fs`.
//!
//! The jail root is a host directory; a [`JailedPath`] maps to it by joining
//! its segments, which by construction cannot contain `..`, separators of
//! either kind or drive prefixes.

use std::any::Any;
use std::fs;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::{
    ChildEntry, File, FileStore, Folder, FolderStore, Identity, JailedPath, Origin, Resource,
    ResourceError, ResourceKind, ResourceStore,
};

/// A host directory used as a jail root.
///
/// # Example
///
/// ```rust,no_run
/// use resourcefs::LocalFolder;
///
/// # fn main() -> Result<(), resourcefs::ResourceError> {
/// let root = LocalFolder::new("/var/lib/myapp").root();
/// // Cannot escape: resolves to /var/lib/myapp/etc/passwd
/// let file = root.get_file("../../etc/passwd");
/// assert_eq!(file.path().to_string(), "/etc/passwd");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalFolder {
    base: Arc<PathBuf>,
    origin: Arc<PathBuf>,
}

impl LocalFolder {
    /// Use `directory` as the jail root. It is not created until needed.
    ///
    /// The directory's canonical form is fixed here and identifies every
    /// resource below it, so handle equality does not change when the
    /// directory is created later.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let base = directory.into();
        let origin = canonical_base(&base);
        Self {
            base: Arc::new(base),
            origin: Arc::new(origin),
        }
    }

    /// The root folder.
    pub fn root(&self) -> Folder {
        Folder::new(LocalFolderStore {
            location: Location {
                base: Arc::clone(&self.base),
                origin: Arc::clone(&self.origin),
                path: JailedPath::root(),
            },
        })
    }

    /// The host directory used as the jail root.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The host path a jailed path maps to.
    pub fn local_path(&self, path: &JailedPath) -> PathBuf {
        map_path(&self.base, path)
    }
}

impl From<LocalFolder> for Folder {
    fn from(local: LocalFolder) -> Self {
        local.root()
    }
}

fn map_path(base: &Path, path: &JailedPath) -> PathBuf {
    let mut local = base.to_path_buf();
    local.extend(path.segments());
    local
}

/// Canonicalize the deepest existing ancestor of `base` and append the rest.
fn canonical_base(base: &Path) -> PathBuf {
    let absolute = std::path::absolute(base).unwrap_or_else(|_| base.to_path_buf());
    let mut missing = Vec::new();
    let mut current = absolute.as_path();
    loop {
        if let Ok(canonical) = fs::canonicalize(current) {
            return missing.iter().rev().fold(canonical, |path, name| path.join(name));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                current = parent;
            }
            _ => return absolute.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct Location {
    base: Arc<PathBuf>,
    origin: Arc<PathBuf>,
    path: JailedPath,
}

impl Location {
    fn at(&self, path: &JailedPath) -> Self {
        Self {
            base: Arc::clone(&self.base),
            origin: Arc::clone(&self.origin),
            path: path.clone(),
        }
    }

    fn local(&self) -> PathBuf {
        map_path(&self.base, &self.path)
    }

    fn identity(&self) -> Identity {
        Identity::new(Origin::Local((*self.origin).clone()), self.path.clone())
    }

    fn file(&self, path: &JailedPath) -> File {
        File::new(LocalFileStore {
            location: self.at(path),
        })
    }

    fn folder(&self, path: &JailedPath) -> Folder {
        Folder::new(LocalFolderStore {
            location: self.at(path),
        })
    }

    fn kind_at(&self, path: &JailedPath) -> Result<Option<ResourceKind>, ResourceError> {
        match fs::metadata(map_path(&self.base, path)) {
            Ok(metadata) if metadata.is_dir() => Ok(Some(ResourceKind::Folder)),
            Ok(metadata) if metadata.is_file() => Ok(Some(ResourceKind::File)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ResourceError::io("metadata", path, e)),
        }
    }

    fn existing(&self, path: &JailedPath) -> Result<Option<Resource>, ResourceError> {
        Ok(self.kind_at(path)?.map(|kind| match kind {
            ResourceKind::File => Resource::File(self.file(path)),
            ResourceKind::Folder => Resource::Folder(self.folder(path)),
        }))
    }

    fn rename(&self, name: &str) -> Result<(), ResourceError> {
        let target = self.path.parent().child(name);
        if self.kind_at(&self.path)?.is_none() {
            return Err(ResourceError::does_not_exist(&self.path));
        }
        if self.kind_at(&target)?.is_some() {
            return Err(ResourceError::already_exists(&target, "rename"));
        }
        fs::rename(self.local(), map_path(&self.base, &target))
            .map_err(|e| self.error("rename", e))
    }

    fn error(&self, operation: &'static str, e: io::Error) -> ResourceError {
        if e.kind() == io::ErrorKind::NotFound {
            ResourceError::does_not_exist(&self.path)
        } else {
            ResourceError::io(operation, &self.path, e)
        }
    }
}

macro_rules! resource_store {
    ($store:ty, $kind:expr) => {
        impl ResourceStore for $store {
            fn path(&self) -> &JailedPath {
                &self.location.path
            }

            fn identity(&self) -> Identity {
                self.location.identity()
            }

            fn existing_resource_at(
                &self,
                path: &JailedPath,
            ) -> Result<Option<Resource>, ResourceError> {
                self.location.existing(path)
            }

            fn folder_at(&self, path: &JailedPath) -> Folder {
                self.location.folder(path)
            }

            fn file_at(&self, path: &JailedPath) -> File {
                self.location.file(path)
            }

            fn exists(&self) -> Result<bool, ResourceError> {
                Ok(self.location.kind_at(&self.location.path)? == Some($kind))
            }

            fn rename(&self, name: &str) -> Result<(), ResourceError> {
                self.location.rename(name)
            }

            fn delete(&self) -> Result<(), ResourceError> {
                self.remove()
            }

            fn create(&self) -> Result<(), ResourceError> {
                self.make()
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

// =============================================================================
// Folder store
// =============================================================================

#[derive(Debug)]
struct LocalFolderStore {
    location: Location,
}

impl LocalFolderStore {
    fn remove(&self) -> Result<(), ResourceError> {
        fs::remove_dir_all(self.location.local()).map_err(|e| self.location.error("delete", e))
    }

    fn make(&self) -> Result<(), ResourceError> {
        fs::create_dir_all(self.location.local())
            .map_err(|e| ResourceError::io("create", &self.location.path, e))
    }
}

resource_store!(LocalFolderStore, ResourceKind::Folder);

impl FolderStore for LocalFolderStore {
    fn list(&self) -> Result<Vec<ChildEntry>, ResourceError> {
        let path = &self.location.path;
        let entries = match fs::read_dir(self.location.local()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ResourceError::io("list", path, e)),
        };
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ResourceError::io("list", path, e))?;
            // Names that are not UTF-8 cannot be addressed by a jailed path.
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            // Follows symlinks, so a link to a directory lists as a folder.
            let Ok(metadata) = fs::metadata(entry.path()) else {
                continue;
            };
            if metadata.is_dir() {
                children.push(ChildEntry::folder(name));
            } else if metadata.is_file() {
                children.push(ChildEntry::file(name));
            }
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }
}

// =============================================================================
// File store
// =============================================================================

#[derive(Debug)]
struct LocalFileStore {
    location: Location,
}

impl LocalFileStore {
    fn remove(&self) -> Result<(), ResourceError> {
        fs::remove_file(self.location.local()).map_err(|e| self.location.error("delete", e))
    }

    fn make(&self) -> Result<(), ResourceError> {
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.location.local())
            .map(drop)
            .map_err(|e| ResourceError::io("create", &self.location.path, e))
    }

    fn metadata(&self) -> Result<fs::Metadata, ResourceError> {
        fs::metadata(self.location.local()).map_err(|e| self.location.error("metadata", e))
    }
}

resource_store!(LocalFileStore, ResourceKind::File);

impl FileStore for LocalFileStore {
    fn size(&self) -> Result<u64, ResourceError> {
        Ok(self.metadata()?.len())
    }

    fn last_modified(&self) -> Result<SystemTime, ResourceError> {
        self.metadata()?
            .modified()
            .map_err(|e| ResourceError::io("last_modified", &self.location.path, e))
    }

    fn touch(&self) -> Result<(), ResourceError> {
        let file = fs::OpenOptions::new()
            .write(true)
            .open(self.location.local())
            .map_err(|e| self.location.error("touch", e))?;
        file.set_modified(SystemTime::now())
            .map_err(|e| ResourceError::io("touch", &self.location.path, e))
    }

    fn open_read(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        let file = fs::File::open(self.location.local()).map_err(|e| self.location.error("read", e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_write(&self) -> Result<Box<dyn Write + Send>, ResourceError> {
        let file = fs::File::create(self.location.local())
            .map_err(|e| ResourceError::io("write", &self.location.path, e))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}
