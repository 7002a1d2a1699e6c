//! Read-only folder view of a zip file.

use std::any::Any;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::ops::ControlFlow;
use std::time::SystemTime;

use super::unpack::for_each_entry;
use crate::{
    ChildEntry, File, FileStore, Folder, FolderStore, Identity, JailedPath, Origin, Resource,
    ResourceError, ResourceKind, ResourceStore,
};

/// A zip file presented as a [`Folder`].
///
/// The archive is read sequentially on every query, so the view always
/// reflects the current content of the zip file. Folders that only appear as
/// parents of entry names are listed too. Every mutating operation fails with
/// [`ResourceError::ReadOnly`].
///
/// # Cost
///
/// Nothing is cached. A listing reads the whole archive, and an existence
/// check reads it up to the first matching entry, so a [`find`](Folder::find)
/// over the view reads the archive once per folder and per lookup. To walk a
/// large archive repeatedly, [`unpack`](crate::unpack) it into a
/// [`VirtualFolder`](crate::VirtualFolder) first.
///
/// # Example
///
/// ```rust
/// use resourcefs::{compress, VirtualFolder, ZipArchive};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = VirtualFolder::new().root();
/// root.get_file("docs/readme.txt").content().write_str("hi")?;
///
/// let bundle = root.get_file("bundle.zip");
/// bundle.content().write_from(&mut compress(&root.get_folder("docs"), None))?;
///
/// let view = ZipArchive::new(bundle).root();
/// assert_eq!(view.get_file("readme.txt").content().read_to_string()?, "hi");
/// assert!(view.get_file("readme.txt").delete().is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ZipArchive {
    file: File,
}

impl ZipArchive {
    /// View `file` as a zip archive. Nothing is read until the view is used.
    pub fn new(file: File) -> Self {
        Self { file }
    }

    /// The zip file behind the view.
    pub fn file(&self) -> &File {
        &self.file
    }

    /// The root folder of the archive.
    pub fn root(&self) -> Folder {
        Folder::new(ArchiveFolderStore {
            location: Location {
                archive: self.file.clone(),
                path: JailedPath::root(),
            },
        })
    }
}

impl From<ZipArchive> for Folder {
    fn from(archive: ZipArchive) -> Self {
        archive.root()
    }
}

#[derive(Debug, Clone)]
struct Location {
    archive: File,
    path: JailedPath,
}

impl Location {
    fn at(&self, path: &JailedPath) -> Self {
        Self {
            archive: self.archive.clone(),
            path: path.clone(),
        }
    }

    fn file(&self, path: &JailedPath) -> File {
        File::new(ArchiveFileStore {
            location: self.at(path),
        })
    }

    fn folder(&self, path: &JailedPath) -> Folder {
        Folder::new(ArchiveFolderStore {
            location: self.at(path),
        })
    }

    fn identity(&self) -> Identity {
        Identity::new(
            Origin::Archive(Box::new(self.archive.identity())),
            self.path.clone(),
        )
    }

    fn read_only(&self, operation: &'static str) -> ResourceError {
        ResourceError::ReadOnly {
            path: self.path.clone(),
            operation,
        }
    }

    /// Every resource in the archive, including implied parent folders.
    fn index(&self) -> Result<BTreeMap<JailedPath, ResourceKind>, ResourceError> {
        let mut index = BTreeMap::new();
        if !self.archive.exists()? {
            return Ok(index);
        }
        let input = self.archive.content().open_read()?;
        for_each_entry(input, "index", |header, _| {
            let path = JailedPath::parse(header.name);
            if !path.is_root() {
                let mut parent = path.parent();
                while !parent.is_root() {
                    index.entry(parent.clone()).or_insert(ResourceKind::Folder);
                    parent = parent.parent();
                }
                let kind = if header.is_dir {
                    ResourceKind::Folder
                } else {
                    ResourceKind::File
                };
                index.insert(path, kind);
            }
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(index)
    }

    /// Stops reading at the first entry that is `path` or lies below it.
    fn kind_at(&self, path: &JailedPath) -> Result<Option<ResourceKind>, ResourceError> {
        if !self.archive.exists()? {
            return Ok(None);
        }
        if path.is_root() {
            return Ok(Some(ResourceKind::Folder));
        }
        let input = self.archive.content().open_read()?;
        let mut kind = None;
        for_each_entry(input, "exists", |header, _| {
            let entry = JailedPath::parse(header.name);
            if entry == *path && !header.is_dir {
                kind = Some(ResourceKind::File);
            } else if entry.starts_with(path) {
                kind = Some(ResourceKind::Folder);
            } else {
                return Ok(ControlFlow::Continue(()));
            }
            Ok(ControlFlow::Break(()))
        })?;
        Ok(kind)
    }

    fn existing(&self, path: &JailedPath) -> Result<Option<Resource>, ResourceError> {
        Ok(self.kind_at(path)?.map(|kind| match kind {
            ResourceKind::File => Resource::File(self.file(path)),
            ResourceKind::Folder => Resource::Folder(self.folder(path)),
        }))
    }

    /// Visit the file entry at this location with its uncompressed size, if
    /// the local header records one.
    fn with_entry<T>(
        &self,
        operation: &'static str,
        mut visit: impl FnMut(Option<u64>, &mut dyn Read) -> Result<T, ResourceError>,
    ) -> Result<T, ResourceError> {
        let input = self.archive.content().open_read()?;
        let mut found = None;
        for_each_entry(input, operation, |header, data| {
            if header.is_dir || JailedPath::parse(header.name) != self.path {
                return Ok(ControlFlow::Continue(()));
            }
            found = Some(visit(header.size, data)?);
            Ok(ControlFlow::Break(()))
        })?;
        found.ok_or_else(|| ResourceError::does_not_exist(&self.path))
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

            fn rename(&self, _name: &str) -> Result<(), ResourceError> {
                Err(self.location.read_only("rename"))
            }

            fn delete(&self) -> Result<(), ResourceError> {
                Err(self.location.read_only("delete"))
            }

            fn create(&self) -> Result<(), ResourceError> {
                Err(self.location.read_only("create"))
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

#[derive(Debug)]
struct ArchiveFolderStore {
    location: Location,
}

resource_store!(ArchiveFolderStore, ResourceKind::Folder);

impl FolderStore for ArchiveFolderStore {
    fn list(&self) -> Result<Vec<ChildEntry>, ResourceError> {
        let path = &self.location.path;
        let children = self
            .location
            .index()?
            .into_iter()
            .filter(|(entry, _)| entry.depth() == path.depth() + 1 && entry.starts_with(path))
            .filter_map(|(entry, kind)| {
                entry.name().map(|name| ChildEntry {
                    name: name.to_owned(),
                    kind,
                })
            })
            .collect();
        Ok(children)
    }
}

#[derive(Debug)]
struct ArchiveFileStore {
    location: Location,
}

resource_store!(ArchiveFileStore, ResourceKind::File);

impl FileStore for ArchiveFileStore {
    fn size(&self) -> Result<u64, ResourceError> {
        let path = &self.location.path;
        self.location.with_entry("size", |size, data| match size {
            Some(size) => Ok(size),
            None => io::copy(data, &mut io::sink()).map_err(|e| ResourceError::io("size", path, e)),
        })
    }

    /// Entries report the modification time of the zip file itself.
    fn last_modified(&self) -> Result<SystemTime, ResourceError> {
        self.location.with_entry("last_modified", |_, _| Ok(()))?;
        self.location.archive.last_modified()
    }

    fn touch(&self) -> Result<(), ResourceError> {
        Err(self.location.read_only("touch"))
    }

    fn open_read(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        let path = &self.location.path;
        let data = self.location.with_entry("read", |_, data| {
            let mut buffer = Vec::new();
            io::copy(data, &mut buffer).map_err(|e| ResourceError::io("read", path, e))?;
            Ok(buffer)
        })?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn open_write(&self) -> Result<Box<dyn Write + Send>, ResourceError> {
        Err(self.location.read_only("write"))
    }
}
