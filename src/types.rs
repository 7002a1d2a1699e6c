//! Core types shared by stores and resources.

use std::path::PathBuf;

use crate::JailedPath;

/// Whether a resource is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceKind {
    /// A file with byte content.
    File,
    /// A folder containing other resources.
    Folder,
}

/// One immediate child reported by [`FolderStore::list`](crate::FolderStore::list).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChildEntry {
    /// Name of the child (a single segment).
    pub name: String,
    /// Kind of the child.
    pub kind: ResourceKind,
}

impl ChildEntry {
    /// A file child.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::File,
        }
    }

    /// A folder child.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Folder,
        }
    }
}

/// The physical backend instance a store belongs to.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// An in-memory tree, keyed by the address of its shared root.
    Memory(usize),
    /// A local directory used as the jail root.
    Local(PathBuf),
    /// A zip archive, keyed by the identity of the archive file.
    Archive(Box<Identity>),
    /// Any other backend, keyed by a name of its choosing.
    Named(String),
}

/// The physical object behind a resource handle.
///
/// Two handles compare equal exactly when their identities do, regardless of
/// how each handle was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// The backend instance.
    pub origin: Origin,
    /// The location inside that backend.
    pub path: JailedPath,
}

impl Identity {
    /// Create an identity.
    pub fn new(origin: Origin, path: JailedPath) -> Self {
        Self { origin, path }
    }
}
