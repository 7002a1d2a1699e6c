//! # Virtual Backend
//!
//! An in-memory folder tree with copy-on-write file buffers.
//!
//! ## Layout
//!
//! ```text
//! VirtualFolder ── Arc<Tree> ── RwLock<Node::Folder>
//!                                  ├── "a" → Node::Folder
//!                                  │          └── "b.txt" → Node::File(Slot { content: Some(Arc<[u8]>) })
//!                                  └── "c.txt" → Node::File(Slot { content: None })
//! ```
//!
//! Every child node is owned by its parent; stores hold only the shared tree
//! and a [`JailedPath`] and look their node up on each call, so there are no
//! back-pointers. File bytes live in immutable `Arc<[u8]>` buffers: copying
//! between virtual files shares the buffer, and a write swaps in a new one,
//! leaving every other holder untouched. A file created but never written
//! holds no buffer at all.

use std::any::Any;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::io::{self, Cursor, Read, Write};
use std::mem;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::SystemTime;

use tracing::warn;

use crate::{
    ChildEntry, File, FileStore, Folder, FolderStore, Identity, JailedPath, Origin, Resource,
    ResourceError, ResourceKind, ResourceStore,
};

type Children = BTreeMap<String, Node>;

enum Node {
    Folder(Children),
    File(Slot),
}

impl Node {
    fn kind(&self) -> ResourceKind {
        match self {
            Node::Folder(_) => ResourceKind::Folder,
            Node::File(_) => ResourceKind::File,
        }
    }

    fn empty(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Folder => Node::Folder(Children::new()),
            ResourceKind::File => Node::File(Slot {
                content: None,
                modified: SystemTime::now(),
            }),
        }
    }
}

#[derive(Clone)]
struct Slot {
    content: Option<Arc<[u8]>>,
    modified: SystemTime,
}

struct Tree {
    root: RwLock<Node>,
}

fn lookup<'a>(root: &'a Node, path: &JailedPath) -> Option<&'a Node> {
    path.segments()
        .iter()
        .try_fold(root, |node, name| match node {
            Node::Folder(children) => children.get(name),
            Node::File(_) => None,
        })
}

fn lookup_mut<'a>(root: &'a mut Node, path: &JailedPath) -> Option<&'a mut Node> {
    path.segments()
        .iter()
        .try_fold(root, |node, name| match node {
            Node::Folder(children) => children.get_mut(name),
            Node::File(_) => None,
        })
}

fn children_mut<'a>(root: &'a mut Node, path: &JailedPath) -> Option<&'a mut Children> {
    match lookup_mut(root, path)? {
        Node::Folder(children) => Some(children),
        Node::File(_) => None,
    }
}

// =============================================================================
// Public handle
// =============================================================================

/// An in-memory folder tree.
///
/// Each `VirtualFolder::new()` is an independent tree: writes through one
/// never show up in another. Handles obtained from the same tree share it and
/// compare equal when they point at the same node.
///
/// # Example
///
/// ```rust
/// use resourcefs::VirtualFolder;
///
/// # fn main() -> Result<(), resourcefs::ResourceError> {
/// let root = VirtualFolder::new().root();
/// let file = root.get_file("notes/todo.txt");
/// file.create_if_missing()?;
/// assert_eq!(file.size()?, 0);
///
/// file.content().write_str("ship it")?;
/// assert_eq!(file.size()?, 7);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct VirtualFolder {
    tree: Arc<Tree>,
}

impl VirtualFolder {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            tree: Arc::new(Tree {
                root: RwLock::new(Node::Folder(Children::new())),
            }),
        }
    }

    /// The root folder of the tree. It always exists.
    pub fn root(&self) -> Folder {
        Folder::new(VirtualFolderStore {
            location: Location {
                tree: Arc::clone(&self.tree),
                path: JailedPath::root(),
            },
        })
    }
}

impl Default for VirtualFolder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<VirtualFolder> for Folder {
    fn from(tree: VirtualFolder) -> Self {
        tree.root()
    }
}

impl fmt::Debug for VirtualFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VirtualFolder")
            .field(&Arc::as_ptr(&self.tree))
            .finish()
    }
}

// =============================================================================
// Location: one path inside one tree
// =============================================================================

#[derive(Clone)]
struct Location {
    tree: Arc<Tree>,
    path: JailedPath,
}

impl Location {
    fn at(&self, path: &JailedPath) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            path: path.clone(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Node> {
        self.tree.root.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Node> {
        self.tree.root.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn identity(&self) -> Identity {
        Identity::new(
            Origin::Memory(Arc::as_ptr(&self.tree) as usize),
            self.path.clone(),
        )
    }

    fn file(&self, path: &JailedPath) -> File {
        File::new(VirtualFileStore {
            location: self.at(path),
        })
    }

    fn folder(&self, path: &JailedPath) -> Folder {
        Folder::new(VirtualFolderStore {
            location: self.at(path),
        })
    }

    fn existing(&self, path: &JailedPath) -> Option<Resource> {
        let kind = lookup(&self.read(), path)?.kind();
        Some(match kind {
            ResourceKind::File => Resource::File(self.file(path)),
            ResourceKind::Folder => Resource::Folder(self.folder(path)),
        })
    }

    fn exists_as(&self, kind: ResourceKind) -> bool {
        lookup(&self.read(), &self.path).is_some_and(|node| node.kind() == kind)
    }

    fn create(&self, kind: ResourceKind) -> Result<(), ResourceError> {
        let Some(name) = self.path.name() else {
            return match kind {
                ResourceKind::Folder => Ok(()),
                ResourceKind::File => Err(ResourceError::already_exists(&self.path, "create")),
            };
        };
        let parent = self.path.parent();
        let mut root = self.write();
        let children =
            children_mut(&mut root, &parent).ok_or_else(|| ResourceError::does_not_exist(&parent))?;
        match children.get(name).map(Node::kind) {
            Some(existing) if existing == kind => Ok(()),
            Some(_) => Err(ResourceError::already_exists(&self.path, "create")),
            None => {
                children.insert(name.to_owned(), Node::empty(kind));
                Ok(())
            }
        }
    }

    fn delete(&self, kind: ResourceKind) -> Result<(), ResourceError> {
        let mut root = self.write();
        let Some(name) = self.path.name() else {
            if let Node::Folder(children) = &mut *root {
                children.clear();
            }
            return Ok(());
        };
        let children = children_mut(&mut root, &self.path.parent())
            .ok_or_else(|| ResourceError::does_not_exist(&self.path))?;
        if children.get(name).is_some_and(|node| node.kind() == kind) {
            children.remove(name);
            Ok(())
        } else {
            Err(ResourceError::does_not_exist(&self.path))
        }
    }

    fn rename(&self, kind: ResourceKind, name: &str) -> Result<(), ResourceError> {
        let Some(current) = self.path.name() else {
            return Err(ResourceError::does_not_exist(&self.path));
        };
        let parent = self.path.parent();
        let mut root = self.write();
        let children = children_mut(&mut root, &parent)
            .ok_or_else(|| ResourceError::does_not_exist(&self.path))?;
        if !children.get(current).is_some_and(|node| node.kind() == kind) {
            return Err(ResourceError::does_not_exist(&self.path));
        }
        if children.contains_key(name) {
            return Err(ResourceError::already_exists(&parent.child(name), "rename"));
        }
        if let Some(node) = children.remove(current) {
            children.insert(name.to_owned(), node);
        }
        Ok(())
    }

    fn slot(&self) -> Result<Slot, ResourceError> {
        match lookup(&self.read(), &self.path) {
            Some(Node::File(slot)) => Ok(slot.clone()),
            _ => Err(ResourceError::does_not_exist(&self.path)),
        }
    }

    /// Swap in a new buffer, creating the file slot if needed.
    fn replace(&self, content: Arc<[u8]>) -> Result<(), ResourceError> {
        let Some(name) = self.path.name() else {
            return Err(ResourceError::already_exists(&self.path, "write"));
        };
        let parent = self.path.parent();
        let mut root = self.write();
        let children =
            children_mut(&mut root, &parent).ok_or_else(|| ResourceError::does_not_exist(&parent))?;
        let slot = Slot {
            content: Some(content),
            modified: SystemTime::now(),
        };
        match children.entry(name.to_owned()) {
            Entry::Occupied(mut entry) => match entry.get_mut() {
                Node::File(existing) => *existing = slot,
                Node::Folder(_) => return Err(ResourceError::already_exists(&self.path, "write")),
            },
            Entry::Vacant(entry) => {
                entry.insert(Node::File(slot));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Stores
// =============================================================================

struct VirtualFolderStore {
    location: Location,
}

struct VirtualFileStore {
    location: Location,
}

impl fmt::Debug for VirtualFolderStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VirtualFolderStore")
            .field(&self.location.path)
            .finish()
    }
}

impl fmt::Debug for VirtualFileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VirtualFileStore")
            .field(&self.location.path)
            .finish()
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
                Ok(self.location.existing(path))
            }

            fn folder_at(&self, path: &JailedPath) -> Folder {
                self.location.folder(path)
            }

            fn file_at(&self, path: &JailedPath) -> File {
                self.location.file(path)
            }

            fn exists(&self) -> Result<bool, ResourceError> {
                Ok(self.location.exists_as($kind))
            }

            fn rename(&self, name: &str) -> Result<(), ResourceError> {
                self.location.rename($kind, name)
            }

            fn delete(&self) -> Result<(), ResourceError> {
                self.location.delete($kind)
            }

            fn create(&self) -> Result<(), ResourceError> {
                self.location.create($kind)
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

resource_store!(VirtualFolderStore, ResourceKind::Folder);
resource_store!(VirtualFileStore, ResourceKind::File);

impl FolderStore for VirtualFolderStore {
    fn list(&self) -> Result<Vec<ChildEntry>, ResourceError> {
        let root = self.location.read();
        let Some(Node::Folder(children)) = lookup(&root, &self.location.path) else {
            return Ok(Vec::new());
        };
        Ok(children
            .iter()
            .map(|(name, node)| ChildEntry {
                name: name.clone(),
                kind: node.kind(),
            })
            .collect())
    }
}

impl FileStore for VirtualFileStore {
    fn size(&self) -> Result<u64, ResourceError> {
        let slot = self.location.slot()?;
        Ok(slot.content.map_or(0, |content| content.len() as u64))
    }

    fn last_modified(&self) -> Result<SystemTime, ResourceError> {
        Ok(self.location.slot()?.modified)
    }

    fn touch(&self) -> Result<(), ResourceError> {
        let mut root = self.location.write();
        match lookup_mut(&mut root, &self.location.path) {
            Some(Node::File(slot)) => {
                slot.modified = SystemTime::now();
                Ok(())
            }
            _ => Err(ResourceError::does_not_exist(&self.location.path)),
        }
    }

    fn open_read(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        let content = self.location.slot()?.content.unwrap_or_default();
        Ok(Box::new(Cursor::new(content)))
    }

    fn open_write(&self) -> Result<Box<dyn Write + Send>, ResourceError> {
        if self.location.exists_as(ResourceKind::Folder) {
            return Err(ResourceError::already_exists(&self.location.path, "write"));
        }
        Ok(Box::new(VirtualWriter {
            location: self.location.clone(),
            buffer: Vec::new(),
            published: false,
        }))
    }

    fn write_file(&self, source: &File) -> Result<bool, ResourceError> {
        let Some(source) = source.store().as_any().downcast_ref::<VirtualFileStore>() else {
            return Ok(false);
        };
        let content = source.location.slot()?.content.unwrap_or_default();
        self.location.replace(content)?;
        Ok(true)
    }
}

/// Collects bytes privately and publishes them on flush, or when dropped
/// with unpublished bytes.
struct VirtualWriter {
    location: Location,
    buffer: Vec<u8>,
    published: bool,
}

impl Write for VirtualWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.published = false;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.location.replace(Arc::from(self.buffer.as_slice()))?;
        self.published = true;
        Ok(())
    }
}

impl Drop for VirtualWriter {
    fn drop(&mut self) {
        // A writer abandoned by a panic never publishes half its bytes.
        if self.published || thread::panicking() {
            return;
        }
        let content = Arc::from(mem::take(&mut self.buffer));
        if let Err(error) = self.location.replace(content) {
            warn!(path = %self.location.path, %error, "discarding unflushed virtual write");
        }
    }
}
