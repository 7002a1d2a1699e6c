//! Lazy pre-order traversal of a folder's descendants.

use std::vec;

use super::{File, Folder, Resource};
use crate::ResourceError;

/// All descendants of a folder, produced lazily in pre-order.
///
/// `Find` is a recipe, not a snapshot: every call to [`iter`](Self::iter)
/// starts a fresh traversal that queries the backend as it goes. A folder is
/// yielded before its subtree, and its subtree before its next sibling.
///
/// # Example
///
/// ```rust
/// use resourcefs::VirtualFolder;
///
/// # fn main() -> Result<(), resourcefs::ResourceError> {
/// let root = VirtualFolder::new().root();
/// root.get_file("a/b.txt").content().write_str("b")?;
/// root.get_file("c.txt").content().write_str("c")?;
///
/// let paths = root
///     .find()
///     .iter()
///     .map(|r| r.map(|r| r.path().to_string()))
///     .collect::<Result<Vec<_>, _>>()?;
/// assert_eq!(paths, ["/a", "/a/b.txt", "/c.txt"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Find {
    root: Folder,
}

impl Find {
    pub(crate) fn new(root: Folder) -> Self {
        Self { root }
    }

    /// The folder whose descendants are produced.
    pub fn root(&self) -> &Folder {
        &self.root
    }

    /// Start a new traversal.
    pub fn iter(&self) -> FindIter {
        FindIter {
            stack: Vec::new(),
            descend: Some(self.root.clone()),
        }
    }

    /// Only the files, in traversal order.
    pub fn files(&self) -> impl Iterator<Item = Result<File, ResourceError>> + use<> {
        self.iter().filter_map(|item| match item {
            Ok(Resource::File(file)) => Some(Ok(file)),
            Ok(Resource::Folder(_)) => None,
            Err(e) => Some(Err(e)),
        })
    }

    /// Only the folders, in traversal order.
    pub fn folders(&self) -> impl Iterator<Item = Result<Folder, ResourceError>> + use<> {
        self.iter().filter_map(|item| match item {
            Ok(Resource::Folder(folder)) => Some(Ok(folder)),
            Ok(Resource::File(_)) => None,
            Err(e) => Some(Err(e)),
        })
    }

    /// Collect the whole traversal, stopping at the first error.
    pub fn collect_all(&self) -> Result<Vec<Resource>, ResourceError> {
        self.iter().collect()
    }
}

impl IntoIterator for Find {
    type Item = Result<Resource, ResourceError>;
    type IntoIter = FindIter;

    fn into_iter(self) -> FindIter {
        self.iter()
    }
}

impl IntoIterator for &Find {
    type Item = Result<Resource, ResourceError>;
    type IntoIter = FindIter;

    fn into_iter(self) -> FindIter {
        self.iter()
    }
}

/// Iterator state of a [`Find`] traversal.
///
/// Holds one child listing per level currently being walked; a folder is only
/// listed when the traversal actually descends into it.
#[derive(Debug)]
pub struct FindIter {
    stack: Vec<vec::IntoIter<Resource>>,
    descend: Option<Folder>,
}

impl Iterator for FindIter {
    type Item = Result<Resource, ResourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(folder) = self.descend.take() {
            match folder.list() {
                Ok(children) => self.stack.push(children.into_iter()),
                Err(e) => return Some(Err(e)),
            }
        }
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(resource) => {
                    if let Resource::Folder(folder) = &resource {
                        self.descend = Some(folder.clone());
                    }
                    return Some(Ok(resource));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
