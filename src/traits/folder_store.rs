//! Listing operations for folder stores.

use super::ResourceStore;
use crate::{ChildEntry, ResourceError};

/// Store contract for a single folder.
///
/// # Object Safety
///
/// This trait is object-safe and is held as `Arc<dyn FolderStore>` by
/// [`Folder`](crate::Folder).
pub trait FolderStore: ResourceStore {
    /// Immediate children, queried live from the backend.
    ///
    /// A folder that does not exist has no children. Order is backend
    /// defined; the bundled backends sort by name.
    fn list(&self) -> Result<Vec<ChildEntry>, ResourceError>;
}
