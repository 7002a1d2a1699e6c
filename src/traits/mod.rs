//! # Store Traits
//!
//! The capability set a backend implements to plug into the resource layer.
//!
//! ## Trait Layers
//!
//! ```text
//! ResourceStore  (path, identity, exists, create, delete, rename, lookup)
//!       ↓                     ↓
//! FileStore                FolderStore
//! (size, timestamps,       (list children)
//!  streams, copy hook)
//! ```
//!
//! ## Quick Reference
//!
//! | Trait | Held by | Adds |
//! |-------|---------|------|
//! | [`ResourceStore`] | both | existence, creation, rename, delete, handle lookup |
//! | [`FileStore`] | [`File`](crate::File) | `size`, `last_modified`, `touch`, `open_read`, `open_write`, `write_file` |
//! | [`FolderStore`] | [`Folder`](crate::Folder) | `list` |
//!
//! Backends stay minimal: every caller-visible behavior (parent creation,
//! existence checks, move, copy, find) lives once in the generic layer and is
//! expressed in terms of these primitives.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Methods take `&self`; backends use
//! interior mutability.
//!
//! ## Object Safety
//!
//! All traits are object-safe:
//!
//! ```rust
//! use resourcefs::{FileStore, FolderStore};
//!
//! fn describe(file: &dyn FileStore, folder: &dyn FolderStore) -> String {
//!     format!("{} in {}", file.path(), folder.path())
//! }
//! ```

mod file_store;
mod folder_store;
mod resource_store;

pub use file_store::FileStore;
pub use folder_store::FolderStore;
pub use resource_store::ResourceStore;
