//! # Backends
//!
//! Concrete stores behind [`Folder`](crate::Folder) and [`File`](crate::File).
//!
//! | Backend | Storage | Identity |
//! |---------|---------|----------|
//! | [`VirtualFolder`] | in-memory tree, copy-on-write buffers | the tree instance |
//! | [`LocalFolder`] | a host directory via `std::fs` | the canonical directory |
//!
//! The read-only zip view lives with the codec as
//! [`ZipArchive`](crate::ZipArchive).

mod local;
mod virtual_folder;

pub use local::LocalFolder;
pub use virtual_folder::VirtualFolder;
