//! # resourcefs
//!
//! Jailed **file and folder resources** over pluggable stores.
//!
//! Callers work with [`Folder`], [`File`] and [`Resource`] handles. Every
//! lookup is resolved against a jail root with [`JailedPath`] rules, so no
//! input string can reach outside the backend it started in. Backends only
//! implement a small store contract; existence checks, parent creation,
//! move, copy and recursive search are written once on top of it.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use resourcefs::{compress, unpack, VirtualFolder};
//!
//! # fn main() -> Result<(), resourcefs::ResourceError> {
//! let root = VirtualFolder::new().root();
//!
//! // Parents are created on write; `..` never escapes the root.
//! root.get_file("site/index.html").content().write_str("<h1>hi</h1>")?;
//! assert_eq!(root.get_file("../../site/index.html").path().to_string(), "/site/index.html");
//!
//! // Copy between folders (or backends) with the same calls.
//! let backup = root.get_folder("backup");
//! root.get_folder("site").copy_to(&backup)?;
//!
//! // Zip a subtree and unpack it somewhere else.
//! let other = VirtualFolder::new().root();
//! unpack(compress(&backup, None), &other)?;
//! assert!(other.get_file("site/index.html").exists()?);
//! # Ok(())
//! # }
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`JailedPath`] | Normalized path that cannot climb above its root |
//! | [`Folder`] / [`File`] / [`Resource`] | Backend-agnostic resource handles |
//! | [`FileContent`] | Streaming and whole-content access to a file |
//! | [`Find`] | Lazy, restartable pre-order walk of a subtree |
//! | [`ResourceError`] | Error type with context |
//!
//! ## Backends
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`VirtualFolder`] | In-memory tree; copies share buffers until written |
//! | [`LocalFolder`] | A host directory through `std::fs` |
//! | [`ZipArchive`] | Read-only view of a zip file |
//!
//! A new backend implements [`FileStore`] and [`FolderStore`] (both extend
//! [`ResourceStore`]) and hands out handles with [`File::new`] /
//! [`Folder::new`].
//!
//! ---
//!
//! ## Error Handling
//!
//! All operations return `Result<T, ResourceError>`:
//!
//! ```rust
//! use resourcefs::{ResourceError, VirtualFolder};
//!
//! let root = VirtualFolder::new().root();
//! let err = root.get_file("missing.txt").size().unwrap_err();
//! assert!(matches!(err, ResourceError::DoesNotExist { .. }));
//! assert_eq!(err.to_string(), "does not exist: /missing.txt");
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! Stores are `Send + Sync` and take `&self`; handles are cheap to clone and
//! can be moved across threads. There is no locking across operations: one
//! writer per physical resource at a time.
//!
//! ---
//!
//! ## Logging
//!
//! Multi-step operations emit [`tracing`](https://docs.rs/tracing) events
//! (`debug` for copy, move, pack and unpack; `trace` per archive entry). The
//! crate never installs a subscriber.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`JailedPath`], [`ChildEntry`], [`ResourceKind`], [`ZipOptions`], and `ContentExtJson` |

// Private modules
mod archive;
mod backend;
mod error;
mod ext;
mod path;
mod stored;
mod traits;
mod types;

// Public re-exports - error types
pub use error::ResourceError;

// Public re-exports - core types
pub use path::{JailedPath, SEPARATOR};
pub use types::{ChildEntry, Identity, Origin, ResourceKind};

// Public re-exports - store contract
pub use traits::{FileStore, FolderStore, ResourceStore};

// Public re-exports - resource handles
pub use stored::{File, FileContent, Find, FindIter, Folder, Resource};

// Public re-exports - backends
pub use backend::{LocalFolder, VirtualFolder};

// Public re-exports - zip codec
pub use archive::{
    Compression, DEFAULT_CHUNK_SIZE, ZipArchive, ZipOptions, ZipStream, compress,
    compress_resources, unpack, unpack_file,
};

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::ContentExtJson;
