//! # Zip Codec
//!
//! Streaming conversion between folders and zip data.
//!
//! | Function | Direction |
//! |----------|-----------|
//! | [`compress`] | folder subtree → [`ZipStream`] (`Read`) |
//! | [`compress_resources`] | any resources → [`ZipStream`] |
//! | [`unpack`] | any `Read` → folder |
//! | [`unpack_file`] | zip [`File`](crate::File) → folder |
//!
//! Packing is pull-driven: the archive is produced as the stream is read and
//! only the entry being written is held in memory. Unpacking reads entries
//! strictly in order without seeking, so it works on sockets and pipes.
//! [`ZipArchive`] presents an existing zip file as a read-only
//! [`Folder`](crate::Folder).

mod folder;
mod options;
mod pack;
mod unpack;

pub use folder::ZipArchive;
pub use options::{Compression, DEFAULT_CHUNK_SIZE, ZipOptions};
pub use pack::ZipStream;
pub use unpack::{unpack, unpack_file};

use crate::{Folder, Resource};

/// Zip the descendants of `folder`.
///
/// Entry names are relative to `folder` and nested under `prefix` when one is
/// given; the folder itself is not an entry. Folders become directory entries
/// ending in `/`.
///
/// # Example
///
/// ```rust
/// use resourcefs::{compress, unpack, VirtualFolder};
///
/// # fn main() -> Result<(), resourcefs::ResourceError> {
/// let source = VirtualFolder::new().root();
/// source.get_file("a.txt").content().write_str("1")?;
///
/// let target = VirtualFolder::new().root();
/// unpack(compress(&source, Some("nested")), &target)?;
/// assert_eq!(target.get_file("nested/a.txt").content().read_to_string()?, "1");
/// # Ok(())
/// # }
/// ```
pub fn compress(folder: &Folder, prefix: Option<&str>) -> ZipStream {
    ZipStream::of_folder(folder, prefix)
}

/// Zip an arbitrary sequence of resources.
///
/// Entry names are the resources' paths relative to their jail root, nested
/// under `prefix` when one is given. Folders are added as directory entries
/// only; their content is not included unless it is part of `resources`.
pub fn compress_resources<I>(resources: I, prefix: Option<&str>) -> ZipStream
where
    I: IntoIterator<Item = Resource>,
    I::IntoIter: Send + 'static,
{
    ZipStream::of_resources(resources, prefix)
}
