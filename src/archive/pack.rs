//! Streaming zip packer.
//!
//! ```text
//!  Find / resources ──► ZipWriter ──► WindowWriter ──► Window ──► ZipStream::read
//!                         (seeks back into the current      (releases bytes that
//!                          entry's local header only)         can no longer change)
//! ```
//!
//! The zip writer patches an entry's local header once the entry's data is
//! complete, so it needs `Seek`. The window keeps every byte from the start of
//! the entry currently being written; everything before it is final and is
//! handed to the reader. Memory use is bounded by one entry plus one chunk.
//!
//! A file is opened only after its entry has been started, so the previous
//! entry's bytes are readable before the next resource is touched.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};
use zip::ZipWriter;
use zip::result::ZipError;

use super::ZipOptions;
use crate::{File, Folder, JailedPath, Resource, ResourceError};

// =============================================================================
// Window
// =============================================================================

#[derive(Debug, Default)]
struct Window {
    /// Absolute offset of `buf[0]`.
    base: u64,
    buf: Vec<u8>,
    /// Absolute write position.
    pos: u64,
    /// Bytes below this offset are final.
    committed: u64,
}

impl Window {
    fn end(&self) -> u64 {
        self.base + self.buf.len() as u64
    }

    fn take(&mut self, out: &mut [u8]) -> usize {
        let available = usize::try_from(self.committed - self.base).unwrap_or(usize::MAX);
        let n = available.min(out.len()).min(self.buf.len());
        out[..n].copy_from_slice(&self.buf[..n]);
        self.buf.drain(..n);
        self.base += n as u64;
        n
    }
}

fn lock(window: &Mutex<Window>) -> MutexGuard<'_, Window> {
    window.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `Write + Seek` sink over the uncommitted tail of the archive.
#[derive(Debug, Clone)]
struct WindowWriter {
    window: Arc<Mutex<Window>>,
}

impl Write for WindowWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut window = lock(&self.window);
        if window.pos < window.committed {
            return Err(io::Error::other("write into a released part of the archive"));
        }
        let offset = usize::try_from(window.pos - window.base).map_err(io::Error::other)?;
        let overlap = (window.buf.len() - offset).min(data.len());
        window.buf[offset..offset + overlap].copy_from_slice(&data[..overlap]);
        window.buf.extend_from_slice(&data[overlap..]);
        window.pos += data.len() as u64;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for WindowWriter {
    fn seek(&mut self, to: SeekFrom) -> io::Result<u64> {
        let mut window = lock(&self.window);
        let target = match to {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => window.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => window.end().checked_add_signed(delta),
        };
        match target {
            Some(target) if target >= window.committed && target <= window.end() => {
                window.pos = target;
                Ok(target)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek outside the unreleased part of the archive",
            )),
        }
    }
}

// =============================================================================
// Entries
// =============================================================================

struct Entry {
    name: String,
    resource: Resource,
}

impl Entry {
    fn new(prefix: &JailedPath, relative: &JailedPath, resource: Resource) -> Option<Self> {
        let mut name = prefix.join(relative).to_relative_string();
        if name.is_empty() {
            return None;
        }
        if resource.is_folder() {
            name.push('/');
        }
        Some(Self { name, resource })
    }
}

type Entries = Box<dyn Iterator<Item = Result<Entry, ResourceError>> + Send>;

// =============================================================================
// ZipStream
// =============================================================================

/// A zip archive produced lazily as it is read.
///
/// Returned by [`compress`](crate::compress) and
/// [`compress_resources`](crate::compress_resources). Nothing is touched until
/// the first `read`; each `read` advances the packer just far enough to
/// return some bytes. Errors from the resources surface as [`io::Error`]s
/// that convert back into [`ResourceError`].
///
/// # Example
///
/// ```rust
/// use std::io::Read;
/// use resourcefs::{compress, Compression, VirtualFolder, ZipOptions};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = VirtualFolder::new().root();
/// root.get_file("a.txt").content().write_str("1")?;
///
/// let mut zipped = Vec::new();
/// compress(&root, None)
///     .with_options(ZipOptions::default().compression(Compression::Stored))
///     .read_to_end(&mut zipped)?;
/// assert!(zipped.starts_with(b"PK\x03\x04"));
/// # Ok(())
/// # }
/// ```
pub struct ZipStream {
    window: Arc<Mutex<Window>>,
    writer: Option<ZipWriter<WindowWriter>>,
    entries: Entries,
    /// File whose entry was started but not yet opened.
    pending: Option<File>,
    current: Option<Box<dyn Read + Send>>,
    options: ZipOptions,
    chunk: Vec<u8>,
    written: usize,
}

impl ZipStream {
    fn new(entries: Entries) -> Self {
        let window = Arc::new(Mutex::new(Window::default()));
        let writer = ZipWriter::new(WindowWriter {
            window: Arc::clone(&window),
        });
        Self {
            window,
            writer: Some(writer),
            entries,
            pending: None,
            current: None,
            options: ZipOptions::default(),
            chunk: Vec::new(),
            written: 0,
        }
    }

    pub(crate) fn of_folder(folder: &Folder, prefix: Option<&str>) -> Self {
        let prefix = prefix.map(JailedPath::parse).unwrap_or_default();
        let base = folder.path().clone();
        let entries = folder.find().into_iter().filter_map(move |item| match item {
            Ok(resource) => {
                let relative = resource.path().strip_prefix(&base).unwrap_or_default();
                Entry::new(&prefix, &relative, resource).map(Ok)
            }
            Err(e) => Some(Err(e)),
        });
        Self::new(Box::new(entries))
    }

    pub(crate) fn of_resources<I>(resources: I, prefix: Option<&str>) -> Self
    where
        I: IntoIterator<Item = Resource>,
        I::IntoIter: Send + 'static,
    {
        let prefix = prefix.map(JailedPath::parse).unwrap_or_default();
        let entries = resources.into_iter().filter_map(move |resource| {
            let relative = resource.path().clone();
            Entry::new(&prefix, &relative, resource).map(Ok)
        });
        Self::new(Box::new(entries))
    }

    /// Use `options` for the entries of this archive.
    ///
    /// Takes effect for entries not yet started; call it before reading.
    pub fn with_options(mut self, options: ZipOptions) -> Self {
        self.options = options;
        self
    }

    /// Number of entries started so far.
    pub fn entries_written(&self) -> usize {
        self.written
    }

    /// Move the packer one step forward. Returns `false` once the archive is
    /// complete.
    fn advance(&mut self) -> io::Result<bool> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(false);
        };
        if let Some(file) = self.pending.take() {
            self.current = Some(file.content().open_read().map_err(io::Error::from)?);
            return Ok(true);
        }
        if let Some(reader) = self.current.as_mut() {
            if self.chunk.len() != self.options.chunk_size.max(1) {
                self.chunk.resize(self.options.chunk_size.max(1), 0);
            }
            let n = match reader.read(&mut self.chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(true),
                Err(e) => return Err(e),
            };
            if n == 0 {
                self.current = None;
            } else {
                writer.write_all(&self.chunk[..n])?;
            }
            return Ok(true);
        }
        match self.entries.next() {
            Some(entry) => self.start(entry.map_err(io::Error::from)?)?,
            None => self.finish()?,
        }
        Ok(true)
    }

    fn start(&mut self, entry: Entry) -> io::Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let checkpoint = lock(&self.window).pos;
        match &entry.resource {
            Resource::Folder(_) => {
                trace!(name = %entry.name, "adding directory entry");
                writer
                    .add_directory(entry.name.as_str(), self.options.directory_options())
                    .map_err(zip_error)?;
            }
            Resource::File(file) => {
                trace!(name = %entry.name, "adding file entry");
                writer
                    .start_file(entry.name.as_str(), self.options.file_options())
                    .map_err(zip_error)?;
                self.pending = Some(file.clone());
            }
        }
        // Starting an entry finalizes the previous one.
        lock(&self.window).committed = checkpoint;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finish().map_err(zip_error)?;
            let mut window = lock(&self.window);
            window.committed = window.end();
            debug!(entries = self.written, "archive complete");
        }
        Ok(())
    }
}

fn zip_error(error: ZipError) -> io::Error {
    ResourceError::archive("compress", error).into()
}

impl Read for ZipStream {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            let n = lock(&self.window).take(out);
            if n > 0 {
                return Ok(n);
            }
            if !self.advance()? {
                return Ok(0);
            }
        }
    }
}

impl fmt::Debug for ZipStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipStream")
            .field("options", &self.options)
            .field("entries_written", &self.written)
            .field("finished", &self.writer.is_none())
            .finish_non_exhaustive()
    }
}
