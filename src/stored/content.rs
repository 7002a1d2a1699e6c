//! Streaming access to file content.

use std::io::{self, Read, Write};

use super::File;
use crate::ResourceError;

/// Content accessor returned by [`File::content`].
///
/// Every stream handed out is a scoped value: dropping it releases the
/// backend, and for some backends (the in-memory one) dropping a writer is
/// what makes the written bytes visible. The convenience methods here open,
/// use and release a stream on every exit path.
#[derive(Debug, Clone, Copy)]
pub struct FileContent<'a> {
    file: &'a File,
}

impl<'a> FileContent<'a> {
    pub(crate) fn new(file: &'a File) -> Self {
        Self { file }
    }

    /// Open the content for reading.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::DoesNotExist`] if the file is absent
    pub fn open_read(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        self.file.ensure_exists()?;
        self.file.store().open_read()
    }

    /// Open the content for writing, creating missing parent folders.
    ///
    /// Existing content is replaced once the writer is flushed or dropped.
    /// Only a flush reports a failure to publish the bytes.
    pub fn open_write(&self) -> Result<Box<dyn Write + Send>, ResourceError> {
        super::create_parent_if_missing(self.file.store())?;
        self.file.store().open_write()
    }

    /// Read the whole content into memory.
    pub fn read_to_vec(&self) -> Result<Vec<u8>, ResourceError> {
        let mut data = Vec::new();
        self.copy_into(&mut data)?;
        Ok(data)
    }

    /// Read the whole content as UTF-8 text.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::InvalidData`] if the content is not valid UTF-8
    pub fn read_to_string(&self) -> Result<String, ResourceError> {
        let data = self.read_to_vec()?;
        String::from_utf8(data).map_err(|e| ResourceError::InvalidData {
            path: self.file.path().clone(),
            details: e.to_string(),
        })
    }

    /// Replace the content with `data`.
    pub fn write_bytes(&self, data: &[u8]) -> Result<(), ResourceError> {
        self.write_from(&mut &data[..]).map(drop)
    }

    /// Replace the content with `text`.
    pub fn write_str(&self, text: &str) -> Result<(), ResourceError> {
        self.write_bytes(text.as_bytes())
    }

    /// Replace the content with everything `reader` yields.
    ///
    /// The reader is borrowed and left open. Returns the number of bytes
    /// written.
    pub fn write_from<R: Read + ?Sized>(&self, reader: &mut R) -> Result<u64, ResourceError> {
        let path = self.file.path();
        let mut writer = self.open_write()?;
        let written = io::copy(reader, &mut writer).map_err(|e| ResourceError::io("write", path, e))?;
        writer.flush().map_err(|e| ResourceError::io("write", path, e))?;
        Ok(written)
    }

    /// Replace the content with the content of `source`.
    ///
    /// The destination store is offered a native copy first (see
    /// [`FileStore::write_file`](crate::FileStore::write_file)); if it declines,
    /// the bytes are streamed.
    pub fn write_file(&self, source: &File) -> Result<(), ResourceError> {
        if source == self.file {
            return source.ensure_exists();
        }
        source.ensure_exists()?;
        super::create_parent_if_missing(self.file.store())?;
        if self.file.store().write_file(source)? {
            return Ok(());
        }
        let mut reader = source.store().open_read()?;
        self.write_from(&mut reader).map(drop)
    }

    /// Stream the content into `writer`. Returns the number of bytes copied.
    pub fn copy_into<W: Write + ?Sized>(&self, writer: &mut W) -> Result<u64, ResourceError> {
        let mut reader = self.open_read()?;
        io::copy(&mut reader, writer).map_err(|e| ResourceError::io("read", self.file.path(), e))
    }
}
