//! Pack configuration.

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Default number of bytes moved from a source file per pack step.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// How file entries are compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Compression {
    /// Store entries without compression.
    Stored,
    /// Deflate entries.
    #[default]
    Deflated,
}

impl Compression {
    pub(crate) fn method(self) -> CompressionMethod {
        match self {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// Options for [`ZipStream`](super::ZipStream).
///
/// # Example
///
/// ```rust
/// use resourcefs::{Compression, ZipOptions};
///
/// let options = ZipOptions::default()
///     .compression(Compression::Deflated)
///     .level(Some(9))
///     .chunk_size(64 * 1024);
/// assert_eq!(options.chunk_size, 64 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ZipOptions {
    /// Compression applied to file entries.
    pub compression: Compression,
    /// Compression level; `None` uses the method's default.
    pub level: Option<i64>,
    /// Bytes read from a source file per step. Zero is treated as one.
    pub chunk_size: usize,
}

impl Default for ZipOptions {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            level: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ZipOptions {
    /// Set the compression method.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the compression level.
    pub fn level(mut self, level: Option<i64>) -> Self {
        self.level = level;
        self
    }

    /// Set the chunk size.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub(crate) fn file_options(&self) -> SimpleFileOptions {
        let options = SimpleFileOptions::default().compression_method(self.compression.method());
        match self.compression {
            // A level is meaningless without compression and rejected by the writer.
            Compression::Stored => options,
            Compression::Deflated => options.compression_level(self.level),
        }
    }

    pub(crate) fn directory_options(&self) -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
    }
}
