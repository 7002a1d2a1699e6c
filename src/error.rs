//! Error types for jailed resources.

use std::io;

use crate::JailedPath;

/// Resource error type with contextual variants.
///
/// Existence and occupancy failures are detected by the generic resource layer
/// before a store is touched; I/O and archive failures always keep their
/// original cause as [`source`](std::error::Error::source).
///
/// # Examples
///
/// ```rust
/// use resourcefs::{JailedPath, ResourceError};
///
/// let err = ResourceError::DoesNotExist { path: JailedPath::parse("/missing") };
/// assert_eq!(err.to_string(), "does not exist: /missing");
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The operation required the resource to exist.
    #[error("does not exist: {path}")]
    DoesNotExist {
        /// The missing resource.
        path: JailedPath,
    },

    /// The operation required the target name to be free.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The occupied path.
        path: JailedPath,
        /// The operation that failed.
        operation: &'static str,
    },

    /// A resource name that cannot be used for a single segment.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The destination of a folder copy or move is unusable.
    #[error("invalid target {path}: {reason}")]
    InvalidTarget {
        /// The rejected destination.
        path: JailedPath,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Content could not be interpreted as requested.
    #[error("invalid data: {path} ({details})")]
    InvalidData {
        /// The file holding the data.
        path: JailedPath,
        /// Details about the invalid data.
        details: String,
    },

    /// The backend does not support mutation.
    #[error("read-only resource: {operation}: {path}")]
    ReadOnly {
        /// The resource that was targeted.
        path: JailedPath,
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The resource involved in the operation.
        path: JailedPath,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Zip archive error with context.
    #[error("{operation}: archive error: {source}")]
    Archive {
        /// The operation that failed.
        operation: &'static str,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl ResourceError {
    pub(crate) fn io(operation: &'static str, path: &JailedPath, source: io::Error) -> Self {
        match source.downcast::<ResourceError>() {
            Ok(inner) => inner,
            Err(source) => ResourceError::Io {
                operation,
                path: path.clone(),
                source,
            },
        }
    }

    pub(crate) fn archive(operation: &'static str, source: zip::result::ZipError) -> Self {
        match source {
            zip::result::ZipError::Io(source) => ResourceError::Io {
                operation,
                path: JailedPath::root(),
                source,
            },
            source => ResourceError::Archive { operation, source },
        }
    }

    pub(crate) fn does_not_exist(path: &JailedPath) -> Self {
        ResourceError::DoesNotExist { path: path.clone() }
    }

    pub(crate) fn already_exists(path: &JailedPath, operation: &'static str) -> Self {
        ResourceError::AlreadyExists {
            path: path.clone(),
            operation,
        }
    }

    /// Returns `true` for [`ResourceError::DoesNotExist`].
    pub fn is_does_not_exist(&self) -> bool {
        matches!(self, ResourceError::DoesNotExist { .. })
    }

    /// Returns `true` for [`ResourceError::AlreadyExists`].
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ResourceError::AlreadyExists { .. })
    }
}

impl From<io::Error> for ResourceError {
    fn from(error: io::Error) -> Self {
        // Errors that crossed a `Read`/`Write` boundary come back as themselves.
        match error.downcast::<ResourceError>() {
            Ok(inner) => inner,
            Err(error) => ResourceError::Io {
                operation: "io",
                path: JailedPath::root(),
                source: error,
            },
        }
    }
}

impl From<ResourceError> for io::Error {
    fn from(error: ResourceError) -> Self {
        let kind = match &error {
            ResourceError::DoesNotExist { .. } => io::ErrorKind::NotFound,
            ResourceError::AlreadyExists { .. } => io::ErrorKind::AlreadyExists,
            ResourceError::InvalidName { .. } | ResourceError::InvalidTarget { .. } => {
                io::ErrorKind::InvalidInput
            }
            ResourceError::InvalidData { .. } | ResourceError::Archive { .. } => {
                io::ErrorKind::InvalidData
            }
            ResourceError::ReadOnly { .. } => io::ErrorKind::PermissionDenied,
            ResourceError::Io { source, .. } => source.kind(),
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, error)
    }
}
