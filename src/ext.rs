//! # Extension Traits
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, [`FileContent`](crate::FileContent)
//! gains JSON helpers through `ContentExtJson`:
//!
//! | Method | Description |
//! |--------|-------------|
//! | `read_json` | Read and deserialize the file as JSON |
//! | `write_json` | Serialize and write the file as pretty JSON |
//!
//! Enable with:
//! ```toml
//! [dependencies]
//! resourcefs = { version = "0.1", features = ["serde"] }
//! ```

#[cfg(feature = "serde")]
mod json {
    use serde::{Serialize, de::DeserializeOwned};

    use crate::{FileContent, ResourceError};

    /// JSON serialization extension methods for file content.
    ///
    /// Available when the `serde` feature is enabled.
    pub trait ContentExtJson {
        /// Read the file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - [`ResourceError::DoesNotExist`] if the file is absent
        /// - [`ResourceError::InvalidData`] if the file isn't valid UTF-8
        /// - [`ResourceError::Deserialization`] if JSON parsing failed
        ///
        /// # Example
        ///
        /// ```rust
        /// use resourcefs::{ContentExtJson, File, ResourceError};
        ///
        /// fn load_config(file: &File) -> Result<serde_json::Value, ResourceError> {
        ///     file.content().read_json()
        /// }
        /// ```
        fn read_json<T: DeserializeOwned>(&self) -> Result<T, ResourceError>;

        /// Serialize a value and write it as JSON, pretty-printed.
        ///
        /// # Errors
        ///
        /// - [`ResourceError::Serialization`] if serialization failed
        /// - any error from writing the content
        fn write_json<T: Serialize>(&self, value: &T) -> Result<(), ResourceError>;
    }

    impl ContentExtJson for FileContent<'_> {
        fn read_json<T: DeserializeOwned>(&self) -> Result<T, ResourceError> {
            let data = self.read_to_string()?;
            serde_json::from_str(&data).map_err(|e| ResourceError::Deserialization(e.to_string()))
        }

        fn write_json<T: Serialize>(&self, value: &T) -> Result<(), ResourceError> {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| ResourceError::Serialization(e.to_string()))?;
            self.write_str(&json)
        }
    }
}

#[cfg(feature = "serde")]
pub use json::ContentExtJson;
