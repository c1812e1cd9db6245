// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for backend operations.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// An error from a backend operation.
///
/// Wraps any underlying error from a repository or cache implementation
/// while preserving the ability to extract the original typed error. The
/// wrapper is cheaply cloneable so a single failure can be shared with every
/// caller coalesced onto the same load.
///
/// # For backend implementers
///
/// Wrap your storage-specific errors using [`from_source`](Self::from_source):
///
/// ```ignore
/// impl Repository<K, V> for RedisRepository {
///     async fn get(&self, key: &K) -> Result<Option<V>, Error> {
///         self.client.get(key).await.map_err(Error::from_source)
///     }
/// }
/// ```
///
/// # For consumers
///
/// Extract the underlying error using [`source_as`](Self::source_as):
///
/// ```
/// use freshet_backend::Error;
///
/// let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
/// let error = Error::from_source(io_err);
///
/// assert!(error.source_as::<std::io::Error>().is_some());
/// ```
#[derive(Clone)]
pub struct Error {
    cause: Arc<dyn StdError + Send + Sync>,
}

impl Error {
    /// Creates a new error wrapping a source error.
    ///
    /// This preserves the original error type for later extraction via
    /// [`source_as`](Self::source_as).
    pub fn from_source(cause: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            cause: Arc::from(cause.into()),
        }
    }

    /// Creates a new error from a message string.
    ///
    /// Use [`from_source`](Self::from_source) instead when wrapping an
    /// existing error.
    ///
    /// # Examples
    ///
    /// ```
    /// use freshet_backend::Error;
    ///
    /// let error = Error::from_message("operation failed");
    /// assert!(error.to_string().contains("operation failed"));
    /// ```
    pub fn from_message(message: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::from_source(message)
    }

    /// Returns `true` if the source error is of type `T`.
    #[must_use]
    pub fn is_source<T: StdError + 'static>(&self) -> bool {
        self.source_as::<T>().is_some()
    }

    /// Returns the source error as type `T` if it matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use freshet_backend::Error;
    ///
    /// let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
    /// let error = Error::from_source(io_err);
    ///
    /// if let Some(io_err) = error.source_as::<std::io::Error>() {
    ///     assert_eq!(io_err.kind(), std::io::ErrorKind::NotFound);
    /// }
    /// ```
    #[must_use]
    pub fn source_as<T: StdError + 'static>(&self) -> Option<&T> {
        self.source().and_then(|s| s.downcast_ref::<T>())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cause)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Error").field(&self.cause).finish()
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// A specialized [`Result`] type for backend operations.
pub type Result<T> = std::result::Result<T, Error>;
