use failure::{Backtrace, Context, Fail};
use std::fmt;
use std::io;

/// Error type surfaced by the cache's public API.
#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

/// Kinds of errors the cache can surface.
#[derive(Debug, Clone, PartialEq, Eq, Fail)]
pub enum ErrorKind {
    /// Legacy artifact of a dynamically-typed partition key; unreachable
    /// here since partition ids are plain `&str` at the API boundary.
    #[fail(display = "partition key must be a string")]
    KeyNotString,
    /// Legacy artifact of a dynamically-typed cache value; unreachable
    /// here since the LRU is monomorphic over `Arc<PartitionHandle>`.
    #[fail(display = "cached object has an unexpected type")]
    InvalidObject,
    /// The named bucket does not exist in the loaded partition.
    #[fail(display = "bucket {} not found", _0)]
    BucketMissing(String),
    /// The bucket exists but the key is absent.
    #[fail(display = "key not found")]
    KeyMissing,
    /// Storage returned a failure other than not-found.
    #[fail(display = "storage error: {}", _0)]
    Storage(String),
    /// Serialization/deserialization error from a Storage metadata sidecar.
    #[fail(display = "json error")]
    Json,
    /// The embedded KV engine failed to open or read a partition file.
    #[fail(display = "sled error")]
    Sled,
    /// A local filesystem operation failed (temp file, rename, unlink).
    #[fail(display = "io error")]
    Io,
    /// Authoritative "no such partition" response from Storage.
    ///
    /// Internal only: a [`Storage`](crate::storage::Storage) backend
    /// whose transport reports absence as an error (rather than as
    /// `Ok(None)`, the way [`FsStorage`](crate::storage::FsStorage)
    /// does) should classify that error with [`is_not_found`] and
    /// return this kind; the partition loader converts it into a
    /// not-found sentinel handle and never lets it reach a caller.
    #[fail(display = "partition not found")]
    NotFound,
}

impl Error {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.inner.get_context().clone()
    }
}

/// Distinguishes an authoritative "no such partition" response from any
/// other Storage failure.
///
/// Storage backends that surface not-found as a transport-level error
/// (an HTTP 404, say) use this to decide whether to translate it into
/// [`ErrorKind::NotFound`] before returning. [`FsStorage`](crate::storage::FsStorage)
/// has no such ambiguity (it reports absence as `Ok(None)` directly),
/// so this predicate exists for the benefit of other implementations.
pub fn is_not_found(err: &Error) -> bool {
    err.kind() == ErrorKind::NotFound
}

impl Clone for Error {
    /// Reconstructs an equivalent error from its `ErrorKind`, losing
    /// the original backtrace and cause chain. Used to hand the same
    /// outcome to every follower of a single-flight partition load,
    /// where `failure::Context`'s own backtrace can't be shared.
    fn clone(&self) -> Self {
        Error::from(self.kind())
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Context::new(kind),
        }
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(context: Context<ErrorKind>) -> Error {
        Error { inner: context }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        error.context(ErrorKind::Io).into()
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        error.context(ErrorKind::Json).into()
    }
}

impl From<sled::Error> for Error {
    fn from(error: sled::Error) -> Error {
        error.context(ErrorKind::Sled).into()
    }
}
