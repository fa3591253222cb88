//! Abstract remote object-store access.
//!
//! `Storage` is the seam between the partition cache and whatever backs
//! it in production (S3, GCS, a plain HTTP blob store, ...). The cache
//! never inspects compression or metadata encoding; those are entirely
//! `Storage`-local. [`FsStorage`] is the reference implementation used
//! by this crate's own tests and by the `toy_example` demo.

mod fs;

pub use fs::FsStorage;

use crate::Result;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Timestamp used for a partition that does not (yet) exist upstream.
///
/// Strictly older than [`probe_failure_sentinel`] so that once the
/// partition appears, the first successful [`Storage::get_last_mod`]
/// call is guaranteed to compare as newer and trigger a reload.
pub fn not_found_sentinel() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::new(2, 2)
}

/// Timestamp substituted when a freshness probe itself fails.
///
/// Strictly older than all realistic last-modified times, so a
/// transient probe failure can never look "newer" than a handle's
/// recorded `last_modified` and cause a spurious eviction.
pub fn probe_failure_sentinel() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::new(1, 0)
}

/// Outcome of a successful [`Storage::get`].
pub struct Fetched {
    /// Local path of the materialized partition directory (an
    /// unpacked sled database). The caller takes ownership; `Storage`
    /// does not retain it and will not clean it up.
    pub local_path: PathBuf,
    /// Last-modified timestamp reported by the store at fetch time.
    pub last_modified: SystemTime,
    /// Whether the upstream payload is flagged as changeable.
    pub mutable: bool,
}

/// Remote object-store abstraction consumed by the partition cache.
///
/// Implementations are responsible for compression and for encoding
/// the `mutable` flag as object metadata. `Storage` must tolerate
/// concurrent calls; the cache relies on that to serve unrelated
/// partitions in parallel.
pub trait Storage: Send + Sync {
    /// Downloads a partition's payload and unpacks it into a fresh
    /// temporary directory, returning `Ok(None)` on an authoritative
    /// not-found response (no error). Any other failure is an `Err`.
    fn get(&self, part: &str) -> Result<Option<Fetched>>;

    /// Packs the directory at `local_path` (a sled database tree) and
    /// uploads it with a metadata flag recording `mutable`.
    fn put(&self, part: &str, local_path: &std::path::Path, mutable: bool) -> Result<()>;

    /// Cheap metadata-only probe for a partition's current
    /// last-modified timestamp. Never errors: any failure is reported
    /// as [`probe_failure_sentinel`].
    fn get_last_mod(&self, part: &str) -> SystemTime;
}
