//! Public façade: point get, scoped read transaction, explicit expire,
//! set-partition, periodic freshness check, shutdown.

use crate::cache::PartitionCache;
use crate::config::Config;
use crate::storage::{FsStorage, Storage};
use crate::Result;
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Entry point of the crate: a bounded, disk-resident cache of remote
/// partitions.
///
/// `Db` is cheap to clone-by-reference (wrap it in an `Arc` if it needs
/// to be shared across threads or handed to a [`crate::freshness::FreshnessScheduler`]);
/// it holds no `&mut self` methods, matching the read-mostly,
/// concurrency-first shape spec'd for this cache.
pub struct Db {
    storage: Arc<dyn Storage>,
    cache: PartitionCache,
}

impl Db {
    /// Builds a `Db` over a caller-supplied [`Storage`] backend, holding
    /// at most `capacity` partitions resident on disk at once.
    pub fn new(storage: Arc<dyn Storage>, capacity: usize) -> Self {
        Self {
            cache: PartitionCache::new(Arc::clone(&storage), capacity),
            storage,
        }
    }

    /// Convenience constructor wiring up the reference [`FsStorage`]
    /// backend from a [`Config`].
    pub fn open(config: &Config) -> Result<Self> {
        let storage = Arc::new(FsStorage::new(&config.storage_root)?);
        Ok(Self::new(storage, config.capacity))
    }

    /// Looks up a single key within a bucket of a partition, loading
    /// the partition on a cache miss.
    pub fn get(&self, partid: &str, bucket: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        let handle = self.cache.get_or_load(partid)?;
        handle.get(bucket, key)
    }

    /// Runs `f` against the partition's embedded KV database inside a
    /// read transaction. Returns the partition's `mutable` flag
    /// alongside `f`'s result, as a hint for the caller's own caching
    /// decisions. Against a partition absent upstream, `f` is not
    /// invoked and the second element is `None`, not an error.
    pub fn view<F, R>(&self, partid: &str, f: F) -> Result<(bool, Option<R>)>
    where
        F: FnOnce(&sled::Db) -> Result<R>,
    {
        let handle = self.cache.get_or_load(partid)?;
        let mutable = handle.mutable;
        let result = handle.view(f)?;
        Ok((mutable, result))
    }

    /// Uploads the sled database directory at `local_path` as
    /// `partid`'s new content via `Storage`, then expires the local
    /// cache entry regardless of upload outcome: a subsequent read
    /// must never serve pre-upload data, even if the upload itself
    /// failed and the failure is about to be surfaced to the caller.
    pub fn set_part(&self, partid: &str, local_path: &Path, mutable: bool) -> Result<()> {
        let uploaded = self.storage.put(partid, local_path, mutable);
        self.expire(partid);
        uploaded
    }

    /// Removes `partid` from the cache, closing its handle. Idempotent.
    pub fn expire(&self, partid: &str) {
        self.cache.expire(partid);
    }

    /// Probes every mutable resident partition's upstream last-modified
    /// time and expires those that changed. Returns the number expired.
    /// Immutable partitions are skipped entirely to bound probe
    /// traffic. Probes run concurrently via rayon; the cache's internal
    /// lock is never held across one.
    pub fn check_expiry(&self) -> usize {
        let snapshot = self.cache.snapshot();
        let stale: Vec<String> = snapshot
            .into_par_iter()
            .filter(|(_, handle)| handle.mutable)
            .filter_map(|(partid, handle)| {
                let last_mod = self.storage.get_last_mod(&partid);
                if last_mod > handle.last_modified {
                    Some(partid)
                } else {
                    None
                }
            })
            .collect();

        for partid in &stale {
            self.cache.expire(partid);
        }
        if !stale.is_empty() {
            info!(count = stale.len(), "freshness check expired partitions");
        }
        stale.len()
    }

    /// Expires every resident partition, releasing its temp file and KV
    /// handle. Equivalent to evicting all keys.
    pub fn close(&self) {
        self.cache.close_all();
    }
}
