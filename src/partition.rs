//! A single cached partition: its temp directory, open KV handle, and
//! the reader/closer discipline that lets capacity eviction and
//! freshness expiry tear it down safely while reads are in flight.

use crate::error::{Error, ErrorKind};
use crate::storage::{self, Storage};
use crate::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::SystemTime;
use tracing::{debug, warn};

/// The in-process representation of a resident partition.
///
/// `db` is `None` for a partition that does not exist upstream (the
/// not-found sentinel, see [`PartitionHandle::load`]): reads against it
/// succeed trivially rather than erroring, mirroring the behavior of
/// [`PartitionHandle::view`] on an absent KV handle.
pub struct PartitionHandle {
    part: String,
    fname: Option<PathBuf>,
    // `RwLock` gives us exactly the shared-read / exclusive-close
    // discipline we need: `view` holds a read guard for the duration
    // of the callback, `close` takes a write guard, which blocks until
    // every in-flight `view` has released its read guard.
    db: RwLock<Option<sled::Db>>,
    /// Last-modified timestamp reported by storage when fetched.
    pub last_modified: SystemTime,
    /// True iff the upstream payload may change and is eligible for
    /// freshness probing.
    pub mutable: bool,
}

impl PartitionHandle {
    /// Downloads and opens `part`, called only by the cache's loader on
    /// a miss. On any Storage error this propagates directly. On an
    /// authoritative not-found, it returns the not-found sentinel: no
    /// `db`, no `fname`, `mutable = true`, `last_modified` set strictly
    /// in the past so the next freshness probe always treats it as
    /// stale once the partition appears upstream.
    pub(crate) fn load(storage: &dyn Storage, part: &str) -> Result<Self> {
        match storage.get(part)? {
            None => {
                debug!(partition = part, "partition not found upstream");
                Ok(Self {
                    part: part.to_owned(),
                    fname: None,
                    db: RwLock::new(None),
                    last_modified: storage::not_found_sentinel(),
                    mutable: true,
                })
            }
            Some(fetched) => {
                let opened = sled::Config::new()
                    .path(&fetched.local_path)
                    .read_only(true)
                    .open();
                match opened {
                    Ok(db) => {
                        debug!(partition = part, path = ?fetched.local_path, "opened partition");
                        Ok(Self {
                            part: part.to_owned(),
                            fname: Some(fetched.local_path),
                            db: RwLock::new(Some(db)),
                            last_modified: fetched.last_modified,
                            mutable: fetched.mutable,
                        })
                    }
                    Err(e) => {
                        if let Err(rm_err) = fs::remove_dir_all(&fetched.local_path) {
                            warn!(partition = part, error = %rm_err, "failed to remove temp directory after open failure");
                        }
                        Err(e.into())
                    }
                }
            }
        }
    }

    /// Runs `f` against the open KV database inside a read transaction,
    /// under the handle's shared lock. If the handle has no open `db`
    /// (the not-found sentinel), this is a no-op that returns `Ok(None)`
    /// without invoking `f`. Close cannot proceed while a `view` is in
    /// flight; bytes read inside `f` must not be retained past its
    /// return; copy anything that needs to outlive the call.
    pub fn view<F, R>(&self, f: F) -> Result<Option<R>>
    where
        F: FnOnce(&sled::Db) -> Result<R>,
    {
        let guard = self.db.read().expect("partition lock poisoned");
        match guard.as_ref() {
            None => Ok(None),
            Some(db) => f(db).map(Some),
        }
    }

    /// Looks up a single key within a named bucket (a sled `Tree`).
    ///
    /// Against the not-found sentinel (no open `db`) this returns an
    /// empty byte string rather than an error: the lookup closure is
    /// simply never invoked, and a partition with no data is not a
    /// failure.
    pub fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        let bucket_name = bucket.to_vec();
        let key = key.to_vec();
        let bucket_for_error = bucket.to_vec();
        let result = self.view(move |db| {
            let exists = db
                .tree_names()
                .into_iter()
                .any(|name| name.as_ref() == bucket_name.as_slice());
            if !exists {
                return Err(Error::from(ErrorKind::BucketMissing(
                    String::from_utf8_lossy(&bucket_name).into_owned(),
                )));
            }
            let tree = db.open_tree(&bucket_name)?;
            match tree.get(&key)? {
                Some(value) => Ok(value.to_vec()),
                None => Err(Error::from(ErrorKind::KeyMissing)),
            }
        })?;
        match result {
            Some(bytes) => Ok(bytes),
            None => {
                debug!(
                    partition = self.part.as_str(),
                    bucket = %String::from_utf8_lossy(&bucket_for_error),
                    "get against not-found partition returns empty"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Acquires the exclusive lock (waiting out in-flight `view`
    /// calls), removes the temp directory if any, and drops the KV
    /// handle. Idempotent: a second call is a safe no-op, though the
    /// cache guarantees exactly one call by removing the handle from
    /// the LRU before invoking `close`.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.db.write().expect("partition lock poisoned");
        let db = guard.take();
        drop(db);
        drop(guard);

        if let Some(fname) = &self.fname {
            match fs::remove_dir_all(fname) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        debug!(partition = self.part.as_str(), "closed partition");
        Ok(())
    }
}
