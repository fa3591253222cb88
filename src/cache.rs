//! Bounded LRU over resident [`PartitionHandle`]s: load-on-miss with
//! single-flight, evict-with-hook, and a snapshot for the freshness
//! checker.

use crate::partition::PartitionHandle;
use crate::storage::Storage;
use crate::Result;
use lru::LruCache;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use tracing::warn;

enum LoadState {
    Pending,
    Done(Result<Arc<PartitionHandle>>),
}

struct LoadSlot {
    state: Mutex<LoadState>,
    done: Condvar,
}

impl LoadSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(LoadState::Pending),
            done: Condvar::new(),
        }
    }

    fn finish(&self, result: Result<Arc<PartitionHandle>>) {
        let mut state = self.state.lock().expect("load slot lock poisoned");
        *state = LoadState::Done(result);
        self.done.notify_all();
    }

    fn wait(&self) -> Result<Arc<PartitionHandle>> {
        let mut state = self.state.lock().expect("load slot lock poisoned");
        while matches!(&*state, LoadState::Pending) {
            state = self.done.wait(state).expect("load slot lock poisoned");
        }
        match &*state {
            LoadState::Done(result) => result.clone(),
            LoadState::Pending => unreachable!("woken with no result published"),
        }
    }
}

enum LookupStep {
    Hit(Arc<PartitionHandle>),
    Leader(Arc<LoadSlot>),
    Follower(Arc<LoadSlot>),
}

/// Maps partition id to resident [`PartitionHandle`], bounded to a
/// fixed capacity of simultaneously resident partitions.
pub(crate) struct PartitionCache {
    storage: Arc<dyn Storage>,
    entries: Mutex<LruCache<String, Arc<PartitionHandle>>>,
    inflight: Mutex<HashMap<String, Arc<LoadSlot>>>,
}

impl PartitionCache {
    pub fn new(storage: Arc<dyn Storage>, capacity: usize) -> Self {
        Self {
            storage,
            entries: Mutex::new(LruCache::new(capacity)),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the resident handle for `partid`, loading it on a miss.
    /// Concurrent misses on the same id share a single load: exactly
    /// one caller runs [`PartitionHandle::load`], the rest block on its
    /// result.
    pub fn get_or_load(&self, partid: &str) -> Result<Arc<PartitionHandle>> {
        let step = {
            let mut entries = self.entries.lock().expect("cache lock poisoned");
            if let Some(handle) = entries.get(partid) {
                LookupStep::Hit(Arc::clone(handle))
            } else {
                drop(entries);
                let mut inflight = self.inflight.lock().expect("inflight lock poisoned");
                if let Some(slot) = inflight.get(partid) {
                    LookupStep::Follower(Arc::clone(slot))
                } else {
                    let slot = Arc::new(LoadSlot::new());
                    inflight.insert(partid.to_owned(), Arc::clone(&slot));
                    LookupStep::Leader(slot)
                }
            }
        };

        match step {
            LookupStep::Hit(handle) => Ok(handle),
            LookupStep::Follower(slot) => slot.wait(),
            LookupStep::Leader(slot) => self.run_load(partid, &slot),
        }
    }

    fn run_load(&self, partid: &str, slot: &LoadSlot) -> Result<Arc<PartitionHandle>> {
        let result = PartitionHandle::load(self.storage.as_ref(), partid).map(Arc::new);

        if let Ok(handle) = &result {
            self.insert(partid, Arc::clone(handle));
        }

        self.inflight
            .lock()
            .expect("inflight lock poisoned")
            .remove(partid);
        slot.finish(result.clone());
        result
    }

    /// Inserts `handle` as the new most-recently-used entry, closing
    /// whatever it replaces: the capacity-evicted tail, or (defensively,
    /// should it ever race with another load of the same id) a stale
    /// entry already present under `partid`.
    fn insert(&self, partid: &str, handle: Arc<PartitionHandle>) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let stale = entries.pop(partid);
        let evicted = entries.push(partid.to_owned(), handle);
        drop(entries);

        if let Some(stale_handle) = stale {
            self.close_hook(partid, &stale_handle);
        }
        if let Some((evicted_id, evicted_handle)) = evicted {
            self.close_hook(&evicted_id, &evicted_handle);
        }
    }

    /// Removes `partid` from the cache, closing its handle if present.
    /// A no-op if absent, so repeated calls are idempotent.
    pub fn expire(&self, partid: &str) {
        let removed = self.entries.lock().expect("cache lock poisoned").pop(partid);
        if let Some(handle) = removed {
            self.close_hook(partid, &handle);
        }
    }

    /// Drains every entry, closing each handle. Used by `Db::close`.
    pub fn close_all(&self) {
        let drained: Vec<(String, Arc<PartitionHandle>)> = {
            let mut entries = self.entries.lock().expect("cache lock poisoned");
            let mut drained = Vec::with_capacity(entries.len());
            while let Some(entry) = entries.pop_lru() {
                drained.push(entry);
            }
            drained
        };
        for (partid, handle) in drained {
            self.close_hook(&partid, &handle);
        }
    }

    /// A point-in-time snapshot of resident (id, handle) pairs, used by
    /// the freshness checker. Taking the snapshot never blocks on
    /// network I/O; it only holds the cache's internal lock long
    /// enough to clone `Arc`s.
    pub fn snapshot(&self) -> Vec<(String, Arc<PartitionHandle>)> {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }

    fn close_hook(&self, partid: &str, handle: &Arc<PartitionHandle>) {
        if let Err(e) = handle.close() {
            warn!(partition = partid, error = %e, "error closing partition on eviction");
        }
    }
}

// `Result<Arc<PartitionHandle>, Error>` is cloned (via the standard
// library's blanket `Clone for Result<T, E>` now that `Error: Clone`,
// see `error.rs`) to hand the same outcome to every follower of a
// single-flight load; `Arc` clones are cheap, and sharing an `Error`
// this way costs its backtrace/cause chain on the follower copies.
