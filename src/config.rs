//! Construction-time configuration for a [`crate::Db`].
//!
//! The teacher's CLI-driven configuration (clap flags wired straight
//! into `main`) is out of scope here (this crate has no command-line
//! surface), but a library still needs *some* ambient way to be
//! configured outside of tests. `Config` fills that role: a plain
//! struct with sane defaults, overridable from the process environment
//! for the common "operator sets a couple of env vars" deployment
//! shape.

use std::env;
use std::path::PathBuf;

/// Default number of partitions held resident on disk at once.
pub const DEFAULT_CAPACITY: usize = 200;

/// Knobs for constructing a [`crate::Db`] backed by [`crate::storage::FsStorage`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of partitions the LRU holds simultaneously.
    pub capacity: usize,
    /// Directory `FsStorage` treats as the object store root.
    pub storage_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            storage_root: env::temp_dir().join("infreqcache"),
        }
    }
}

impl Config {
    /// Builds a `Config` from `INFREQCACHE_CAPACITY` and
    /// `INFREQCACHE_STORAGE_ROOT`, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = env::var("INFREQCACHE_CAPACITY") {
            if let Ok(capacity) = raw.parse() {
                config.capacity = capacity;
            }
        }
        if let Ok(root) = env::var("INFREQCACHE_STORAGE_ROOT") {
            config.storage_root = PathBuf::from(root);
        }
        config
    }
}
