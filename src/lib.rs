#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

//! A read-mostly, partitioned key-value database whose authoritative
//! storage lives in a remote object store and whose read path is
//! served by a bounded, disk-resident LRU cache of whole partitions.
//!
//! Each partition is an immutable-by-default embedded KV file,
//! downloaded on demand, held under [`Db`]'s LRU, and evicted either by
//! capacity pressure or by a freshness check against the object
//! store's last-modified timestamp. See [`Db`] for the public API and
//! [`storage::Storage`] for the object-store seam.

mod cache;
mod config;
mod db;
mod error;
pub mod freshness;
pub mod partition;
pub mod storage;

pub use config::Config;
pub use db::Db;
pub use error::{is_not_found, Error, ErrorKind};
pub use freshness::FreshnessScheduler;
pub use partition::PartitionHandle;

/// Result type used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;
