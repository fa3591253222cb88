use super::{Fetched, Storage};
use crate::Result;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Reference [`Storage`] backend that treats a local directory as the
/// object store.
///
/// A partition is sled's own on-disk representation (a directory of
/// segment files, not a single mmap-able file), so each upload is
/// packed as a `tar.gz` archive of that directory, and the `mutable`
/// flag rides along in a small sidecar file next to the archive.
///
/// This stands in for a production backend (S3, GCS, ...). It exists so
/// the cache is runnable and testable without a network dependency; the
/// concrete production backend is out of scope for this crate.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Creates a storage rooted at `root`, creating the directory if
    /// it does not already exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn archive_path(&self, part: &str) -> PathBuf {
        self.root.join(format!("{}.tar.gz", part))
    }

    fn mutable_flag_path(&self, part: &str) -> PathBuf {
        self.root.join(format!("{}.mutable", part))
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl Storage for FsStorage {
    fn get(&self, part: &str) -> Result<Option<Fetched>> {
        let archive_path = self.archive_path(part);
        if !archive_path.exists() {
            return Ok(None);
        }

        let last_modified = fs::metadata(&archive_path)?.modified()?;

        let mutable = match fs::read_to_string(self.mutable_flag_path(part)) {
            Ok(contents) => contents.trim() == "1",
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        let tmp_dir = tempfile::Builder::new().prefix("infreqcache-").tempdir()?;
        let decoder = GzDecoder::new(File::open(&archive_path)?);
        tar::Archive::new(decoder).unpack(tmp_dir.path())?;
        // Ownership of the materialized partition directory transfers
        // to the caller; `tempdir()`'s own cleanup-on-drop is disarmed
        // by `into_path`.
        let local_path = tmp_dir.into_path();

        debug!(partition = part, path = ?local_path, "fetched partition from fs storage");
        Ok(Some(Fetched {
            local_path,
            last_modified,
            mutable,
        }))
    }

    fn put(&self, part: &str, local_path: &Path, mutable: bool) -> Result<()> {
        let archive_path = self.archive_path(part);
        Self::ensure_parent(&archive_path)?;

        let encoder = GzEncoder::new(File::create(&archive_path)?, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(".", local_path)?;
        builder.into_inner()?.finish()?;

        let flag_path = self.mutable_flag_path(part);
        fs::write(&flag_path, if mutable { "1" } else { "0" })?;

        debug!(partition = part, mutable, "uploaded partition to fs storage");
        Ok(())
    }

    fn get_last_mod(&self, part: &str) -> SystemTime {
        fs::metadata(self.archive_path(part))
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| super::probe_failure_sentinel())
    }
}
