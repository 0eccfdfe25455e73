// Disk caches. One directory per external id space, one file per key.
//
// Keys are used as file names directly when they are filesystem-safe and
// otherwise hashed. Reads try both addresses. Writes go through a temp file in
// the same directory and are renamed into place.

use std::fs;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{ResolveError, Result};

const FAILURES_DIR: &str = "page_failures";
const MAX_RAW_KEY_LEN: usize = 128;

/// A directory of blobs addressed by string keys.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| ResolveError::storage(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `key` is written: the raw key when safe, else its hash.
    pub fn path_for(&self, key: &str) -> PathBuf {
        if is_safe_key(key) {
            self.dir.join(key)
        } else {
            self.hashed_path(key)
        }
    }

    fn hashed_path(&self, key: &str) -> PathBuf {
        self.dir.join(hex::encode(Sha256::digest(key.as_bytes())))
    }

    fn candidate_paths(&self, key: &str) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(2);
        if is_safe_key(key) {
            paths.push(self.dir.join(key));
        }
        paths.push(self.hashed_path(key));
        paths
    }

    pub fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        for path in self.candidate_paths(key) {
            match fs::read(&path) {
                Ok(bytes) => return Ok(Some(bytes)),
                Err(e) if e.kind() == IoErrorKind::NotFound => continue,
                Err(e) => return Err(ResolveError::storage(&path, e)),
            }
        }
        Ok(None)
    }

    pub fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| ResolveError::storage(&self.dir, e))?;
        tmp.write_all(bytes)
            .map_err(|e| ResolveError::storage(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| ResolveError::storage(&path, e.error))?;
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.candidate_paths(key).iter().any(|p| p.exists())
    }

    /// Delete every address of `key`. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let mut removed = false;
        for path in self.candidate_paths(key) {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == IoErrorKind::NotFound => {}
                Err(e) => return Err(ResolveError::storage(&path, e)),
            }
        }
        Ok(removed)
    }

    /// Read and decode a JSON blob. An undecodable blob is `Corrupt`.
    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.read(key)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ResolveError::corrupt(self.path_for(key).display().to_string(), e.to_string()))
    }

    pub fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| ResolveError::corrupt(key, e.to_string()))?;
        self.write(key, &bytes)
    }
}

fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_RAW_KEY_LEN
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')' | ','))
}

/// A success store plus a parallel failure store under `page_failures/`.
///
/// A failure marker can sit next to a cached success for the same key (a page
/// that was fetched but holds no plot), so callers check [`Cache::failure`]
/// first. Storing a success clears the marker. Successes are only ever
/// removed by [`Cache::evict`].
#[derive(Debug, Clone)]
pub struct Cache {
    success: BlobStore,
    failures: BlobStore,
}

impl Cache {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let success = BlobStore::open(&dir)?;
        let failures = BlobStore::open(dir.join(FAILURES_DIR))?;
        Ok(Self { success, failures })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.success.read_json(key)
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.success.write_json(key, value)?;
        self.failures.remove(key)?;
        Ok(())
    }

    /// The recorded permanent-failure reason for `key`, if any.
    pub fn failure(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .failures
            .read(key)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    pub fn record_failure(&self, key: &str, reason: &str) -> Result<()> {
        debug!(key, reason, "cache: recording failure");
        self.failures.write(key, reason.as_bytes())
    }

    /// Drop both the success and the failure entry so the key is retried.
    pub fn evict(&self, key: &str) -> Result<()> {
        debug!(key, "cache: evicting");
        self.success.remove(key)?;
        self.failures.remove(key)?;
        Ok(())
    }
}

/// All cache namespaces under one root directory.
#[derive(Debug, Clone)]
pub struct Caches {
    pub catalog: Cache,
    pub entities: Cache,
    pub pages: Cache,
    pub search: Cache,
    pub bookshelf: Cache,
    pub bookgraph: BlobStore,
}

impl Caches {
    pub fn open(root: &Path) -> Result<Self> {
        Ok(Self {
            catalog: Cache::open(root.join("catalog"))?,
            entities: Cache::open(root.join("entities"))?,
            pages: Cache::open(root.join("pages"))?,
            search: Cache::open(root.join("search"))?,
            bookshelf: Cache::open(root.join("bookshelf"))?,
            bookgraph: BlobStore::open(root.join("bookgraph"))?,
        })
    }
}
