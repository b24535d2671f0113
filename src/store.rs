//! Key-value persistence backing every cache and ledger in the crate.
//!
//! Two variants mirror the two lifetimes the client needs:
//! - [`MemoryStore`]: session-scoped, dropped with the process or on sign-out.
//! - [`FileStore`]: long-lived, one JSON file per key, survives restarts.
//!
//! Writes never fail loudly. A store that cannot persist logs and moves on;
//! callers treat a later miss the same as "never cached".

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.inner.lock().expect("store mutex poisoned").remove(key);
    }
}

/// Directory-backed store. Values land in `<dir>/<sha256(key)>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!(error = ?e, dir = %dir.display(), "store dir not created");
        }
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }

    fn write_atomic(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(value.as_bytes())?;
        fs::rename(tmp, path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.write_atomic(key, value) {
            tracing::warn!(error = ?e, key, "file store write failed");
        }
    }

    fn remove(&self, key: &str) {
        let path = self.path_for(key);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(error = ?e, key, "file store remove failed");
            }
        }
    }
}

/// Keys may contain `:`, `/`, `@` and anything else a user id carries; file names
/// may not. Distinct keys map to distinct SHA-256 hex names.
fn file_stem(key: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
