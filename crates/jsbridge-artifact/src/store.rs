//! Durable artifact storage, shared across process runs.
//!
//! Layout under one root directory:
//!
//! ```text
//! <root>/gen/      intermediate per-contract dumps (JSON, for inspection)
//! <root>/staging/  temporary files for in-progress writes
//! <root>/cache/    compiled artifacts, proxy_<hex-digest>.pxa
//! ```
//!
//! Cache writes land in `staging/` first and are renamed into place, so a
//! reader never observes a half-written artifact even with concurrent
//! writers for the same key. Entries from a previous process remain valid
//! as long as the digest algorithm and canonicalization are unchanged.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::contract::ContractKey;
use crate::module::ProxyArtifact;

/// Filename prefix for cached artifacts.
pub const ARTIFACT_PREFIX: &str = "proxy_";
/// Filename extension for cached artifacts.
pub const ARTIFACT_EXT: &str = "pxa";

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Storage errors. Any of these aborts the current synthesis request.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Directory creation or artifact read/write failure
    #[error("{0}")]
    Io(#[from] io::Error),

    /// Intermediate dump serialization failure
    #[error("artifact dump error: {0}")]
    Dump(#[from] serde_json::Error),
}

/// Durable store for compiled proxy artifacts.
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactStore { root: root.into() }
    }

    /// Create the storage layout, optionally clearing leftovers from
    /// earlier runs first.
    pub fn init(&self, clear: bool) -> Result<(), StoreError> {
        if clear {
            for dir in [self.gen_dir(), self.staging_dir(), self.cache_dir()] {
                rotate_and_delete(&dir)?;
            }
        }
        fs::create_dir_all(self.gen_dir())?;
        fs::create_dir_all(self.staging_dir())?;
        fs::create_dir_all(self.cache_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn gen_dir(&self) -> PathBuf {
        self.root.join("gen")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Path of the compiled artifact for `key`.
    pub fn artifact_path(&self, key: &ContractKey) -> PathBuf {
        self.cache_dir()
            .join(format!("{}{}.{}", ARTIFACT_PREFIX, key, ARTIFACT_EXT))
    }

    /// Whether a compiled artifact for `key` is present.
    pub fn contains(&self, key: &ContractKey) -> bool {
        self.artifact_path(key).is_file()
    }

    /// Read the compiled artifact for `key`, or `None` if absent.
    pub fn read(&self, key: &ContractKey) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.artifact_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the compiled artifact for `key`.
    ///
    /// Writes to a unique staging file and renames into place; concurrent
    /// writers for the same key are safe, last rename wins with identical
    /// content.
    pub fn write(&self, key: &ContractKey, bytes: &[u8]) -> Result<(), StoreError> {
        let staged = self.staging_dir().join(format!(
            "{}{}.{}.{}",
            ARTIFACT_PREFIX,
            key,
            process::id(),
            STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&staged, bytes)?;
        fs::rename(&staged, self.artifact_path(key))?;
        Ok(())
    }

    /// Dump the intermediate (pre-compile) artifact as JSON for inspection.
    pub fn write_gen_dump(&self, artifact: &ProxyArtifact) -> Result<(), StoreError> {
        let path = self
            .gen_dir()
            .join(format!("{}{}.json", ARTIFACT_PREFIX, artifact.key()));
        let json = serde_json::to_vec_pretty(artifact)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Move a directory aside and delete it on a background thread, so startup
/// is not blocked on a large cache removal.
fn rotate_and_delete(dir: &Path) -> Result<(), StoreError> {
    if !dir.exists() {
        return Ok(());
    }

    let mut rotated = dir.as_os_str().to_owned();
    rotated.push("_to_delete");
    let rotated = PathBuf::from(rotated);
    if rotated.exists() {
        fs::remove_dir_all(&rotated)?;
    }
    fs::rename(dir, &rotated)?;

    std::thread::spawn(move || {
        if let Err(e) = fs::remove_dir_all(&rotated) {
            tracing::warn!(
                target: "jsbridge::store",
                path = %rotated.display(),
                error = %e,
                "failed to delete rotated storage directory"
            );
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractSpec;
    use jsbridge_core::registry::MethodDescriptor;
    use jsbridge_core::value::TypeTag;

    fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.init(false).unwrap();
        (dir, store)
    }

    #[test]
    fn test_init_creates_layout() {
        let (_dir, store) = store();
        assert!(store.gen_dir().is_dir());
        assert!(store.staging_dir().is_dir());
        assert!(store.cache_dir().is_dir());
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, store) = store();
        let key = ContractSpec::new("Object", &["Runnable"]).key();

        assert!(!store.contains(&key));
        assert!(store.read(&key).unwrap().is_none());

        store.write(&key, b"artifact bytes").unwrap();
        assert!(store.contains(&key));
        assert_eq!(store.read(&key).unwrap().unwrap(), b"artifact bytes");
    }

    #[test]
    fn test_artifact_filename_shape() {
        let (_dir, store) = store();
        let key = ContractSpec::new("Object", &[]).key();
        let name = store
            .artifact_path(&key)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with(ARTIFACT_PREFIX));
        assert!(name.ends_with(".pxa"));
        assert_eq!(name.len(), ARTIFACT_PREFIX.len() + 64 + 4);
    }

    #[test]
    fn test_write_leaves_no_staging_files() {
        let (_dir, store) = store();
        let key = ContractSpec::new("Object", &["Runnable"]).key();
        store.write(&key, b"bytes").unwrap();

        let leftovers = fs::read_dir(store.staging_dir()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_overwrite_same_key() {
        let (_dir, store) = store();
        let key = ContractSpec::new("Object", &["Runnable"]).key();
        store.write(&key, b"first").unwrap();
        store.write(&key, b"second").unwrap();
        assert_eq!(store.read(&key).unwrap().unwrap(), b"second");
    }

    #[test]
    fn test_gen_dump_is_valid_json() {
        let (_dir, store) = store();
        let artifact = ProxyArtifact::new(
            ContractSpec::new("Object", &["Runnable"]),
            vec![MethodDescriptor::new("run", vec![], TypeTag::Void)],
        );
        store.write_gen_dump(&artifact).unwrap();

        let path = store
            .gen_dir()
            .join(format!("{}{}.json", ARTIFACT_PREFIX, artifact.key()));
        let json = fs::read_to_string(path).unwrap();
        let parsed: ProxyArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, artifact);
    }

    #[test]
    fn test_clear_on_init_drops_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.init(false).unwrap();

        let key = ContractSpec::new("Object", &["Runnable"]).key();
        store.write(&key, b"stale").unwrap();

        store.init(true).unwrap();
        assert!(!store.contains(&key));
        // The layout is recreated.
        assert!(store.cache_dir().is_dir());
    }

    #[test]
    fn test_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let key = ContractSpec::new("Object", &["Runnable"]).key();

        {
            let store = ArtifactStore::new(dir.path());
            store.init(false).unwrap();
            store.write(&key, b"persisted").unwrap();
        }

        let reopened = ArtifactStore::new(dir.path());
        reopened.init(false).unwrap();
        assert_eq!(reopened.read(&key).unwrap().unwrap(), b"persisted");
    }
}
