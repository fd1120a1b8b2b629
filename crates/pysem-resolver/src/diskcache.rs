//! Disk cache contract (C8, §4.7 "Disk cache layout"): per-module `.pyi`
//! files under a database directory, staleness checked against the source
//! file and the engine's own binary mtime. Only the contract is exercised
//! here — no real cache files are written by this crate's own code (§1:
//! "persistence of cache binaries to disk... only the cache *contract*
//! matters"); `is_fresh`/`lookup` operate on whatever a caller already
//! placed under `database_path`.

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

/// A configured on-disk cache database directory plus the engine binary's
/// own modification time, used to decide whether a cached stub is still
/// valid (§4.7: "rejected if the cached file is older than either the
/// source or the engine's own binary").
#[derive(Debug, Clone)]
pub struct DiskCache {
    database_path: PathBuf,
    engine_mtime: Option<SystemTime>,
}

impl DiskCache {
    #[must_use]
    pub fn new(database_path: PathBuf) -> Self {
        let engine_mtime =
            std::env::current_exe().ok().and_then(|exe| exe.metadata().ok()).and_then(|meta| meta.modified().ok());
        Self { database_path, engine_mtime }
    }

    #[must_use]
    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// §4.7 "named by module name (prefixed `python.` or `python._` variants
    /// are checked)": tries the direct name first, then the two historical
    /// prefixes.
    #[must_use]
    pub fn cache_candidates(&self, module_name: &str) -> Vec<PathBuf> {
        vec![
            self.database_path.join(format!("{module_name}.pyi")),
            self.database_path.join(format!("python.{module_name}.pyi")),
            self.database_path.join(format!("python._{module_name}.pyi")),
        ]
    }

    /// §4.7 "or hashed by source directory": fallback name used when a
    /// module doesn't map to a simple dotted path (e.g. a compiled module
    /// scraped from an arbitrary library path).
    #[must_use]
    pub fn hashed_cache_path(&self, source_dir: &Path) -> PathBuf {
        let digest = fnv1a(source_dir.to_string_lossy().as_bytes());
        self.database_path.join(format!("{digest:016x}.pyi"))
    }

    /// Finds the first existing cache candidate for `module_name` that is
    /// still fresh relative to `source_path` (if any) and the engine binary.
    #[must_use]
    pub fn lookup(&self, module_name: &str, source_path: Option<&Path>) -> Option<PathBuf> {
        self.cache_candidates(module_name).into_iter().find(|candidate| self.is_fresh(candidate, source_path))
    }

    /// §4.7: a cached file is rejected if older than either the source it
    /// was derived from or the engine binary that produced it.
    #[must_use]
    pub fn is_fresh(&self, cache_path: &Path, source_path: Option<&Path>) -> bool {
        let Ok(cache_mtime) = cache_path.metadata().and_then(|meta| meta.modified()) else {
            return false;
        };

        if self.engine_mtime.is_some_and(|engine_mtime| cache_mtime < engine_mtime) {
            return false;
        }

        if let Some(source_mtime) = source_path.and_then(|path| path.metadata().and_then(|meta| meta.modified()).ok())
            && cache_mtime < source_mtime
        {
            return false;
        }

        true
    }
}

/// Small non-cryptographic hash for the "hashed by source directory"
/// fallback naming scheme; a collision only costs a cache miss, never
/// correctness, so FNV-1a needs no extra dependency.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET_BASIS, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use std::{thread::sleep, time::Duration};

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn cache_with_no_engine_mtime(database_path: PathBuf) -> DiskCache {
        DiskCache { database_path, engine_mtime: None }
    }

    #[test]
    fn lookup_finds_the_plain_named_candidate() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("os.pyi"), "").unwrap();
        let cache = cache_with_no_engine_mtime(dir.path().to_path_buf());

        assert_eq!(cache.lookup("os", None), Some(dir.path().join("os.pyi")));
    }

    #[test]
    fn lookup_falls_back_to_python_dot_prefix() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("python.os.pyi"), "").unwrap();
        let cache = cache_with_no_engine_mtime(dir.path().to_path_buf());

        assert_eq!(cache.lookup("os", None), Some(dir.path().join("python.os.pyi")));
    }

    #[test]
    fn stale_cache_older_than_source_is_rejected() {
        let dir = tempdir().unwrap();
        let cache_path = dir.path().join("os.pyi");
        std::fs::write(&cache_path, "").unwrap();
        sleep(Duration::from_millis(20));
        let source_path = dir.path().join("os.py");
        std::fs::write(&source_path, "").unwrap();

        let cache = cache_with_no_engine_mtime(dir.path().to_path_buf());
        assert!(!cache.is_fresh(&cache_path, Some(&source_path)));
    }

    #[test]
    fn fresh_cache_newer_than_source_is_accepted() {
        let dir = tempdir().unwrap();
        let source_path = dir.path().join("os.py");
        std::fs::write(&source_path, "").unwrap();
        sleep(Duration::from_millis(20));
        let cache_path = dir.path().join("os.pyi");
        std::fs::write(&cache_path, "").unwrap();

        let cache = cache_with_no_engine_mtime(dir.path().to_path_buf());
        assert!(cache.is_fresh(&cache_path, Some(&source_path)));
    }

    #[test]
    fn missing_cache_file_is_not_fresh() {
        let dir = tempdir().unwrap();
        let cache = cache_with_no_engine_mtime(dir.path().to_path_buf());
        assert!(!cache.is_fresh(&dir.path().join("missing.pyi"), None));
    }
}
