// src/fetch/cache.rs

//! Digest-keyed source cache

use crate::error::{Error, Result};
use crate::hash::{Hash, hash_file};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::client::Fetcher;

/// Source archives on disk, named by the digest they must hash to
///
/// A file only ever reaches its final name after its bytes were hashed and
/// matched, so anything in the cache under a digest's key has that digest
/// unless it was tampered with locally; cached files are re-hashed anyway
/// before every use.
pub struct SourceCache<'a> {
    dir: PathBuf,
    fetcher: &'a dyn Fetcher,
}

impl<'a> SourceCache<'a> {
    pub fn new(dir: impl Into<PathBuf>, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            dir: dir.into(),
            fetcher,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a verified archive with this digest is stored under
    pub fn cached_path(&self, digest: &Hash) -> PathBuf {
        self.dir.join(digest.cache_key())
    }

    /// Whether a verified copy is already present
    pub fn contains(&self, digest: &Hash) -> bool {
        let path = self.cached_path(digest);
        path.is_file() && matches_digest(&path, digest).unwrap_or(false)
    }

    /// Fetch `url` and verify it against `digest`
    ///
    /// Returns the cached path. Fails with `IntegrityError` if the fetched
    /// bytes hash to anything else; the partial download is removed and
    /// nothing is cached.
    pub fn fetch_and_verify(&self, url: &str, digest: &Hash) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let cached_path = self.cached_path(digest);

        if cached_path.exists() {
            debug!("Using cached source: {}", cached_path.display());
            if matches_digest(&cached_path, digest)? {
                return Ok(cached_path);
            }
            warn!("Cached source {} is corrupt, re-downloading", cached_path.display());
            match fs::remove_file(&cached_path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!("Fetching {}", url);
        // Private download file per call; only a verified file is renamed in
        let part_prefix = format!(".{}-", digest.cache_key());
        let part = tempfile::Builder::new()
            .prefix(&part_prefix)
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        self.fetcher.fetch(url, part.path())?;

        let actual = hash_file(digest.algorithm, part.path())?;
        if actual != *digest {
            return Err(Error::IntegrityError {
                url: url.to_string(),
                expected: digest.to_prefixed_string(),
                actual: actual.to_prefixed_string(),
            });
        }

        part.persist(&cached_path).map_err(|e| {
            Error::IoError(format!(
                "Failed to move verified source to {}: {}",
                cached_path.display(),
                e.error
            ))
        })?;
        info!("Verified {} ({})", url, digest.short());
        Ok(cached_path)
    }

    /// `fetch_and_verify`, returning the archive bytes
    pub fn fetch_and_verify_bytes(&self, url: &str, digest: &Hash) -> Result<Vec<u8>> {
        let path = self.fetch_and_verify(url, digest)?;
        Ok(fs::read(path)?)
    }
}

fn matches_digest(path: &Path, digest: &Hash) -> Result<bool> {
    Ok(hash_file(digest.algorithm, path)? == *digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{HashAlgorithm, hash_bytes};
    use std::sync::Mutex;

    /// Serves fixed bytes for any URL and counts calls
    struct StaticFetcher {
        body: Vec<u8>,
        calls: Mutex<u32>,
    }

    impl StaticFetcher {
        fn new(body: &[u8]) -> Self {
            Self {
                body: body.to_vec(),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl Fetcher for StaticFetcher {
        fn fetch(&self, _url: &str, dest: &Path) -> Result<u64> {
            *self.calls.lock().unwrap() += 1;
            fs::write(dest, &self.body)?;
            Ok(self.body.len() as u64)
        }
    }

    struct FailingFetcher;

    impl Fetcher for FailingFetcher {
        fn fetch(&self, url: &str, _dest: &Path) -> Result<u64> {
            Err(Error::NetworkError(format!("unreachable: {}", url)))
        }
    }

    const URL: &str = "https://example.com/tool-1.0.tar.gz";

    #[test]
    fn test_fetch_and_verify_match() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::new(b"release bytes");
        let cache = SourceCache::new(dir.path(), &fetcher);
        let digest = hash_bytes(HashAlgorithm::Sha256, b"release bytes");

        let path = cache.fetch_and_verify(URL, &digest).unwrap();
        assert_eq!(path, cache.cached_path(&digest));
        assert!(cache.contains(&digest));
        assert_eq!(cache.fetch_and_verify_bytes(URL, &digest).unwrap(), b"release bytes");
    }

    #[test]
    fn test_refetch_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::new(b"release bytes");
        let cache = SourceCache::new(dir.path(), &fetcher);
        let digest = hash_bytes(HashAlgorithm::Sha256, b"release bytes");

        cache.fetch_and_verify(URL, &digest).unwrap();
        cache.fetch_and_verify(URL, &digest).unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_mismatch_is_integrity_error_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::new(b"tampered bytes");
        let cache = SourceCache::new(dir.path(), &fetcher);
        let digest = hash_bytes(HashAlgorithm::Sha256, b"release bytes");

        let err = cache.fetch_and_verify(URL, &digest).unwrap_err();
        match err {
            Error::IntegrityError {
                url,
                expected,
                actual,
            } => {
                assert_eq!(url, URL);
                assert_eq!(expected, digest.to_prefixed_string());
                assert_eq!(actual, format!("sha256:{}", crate::hash::sha256(b"tampered bytes")));
            }
            other => panic!("expected IntegrityError, got {other:?}"),
        }

        assert!(!cache.contains(&digest));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_corrupt_cache_entry_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StaticFetcher::new(b"release bytes");
        let cache = SourceCache::new(dir.path(), &fetcher);
        let digest = hash_bytes(HashAlgorithm::Sha256, b"release bytes");

        fs::write(cache.cached_path(&digest), b"bit rot").unwrap();
        assert!(!cache.contains(&digest));

        cache.fetch_and_verify(URL, &digest).unwrap();
        assert_eq!(fetcher.calls(), 1);
        assert!(cache.contains(&digest));
    }

    #[test]
    fn test_unreachable_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SourceCache::new(dir.path(), &FailingFetcher);
        let digest = hash_bytes(HashAlgorithm::Sha256, b"release bytes");

        let err = cache.fetch_and_verify(URL, &digest).unwrap_err();
        assert!(matches!(err, Error::NetworkError(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    /// Writes its body in two halves with a pause in between
    struct SlowFetcher {
        body: Vec<u8>,
    }

    impl Fetcher for SlowFetcher {
        fn fetch(&self, _url: &str, dest: &Path) -> Result<u64> {
            use std::io::Write;
            let mut file = fs::File::create(dest)?;
            let (head, rest) = self.body.split_at(self.body.len() / 2);
            file.write_all(head)?;
            std::thread::sleep(std::time::Duration::from_millis(100));
            file.write_all(rest)?;
            Ok(self.body.len() as u64)
        }
    }

    #[test]
    fn test_concurrent_fetches_of_one_digest() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = SlowFetcher {
            body: b"release bytes".to_vec(),
        };
        let digest = hash_bytes(HashAlgorithm::Sha256, b"release bytes");

        let fetch = || SourceCache::new(dir.path(), &fetcher).fetch_and_verify(URL, &digest);
        let results = std::thread::scope(|scope| {
            let first = scope.spawn(fetch);
            let second = scope.spawn(fetch);
            [first.join().unwrap(), second.join().unwrap()]
        });

        let cache = SourceCache::new(dir.path(), &fetcher);
        for result in results {
            assert_eq!(result.unwrap(), cache.cached_path(&digest));
        }
        assert!(cache.contains(&digest));
        // Only the verified archive remains
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_any_single_byte_difference_fails() {
        let dir = tempfile::tempdir().unwrap();
        let original = b"release bytes".to_vec();
        let digest = hash_bytes(HashAlgorithm::Sha256, &original);

        for i in 0..original.len() {
            let mut altered = original.clone();
            altered[i] ^= 0x01;
            let fetcher = StaticFetcher::new(&altered);
            let cache = SourceCache::new(dir.path(), &fetcher);
            assert!(matches!(
                cache.fetch_and_verify(URL, &digest),
                Err(Error::IntegrityError { .. })
            ));
        }
    }
}
