// ── Resilient fetcher ──
//
// HTTP GET with a disk-backed cache as the fail-over source. A
// successful fetch refreshes the cache entry for its URL with an
// atomic write; a failed fetch falls back to the last cached copy,
// subject to a staleness bound. Callers only ever see `UpdateFailed`
// when both paths are exhausted -- `CacheMiss` never crosses this
// boundary.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CacheMissReason, UpdateError};

/// Client identifier sent with every request.
pub const USER_AGENT: &str = concat!("sie-update/", env!("CARGO_PKG_VERSION"));

/// Name of the cache subdirectory under the system configuration
/// directory.
pub const CACHE_DIR_NAME: &str = "sie-update";

// ── Cache directory ──────────────────────────────────────────────────

/// On-disk fetch cache: one file per distinct source URL basename,
/// directly under `<etc_dir>/sie-update`, no subdirectories.
#[derive(Debug, Clone)]
pub struct CacheDir {
    dir: PathBuf,
}

impl CacheDir {
    /// Open (creating if necessary) the cache directory under `etc_dir`.
    ///
    /// Fails if a non-directory entry already occupies the path.
    pub fn open(etc_dir: &Path) -> Result<Self, UpdateError> {
        let dir = etc_dir.join(CACHE_DIR_NAME);
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("cache path {} exists and is not a directory", dir.display()),
                )
                .into());
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                fs::create_dir(&dir)?;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Cache entry path for a URL: keyed by the basename of the URL path.
    fn entry_for(&self, url: &Url) -> PathBuf {
        let basename = Path::new(url.path())
            .file_name()
            .map_or_else(String::new, |name| name.to_string_lossy().into_owned());
        self.dir.join(basename)
    }

    /// Read the cached copy for `url`, honoring the staleness bound.
    ///
    /// `max_age` of `None` disables expiry.
    pub fn fetch(&self, url: &Url, max_age: Option<Duration>) -> Result<Vec<u8>, UpdateError> {
        let path = self.entry_for(url);
        debug!(%url, cache_file = %path.display(), "fetching from cache");

        let meta = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                return Err(UpdateError::CacheMiss {
                    path,
                    reason: CacheMissReason::Absent,
                });
            }
        };

        if let Some(max_age) = max_age {
            // A clock set backwards makes the entry look fresh; that is
            // the safe direction.
            let age = meta.modified()?.elapsed().unwrap_or_default();
            if age > max_age {
                return Err(UpdateError::CacheMiss {
                    path,
                    reason: CacheMissReason::Expired,
                });
            }
        }

        Ok(fs::read(&path)?)
    }

    /// Atomically create or replace the cache entry for `url`.
    ///
    /// Writes to a temporary file in the same directory, sets 0644
    /// permissions, and renames over the target, so concurrent readers
    /// never observe a partial file.
    pub fn put(&self, url: &Url, body: &[u8]) -> Result<(), UpdateError> {
        let path = self.entry_for(url);
        debug!(%url, cache_file = %path.display(), "storing to cache");

        let mut tmp = tempfile::Builder::new()
            .prefix("cache")
            .tempfile_in(&self.dir)?;
        tmp.write_all(body)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))?;
        }
        tmp.persist(&path).map_err(|err| err.error)?;
        Ok(())
    }
}

// ── Fetcher ──────────────────────────────────────────────────────────

/// HTTP fetcher with cache fail-over.
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: reqwest::Client,
    cache_max_age: Option<Duration>,
}

impl Fetcher {
    /// Build a fetcher with the given request timeout and cache
    /// staleness bound (`None` disables expiry).
    pub fn new(
        timeout: Duration,
        cache_max_age: Option<Duration>,
    ) -> Result<Self, UpdateError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            cache_max_age,
        })
    }

    /// Fetch `url`, refreshing the cache on success and falling back to
    /// it on failure.
    ///
    /// Fails with [`UpdateError::UpdateFailed`] only when both the
    /// network request and the cache fallback are exhausted.
    pub async fn fetch(
        &self,
        url: &Url,
        cache: Option<&CacheDir>,
    ) -> Result<Vec<u8>, UpdateError> {
        debug!(%url, "fetching");
        match self.http_fetch(url).await {
            Ok(body) => {
                if let Some(cache) = cache {
                    cache.put(url, &body)?;
                }
                Ok(body)
            }
            Err(err) => {
                warn!(%url, error = %err, "HTTP fetch failed");
                let Some(cache) = cache else {
                    return Err(UpdateError::UpdateFailed(format!(
                        "fetch failed for {url}: {err}"
                    )));
                };
                info!(cache = %cache.path().display(), "failing over to cache");
                cache.fetch(url, self.cache_max_age).map_err(|cache_err| {
                    UpdateError::UpdateFailed(format!(
                        "fetch failed for {url}: {err}; {cache_err}"
                    ))
                })
            }
        }
    }

    async fn http_fetch(&self, url: &Url) -> Result<Vec<u8>, UpdateError> {
        let response = self.http.get(url.clone()).send().await?;
        let response = response.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn cache_entry_keyed_by_url_basename() {
        let etc = tempfile::tempdir().unwrap();
        let cache = CacheDir::open(etc.path()).unwrap();
        let entry = cache.entry_for(&url("http://example.net/v2/guest/aa-bb.json?x=1"));
        assert_eq!(
            entry,
            etc.path().join(CACHE_DIR_NAME).join("aa-bb.json")
        );
    }

    #[test]
    fn open_rejects_non_directory_cache_path() {
        let etc = tempfile::tempdir().unwrap();
        fs::write(etc.path().join(CACHE_DIR_NAME), b"in the way").unwrap();
        let err = CacheDir::open(etc.path()).unwrap_err();
        assert!(matches!(err, UpdateError::Io(_)));
    }

    #[test]
    fn put_then_fetch_round_trips() {
        let etc = tempfile::tempdir().unwrap();
        let cache = CacheDir::open(etc.path()).unwrap();
        let u = url("http://example.net/guest/host.json");

        cache.put(&u, b"{\"a\":1}").unwrap();
        let body = cache.fetch(&u, None).unwrap();
        assert_eq!(body, b"{\"a\":1}");
    }

    #[test]
    fn fetch_misses_on_absent_entry() {
        let etc = tempfile::tempdir().unwrap();
        let cache = CacheDir::open(etc.path()).unwrap();
        let err = cache
            .fetch(&url("http://example.net/guest/nope.json"), None)
            .unwrap_err();
        assert!(err.is_cache_miss());
    }

    #[test]
    fn fetch_misses_on_expired_entry() {
        let etc = tempfile::tempdir().unwrap();
        let cache = CacheDir::open(etc.path()).unwrap();
        let u = url("http://example.net/guest/old.json");
        cache.put(&u, b"stale").unwrap();

        // Zero max age: any entry is already expired.
        let err = cache.fetch(&u, Some(Duration::ZERO)).unwrap_err();
        assert!(matches!(
            err,
            UpdateError::CacheMiss {
                reason: CacheMissReason::Expired,
                ..
            }
        ));

        // Generous max age: the entry is fresh.
        assert!(cache.fetch(&u, Some(Duration::from_secs(60))).is_ok());
    }

    #[test]
    fn put_replaces_existing_entry_atomically() {
        let etc = tempfile::tempdir().unwrap();
        let cache = CacheDir::open(etc.path()).unwrap();
        let u = url("http://example.net/guest/host.json");

        cache.put(&u, b"first").unwrap();
        cache.put(&u, b"second").unwrap();
        assert_eq!(cache.fetch(&u, None).unwrap(), b"second");

        // Only the entry itself remains; temporaries were renamed away.
        let names: Vec<_> = fs::read_dir(cache.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, ["host.json"]);
    }

    #[test]
    fn aborted_write_leaves_existing_entry_intact() {
        let etc = tempfile::tempdir().unwrap();
        let cache = CacheDir::open(etc.path()).unwrap();
        let u = url("http://example.net/guest/host.json");
        cache.put(&u, b"good").unwrap();

        // A writer that dies between write and rename leaves only an
        // orphaned temporary behind.
        let mut tmp = tempfile::Builder::new()
            .prefix("cache")
            .tempfile_in(cache.path())
            .unwrap();
        tmp.write_all(b"partial").unwrap();
        tmp.keep().unwrap();

        assert_eq!(cache.fetch(&u, None).unwrap(), b"good");
    }

    #[cfg(unix)]
    #[test]
    fn cache_entries_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let etc = tempfile::tempdir().unwrap();
        let cache = CacheDir::open(etc.path()).unwrap();
        let u = url("http://example.net/guest/host.json");
        cache.put(&u, b"data").unwrap();

        let mode = fs::metadata(cache.entry_for(&u)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
