//! File synchronizer: mirror a remote document into a local file,
//! rewriting only when content actually differs so dependent processes
//! watching the file see no needless churn.

use std::fs;
use std::path::Path;

use tracing::info;
use url::Url;

use crate::error::UpdateError;
use crate::fetch::{CacheDir, Fetcher};

/// Synchronize `path` with the document at `url`.
///
/// Returns whether a write occurred; callers use this for reporting
/// only. Absence of the local file is not an error. Fetch failures
/// propagate from [`Fetcher::fetch`].
pub async fn sync_file(
    fetcher: &Fetcher,
    path: &Path,
    url: &Url,
    cache: Option<&CacheDir>,
) -> Result<bool, UpdateError> {
    let current = match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => return Err(err.into()),
    };

    let remote = fetcher.fetch(url, cache).await?;
    if current.as_deref() == Some(remote.as_slice()) {
        return Ok(false);
    }

    fs::write(path, &remote)?;
    info!(file = %path.display(), %url, "updated file");
    Ok(true)
}
