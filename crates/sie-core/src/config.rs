//! Agent configuration.
//!
//! Built once at startup by the CLI and passed by reference into every
//! component that needs it. There is no global mutable state: base URL,
//! verbosity, poll interval, and preserve set all live here.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::UpdateError;

/// Default update service base URL.
pub const DEFAULT_BASE_URL: &str = "http://update.sie-network.net:51080/sie-update/v2/";

/// Default daemon poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3600);

/// Default maximum cache entry age (7 days).
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(604_800);

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable runtime configuration for the update agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Update service base URL; the per-host document lives under
    /// `guest/` relative to this.
    pub base_url: Url,

    /// System configuration directory; alias files land directly in it
    /// and the fetch cache in its `sie-update` subdirectory.
    pub etc_dir: PathBuf,

    /// Interfaces to reconcile, in order.
    pub interfaces: Vec<String>,

    /// VLAN ids never removed or modified, regardless of the desired
    /// config.
    pub preserve: BTreeSet<u16>,

    /// Daemon poll interval (jitter is derived from it).
    pub poll_interval: Duration,

    /// Maximum cache entry age before fallback refuses it.
    /// `None` disables expiry.
    pub cache_max_age: Option<Duration>,

    /// HTTP request timeout.
    pub http_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            // The default URL is a compile-time constant and always parses.
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            etc_dir: PathBuf::from("/etc"),
            interfaces: Vec::new(),
            preserve: BTreeSet::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            cache_max_age: Some(DEFAULT_CACHE_MAX_AGE),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl AgentConfig {
    /// The `guest/` base under which per-host documents and alias
    /// files are published.
    pub fn guest_base(&self) -> Result<Url, UpdateError> {
        Ok(self.base_url.join("guest/")?)
    }
}

// ── Preserve-set parsing ─────────────────────────────────────────────

/// Parse preserve specs of the form `N` or `N-M` (inclusive) into a
/// set of VLAN ids.
pub fn parse_preserve_specs<S: AsRef<str>>(specs: &[S]) -> Result<BTreeSet<u16>, UpdateError> {
    let mut preserve = BTreeSet::new();
    for spec in specs {
        let spec = spec.as_ref();
        if let Ok(vlan) = spec.parse::<u16>() {
            preserve.insert(vlan);
            continue;
        }
        let invalid = || UpdateError::InvalidPreserveSpec { spec: spec.into() };
        let (low, high) = spec.split_once('-').ok_or_else(invalid)?;
        let low: u16 = low.trim().parse().map_err(|_| invalid())?;
        let high: u16 = high.trim().parse().map_err(|_| invalid())?;
        if low > high {
            return Err(invalid());
        }
        preserve.extend(low..=high);
    }
    Ok(preserve)
}
