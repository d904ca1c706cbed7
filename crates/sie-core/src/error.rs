use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why a cache lookup produced no usable entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMissReason {
    /// No entry exists for this URL.
    Absent,
    /// An entry exists but its age exceeds the configured maximum.
    Expired,
}

impl fmt::Display for CacheMissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "does not exist"),
            Self::Expired => write!(f, "has expired"),
        }
    }
}

/// Top-level error type for the `sie-core` crate.
///
/// Covers every failure mode of a reconciliation pass: backend command
/// execution, fetch/cache fallback, wire-contract violations, and the
/// terminal per-pass failure. `sie-cli` maps these into user-facing
/// diagnostics and exit codes.
#[derive(Debug, Error)]
pub enum UpdateError {
    // ── Backend ─────────────────────────────────────────────────────
    /// A backend primitive returned non-success.
    #[error("command `{command}` exited with status {status}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The hardware address of an interface could not be determined.
    /// Without identity no desired config can be located, so this is
    /// fatal for the pass.
    #[error("unable to determine hardware address for interface {iface}")]
    NoHardwareAddress { iface: String },

    /// The running OS has no network backend implementation.
    #[error("unsupported operating system: {os}")]
    UnsupportedOs { os: String },

    // ── Fetch / cache ───────────────────────────────────────────────
    /// Cache entry absent or expired. Confined to the fetcher: it is
    /// converted to `UpdateFailed` before a fetch result is returned,
    /// so reconciliation code never observes it.
    #[error("cache entry {} {reason}", path.display())]
    CacheMiss {
        path: PathBuf,
        reason: CacheMissReason,
    },

    /// The remote service has no configuration document for this
    /// hardware address (and no usable cache copy exists).
    #[error("no configuration found for hardware address {hwaddr}")]
    NoHostConfig {
        hwaddr: String,
        #[source]
        source: Box<UpdateError>,
    },

    // ── Wire contract ───────────────────────────────────────────────
    /// The remote document could not be parsed. Surfaced rather than
    /// swallowed: a parse failure means a broken contract, not a
    /// transient condition.
    #[error("malformed configuration document: {0}")]
    MalformedConfig(#[from] serde_json::Error),

    /// The desired config lists the same VLAN id more than once.
    /// Rejected outright instead of last-write-wins.
    #[error("desired configuration lists VLAN {vlan} more than once")]
    DuplicateVlan { vlan: u16 },

    /// VLAN id outside the valid 802.1Q range.
    #[error("VLAN id {vlan} is outside the valid range 1-4094")]
    VlanOutOfRange { vlan: u16 },

    /// A preserve-set specification was not `N` or `N-M`.
    #[error("invalid VLAN preserve spec: {spec:?}")]
    InvalidPreserveSpec { spec: String },

    // ── Terminal ────────────────────────────────────────────────────
    /// Terminal failure of one reconciliation pass.
    #[error("update failed: {0}")]
    UpdateFailed(String),

    // ── Transport / IO ──────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL construction error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UpdateError {
    /// Returns `true` for the per-pass failures the daemon loop logs
    /// quietly; anything else is logged with full diagnostic detail.
    pub fn is_pass_failure(&self) -> bool {
        matches!(
            self,
            Self::UpdateFailed(_) | Self::NoHostConfig { .. } | Self::NoHardwareAddress { .. }
        )
    }

    /// Returns `true` if this is a cache miss (absent or expired).
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Self::CacheMiss { .. })
    }
}
