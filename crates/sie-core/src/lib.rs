// sie-core: fetch and reconciliation engine for the SIE network update agent.

pub mod backend;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod poll;
pub mod reconcile;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{NetBackend, DEFAULT_NETMASK, LINK_MTU};
pub use config::AgentConfig;
pub use error::UpdateError;
pub use fetch::{CacheDir, Fetcher};
pub use model::{AliasFiles, DesiredConfig, HardwareAddress, VlanConfig};
pub use reconcile::reconcile;
pub use sync::sync_file;
