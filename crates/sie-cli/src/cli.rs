//! Clap derive structure for the `sie-update` binary.

use std::path::PathBuf;

use clap::Parser;

/// sie-update -- keep SIE network interfaces synchronized with the
/// update service.
#[derive(Debug, Parser)]
#[command(
    name = "sie-update",
    version,
    about = "Synchronize SIE VLAN interfaces and alias files with the update service",
    long_about = "Fetches the desired VLAN/addressing configuration for this host \
        (keyed by hardware address) from the SIE update service and reconciles \
        the local network interfaces against it, either once or as a polling daemon."
)]
pub struct Cli {
    /// SIE network interface to reconcile (repeatable)
    #[arg(long, short = 'i', value_name = "IFACE")]
    pub interface: Vec<String>,

    /// System configuration directory
    #[arg(long, short = 'e', value_name = "DIR", env = "SIE_ETCDIR")]
    pub etcdir: Option<PathBuf>,

    /// Update service base URL
    #[arg(long, short = 'u', value_name = "URL", env = "SIE_BASE_URL")]
    pub base_url: Option<String>,

    /// VLAN ids exempt from removal or modification: N or N-M (repeatable)
    #[arg(long, short = 'P', value_name = "VLAN|LOW-HIGH")]
    pub preserve: Vec<String>,

    /// Run as a polling daemon instead of one-shot
    #[arg(long, short = 'd')]
    pub daemon: bool,

    /// Poll interval in seconds for daemon mode
    #[arg(long = "poll-time", short = 't', value_name = "SECS", env = "SIE_POLL_TIME")]
    pub poll_time: Option<u64>,

    /// Log file for daemon mode
    #[arg(long = "log-file", short = 'l', value_name = "PATH", env = "SIE_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "PATH", env = "SIE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}
