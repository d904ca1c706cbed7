//! CLI-owned configuration: optional TOML file, `SIE_`-prefixed
//! environment variables, and flag overrides, merged into the
//! immutable [`AgentConfig`] the core components receive.
//!
//! Core never sees these types -- it gets a pre-built `AgentConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use url::Url;

use sie_core::config::{parse_preserve_specs, DEFAULT_BASE_URL};
use sie_core::AgentConfig;

use crate::cli::Cli;
use crate::error::CliError;

/// Default TOML configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sie-update.toml";

/// Default daemon log file.
pub const DEFAULT_LOG_FILE: &str = "/var/log/sie-update.log";

/// On-disk / environment configuration shape. Every field has a
/// default, so a missing file or an empty one is valid.
#[derive(Debug, Deserialize, Serialize)]
pub struct FileConfig {
    /// Interfaces to reconcile.
    #[serde(default)]
    pub interface: Vec<String>,

    /// System configuration directory.
    #[serde(default = "default_etcdir")]
    pub etcdir: PathBuf,

    /// Update service base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Preserve specs (`N` or `N-M`).
    #[serde(default)]
    pub preserve: Vec<String>,

    /// Daemon poll interval in seconds.
    #[serde(default = "default_poll_time")]
    pub poll_time: u64,

    /// Daemon log file.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Cache staleness bound in seconds; 0 disables expiry.
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age: u64,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            interface: Vec::new(),
            etcdir: default_etcdir(),
            base_url: default_base_url(),
            preserve: Vec::new(),
            poll_time: default_poll_time(),
            log_file: default_log_file(),
            cache_max_age: default_cache_max_age(),
            timeout: default_timeout(),
        }
    }
}

fn default_etcdir() -> PathBuf {
    PathBuf::from("/etc")
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_poll_time() -> u64 {
    3600
}
fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}
fn default_cache_max_age() -> u64 {
    604_800
}
fn default_timeout() -> u64 {
    30
}

/// Load the layered file/env configuration.
fn load_file_config(path: Option<&Path>) -> Result<FileConfig, CliError> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    let figment = Figment::new()
        .merge(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SIE_"));
    Ok(figment.extract()?)
}

/// Merge the file/env layer with CLI flags into the core's
/// `AgentConfig`, plus the resolved daemon log file path.
///
/// Flags win over environment and file values.
pub fn build_agent_config(cli: &Cli) -> Result<(AgentConfig, PathBuf), CliError> {
    let file = load_file_config(cli.config.as_deref())?;

    let interfaces = if cli.interface.is_empty() {
        file.interface
    } else {
        cli.interface.clone()
    };
    if interfaces.is_empty() {
        return Err(CliError::Validation {
            field: "interface".into(),
            reason: "at least one SIE network interface (-i) is required".into(),
        });
    }

    let etc_dir = cli.etcdir.clone().unwrap_or(file.etcdir);
    if !etc_dir.is_dir() {
        return Err(CliError::Validation {
            field: "etcdir".into(),
            reason: format!("path does not exist: {}", etc_dir.display()),
        });
    }

    let base_url = parse_base_url(cli.base_url.as_deref().unwrap_or(&file.base_url))?;

    let preserve_specs = if cli.preserve.is_empty() {
        file.preserve
    } else {
        cli.preserve.clone()
    };
    let preserve = parse_preserve_specs(&preserve_specs).map_err(|err| CliError::Validation {
        field: "preserve".into(),
        reason: err.to_string(),
    })?;

    let poll_time = cli.poll_time.unwrap_or(file.poll_time);
    let cache_max_age = match file.cache_max_age {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    let log_file = cli.log_file.clone().unwrap_or(file.log_file);

    let agent = AgentConfig {
        base_url,
        etc_dir,
        interfaces,
        preserve,
        poll_interval: Duration::from_secs(poll_time),
        cache_max_age,
        http_timeout: Duration::from_secs(file.timeout),
    };
    Ok((agent, log_file))
}

/// Parse the base URL, normalizing to a trailing slash so relative
/// joins keep the final path segment.
fn parse_base_url(raw: &str) -> Result<Url, CliError> {
    let normalized = if raw.ends_with('/') {
        raw.to_owned()
    } else {
        format!("{raw}/")
    };
    normalized.parse().map_err(|_| CliError::Validation {
        field: "base-url".into(),
        reason: format!("invalid URL: {raw}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse_cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("sie-update").chain(args.iter().copied()))
    }

    #[test]
    fn flags_override_defaults() {
        let etc = tempfile::tempdir().unwrap();
        let etc_arg = etc.path().to_str().unwrap();
        let cli = parse_cli(&[
            "-i", "eth1", "-i", "eth2", "-e", etc_arg, "-P", "100-102", "-t", "60",
        ]);

        let (agent, _) = build_agent_config(&cli).unwrap();
        assert_eq!(agent.interfaces, ["eth1", "eth2"]);
        assert_eq!(agent.etc_dir, etc.path());
        assert_eq!(agent.preserve, [100, 101, 102].into());
        assert_eq!(agent.poll_interval, Duration::from_secs(60));
    }

    #[test]
    fn missing_interface_is_a_usage_error() {
        let etc = tempfile::tempdir().unwrap();
        let cli = parse_cli(&["-e", etc.path().to_str().unwrap()]);
        let err = build_agent_config(&cli).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::exit_code::USAGE);
    }

    #[test]
    fn nonexistent_etcdir_is_rejected() {
        let cli = parse_cli(&["-i", "eth1", "-e", "/definitely/not/here"]);
        assert!(build_agent_config(&cli).is_err());
    }

    #[test]
    fn toml_file_supplies_values_beneath_flags() {
        let etc = tempfile::tempdir().unwrap();
        let config_path = etc.path().join("sie-update.toml");
        std::fs::write(
            &config_path,
            format!(
                "interface = [\"ix0\"]\netcdir = \"{}\"\npoll_time = 120\n",
                etc.path().display()
            ),
        )
        .unwrap();

        let cli = parse_cli(&["--config", config_path.to_str().unwrap()]);
        let (agent, _) = build_agent_config(&cli).unwrap();
        assert_eq!(agent.interfaces, ["ix0"]);
        assert_eq!(agent.poll_interval, Duration::from_secs(120));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = parse_base_url("http://example.net/v2").unwrap();
        assert_eq!(url.as_str(), "http://example.net/v2/");
        assert_eq!(url.join("guest/").unwrap().as_str(), "http://example.net/v2/guest/");
    }
}
