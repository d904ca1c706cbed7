//! Wire model for the remote configuration document.
//!
//! The document is fetched fresh (or from cache) at the start of every
//! reconciliation pass, validated on parse, and discarded at the end
//! of the pass.

use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;

use serde::Deserialize;

use crate::error::UpdateError;

// ── Hardware address ─────────────────────────────────────────────────

/// Canonical colon-separated MAC address string, as reported by the
/// network backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HardwareAddress(String);

impl HardwareAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hyphen-separated form used to build the per-host document URL.
    pub fn dashed(&self) -> String {
        self.0.replace(':', "-")
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Desired configuration ────────────────────────────────────────────

/// One desired VLAN sub-interface with its IPv4 assignment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VlanConfig {
    pub vlan: u16,
    pub ip: Ipv4Addr,
}

/// Relative paths of the three alias documents, resolved against the
/// `guest/` base at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AliasFiles {
    pub chalias: String,
    pub gralias: String,
    pub opalias: String,
}

/// The parsed remote configuration document:
/// `{ "ifconfig": [{"vlan": N, "ip": "x.x.x.x"}, ...], "files": {...} }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DesiredConfig {
    pub ifconfig: Vec<VlanConfig>,
    pub files: AliasFiles,
}

impl DesiredConfig {
    /// Parse and validate a raw document body.
    ///
    /// Validation rejects VLAN ids outside 1..=4094 and duplicate ids
    /// within `ifconfig` -- a duplicate means a broken remote contract,
    /// and rejecting is the deterministic alternative to silent
    /// last-write-wins.
    pub fn parse(body: &[u8]) -> Result<Self, UpdateError> {
        let config: Self = serde_json::from_slice(body)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), UpdateError> {
        let mut seen = BTreeSet::new();
        for entry in &self.ifconfig {
            if !(1..=4094).contains(&entry.vlan) {
                return Err(UpdateError::VlanOutOfRange { vlan: entry.vlan });
            }
            if !seen.insert(entry.vlan) {
                return Err(UpdateError::DuplicateVlan { vlan: entry.vlan });
            }
        }
        Ok(())
    }

    /// The set of VLAN ids this document declares.
    pub fn desired_vlans(&self) -> BTreeSet<u16> {
        self.ifconfig.iter().map(|entry| entry.vlan).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "ifconfig": [
            {"vlan": 10, "ip": "10.0.0.5"},
            {"vlan": 20, "ip": "10.0.1.5"}
        ],
        "files": {
            "chalias": "ch.alias",
            "gralias": "gr.alias",
            "opalias": "op.alias"
        }
    }"#;

    #[test]
    fn parses_valid_document() {
        let config = DesiredConfig::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(config.ifconfig.len(), 2);
        assert_eq!(config.ifconfig[0].vlan, 10);
        assert_eq!(config.ifconfig[0].ip, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(config.files.chalias, "ch.alias");
        assert_eq!(config.desired_vlans(), BTreeSet::from([10, 20]));
    }

    #[test]
    fn rejects_duplicate_vlan_ids() {
        let body = r#"{
            "ifconfig": [
                {"vlan": 10, "ip": "10.0.0.5"},
                {"vlan": 10, "ip": "10.0.0.6"}
            ],
            "files": {"chalias": "a", "gralias": "b", "opalias": "c"}
        }"#;
        let err = DesiredConfig::parse(body.as_bytes()).unwrap_err();
        assert!(matches!(err, UpdateError::DuplicateVlan { vlan: 10 }));
    }

    #[test]
    fn rejects_out_of_range_vlan() {
        let body = r#"{
            "ifconfig": [{"vlan": 4095, "ip": "10.0.0.5"}],
            "files": {"chalias": "a", "gralias": "b", "opalias": "c"}
        }"#;
        let err = DesiredConfig::parse(body.as_bytes()).unwrap_err();
        assert!(matches!(err, UpdateError::VlanOutOfRange { vlan: 4095 }));

        let body = r#"{
            "ifconfig": [{"vlan": 0, "ip": "10.0.0.5"}],
            "files": {"chalias": "a", "gralias": "b", "opalias": "c"}
        }"#;
        let err = DesiredConfig::parse(body.as_bytes()).unwrap_err();
        assert!(matches!(err, UpdateError::VlanOutOfRange { vlan: 0 }));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = DesiredConfig::parse(b"not json").unwrap_err();
        assert!(matches!(err, UpdateError::MalformedConfig(_)));
    }

    #[test]
    fn hardware_address_dashed_form() {
        let hwaddr = HardwareAddress::new("AA:BB:CC:00:11:22\n");
        assert_eq!(hwaddr.as_str(), "aa:bb:cc:00:11:22");
        assert_eq!(hwaddr.dashed(), "aa-bb-cc-00-11-22");
    }
}
