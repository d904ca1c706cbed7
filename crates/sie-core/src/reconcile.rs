// ── Reconciliation pass ──
//
// One full read-desired/read-observed/diff/apply cycle for one
// interface. Nothing is held across passes: each pass re-reads both
// sides, so the system self-heals against drift or manual changes
// between polls.

use std::collections::BTreeSet;

use tracing::{debug, error, info};
use url::Url;

use crate::backend::NetBackend;
use crate::config::AgentConfig;
use crate::error::UpdateError;
use crate::fetch::{CacheDir, Fetcher};
use crate::model::DesiredConfig;
use crate::sync::sync_file;

/// Fixed local filenames for the three alias documents, directly under
/// the system configuration directory.
pub const FNAME_CHALIAS: &str = "nmsgtool.chalias";
pub const FNAME_GRALIAS: &str = "nmsg.gralias";
pub const FNAME_OPALIAS: &str = "nmsg.opalias";

/// Run one reconciliation pass for `iface`.
///
/// Identity lookup and the per-host config fetch are pass-fatal;
/// everything after is best-effort sequential application, aborted by
/// the first backend failure. Failures never leak into sibling
/// interfaces' passes.
pub async fn reconcile(
    backend: &dyn NetBackend,
    iface: &str,
    config: &AgentConfig,
    fetcher: &Fetcher,
) -> Result<(), UpdateError> {
    let cache = CacheDir::open(&config.etc_dir)?;

    let hwaddr = backend.hardware_address(iface)?;
    debug!(%iface, %hwaddr, "starting reconciliation pass");

    let guest_base = config.guest_base()?;
    let config_url = guest_base.join(&format!("{}.json", hwaddr.dashed()))?;

    // No generic fallback config exists: an unreachable per-host
    // document (with no usable cache) ends the pass here.
    let body = match fetcher.fetch(&config_url, Some(&cache)).await {
        Ok(body) => body,
        Err(err) => {
            error!(%hwaddr, "no configuration found for hardware address");
            return Err(UpdateError::NoHostConfig {
                hwaddr: hwaddr.as_str().into(),
                source: Box::new(err),
            });
        }
    };

    // Only after config exists: never bring up a link for an interface
    // without valid configuration.
    backend.set_link_up(iface)?;

    let desired_config = DesiredConfig::parse(&body)?;

    let desired = desired_config.desired_vlans();
    let observed = backend.vlans(iface)?;
    debug!(?desired, ?observed, preserve = ?config.preserve, "computed VLAN sets");

    for vlan in removal_set(&observed, &desired, &config.preserve) {
        info!(%iface, vlan, "removing VLAN no longer in desired config");
        backend.remove_vlan(iface, vlan)?;
    }

    for entry in &desired_config.ifconfig {
        if config.preserve.contains(&entry.vlan) {
            debug!(%iface, vlan = entry.vlan, "VLAN preserved by operator, skipping");
            continue;
        }
        backend.set_vlan_up(iface, entry.vlan, entry.ip)?;
    }

    let aliases = [
        (FNAME_CHALIAS, desired_config.files.chalias.as_str()),
        (FNAME_GRALIAS, desired_config.files.gralias.as_str()),
        (FNAME_OPALIAS, desired_config.files.opalias.as_str()),
    ];
    for (fname, relpath) in aliases {
        let url: Url = guest_base.join(relpath)?;
        sync_file(fetcher, &config.etc_dir.join(fname), &url, Some(&cache)).await?;
    }

    Ok(())
}

/// VLANs to remove: `observed − desired − preserve`.
///
/// Order across VLANs is unspecified; each removal is independent.
pub fn removal_set(
    observed: &BTreeSet<u16>,
    desired: &BTreeSet<u16>,
    preserve: &BTreeSet<u16>,
) -> BTreeSet<u16> {
    observed
        .iter()
        .copied()
        .filter(|vlan| !desired.contains(vlan) && !preserve.contains(vlan))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[u16]) -> BTreeSet<u16> {
        ids.iter().copied().collect()
    }

    #[test]
    fn removal_set_is_observed_minus_desired_minus_preserve() {
        let observed = set(&[10, 20, 30, 40]);
        let desired = set(&[10, 50]);
        let preserve = set(&[30]);
        assert_eq!(removal_set(&observed, &desired, &preserve), set(&[20, 40]));
    }

    #[test]
    fn removal_set_empty_when_observed_covered() {
        let observed = set(&[10, 20]);
        assert_eq!(
            removal_set(&observed, &set(&[10, 20]), &set(&[])),
            set(&[])
        );
        assert_eq!(
            removal_set(&observed, &set(&[]), &set(&[10, 20])),
            set(&[])
        );
    }

    #[test]
    fn removal_set_ignores_preserve_entries_not_observed() {
        let observed = set(&[20]);
        let desired = set(&[]);
        let preserve = set(&[10, 20, 30]);
        assert_eq!(removal_set(&observed, &desired, &preserve), set(&[]));
    }
}
