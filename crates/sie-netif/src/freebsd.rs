//! FreeBSD backend: `ifconfig` command sequences throughout.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use tracing::info;

use sie_core::{HardwareAddress, NetBackend, UpdateError, DEFAULT_NETMASK, LINK_MTU};

use crate::cmd::{checked, CommandRunner, ShellRunner};

/// `NetBackend` for FreeBSD hosts.
#[derive(Debug)]
pub struct FreebsdBackend<R = ShellRunner> {
    runner: R,
}

impl FreebsdBackend {
    pub fn new() -> Self {
        Self::with_runner(ShellRunner)
    }
}

impl Default for FreebsdBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> FreebsdBackend<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> NetBackend for FreebsdBackend<R> {
    fn hardware_address(&self, iface: &str) -> Result<HardwareAddress, UpdateError> {
        let output = checked(&self.runner, "ifconfig", &[iface])
            .map_err(|_| UpdateError::NoHardwareAddress { iface: iface.into() })?;
        ether_address(&output.stdout)
            .map(HardwareAddress::new)
            .ok_or_else(|| UpdateError::NoHardwareAddress { iface: iface.into() })
    }

    fn vlans(&self, _iface: &str) -> Result<BTreeSet<u16>, UpdateError> {
        let output = self.runner.run("ifconfig", &[])?;
        let mut vlans = BTreeSet::new();
        if output.success() {
            for line in output.stdout.lines() {
                let Some(rest) = line.strip_prefix("vlan") else {
                    continue;
                };
                let Some((id, _)) = rest.split_once(':') else {
                    continue;
                };
                if let Ok(vlan) = id.parse::<u16>() {
                    vlans.insert(vlan);
                }
            }
        }
        Ok(vlans)
    }

    fn set_link_up(&self, iface: &str) -> Result<(), UpdateError> {
        let probe = self.runner.run("ifconfig", &[iface])?;
        if !probe.success() {
            return Err(UpdateError::UpdateFailed(format!(
                "unable to bring up network interface {iface}"
            )));
        }
        let in_shape =
            probe.stdout.contains(&format!("mtu {LINK_MTU}")) && probe.stdout.contains("UP");
        if !probe.stdout.is_empty() && !in_shape {
            let mtu = LINK_MTU.to_string();
            checked(&self.runner, "ifconfig", &[iface, "mtu", &mtu, "up"])?;
        }
        Ok(())
    }

    fn set_vlan_up(&self, iface: &str, vlan: u16, ip: Ipv4Addr) -> Result<(), UpdateError> {
        let vlan_iface = format!("vlan{vlan}");

        let probe = self.runner.run("ifconfig", &[&vlan_iface])?;
        if probe.success() {
            let desired = ip.to_string();
            let current = inet_addresses(&probe.stdout);
            // Converge in one call even from several stale addresses:
            // assign the desired address first, then drop every other.
            if !current.contains(&desired) {
                self.add_ip_addr(ip, &vlan_iface, DEFAULT_NETMASK)?;
                info!(interface = %vlan_iface, %ip, "assigned address on VLAN");
            }
            for stale in current.iter().filter(|addr| **addr != desired) {
                info!(address = %stale, interface = %vlan_iface, "removing obsolete address");
                checked(&self.runner, "ifconfig", &[&vlan_iface, "-alias", stale])?;
            }
        } else {
            let id = vlan.to_string();
            checked(
                &self.runner,
                "ifconfig",
                &[&vlan_iface, "create", "vlan", &id, "vlandev", iface],
            )?;
            self.add_ip_addr(ip, &vlan_iface, DEFAULT_NETMASK)?;
            info!(%iface, vlan, %ip, "added new VLAN");
        }
        Ok(())
    }

    fn set_vlan_mtu(&self, _iface: &str, vlan: u16, mtu: u32) -> Result<(), UpdateError> {
        let vlan_iface = format!("vlan{vlan}");
        let mtu = mtu.to_string();
        checked(&self.runner, "ifconfig", &[&vlan_iface, "mtu", &mtu])?;
        Ok(())
    }

    fn remove_vlan(&self, iface: &str, vlan: u16) -> Result<(), UpdateError> {
        let vlan_iface = format!("vlan{vlan}");
        checked(&self.runner, "ifconfig", &[&vlan_iface, "destroy"])?;
        info!(%iface, vlan, "removed old VLAN");
        Ok(())
    }

    fn add_ip_addr(&self, ip: Ipv4Addr, iface: &str, netmask: u8) -> Result<(), UpdateError> {
        let ip = ip.to_string();
        let mask = hex_netmask(netmask);
        checked(&self.runner, "ifconfig", &[iface, "alias", &ip, "netmask", &mask])?;
        Ok(())
    }
}

/// The `ether` line value from `ifconfig <iface>` output.
fn ether_address(stdout: &str) -> Option<&str> {
    for line in stdout.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() == Some("ether") {
            return tokens.next();
        }
    }
    None
}

/// Collect bare `inet <addr>` assignments from `ifconfig` output.
fn inet_addresses(stdout: &str) -> BTreeSet<String> {
    let mut addresses = BTreeSet::new();
    for line in stdout.lines() {
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            if token == "inet" {
                if let Some(addr) = tokens.next() {
                    addresses.insert(addr.to_owned());
                }
            }
        }
    }
    addresses
}

/// ifconfig wants the netmask in hex form, e.g. `0xffffff00` for /24.
fn hex_netmask(netmask: u8) -> String {
    let mask = ((1u64 << 32) - (1u64 << (32 - u32::from(netmask)))) as u32;
    format!("{mask:#010x}")
}
