//! Linux backend: `ip`/`sysctl` command sequences, with hardware
//! address and VLAN enumeration read from sysfs/procfs.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use tracing::info;

use sie_core::{HardwareAddress, NetBackend, UpdateError, DEFAULT_NETMASK, LINK_MTU};

use crate::cmd::{checked, CommandRunner, ShellRunner};

/// `NetBackend` for Linux hosts.
#[derive(Debug)]
pub struct LinuxBackend<R = ShellRunner> {
    runner: R,
    sys_net: PathBuf,
    proc_vlan: PathBuf,
}

impl LinuxBackend {
    pub fn new() -> Self {
        Self::with_runner(ShellRunner)
    }
}

impl Default for LinuxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> LinuxBackend<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            sys_net: PathBuf::from("/sys/class/net"),
            proc_vlan: PathBuf::from("/proc/net/vlan"),
        }
    }
}

impl<R: CommandRunner> NetBackend for LinuxBackend<R> {
    fn hardware_address(&self, iface: &str) -> Result<HardwareAddress, UpdateError> {
        let path = self.sys_net.join(iface).join("address");
        let raw = std::fs::read_to_string(&path)
            .map_err(|_| UpdateError::NoHardwareAddress { iface: iface.into() })?;
        Ok(HardwareAddress::new(raw))
    }

    fn vlans(&self, iface: &str) -> Result<BTreeSet<u16>, UpdateError> {
        let mut vlans = BTreeSet::new();
        let entries = match std::fs::read_dir(&self.proc_vlan) {
            Ok(entries) => entries,
            // No 8021q module loaded means no VLANs.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vlans),
            Err(err) => return Err(err.into()),
        };
        let prefix = format!("{iface}.");
        for entry in entries {
            let name = entry?.file_name();
            if let Some(id) = name.to_string_lossy().strip_prefix(&prefix) {
                if let Ok(vlan) = id.parse::<u16>() {
                    vlans.insert(vlan);
                }
            }
        }
        Ok(vlans)
    }

    fn set_link_up(&self, iface: &str) -> Result<(), UpdateError> {
        let probe = self.runner.run("ip", &["link", "show", iface])?;
        if !probe.success() {
            return Err(UpdateError::UpdateFailed(format!(
                "unable to bring up network interface {iface}"
            )));
        }
        let in_shape =
            probe.stdout.contains(&format!("mtu {LINK_MTU}")) && probe.stdout.contains("state UP");
        if !probe.stdout.is_empty() && !in_shape {
            let mtu = LINK_MTU.to_string();
            checked(&self.runner, "ip", &["link", "set", "up", iface, "mtu", &mtu])?;
        }
        Ok(())
    }

    fn set_vlan_up(&self, iface: &str, vlan: u16, ip: Ipv4Addr) -> Result<(), UpdateError> {
        let vlan_iface = format!("{iface}.{vlan}");

        let probe = self.runner.run("ip", &["addr", "show", &vlan_iface])?;
        if probe.success() {
            let desired = format!("{ip}/{DEFAULT_NETMASK}");
            let current = inet_addresses(&probe.stdout);
            if current.contains(&desired) {
                // Exact address already assigned; only stale extras go.
                for stale in current.iter().filter(|addr| **addr != desired) {
                    info!(address = %stale, interface = %vlan_iface, "removing obsolete address");
                    checked(&self.runner, "ip", &["addr", "del", stale, "dev", &vlan_iface])?;
                }
            } else {
                checked(&self.runner, "ip", &["addr", "flush", "dev", &vlan_iface])?;
                self.add_ip_addr(ip, &vlan_iface, DEFAULT_NETMASK)?;
                info!(interface = %vlan_iface, %ip, "replaced address on VLAN");
            }
        } else {
            let id = vlan.to_string();
            checked(
                &self.runner,
                "ip",
                &["link", "add", "link", iface, "name", &vlan_iface, "type", "vlan", "id", &id],
            )?;
            let ipv6_off = format!("net.ipv6.conf.{iface}/{vlan}.disable_ipv6=1");
            checked(&self.runner, "sysctl", &["-q", "-w", &ipv6_off])?;
            self.add_ip_addr(ip, &vlan_iface, DEFAULT_NETMASK)?;
            info!(%iface, vlan, %ip, "added new VLAN");
        }

        checked(&self.runner, "ip", &["link", "set", "up", "dev", &vlan_iface])?;
        Ok(())
    }

    fn set_vlan_mtu(&self, iface: &str, vlan: u16, mtu: u32) -> Result<(), UpdateError> {
        let mtu = mtu.to_string();
        let vlan_iface = format!("{iface}.{vlan}");
        checked(&self.runner, "ip", &["link", "set", "mtu", &mtu, "dev", &vlan_iface])?;
        Ok(())
    }

    fn remove_vlan(&self, iface: &str, vlan: u16) -> Result<(), UpdateError> {
        let vlan_iface = format!("{iface}.{vlan}");
        checked(&self.runner, "ip", &["link", "del", "dev", &vlan_iface])?;
        info!(%iface, vlan, "removed old VLAN");
        Ok(())
    }

    fn add_ip_addr(&self, ip: Ipv4Addr, iface: &str, netmask: u8) -> Result<(), UpdateError> {
        let cidr = format!("{ip}/{netmask}");
        checked(&self.runner, "ip", &["addr", "add", &cidr, "dev", iface])?;
        Ok(())
    }
}

/// Collect the `inet <addr>/<len>` assignments from `ip addr show`
/// output.
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
