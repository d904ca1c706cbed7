//! OS network backend capability.
//!
//! The reconciler is polymorphic over this trait: one concrete
//! implementation per OS family is selected once at startup (see
//! `sie-netif`) and passed in as `&dyn NetBackend` -- never branched
//! on per call. Methods are synchronous because every implementation
//! wraps blocking external command execution.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::error::UpdateError;
use crate::model::HardwareAddress;

/// MTU enforced on the base link and its VLAN sub-interfaces.
pub const LINK_MTU: u32 = 9000;

/// Default IPv4 prefix length for VLAN address assignments.
pub const DEFAULT_NETMASK: u8 = 24;

/// Primitives the reconciler needs from the operating system.
pub trait NetBackend {
    /// Canonical hardware address of `iface`.
    fn hardware_address(&self, iface: &str) -> Result<HardwareAddress, UpdateError>;

    /// VLAN ids currently present on `iface`.
    fn vlans(&self, iface: &str) -> Result<BTreeSet<u16>, UpdateError>;

    /// Bring the base link administratively up with MTU [`LINK_MTU`].
    /// Must be idempotent: a link already in the desired state is left
    /// untouched to avoid flapping it on every poll.
    fn set_link_up(&self, iface: &str) -> Result<(), UpdateError>;

    /// Ensure the VLAN sub-interface exists, carries exactly `ip`, and
    /// is up. Idempotent and incremental: create + address when
    /// missing; no network-affecting action beyond link-up when the
    /// exact address is already assigned; replace (never append) when
    /// a different address is found, removing every stale address.
    fn set_vlan_up(&self, iface: &str, vlan: u16, ip: Ipv4Addr) -> Result<(), UpdateError>;

    /// Set the MTU of an existing VLAN sub-interface.
    fn set_vlan_mtu(&self, iface: &str, vlan: u16, mtu: u32) -> Result<(), UpdateError>;

    /// Destroy the VLAN sub-interface.
    fn remove_vlan(&self, iface: &str, vlan: u16) -> Result<(), UpdateError>;

    /// Assign `ip/netmask` to an interface.
    fn add_ip_addr(&self, ip: Ipv4Addr, iface: &str, netmask: u8) -> Result<(), UpdateError>;
}
