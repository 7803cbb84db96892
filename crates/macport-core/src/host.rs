//! Switch and MAC/port observation types

use serde::{Deserialize, Serialize};

use crate::mac::MacAddress;
use crate::vendor::Vendor;

/// Port name used when an ifIndex has no entry in the interface-name table
pub const UNKNOWN_PORT: &str = "Unknown Port";

/// Returns true if a community string is a directory secret macro such as
/// `{$SNMP_COMMUNITY}` rather than a literal value.
pub fn is_macro_placeholder(community: &str) -> bool {
    community.len() > 3 && community.starts_with("{$") && community.ends_with('}')
}

/// One monitored switch, as listed by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Directory host name, unique per directory entry
    pub hostname: String,
    /// Opaque directory id, only used for macro resolution
    pub host_id: String,
    /// SNMP management address
    pub ip: String,
    /// SNMP v2c community. Empty, or still a `{$MACRO}` if resolution failed.
    pub community: String,
    pub vendor: Vendor,
}

impl Host {
    pub fn new(
        hostname: impl Into<String>,
        host_id: impl Into<String>,
        ip: impl Into<String>,
        community: impl Into<String>,
        vendor: Vendor,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            host_id: host_id.into(),
            ip: ip.into(),
            community: community.into(),
            vendor,
        }
    }

    /// A community that can actually be sent to a switch: non-empty and not
    /// an unresolved macro placeholder.
    pub fn has_usable_community(&self) -> bool {
        let community = self.community.trim();
        !community.is_empty() && !is_macro_placeholder(community)
    }
}

/// One (MAC, port) pair seen on an access port of a switch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacPortEntry {
    pub mac: MacAddress,
    pub port: String,
}

impl MacPortEntry {
    pub fn new(mac: MacAddress, port: impl Into<String>) -> Self {
        Self {
            mac,
            port: port.into(),
        }
    }
}

impl std::fmt::Display for MacPortEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.mac, self.port)
    }
}
