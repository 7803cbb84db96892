//! Vendor tags and the static OID registry
//!
//! The MAC forwarding table is standard BRIDGE-MIB and therefore shared by
//! every vendor. Interface names and port VLAN mode live in different tables
//! depending on the switch family, so those are looked up per vendor.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// dot1dTpFdbPort: MAC address (as the last six OID arcs) -> bridge port
pub const MAC_TABLE_OID: &str = "1.3.6.1.2.1.17.4.3.1.2";

/// VLAN mode value reported for an access (untagged, single VLAN) port
pub const ACCESS_MODE: i64 = 1;

/// Closed set of switch families the poller knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    Cisco,
    Aruba,
    ProCurve,
    /// No attached template matched a known vendor
    Unknown,
}

impl Default for Vendor {
    fn default() -> Self {
        Self::Unknown
    }
}

impl Vendor {
    /// All vendors that have an OID mapping
    pub fn known() -> &'static [Vendor] {
        &[Vendor::Cisco, Vendor::Aruba, Vendor::ProCurve]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Cisco => "Cisco",
            Vendor::Aruba => "Aruba",
            Vendor::ProCurve => "ProCurve",
            Vendor::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Vendor::Unknown)
    }

    /// Look up the per-vendor table OIDs. `None` only for [`Vendor::Unknown`].
    pub fn oids(&self) -> Option<VendorOids> {
        match self {
            Vendor::Cisco => Some(VendorOids {
                // ifDescr
                interface_names: "1.3.6.1.2.1.2.2.1.2",
                // CISCO-VLAN-MEMBERSHIP-MIB vmVlanType
                vlan_mode: "1.3.6.1.4.1.9.9.68.1.2.2.1.2",
            }),
            Vendor::Aruba => Some(VendorOids {
                interface_names: "1.3.6.1.2.1.2.2.1.2",
                vlan_mode: "1.3.6.1.2.1.17.7.1.4.5.1.1",
            }),
            Vendor::ProCurve => Some(VendorOids {
                // ifName
                interface_names: "1.3.6.1.2.1.31.1.1.1.1",
                vlan_mode: "1.3.6.1.2.1.17.7.1.4.5.1.1",
            }),
            Vendor::Unknown => None,
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown vendor tag '{0}' (expected one of Cisco, Aruba, ProCurve)")]
pub struct ParseVendorError(pub String);

impl FromStr for Vendor {
    type Err = ParseVendorError;

    /// Parses a configured vendor tag. `Unknown` is not a valid tag to configure.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cisco" => Ok(Vendor::Cisco),
            "aruba" => Ok(Vendor::Aruba),
            "procurve" => Ok(Vendor::ProCurve),
            _ => Err(ParseVendorError(s.to_string())),
        }
    }
}

/// OIDs of the vendor-specific tables walked for one switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorOids {
    /// ifIndex -> interface name
    pub interface_names: &'static str,
    /// ifIndex -> VLAN/port mode (1 = access, 2 = trunk)
    pub vlan_mode: &'static str,
}

/// Template id -> vendor mapping used to classify directory hosts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorMap {
    templates: HashMap<String, Vendor>,
}

impl VendorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template_id: impl Into<String>, vendor: Vendor) {
        self.templates.insert(template_id.into(), vendor);
    }

    pub fn get(&self, template_id: &str) -> Option<Vendor> {
        self.templates.get(template_id).copied()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Classify a host from its attached templates.
    ///
    /// The first template (in the order given) that maps to a vendor wins.
    /// A later template mapping to a different vendor is reported but ignored.
    pub fn classify<'a, I>(&self, hostname: &str, template_ids: I) -> Vendor
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut chosen: Option<(Vendor, &str)> = None;

        for template_id in template_ids {
            let Some(vendor) = self.get(template_id) else {
                continue;
            };
            match chosen {
                None => chosen = Some((vendor, template_id)),
                Some((first, first_template)) if first != vendor => {
                    warn!(
                        host = %hostname,
                        kept = %first,
                        kept_template = %first_template,
                        ignored = %vendor,
                        ignored_template = %template_id,
                        "Host templates map to conflicting vendors, keeping first match"
                    );
                }
                Some(_) => {}
            }
        }

        chosen.map(|(v, _)| v).unwrap_or(Vendor::Unknown)
    }
}

impl FromIterator<(String, Vendor)> for VendorMap {
    fn from_iter<T: IntoIterator<Item = (String, Vendor)>>(iter: T) -> Self {
        Self {
            templates: iter.into_iter().collect(),
        }
    }
}
