//! MAC/port correlation across the forwarding, interface and VLAN-mode tables

use macport_core::{MacAddress, MacPortEntry, Vendor, ACCESS_MODE, MAC_TABLE_OID, UNKNOWN_PORT};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::session::{parse_oid, SessionFactory, SnmpError, SnmpSession, SnmpTarget, WalkEntry};

/// Raw rows of the three tables walked for one switch
#[derive(Debug, Clone, Default)]
pub struct SwitchTables {
    pub mac_table: Vec<WalkEntry>,
    pub interfaces: Vec<WalkEntry>,
    pub vlan_modes: Vec<WalkEntry>,
}

/// Polls switches and turns their tables into access-port MAC observations
#[derive(Clone)]
pub struct Correlator {
    factory: Arc<dyn SessionFactory>,
}

impl Correlator {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self { factory }
    }

    /// Poll one switch.
    ///
    /// A failing walk is logged and treated as an empty table. The switch is
    /// reported unreachable only if the session cannot be opened or all three
    /// walks fail.
    pub async fn poll(
        &self,
        ip: &str,
        community: &str,
        vendor: Vendor,
    ) -> Result<Vec<MacPortEntry>, SnmpError> {
        let oids = vendor.oids().ok_or(SnmpError::UnsupportedVendor(vendor))?;
        let target = SnmpTarget::new(ip, community);

        let session = self.factory.open(&target).await?;

        let mut failures = Vec::new();
        let session = session.as_ref();
        let mac_table = walk_or_empty(session, ip, MAC_TABLE_OID, &mut failures).await;
        let interfaces = walk_or_empty(session, ip, oids.interface_names, &mut failures).await;
        let vlan_modes = walk_or_empty(session, ip, oids.vlan_mode, &mut failures).await;

        if failures.len() == 3 {
            return Err(SnmpError::Unreachable {
                target: ip.to_string(),
                reason: failures.join("; "),
            });
        }

        let tables = SwitchTables {
            mac_table,
            interfaces,
            vlan_modes,
        };
        let entries = correlate(&tables);

        info!(
            ip = %ip,
            vendor = %vendor,
            macs = tables.mac_table.len(),
            interfaces = tables.interfaces.len(),
            access_entries = entries.len(),
            "Switch polled"
        );

        Ok(entries)
    }
}

async fn walk_or_empty(
    session: &dyn SnmpSession,
    ip: &str,
    root: &str,
    failures: &mut Vec<String>,
) -> Vec<WalkEntry> {
    match session.bulk_walk(root).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(ip = %ip, oid = %root, error = %e, "Walk failed, continuing with empty table");
            failures.push(e.to_string());
            Vec::new()
        }
    }
}

/// ifIndex -> port name from the interface-name table
pub fn port_names(interfaces: &[WalkEntry]) -> HashMap<u32, String> {
    let mut names = HashMap::with_capacity(interfaces.len());
    for entry in interfaces {
        match (entry.index(), entry.value.port_name()) {
            (Some(if_index), Some(name)) => {
                names.insert(if_index, name);
            }
            _ => debug!(oid = ?entry.oid, value = ?entry.value, "Skipping interface row"),
        }
    }
    names
}

/// Interface indexes whose VLAN mode is access
pub fn access_ports(vlan_modes: &[WalkEntry]) -> HashSet<u32> {
    vlan_modes
        .iter()
        .filter(|entry| entry.value.vlan_mode() == Some(ACCESS_MODE))
        .filter_map(WalkEntry::index)
        .collect()
}

/// Join the three tables into access-port MAC/port pairs, in MAC-table order.
///
/// Trunk and unclassified ports are dropped. Access ports missing from the
/// interface-name table get [`UNKNOWN_PORT`]. Malformed MAC rows are skipped.
pub fn correlate(tables: &SwitchTables) -> Vec<MacPortEntry> {
    let names = port_names(&tables.interfaces);
    let access = access_ports(&tables.vlan_modes);
    let mac_root = parse_oid(MAC_TABLE_OID).unwrap_or_default();

    let mut entries = Vec::new();
    for row in &tables.mac_table {
        let suffix = row.suffix(&mac_root);
        if suffix.len() < 6 {
            warn!(oid = ?row.oid, "Skipping MAC table row with fewer than 6 index arcs");
            continue;
        }
        let Some(mac) = MacAddress::from_oid_arcs(suffix) else {
            warn!(oid = ?row.oid, "Skipping MAC table row with out-of-range octet");
            continue;
        };
        let Some(if_index) = row.value.if_index() else {
            warn!(mac = %mac, value = ?row.value, "Skipping MAC table row without interface index");
            continue;
        };

        if !access.contains(&if_index) {
            debug!(mac = %mac, if_index = if_index, "Skipping MAC on non-access port");
            continue;
        }

        let port = names
            .get(&if_index)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_PORT.to_string());

        entries.push(MacPortEntry::new(mac, port));
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSessionFactory, FakeSwitch};

    const CISCO_IF: &str = "1.3.6.1.2.1.2.2.1.2";
    const CISCO_VLAN: &str = "1.3.6.1.4.1.9.9.68.1.2.2.1.2";

    fn row(oid: &str, value: impl Into<crate::SnmpValue>) -> WalkEntry {
        WalkEntry::parse(oid, value).unwrap()
    }

    fn mac_row(suffix: &str, if_index: i64) -> WalkEntry {
        row(&format!("{}.{}", MAC_TABLE_OID, suffix), if_index)
    }

    #[test]
    fn test_single_access_entry() {
        let tables = SwitchTables {
            mac_table: vec![mac_row("0.20.41.48.55.2", 5)],
            interfaces: vec![row(&format!("{}.5", CISCO_IF), "Gi0/5")],
            vlan_modes: vec![row(&format!("{}.5", CISCO_VLAN), 1i64)],
        };

        let entries = correlate(&tables);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mac.to_string(), "00:14:29:30:37:02");
        assert_eq!(entries[0].port, "Gi0/5");
    }

    #[test]
    fn test_trunk_ports_are_dropped() {
        let tables = SwitchTables {
            mac_table: vec![
                mac_row("0.20.41.48.55.2", 5),
                mac_row("0.20.41.48.55.3", 49),
                mac_row("0.20.41.48.55.4", 50),
            ],
            interfaces: vec![
                row(&format!("{}.5", CISCO_IF), "Gi0/5"),
                row(&format!("{}.49", CISCO_IF), "Gi0/49"),
                row(&format!("{}.50", CISCO_IF), "Gi0/50"),
            ],
            vlan_modes: vec![
                row(&format!("{}.5", CISCO_VLAN), 1i64),
                row(&format!("{}.49", CISCO_VLAN), 2i64),
            ],
        };

        let entries = correlate(&tables);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].port, "Gi0/5");
    }

    #[test]
    fn test_unknown_port_fallback() {
        let tables = SwitchTables {
            mac_table: vec![mac_row("170.187.204.221.238.255", 7)],
            interfaces: vec![row(&format!("{}.5", CISCO_IF), "Gi0/5")],
            vlan_modes: vec![row(&format!("{}.7", CISCO_VLAN), 1i64)],
        };

        let entries = correlate(&tables);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mac.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(entries[0].port, UNKNOWN_PORT);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let tables = SwitchTables {
            mac_table: vec![
                mac_row("20.41.48", 5),
                mac_row("0.20.41.48.55.300", 5),
                row(&format!("{}.0.20.41.48.55.9", MAC_TABLE_OID), "not-an-index"),
                mac_row("0.20.41.48.55.2", 5),
            ],
            interfaces: vec![row(&format!("{}.5", CISCO_IF), "\"Gi0/5\"")],
            vlan_modes: vec![row(&format!("{}.5", CISCO_VLAN), 1i64)],
        };

        let entries = correlate(&tables);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].port, "Gi0/5");
    }

    #[test]
    fn test_output_follows_mac_table_order() {
        let tables = SwitchTables {
            mac_table: vec![
                mac_row("0.0.0.0.0.9", 1),
                mac_row("0.0.0.0.0.1", 2),
                mac_row("0.0.0.0.0.5", 1),
            ],
            interfaces: vec![
                row(&format!("{}.1", CISCO_IF), "Gi0/1"),
                row(&format!("{}.2", CISCO_IF), "Gi0/2"),
            ],
            vlan_modes: vec![
                row(&format!("{}.1", CISCO_VLAN), 1i64),
                row(&format!("{}.2", CISCO_VLAN), 1i64),
            ],
        };

        let macs: Vec<String> = correlate(&tables).iter().map(|e| e.mac.to_string()).collect();
        assert_eq!(
            macs,
            vec!["00:00:00:00:00:09", "00:00:00:00:00:01", "00:00:00:00:00:05"]
        );
    }

    #[tokio::test]
    async fn test_poll_walks_vendor_tables() {
        let switch = FakeSwitch::new()
            .with_row(&format!("{}.0.20.41.48.55.2", MAC_TABLE_OID), 5i64)
            .with_row(&format!("{}.5", CISCO_IF), "Gi0/5")
            .with_row(&format!("{}.5", CISCO_VLAN), 1i64);
        let factory = Arc::new(FakeSessionFactory::new().with_switch("10.0.0.1", switch));
        let correlator = Correlator::new(factory.clone());

        let entries = correlator.poll("10.0.0.1", "public", Vendor::Cisco).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mac.to_string(), "00:14:29:30:37:02");
        assert_eq!(entries[0].port, "Gi0/5");
        assert_eq!(factory.open_count(), 1);
        assert_eq!(
            factory.walked_roots(),
            vec![MAC_TABLE_OID.to_string(), CISCO_IF.to_string(), CISCO_VLAN.to_string()]
        );
    }

    #[tokio::test]
    async fn test_poll_unknown_vendor_never_opens_session() {
        let factory = Arc::new(FakeSessionFactory::new());
        let correlator = Correlator::new(factory.clone());

        let err = correlator.poll("10.0.0.1", "public", Vendor::Unknown).await.unwrap_err();
        assert_eq!(err, SnmpError::UnsupportedVendor(Vendor::Unknown));
        assert_eq!(factory.open_count(), 0);
    }

    #[tokio::test]
    async fn test_poll_unreachable_switch() {
        let factory = Arc::new(FakeSessionFactory::new());
        let correlator = Correlator::new(factory);

        let err = correlator.poll("10.9.9.9", "public", Vendor::Aruba).await.unwrap_err();
        assert!(matches!(err, SnmpError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_poll_tolerates_single_failed_walk() {
        let switch = FakeSwitch::new()
            .with_row(&format!("{}.0.20.41.48.55.2", MAC_TABLE_OID), 5i64)
            .with_row(&format!("{}.5", CISCO_VLAN), 1i64)
            .failing(CISCO_IF);
        let factory = Arc::new(FakeSessionFactory::new().with_switch("10.0.0.1", switch));
        let correlator = Correlator::new(factory);

        let entries = correlator.poll("10.0.0.1", "public", Vendor::Cisco).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].port, UNKNOWN_PORT);
    }

    #[tokio::test]
    async fn test_poll_all_walks_failing_is_unreachable() {
        let switch = FakeSwitch::new()
            .failing(MAC_TABLE_OID)
            .failing(CISCO_IF)
            .failing(CISCO_VLAN);
        let factory = Arc::new(FakeSessionFactory::new().with_switch("10.0.0.1", switch));
        let correlator = Correlator::new(factory);

        let err = correlator.poll("10.0.0.1", "public", Vendor::Cisco).await.unwrap_err();
        assert!(matches!(err, SnmpError::Unreachable { .. }));
    }
}
