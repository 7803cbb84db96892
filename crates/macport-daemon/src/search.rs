//! Inventory lookup by MAC address

use macport_core::{InventoryError, InventoryRecord, InventoryStore, MacAddress};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("MAC address is required.")]
    Missing,
    #[error("Invalid MAC address.")]
    Invalid,
    #[error("MAC address not found.")]
    NotFound,
    #[error("inventory query failed: {0}")]
    Store(#[from] InventoryError),
}

/// Drop rows on aggregated uplinks (port-channels, LAGs). A row is dropped if
/// its port name contains any pattern; matching is case-sensitive.
pub fn filter_uplinks(
    records: Vec<InventoryRecord>,
    skip_ports: &[String],
) -> Vec<InventoryRecord> {
    records
        .into_iter()
        .filter(|r| !skip_ports.iter().any(|p| r.port_name.contains(p.as_str())))
        .collect()
}

/// Normalise `query` and return the matching rows, uplinks removed
pub fn lookup(
    store: &InventoryStore,
    query: &str,
    skip_ports: &[String],
) -> Result<Vec<InventoryRecord>, SearchError> {
    if query.trim().is_empty() {
        return Err(SearchError::Missing);
    }
    let mac: MacAddress = query.parse().map_err(|_| SearchError::Invalid)?;

    let records = filter_uplinks(store.find_by_mac(&mac)?, skip_ports);
    if records.is_empty() {
        return Err(SearchError::NotFound);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macport_core::{MacPortEntry, Vendor};

    fn skip() -> Vec<String> {
        vec!["Po".into(), "Port-Channel".into(), "lag".into()]
    }

    fn seeded_store() -> InventoryStore {
        let store = InventoryStore::open_in_memory().unwrap();
        let mac: MacAddress = "00:14:29:30:37:02".parse().unwrap();
        store
            .upsert(
                "sw1",
                "10.0.0.1",
                Vendor::Cisco,
                &[MacPortEntry::new(mac, "Gi0/5"), MacPortEntry::new(mac, "Po1")],
            )
            .unwrap();
        store
            .upsert("sw2", "10.0.0.2", Vendor::Aruba, &[MacPortEntry::new(mac, "lag 12")])
            .unwrap();
        store
    }

    #[test]
    fn test_lookup_normalises_query() {
        let store = seeded_store();
        for query in ["00-14-29-30-37-02", "0014.2930.3702", "001429303702", "00:14:29:30:37:02"] {
            let records = lookup(&store, query, &skip()).unwrap();
            assert_eq!(records.len(), 1, "query {}", query);
            assert_eq!(records[0].switch_name, "sw1");
            assert_eq!(records[0].port_name, "Gi0/5");
        }
    }

    #[test]
    fn test_lookup_errors() {
        let store = seeded_store();
        assert!(matches!(lookup(&store, "  ", &skip()), Err(SearchError::Missing)));
        assert!(matches!(lookup(&store, "00:14:29", &skip()), Err(SearchError::Invalid)));
        assert!(matches!(
            lookup(&store, "AA:BB:CC:DD:EE:FF", &skip()),
            Err(SearchError::NotFound)
        ));
    }

    #[test]
    fn test_only_uplinks_is_not_found() {
        let store = InventoryStore::open_in_memory().unwrap();
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        store
            .upsert("sw1", "10.0.0.1", Vendor::Cisco, &[MacPortEntry::new(mac, "Port-Channel3")])
            .unwrap();

        assert!(matches!(
            lookup(&store, "aabbccddeeff", &skip()),
            Err(SearchError::NotFound)
        ));
        assert_eq!(lookup(&store, "aabbccddeeff", &[]).unwrap().len(), 1);
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let store = seeded_store();
        let mac: MacAddress = "00:14:29:30:37:02".parse().unwrap();
        let records = store.find_by_mac(&mac).unwrap();
        assert_eq!(records.len(), 3);

        let kept = filter_uplinks(records, &["po".to_string()]);
        assert_eq!(kept.len(), 3);
    }
}
