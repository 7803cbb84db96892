//! SQLite-backed MAC/port inventory
//!
//! One row per (switch, MAC, port) fact. Re-observing a known fact only
//! refreshes `updated_at`; `switch_ip`, `vendor` and `created_at` keep the
//! values from the first observation.

use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::host::MacPortEntry;
use crate::mac::MacAddress;
use crate::vendor::Vendor;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("write failed for {host} ({mac} on {port}): {source}")]
    WriteFailed {
        host: String,
        mac: String,
        port: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("invalid timestamp '{0}' in inventory")]
    Timestamp(String),
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS network_inventory (
    switch_name TEXT NOT NULL,
    switch_ip TEXT NOT NULL,
    vendor TEXT NOT NULL,
    mac_address TEXT NOT NULL,
    port_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(switch_name, mac_address, port_name)
);

CREATE INDEX IF NOT EXISTS idx_inventory_mac ON network_inventory(mac_address);
"#;

const UPSERT: &str = r#"
INSERT INTO network_inventory
    (switch_name, switch_ip, vendor, mac_address, port_name, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
ON CONFLICT(switch_name, mac_address, port_name) DO UPDATE SET
    updated_at = excluded.updated_at
"#;

const SELECT_COLUMNS: &str = "SELECT switch_name, switch_ip, vendor, mac_address, port_name, \
     created_at, updated_at FROM network_inventory";

/// A persisted "this switch has seen this MAC on this port" fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRecord {
    pub switch_name: String,
    pub switch_ip: String,
    pub vendor: String,
    pub mac_address: String,
    pub port_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inventory database handle. Writes are serialised through the inner lock.
pub struct InventoryStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl InventoryStore {
    /// Open (or create) the inventory database at `path` and ensure the schema
    pub fn open(path: &Path) -> Result<Self, InventoryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        store.ensure_schema()?;

        info!(path = %path.display(), "Opened inventory database");
        Ok(store)
    }

    /// In-memory database, schema included
    pub fn open_in_memory() -> Result<Self, InventoryError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            path: None,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create the inventory table and indexes if absent. Safe to call repeatedly.
    pub fn ensure_schema(&self) -> Result<(), InventoryError> {
        self.conn.lock().execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Upsert a host's entries stamped with the current time
    pub fn upsert(
        &self,
        hostname: &str,
        ip: &str,
        vendor: Vendor,
        entries: &[MacPortEntry],
    ) -> Result<usize, InventoryError> {
        self.upsert_at(hostname, ip, vendor, entries, Utc::now())
    }

    /// Upsert a host's entries in one transaction.
    ///
    /// The first failing row aborts the host and rolls back the rows already
    /// written for it in this call.
    pub fn upsert_at(
        &self,
        hostname: &str,
        ip: &str,
        vendor: Vendor,
        entries: &[MacPortEntry],
        now: DateTime<Utc>,
    ) -> Result<usize, InventoryError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let stamp = now.to_rfc3339();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT)?;
            for entry in entries {
                let mac = entry.mac.to_string();
                stmt.execute(params![hostname, ip, vendor.as_str(), mac, entry.port, stamp])
                    .map_err(|source| InventoryError::WriteFailed {
                        host: hostname.to_string(),
                        mac: mac.clone(),
                        port: entry.port.clone(),
                        source,
                    })?;
            }
        }
        tx.commit()?;

        debug!(host = %hostname, rows = entries.len(), "Inventory upserted");
        Ok(entries.len())
    }

    /// All sightings of a MAC, ordered by switch then port
    pub fn find_by_mac(&self, mac: &MacAddress) -> Result<Vec<InventoryRecord>, InventoryError> {
        self.query(
            &format!(
                "{} WHERE mac_address = ?1 ORDER BY switch_name, port_name",
                SELECT_COLUMNS
            ),
            &mac.to_string(),
        )
    }

    /// Everything recorded for one switch, ordered by port then MAC
    pub fn records_for_switch(
        &self,
        switch_name: &str,
    ) -> Result<Vec<InventoryRecord>, InventoryError> {
        self.query(
            &format!(
                "{} WHERE switch_name = ?1 ORDER BY port_name, mac_address",
                SELECT_COLUMNS
            ),
            switch_name,
        )
    }

    /// Total number of rows
    pub fn count(&self) -> Result<usize, InventoryError> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM network_inventory", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query(&self, sql: &str, param: &str) -> Result<Vec<InventoryRecord>, InventoryError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;

        let rows = stmt
            .query_map(params![param], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(switch_name, switch_ip, vendor, mac_address, port_name, created, updated)| {
                    Ok(InventoryRecord {
                        switch_name,
                        switch_ip,
                        vendor,
                        mac_address,
                        port_name,
                        created_at: parse_timestamp(&created)?,
                        updated_at: parse_timestamp(&updated)?,
                    })
                },
            )
            .collect()
    }
}

/// SQLite `CURRENT_TIMESTAMP` format, UTC without offset
const SQLITE_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// RFC 3339 as written by this store, or the SQLite default format found in
/// tables created by older tooling
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, InventoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(s, SQLITE_TIMESTAMP).map(|dt| dt.and_utc()))
        .map_err(|_| InventoryError::Timestamp(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn entry(mac: &str, port: &str) -> MacPortEntry {
        MacPortEntry::new(mac.parse().unwrap(), port)
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 10, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let store = InventoryStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store.ensure_schema().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_upsert_twice_only_refreshes_updated_at() {
        let store = InventoryStore::open_in_memory().unwrap();
        let entries = [entry("00:14:29:30:37:02", "Gi0/5")];

        store
            .upsert_at("sw1", "10.0.0.1", Vendor::Cisco, &entries, at(8))
            .unwrap();
        store
            .upsert_at("sw1", "10.0.0.1", Vendor::Cisco, &entries, at(9))
            .unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let rows = store.records_for_switch("sw1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].created_at, at(8));
        assert_eq!(rows[0].updated_at, at(9));
    }

    #[test]
    fn test_conflict_keeps_first_ip_and_vendor() {
        let store = InventoryStore::open_in_memory().unwrap();
        let entries = [entry("00:14:29:30:37:02", "Gi0/5")];

        store
            .upsert_at("sw1", "10.0.0.1", Vendor::Cisco, &entries, at(8))
            .unwrap();
        store
            .upsert_at("sw1", "10.0.0.99", Vendor::Aruba, &entries, at(9))
            .unwrap();

        let rows = store.records_for_switch("sw1").unwrap();
        assert_eq!(rows[0].switch_ip, "10.0.0.1");
        assert_eq!(rows[0].vendor, "Cisco");
    }

    #[test]
    fn test_same_mac_on_new_port_is_new_row() {
        let store = InventoryStore::open_in_memory().unwrap();
        let on = |port| [entry("00:14:29:30:37:02", port)];
        store.upsert_at("sw1", "10.0.0.1", Vendor::Cisco, &on("Gi0/5"), at(8)).unwrap();
        store.upsert_at("sw1", "10.0.0.1", Vendor::Cisco, &on("Gi0/6"), at(9)).unwrap();
        store.upsert_at("sw2", "10.0.0.2", Vendor::Aruba, &on("1/1/3"), at(9)).unwrap();

        assert_eq!(store.count().unwrap(), 3);
        let mac: MacAddress = "00:14:29:30:37:02".parse().unwrap();
        let found = store.find_by_mac(&mac).unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].switch_name, "sw1");
        assert_eq!(found[0].port_name, "Gi0/5");
        assert_eq!(found[2].switch_name, "sw2");
    }

    #[test]
    fn test_empty_upsert_is_noop() {
        let store = InventoryStore::open_in_memory().unwrap();
        assert_eq!(store.upsert("sw1", "10.0.0.1", Vendor::Cisco, &[]).unwrap(), 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_write_failure_is_reported_and_rolled_back() {
        let store = InventoryStore::open_in_memory().unwrap();
        store
            .conn
            .lock()
            .execute_batch("DROP TABLE network_inventory")
            .unwrap();

        let err = store
            .upsert("sw1", "10.0.0.1", Vendor::Cisco, &[entry("00:14:29:30:37:02", "Gi0/5")])
            .unwrap_err();
        // Preparing the statement fails before any row is attempted
        assert!(matches!(err, InventoryError::Sqlite(_)));

        store.ensure_schema().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_row_failure_aborts_host() {
        let store = InventoryStore::open_in_memory().unwrap();
        store
            .conn
            .lock()
            .execute_batch(
                "CREATE TRIGGER reject_po BEFORE INSERT ON network_inventory
                 WHEN NEW.port_name LIKE 'Po%'
                 BEGIN SELECT RAISE(ABORT, 'port-channel rejected'); END;",
            )
            .unwrap();

        let entries = [
            entry("00:00:00:00:00:01", "Gi0/1"),
            entry("00:00:00:00:00:02", "Po1"),
            entry("00:00:00:00:00:03", "Gi0/3"),
        ];
        let err = store
            .upsert("sw1", "10.0.0.1", Vendor::Cisco, &entries)
            .unwrap_err();

        match err {
            InventoryError::WriteFailed { host, port, .. } => {
                assert_eq!(host, "sw1");
                assert_eq!(port, "Po1");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_reads_sqlite_default_timestamps() {
        let store = InventoryStore::open_in_memory().unwrap();
        store
            .conn
            .lock()
            .execute_batch(
                "INSERT INTO network_inventory
                 (switch_name, switch_ip, vendor, mac_address, port_name, created_at, updated_at)
                 VALUES ('sw1', '10.0.0.1', 'Cisco', '00:14:29:30:37:02', 'Gi0/5',
                         '2025-03-01 10:00:00', '2025-03-02 11:30:00')",
            )
            .unwrap();

        let mac: MacAddress = "00:14:29:30:37:02".parse().unwrap();
        let rows = store.find_by_mac(&mac).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].created_at, Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
        assert_eq!(rows[0].updated_at, Utc.with_ymd_and_hms(2025, 3, 2, 11, 30, 0).unwrap());

        let entries = [entry("00:14:29:30:37:02", "Gi0/5")];
        store
            .upsert_at("sw1", "10.0.0.1", Vendor::Cisco, &entries, at(9))
            .unwrap();
        let rows = store.find_by_mac(&mac).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].created_at, Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
        assert_eq!(rows[0].updated_at, at(9));
    }

    #[test]
    fn test_rejects_unparsable_timestamp() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(InventoryError::Timestamp(_))
        ));
    }

    #[test]
    fn test_on_disk_store_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("network_inventory.db");

        {
            let store = InventoryStore::open(&path).unwrap();
            store
                .upsert("sw1", "10.0.0.1", Vendor::ProCurve, &[entry("aa:bb:cc:dd:ee:ff", "A1")])
                .unwrap();
        }

        let reopened = InventoryStore::open(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        let rows = reopened.records_for_switch("sw1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mac_address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(rows[0].vendor, "ProCurve");
    }
}
