//! SNMP sessions: the walking abstraction and its v2c implementation

use async_snmp::{Auth, Client, Oid, Retry, UdpClient, Value};
use async_trait::async_trait;
use macport_core::Vendor;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

use crate::value::SnmpValue;

/// Standard SNMP agent port
pub const SNMP_PORT: u16 = 161;

/// Round-trip timeout for one request; no retries are attempted
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// GETBULK max-repetitions
pub const DEFAULT_MAX_REPETITIONS: u32 = 25;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnmpError {
    #[error("SNMP target {target} unreachable: {reason}")]
    Unreachable { target: String, reason: String },
    #[error("walk of {oid} failed: {reason}")]
    Walk { oid: String, reason: String },
    #[error("no OID mapping for vendor {0}")]
    UnsupportedVendor(Vendor),
}

/// One switch to talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpTarget {
    pub ip: String,
    pub community: String,
}

impl SnmpTarget {
    pub fn new(ip: impl Into<String>, community: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            community: community.into(),
        }
    }
}

/// One (OID, value) pair returned by a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub oid: Vec<u32>,
    pub value: SnmpValue,
}

impl WalkEntry {
    pub fn new(oid: Vec<u32>, value: impl Into<SnmpValue>) -> Self {
        Self {
            oid,
            value: value.into(),
        }
    }

    /// Build from a dotted OID string. `None` if the OID does not parse.
    pub fn parse(oid: &str, value: impl Into<SnmpValue>) -> Option<Self> {
        Some(Self::new(parse_oid(oid)?, value))
    }

    /// Arcs after `root`, or all arcs if the entry is not under `root`
    pub fn suffix(&self, root: &[u32]) -> &[u32] {
        self.oid.strip_prefix(root).unwrap_or(&self.oid)
    }

    /// Last arc, the row index for single-index tables
    pub fn index(&self) -> Option<u32> {
        self.oid.last().copied()
    }
}

/// Parse a dotted OID (`1.3.6.1...`, leading dot allowed)
pub fn parse_oid(oid: &str) -> Option<Vec<u32>> {
    let trimmed = oid.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    trimmed.split('.').map(|arc| arc.parse().ok()).collect()
}

/// An open session to one switch
#[async_trait]
pub trait SnmpSession: Send + Sync {
    /// Walk every entry under `root` with GETBULK
    async fn bulk_walk(&self, root: &str) -> Result<Vec<WalkEntry>, SnmpError>;
}

/// Opens sessions; swapped for a fake in tests
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, target: &SnmpTarget) -> Result<Box<dyn SnmpSession>, SnmpError>;
}

/// SNMP v2c sessions over UDP
#[derive(Debug, Clone)]
pub struct V2cSessionFactory {
    pub port: u16,
    pub timeout: Duration,
    pub max_repetitions: u32,
    /// Retry policy per request; a timed-out switch is given up on immediately
    pub retry: Retry,
}

impl Default for V2cSessionFactory {
    fn default() -> Self {
        Self {
            port: SNMP_PORT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_repetitions: DEFAULT_MAX_REPETITIONS,
            retry: Retry::none(),
        }
    }
}

#[async_trait]
impl SessionFactory for V2cSessionFactory {
    async fn open(&self, target: &SnmpTarget) -> Result<Box<dyn SnmpSession>, SnmpError> {
        let addr = format!("{}:{}", target.ip, self.port);

        let client = Client::builder(addr.clone(), Auth::v2c(target.community.clone()))
            .timeout(self.timeout)
            .retry(self.retry.clone())
            .connect()
            .await
            .map_err(|e| SnmpError::Unreachable {
                target: addr.clone(),
                reason: e.to_string(),
            })?;

        debug!(target = %addr, "SNMP session opened");

        Ok(Box::new(V2cSession {
            client,
            target: addr,
            max_repetitions: self.max_repetitions,
        }))
    }
}

struct V2cSession {
    client: UdpClient,
    target: String,
    max_repetitions: u32,
}

#[async_trait]
impl SnmpSession for V2cSession {
    async fn bulk_walk(&self, root: &str) -> Result<Vec<WalkEntry>, SnmpError> {
        let walk_error = |reason: String| SnmpError::Walk {
            oid: root.to_string(),
            reason,
        };

        let root_oid = Oid::parse(root).map_err(|e| walk_error(e.to_string()))?;
        let mut walk = self.client.bulk_walk(root_oid, self.max_repetitions as _);

        let mut entries = Vec::new();
        while let Some(item) = walk.next().await {
            let varbind = item.map_err(|e| walk_error(e.to_string()))?;
            match from_wire(&varbind.value) {
                Some(value) => entries.push(WalkEntry::new(varbind.oid.arcs().to_vec(), value)),
                None => trace!(
                    target = %self.target,
                    oid = %varbind.oid,
                    "Skipping varbind with non-tabular value"
                ),
            }
        }

        debug!(target = %self.target, root = %root, count = entries.len(), "Walk complete");
        Ok(entries)
    }
}

/// Map a wire value onto the three shapes the correlator understands
fn from_wire(value: &Value) -> Option<SnmpValue> {
    match value {
        Value::Integer(i) => Some(SnmpValue::Integer(i64::from(*i))),
        Value::OctetString(bytes) => Some(SnmpValue::from_octets(bytes)),
        Value::Counter32(n) | Value::Gauge32(n) | Value::TimeTicks(n) => {
            Some(SnmpValue::Integer(i64::from(*n)))
        }
        Value::Counter64(n) => i64::try_from(*n).ok().map(SnmpValue::Integer),
        _ => None,
    }
}
