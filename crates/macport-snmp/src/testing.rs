//! In-memory switches for exercising the poller without a network

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::session::{parse_oid, SessionFactory, SnmpError, SnmpSession, SnmpTarget, WalkEntry};
use crate::value::SnmpValue;

/// Canned tables for one switch
#[derive(Debug, Clone, Default)]
pub struct FakeSwitch {
    rows: Vec<WalkEntry>,
    failing: HashSet<String>,
}

impl FakeSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row; rows are returned in insertion order. Unparsable OIDs are ignored.
    pub fn with_row(mut self, oid: &str, value: impl Into<SnmpValue>) -> Self {
        if let Some(entry) = WalkEntry::parse(oid, value) {
            self.rows.push(entry);
        }
        self
    }

    /// Make every walk of `root` fail
    pub fn failing(mut self, root: &str) -> Self {
        self.failing.insert(root.to_string());
        self
    }
}

/// Session factory backed by [`FakeSwitch`]es keyed by IP.
///
/// Opening an unknown IP fails as unreachable. Every open and walk is counted.
#[derive(Debug, Default)]
pub struct FakeSessionFactory {
    switches: HashMap<String, FakeSwitch>,
    log: Arc<Mutex<CallLog>>,
}

#[derive(Debug, Default)]
struct CallLog {
    opened: Vec<SnmpTarget>,
    walked: Vec<String>,
}

impl FakeSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_switch(mut self, ip: &str, switch: FakeSwitch) -> Self {
        self.switches.insert(ip.to_string(), switch);
        self
    }

    /// Number of open attempts, successful or not
    pub fn open_count(&self) -> usize {
        self.log.lock().opened.len()
    }

    /// Targets passed to `open`, in call order
    pub fn opened(&self) -> Vec<SnmpTarget> {
        self.log.lock().opened.clone()
    }

    /// Roots walked across all sessions, in call order
    pub fn walked_roots(&self) -> Vec<String> {
        self.log.lock().walked.clone()
    }
}

#[async_trait]
impl SessionFactory for FakeSessionFactory {
    async fn open(&self, target: &SnmpTarget) -> Result<Box<dyn SnmpSession>, SnmpError> {
        self.log.lock().opened.push(target.clone());

        let switch = self
            .switches
            .get(&target.ip)
            .cloned()
            .ok_or_else(|| SnmpError::Unreachable {
                target: target.ip.clone(),
                reason: "request timed out".to_string(),
            })?;

        Ok(Box::new(FakeSession {
            switch,
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeSession {
    switch: FakeSwitch,
    log: Arc<Mutex<CallLog>>,
}

#[async_trait]
impl SnmpSession for FakeSession {
    async fn bulk_walk(&self, root: &str) -> Result<Vec<WalkEntry>, SnmpError> {
        self.log.lock().walked.push(root.to_string());

        if self.switch.failing.contains(root) {
            return Err(SnmpError::Walk {
                oid: root.to_string(),
                reason: "request timed out".to_string(),
            });
        }

        let prefix = parse_oid(root).ok_or_else(|| SnmpError::Walk {
            oid: root.to_string(),
            reason: "invalid OID".to_string(),
        })?;

        Ok(self
            .switch
            .rows
            .iter()
            .filter(|entry| entry.oid.len() > prefix.len() && entry.oid.starts_with(&prefix))
            .cloned()
            .collect())
    }
}
