//! Per-host skip and failure reporting

use parking_lot::Mutex;
use serde::Serialize;

/// Why a host contributed nothing (or only part of its data) to a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Community is empty, or a secret macro could not be resolved
    EmptyCommunity,
    /// No attached template maps to a known vendor
    UnknownVendor,
    /// Switch did not answer SNMP
    SnmpUnreachable(String),
    /// Inventory upsert failed part way through the host
    StorageWriteFailed(String),
    /// The host's discovery task died before producing an outcome
    TaskFailed(String),
}

impl SkipReason {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::EmptyCommunity => "empty_community",
            SkipReason::UnknownVendor => "unknown_vendor",
            SkipReason::SnmpUnreachable(_) => "snmp_unreachable",
            SkipReason::StorageWriteFailed(_) => "storage_write_failed",
            SkipReason::TaskFailed(_) => "task_failed",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptyCommunity => f.write_str(
                "community is empty, its either using not compliant snmp v1/v2 or there are another problems like invalid macros",
            ),
            SkipReason::UnknownVendor => f.write_str(
                "vendor is unknown, cannot validate it, assign valid templates to the host",
            ),
            SkipReason::SnmpUnreachable(detail) => write!(f, "snmp unreachable: {}", detail),
            SkipReason::StorageWriteFailed(detail) => {
                write!(f, "inventory write failed: {}", detail)
            }
            SkipReason::TaskFailed(detail) => write!(f, "discovery task failed: {}", detail),
        }
    }
}

/// Sink for (hostname, reason) pairs produced during a run
pub trait FailureReporter: Send + Sync {
    fn report(&self, hostname: &str, reason: &SkipReason);
}

/// Keeps every report in memory; used by tests
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(String, SkipReason)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(String, SkipReason)> {
        self.reports.lock().clone()
    }

    pub fn reasons_for(&self, hostname: &str) -> Vec<SkipReason> {
        self.reports
            .lock()
            .iter()
            .filter(|(h, _)| h == hostname)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

impl FailureReporter for RecordingReporter {
    fn report(&self, hostname: &str, reason: &SkipReason) {
        self.reports.lock().push((hostname.to_string(), reason.clone()));
    }
}
