//! Discovery run: list hosts, classify, poll, persist or report

use macport_core::{
    FailureReporter, Host, InventoryError, InventoryStore, MacPortEntry, SkipReason, Vendor,
};
use macport_directory::{DirectoryError, HostDirectory};
use macport_snmp::{Correlator, SnmpError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("host listing failed: {0}")]
    Directory(#[from] DirectoryError),
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,
}

/// What to do with correlated entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Poll every host and upsert into the inventory
    Persist,
    /// Poll only the named host and hand the entries back without writing
    Report { host: String },
}

impl RunMode {
    pub fn is_persist(&self) -> bool {
        matches!(self, RunMode::Persist)
    }
}

/// Runner settings
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory host group to discover
    pub group_id: u64,
    /// Maximum hosts polled at once; 1 polls sequentially
    pub concurrency: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            group_id: 0,
            concurrency: 1,
        }
    }
}

/// Final state of one host in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOutcome {
    /// Rejected before any network call
    Skipped(SkipReason),
    /// Switch did not answer; nothing recorded
    Unreachable(String),
    /// Entries written to the inventory
    Persisted { entries: usize },
    /// Entries correlated in report mode, not written
    Reported(Vec<MacPortEntry>),
    /// Upsert aborted; the host's rows for this run were rolled back
    StorageFailed(String),
    /// The host's task panicked or was cancelled
    TaskFailed(String),
}

/// One host's result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostReport {
    pub hostname: String,
    pub ip: String,
    pub vendor: Vendor,
    pub outcome: HostOutcome,
}

/// Results of a run, in directory order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub hosts: Vec<HostReport>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.hosts.len()
    }

    pub fn persisted(&self) -> usize {
        self.count(|o| matches!(o, HostOutcome::Persisted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, HostOutcome::Skipped(_)))
    }

    /// Hosts that were polled but produced nothing usable
    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                HostOutcome::Unreachable(_)
                    | HostOutcome::StorageFailed(_)
                    | HostOutcome::TaskFailed(_)
            )
        })
    }

    /// Entries upserted across all hosts
    pub fn entries_written(&self) -> usize {
        self.hosts
            .iter()
            .map(|h| match h.outcome {
                HostOutcome::Persisted { entries } => entries,
                _ => 0,
            })
            .sum()
    }

    /// The report for one host, if it took part in the run
    pub fn host(&self, hostname: &str) -> Option<&HostReport> {
        self.hosts.iter().find(|h| h.hostname == hostname)
    }

    fn count(&self, pred: impl Fn(&HostOutcome) -> bool) -> usize {
        self.hosts.iter().filter(|h| pred(&h.outcome)).count()
    }
}

/// Pre-poll classification. Community is checked before vendor.
pub fn classify(host: &Host) -> Result<(), SkipReason> {
    if !host.has_usable_community() {
        return Err(SkipReason::EmptyCommunity);
    }
    if !host.vendor.is_known() {
        return Err(SkipReason::UnknownVendor);
    }
    Ok(())
}

/// Drives one discovery run
pub struct DiscoveryRunner {
    directory: Arc<dyn HostDirectory>,
    correlator: Correlator,
    store: Arc<InventoryStore>,
    reporter: Arc<dyn FailureReporter>,
    config: RunnerConfig,
}

impl DiscoveryRunner {
    pub fn new(
        directory: Arc<dyn HostDirectory>,
        correlator: Correlator,
        store: Arc<InventoryStore>,
        reporter: Arc<dyn FailureReporter>,
        config: RunnerConfig,
    ) -> Result<Self, DiscoveryError> {
        if config.concurrency == 0 {
            return Err(DiscoveryError::InvalidConcurrency);
        }
        Ok(Self {
            directory,
            correlator,
            store,
            reporter,
            config,
        })
    }

    /// Run once. Only a directory failure aborts the run; every per-host
    /// failure is reported and recorded in the summary.
    pub async fn run(&self, mode: &RunMode) -> Result<RunSummary, DiscoveryError> {
        let mut hosts = self.directory.list_hosts(self.config.group_id).await?;

        if let RunMode::Report { host } = mode {
            hosts.retain(|h| &h.hostname == host);
            if hosts.is_empty() {
                info!(host = %host, "No host with that name in the group, nothing to do");
                return Ok(RunSummary::default());
            }
        }

        info!(
            hosts = hosts.len(),
            concurrency = self.config.concurrency,
            persist = mode.is_persist(),
            "Starting discovery run"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();
        // Task id -> (directory position, host)
        let mut pending = HashMap::new();

        for (order, host) in hosts.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let correlator = self.correlator.clone();
            let store = Arc::clone(&self.store);
            let reporter = Arc::clone(&self.reporter);
            let persist = mode.is_persist();
            let task_host = host.clone();

            let handle = tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let reporter = reporter.as_ref();
                process_host(&task_host, &correlator, &store, reporter, persist).await
            });
            pending.insert(handle.id(), (order, host));
        }

        let mut reports = Vec::new();
        while let Some(result) = tasks.join_next_with_id().await {
            let (id, outcome) =
                result.unwrap_or_else(|e| (e.id(), self.task_failed(&pending, &e)));
            if let Some((order, host)) = pending.remove(&id) {
                reports.push((
                    order,
                    HostReport {
                        hostname: host.hostname,
                        ip: host.ip,
                        vendor: host.vendor,
                        outcome,
                    },
                ));
            }
        }
        reports.sort_by_key(|(order, _)| *order);

        let summary = RunSummary {
            hosts: reports.into_iter().map(|(_, report)| report).collect(),
        };

        info!(
            total = summary.total(),
            persisted = summary.persisted(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            entries = summary.entries_written(),
            "Discovery run complete"
        );

        Ok(summary)
    }

    fn task_failed(
        &self,
        pending: &HashMap<tokio::task::Id, (usize, Host)>,
        e: &JoinError,
    ) -> HostOutcome {
        let detail = if e.is_panic() {
            "panicked".to_string()
        } else {
            e.to_string()
        };
        match pending.get(&e.id()) {
            Some((_, host)) => {
                error!(host = %host.hostname, error = %detail, "Host task failed");
                self.reporter.report(&host.hostname, &SkipReason::TaskFailed(detail.clone()));
            }
            None => error!(error = %detail, "Untracked host task failed"),
        }
        HostOutcome::TaskFailed(detail)
    }
}

async fn process_host(
    host: &Host,
    correlator: &Correlator,
    store: &Arc<InventoryStore>,
    reporter: &dyn FailureReporter,
    persist: bool,
) -> HostOutcome {
    if let Err(reason) = classify(host) {
        debug!(host = %host.hostname, code = reason.code(), "Skipping host");
        reporter.report(&host.hostname, &reason);
        return HostOutcome::Skipped(reason);
    }

    let entries = match correlator.poll(&host.ip, &host.community, host.vendor).await {
        Ok(entries) => entries,
        Err(SnmpError::UnsupportedVendor(_)) => {
            let reason = SkipReason::UnknownVendor;
            reporter.report(&host.hostname, &reason);
            return HostOutcome::Skipped(reason);
        }
        Err(e) => {
            let detail = e.to_string();
            reporter.report(&host.hostname, &SkipReason::SnmpUnreachable(detail.clone()));
            return HostOutcome::Unreachable(detail);
        }
    };

    if !persist {
        info!(host = %host.hostname, entries = entries.len(), "Host polled (report only)");
        return HostOutcome::Reported(entries);
    }

    match upsert_blocking(store, host, entries).await {
        Ok(written) => {
            info!(
                host = %host.hostname,
                ip = %host.ip,
                vendor = %host.vendor,
                entries = written,
                "Host persisted"
            );
            HostOutcome::Persisted { entries: written }
        }
        Err(e) => {
            let detail = e.to_string();
            warn!(host = %host.hostname, error = %detail, "Inventory write failed");
            reporter.report(&host.hostname, &SkipReason::StorageWriteFailed(detail.clone()));
            HostOutcome::StorageFailed(detail)
        }
    }
}

/// SQLite calls block, so the upsert runs off the async workers
async fn upsert_blocking(
    store: &Arc<InventoryStore>,
    host: &Host,
    entries: Vec<MacPortEntry>,
) -> Result<usize, String> {
    let store = Arc::clone(store);
    let hostname = host.hostname.clone();
    let ip = host.ip.clone();
    let vendor = host.vendor;

    tokio::task::spawn_blocking(move || store.upsert(&hostname, &ip, vendor, &entries))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e: InventoryError| e.to_string())
}
