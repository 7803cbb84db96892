//! macport Discovery - Run orchestration
//!
//! Lists the switches of a directory group, rejects the ones that cannot be
//! polled, walks the rest over SNMP and either upserts the correlated
//! entries into the inventory or hands them back for printing.

pub mod runner;

pub use runner::{
    classify, DiscoveryError, DiscoveryRunner, HostOutcome, HostReport, RunMode, RunSummary,
    RunnerConfig,
};
