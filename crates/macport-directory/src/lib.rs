//! macport Directory - Monitoring-system directory client
//!
//! Lists monitored switches of a host group over the directory's JSON-RPC
//! API, classifies their vendor from attached templates and resolves
//! `{$MACRO}` community placeholders.

pub mod client;
pub mod rpc;

pub use client::{
    host_from_record, DirectoryClient, DirectoryConfig, DirectoryError, HostDirectory,
    DEFAULT_TIMEOUT_SECS,
};
