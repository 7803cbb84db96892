//! Directory client: host listing and secret macro resolution

use async_trait::async_trait;
use macport_core::{is_macro_placeholder, Host, VendorMap};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::rpc::{
    find_macro, HostGetParams, HostRecord, MacroGetParams, RpcRequest, RpcResponse, UserMacro,
    JSONRPC_VERSION,
};

/// Default HTTP timeout for directory calls
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("directory returned error {code}: {message}{}", .data.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },
    #[error("malformed directory response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("macro not found: {0}")]
    MacroNotFound(String),
}

impl DirectoryError {
    /// Everything except an unresolved macro means the directory cannot be trusted for this run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DirectoryError::MacroNotFound(_))
    }
}

/// Connection settings for the directory API
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// JSON-RPC endpoint, e.g. `https://zabbix.example.net/api_jsonrpc.php`
    pub url: String,
    /// API token sent in the envelope `auth` field
    pub token: String,
    pub timeout: Duration,
}

impl DirectoryConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Source of monitored switches
#[async_trait]
pub trait HostDirectory: Send + Sync {
    /// List the hosts of a group with credentials resolved and vendor classified.
    /// Hosts without an SNMP interface are left out.
    async fn list_hosts(&self, group_id: u64) -> Result<Vec<Host>, DirectoryError>;

    /// Resolve a `{$MACRO}` placeholder visible to `host_id`
    async fn resolve_macro(
        &self,
        host_id: &str,
        macro_name: &str,
    ) -> Result<String, DirectoryError>;
}

/// JSON-RPC directory client
pub struct DirectoryClient {
    client: reqwest::Client,
    config: DirectoryConfig,
    vendors: VendorMap,
    next_id: AtomicU64,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig, vendors: VendorMap) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            vendors,
            next_id: AtomicU64::new(1),
        })
    }

    /// Perform one JSON-RPC call and unwrap the envelope
    async fn call<P, T>(&self, method: &str, params: P) -> Result<T, DirectoryError>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            auth: Some(self.config.token.as_str()).filter(|t| !t.is_empty()),
            id,
        };

        debug!(method = %method, id = id, url = %self.config.url, "Directory request");

        let response = self
            .client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Unavailable(format!(
                "{} returned HTTP {}",
                method, status
            )));
        }

        let body = response.bytes().await?;
        let envelope: RpcResponse<T> = serde_json::from_slice(&body)?;

        if let Some(err) = envelope.error {
            return Err(DirectoryError::Rpc {
                code: err.code,
                message: err.message,
                data: err.data,
            });
        }

        envelope.result.ok_or_else(|| {
            DirectoryError::Unavailable(format!("{} response has no result", method))
        })
    }
}

#[async_trait]
impl HostDirectory for DirectoryClient {
    async fn list_hosts(&self, group_id: u64) -> Result<Vec<Host>, DirectoryError> {
        let records: Vec<HostRecord> = self
            .call("host.get", HostGetParams::for_group(group_id))
            .await?;

        info!(group = group_id, count = records.len(), "Directory returned hosts");

        let mut hosts = Vec::with_capacity(records.len());
        for record in &records {
            let Some(mut host) = host_from_record(record, &self.vendors) else {
                debug!(host = %record.host, "No SNMP interface, dropping host");
                continue;
            };

            if is_macro_placeholder(&host.community) {
                match self.resolve_macro(&host.host_id, &host.community).await {
                    Ok(value) if !value.is_empty() => host.community = value,
                    Ok(_) => {
                        warn!(
                            host = %host.hostname,
                            community = %host.community,
                            "Macro resolved to an empty value"
                        );
                    }
                    Err(DirectoryError::MacroNotFound(name)) => {
                        warn!(
                            host = %host.hostname,
                            community = %name,
                            "Community macro not found"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }

            hosts.push(host);
        }

        Ok(hosts)
    }

    async fn resolve_macro(
        &self,
        host_id: &str,
        macro_name: &str,
    ) -> Result<String, DirectoryError> {
        let macros: Vec<UserMacro> = self
            .call("usermacro.get", MacroGetParams::for_host(host_id))
            .await?;

        find_macro(&macros, macro_name)
            .map(|m| m.value.clone())
            .ok_or_else(|| DirectoryError::MacroNotFound(macro_name.to_string()))
    }
}

/// Build a [`Host`] from one `host.get` record, community left unresolved.
/// `None` if the record has no SNMP interface.
pub fn host_from_record(record: &HostRecord, vendors: &VendorMap) -> Option<Host> {
    let iface = record.snmp_interface()?;
    let vendor = vendors.classify(&record.host, record.template_ids());

    Some(Host::new(
        record.host.clone(),
        record.hostid.clone(),
        iface.ip.clone(),
        iface.community(),
        vendor,
    ))
}
