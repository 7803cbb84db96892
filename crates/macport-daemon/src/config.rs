//! Configuration loading and validation

use anyhow::{bail, Context, Result};
use macport_directory::DirectoryConfig;
use macport_discovery::RunnerConfig;
use macport_snmp::V2cSessionFactory;
use macport_core::{Vendor, VendorMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub directory: DirectorySection,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub snmp: SnmpConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub search: SearchConfig,
    /// Directory template id -> vendor tag
    #[serde(default)]
    pub vendors: BTreeMap<String, String>,
    /// Directory of the config file; relative paths resolve against it
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySection {
    /// JSON-RPC endpoint
    pub url: String,
    /// API token sent in the `auth` field
    #[serde(default)]
    pub token: String,
    /// Host group to discover
    pub group_id: u64,
    #[serde(default = "default_directory_timeout")]
    pub timeout_secs: u64,
}

fn default_directory_timeout() -> u64 {
    macport_directory::DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("network_inventory.db")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnmpConfig {
    #[serde(default = "default_snmp_port")]
    pub port: u16,
    /// Per-request timeout; requests are never retried
    #[serde(default = "default_snmp_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_repetitions")]
    pub max_repetitions: u32,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            port: default_snmp_port(),
            timeout_secs: default_snmp_timeout(),
            max_repetitions: default_max_repetitions(),
        }
    }
}

fn default_snmp_port() -> u16 {
    macport_snmp::SNMP_PORT
}

fn default_snmp_timeout() -> u64 {
    macport_snmp::DEFAULT_TIMEOUT_SECS
}

fn default_max_repetitions() -> u32 {
    macport_snmp::DEFAULT_MAX_REPETITIONS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Hosts polled at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Append-only log of skipped and failed hosts
    #[serde(default = "default_fail_log")]
    pub fail_log: PathBuf,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            fail_log: default_fail_log(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_fail_log() -> PathBuf {
    PathBuf::from("fail.log")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Ports whose name contains any of these are hidden from search results
    #[serde(default = "default_skip_ports")]
    pub skip_ports: Vec<String>,
    /// Bind address for the search API
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            skip_ports: default_skip_ports(),
            bind: default_bind(),
        }
    }
}

fn default_skip_ports() -> Vec<String> {
    vec!["Po".to_string(), "Port-Channel".to_string(), "lag".to_string()]
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Config {
    /// Reject values that would only fail later, part way through a run
    pub fn validate(&self) -> Result<()> {
        if self.directory.url.trim().is_empty() {
            bail!("directory.url must not be empty");
        }
        if self.discovery.concurrency == 0 {
            bail!("discovery.concurrency must be at least 1");
        }
        self.vendor_map()?;
        Ok(())
    }

    /// Parse the `[vendors]` table
    pub fn vendor_map(&self) -> Result<VendorMap> {
        let mut map = VendorMap::new();
        for (template_id, tag) in &self.vendors {
            let vendor: Vendor = tag
                .parse()
                .with_context(|| format!("vendors.\"{}\"", template_id))?;
            map.insert(template_id.clone(), vendor);
        }
        Ok(map)
    }

    pub fn directory_config(&self) -> DirectoryConfig {
        DirectoryConfig {
            url: self.directory.url.clone(),
            token: self.directory.token.clone(),
            timeout: Duration::from_secs(self.directory.timeout_secs),
        }
    }

    pub fn session_factory(&self) -> V2cSessionFactory {
        V2cSessionFactory {
            port: self.snmp.port,
            timeout: Duration::from_secs(self.snmp.timeout_secs),
            max_repetitions: self.snmp.max_repetitions,
            ..V2cSessionFactory::default()
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            group_id: self.directory.group_id,
            concurrency: self.discovery.concurrency,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.storage.database)
    }

    pub fn fail_log_path(&self) -> PathBuf {
        self.resolve(&self.discovery.fail_log)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Parse configuration text; relative paths resolve against `base_dir`
pub fn parse_config(content: &str, base_dir: &Path) -> Result<Config> {
    let mut config: Config = toml::from_str(content)?;
    config.base_dir = base_dir.to_path_buf();
    config.validate()?;
    Ok(config)
}

/// Load configuration from file. A missing file is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        bail!("configuration file not found: {}", path.display());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let config = parse_config(&content, base_dir)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;

    info!(path = %path.display(), vendors = config.vendors.len(), "Loaded configuration");
    Ok(config)
}
