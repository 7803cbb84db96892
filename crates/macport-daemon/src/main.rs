//! macport - Switch MAC-to-port inventory
//!
//! Runs discovery against the switches listed by the monitoring directory,
//! searches the resulting inventory, and serves the search API.

mod api;
mod config;
mod failure_log;
mod search;
mod server;
mod state;

use anyhow::{bail, Context, Result};
use clap::Parser;
use macport_core::InventoryStore;
use macport_directory::DirectoryClient;
use macport_discovery::{DiscoveryRunner, HostOutcome, RunMode, RunSummary};
use macport_snmp::Correlator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::failure_log::FailureLog;
use crate::search::SearchError;

#[derive(Parser, Debug)]
#[command(name = "macport")]
#[command(about = "Switch MAC address to port inventory")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "macport.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Poll a single host and print its entries instead of storing them
    #[arg(long, requires = "host")]
    single: bool,

    /// Host name for --single
    #[arg(long)]
    host: Option<String>,

    /// Look up a MAC address in the inventory
    #[arg(long, conflicts_with_all = ["single", "serve"])]
    search: Option<String>,

    /// Serve the search API
    #[arg(long, conflicts_with = "single")]
    serve: bool,

    /// Bind address for --serve
    #[arg(short, long, requires = "serve")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("macport v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load_config(&args.config)?;

    let database = config.database_path();
    let store = Arc::new(
        InventoryStore::open(&database)
            .with_context(|| format!("opening inventory {}", database.display()))?,
    );
    if let Some(path) = store.path() {
        info!(path = %path.display(), "Inventory opened");
    }

    if let Some(query) = args.search.as_deref() {
        return print_search(&store, query, &config.search.skip_ports);
    }

    if args.serve {
        let bind = args.bind.unwrap_or_else(|| config.search.bind.clone());
        let state = state::AppState::new(store, config.search.skip_ports.clone());
        return server::run(state, &bind).await;
    }

    let mode = if args.single {
        match args.host {
            Some(host) => RunMode::Report { host },
            None => bail!("--single requires --host"),
        }
    } else {
        RunMode::Persist
    };

    let directory = DirectoryClient::new(config.directory_config(), config.vendor_map()?)?;
    let correlator = Correlator::new(Arc::new(config.session_factory()));
    let reporter = FailureLog::open(&config.fail_log_path())?;
    info!(path = %reporter.path().display(), "Failure log opened");

    let runner = DiscoveryRunner::new(
        Arc::new(directory),
        correlator,
        store,
        Arc::new(reporter),
        config.runner_config(),
    )?;

    let summary = runner.run(&mode).await?;

    if let RunMode::Report { host } = &mode {
        print_report(host, &summary);
    }

    Ok(())
}

fn print_report(host: &str, summary: &RunSummary) {
    let Some(report) = summary.host(host) else {
        println!("Host {} not found in the configured group", host);
        return;
    };

    println!("{} ({}, {}):", report.hostname, report.ip, report.vendor);
    match &report.outcome {
        HostOutcome::Reported(entries) if entries.is_empty() => {
            println!("  no access-port entries");
        }
        HostOutcome::Reported(entries) => {
            for entry in entries {
                println!("  {}", entry);
            }
        }
        HostOutcome::Skipped(reason) => println!("  skipped: {}", reason),
        HostOutcome::Unreachable(detail) => println!("  unreachable: {}", detail),
        other => println!("  {:?}", other),
    }
}

fn print_search(store: &InventoryStore, query: &str, skip_ports: &[String]) -> Result<()> {
    match search::lookup(store, query, skip_ports) {
        Ok(records) => {
            for r in records {
                println!(
                    "{}\t{}\t{}\t{}\t{}\tfirst seen {}\tlast seen {}",
                    r.mac_address,
                    r.switch_name,
                    r.switch_ip,
                    r.port_name,
                    r.vendor,
                    r.created_at.to_rfc3339(),
                    r.updated_at.to_rfc3339()
                );
            }
            Ok(())
        }
        Err(SearchError::NotFound) => {
            println!("{}", SearchError::NotFound);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
