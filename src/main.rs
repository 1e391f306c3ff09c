//! Launch Bundler CLI
//!
//! - `plan`: validate a launch request and print the sniper allocation table
//! - `status`: poll a submitted bundle until it settles
//! - `simulate` (feature `mock-mode`): run a whole launch against in-memory
//!   collaborators and print the report

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use launch_bundler::config::LauncherConfig;
use launch_bundler::ledger::RpcLedger;
use launch_bundler::metrics::LaunchMetrics;
use launch_bundler::monitor::{
    BundleResolution, CancelToken, ConfirmationMonitor, MonitorSettings, RecordStore,
    TransactionRecord, TxKind,
};
use launch_bundler::relay::JitoRelay;
use launch_bundler::request::{allocate, LaunchRequestDraft};
use launch_bundler::structured_logging::LaunchLogger;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "launcher.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a launch request and print its sniper allocation
    Plan {
        #[arg(short, long)]
        request: String,
    },
    /// Poll a submitted bundle until it lands, fails or times out
    Status {
        #[arg(short, long)]
        bundle_id: String,
    },
    /// Run a launch against in-memory collaborators
    #[cfg(feature = "mock-mode")]
    Simulate {
        #[arg(short, long)]
        request: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json_logs)?;

    info!("Launch bundler {}", env!("CARGO_PKG_VERSION"));
    let config = load_config(&args.config)?;

    match args.command {
        Command::Plan { request } => plan(&config, &request),
        Command::Status { bundle_id } => status(&config, &bundle_id).await,
        #[cfg(feature = "mock-mode")]
        Command::Simulate { request } => simulate(&config, &request).await,
    }
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "launch_bundler=debug,info"
    } else {
        "launch_bundler=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }
    Ok(())
}

/// Load the config file, or defaults when it does not exist
fn load_config(path: &str) -> Result<LauncherConfig> {
    if std::path::Path::new(path).exists() {
        LauncherConfig::from_file_with_env(path)
    } else {
        info!("No config at {}, using defaults", path);
        let config = LauncherConfig::default();
        config.validate()?;
        Ok(config)
    }
}

fn load_request(path: &str) -> Result<LaunchRequestDraft> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {}", path))?;
    toml::from_str(&content).with_context(|| format!("Invalid request file: {}", path))
}

fn plan(config: &LauncherConfig, request_path: &str) -> Result<()> {
    let request = load_request(request_path)?.validate_with(&config.launch)?;
    let allocations = allocate(
        request.total_sniper_sol(),
        request.distribution(),
        request.sniper_signers(),
    )?;

    println!(
        "mint {}  liquidity {} tokens / {} SOL  slippage {}%  relay {}",
        request.token_mint(),
        request.token_amount(),
        request.sol_amount(),
        request.slippage_pct(),
        request.use_relay()
    );
    println!("{:>3}  {:>6}  {:>12}  wallet", "#", "%", "SOL");
    for a in &allocations {
        println!(
            "{:>3}  {:>6.1}  {:>12.9}  {}{}",
            a.index,
            a.percentage,
            a.sol_amount,
            a.signer.pubkey(),
            if a.signer.is_generated() { " (new)" } else { "" }
        );
    }
    Ok(())
}

async fn status(config: &LauncherConfig, bundle_id: &str) -> Result<()> {
    let relay = Arc::new(JitoRelay::new(&config.relay)?);
    let ledger = Arc::new(RpcLedger::new(&config.ledger)?);
    let store = Arc::new(RecordStore::new());
    let key = format!("{}:bundle", bundle_id);
    store.insert(TransactionRecord::pending(key.clone(), TxKind::Pool, None));

    let monitor = ConfirmationMonitor::new(
        relay,
        ledger,
        store.clone(),
        MonitorSettings::from_config(&config.monitor),
        Arc::new(LaunchMetrics::new()?),
        LaunchLogger::detached(bundle_id, "status"),
    );

    let cancel = CancelToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let resolution = monitor.watch_bundle(bundle_id, &[key], &cancel).await;
    match resolution {
        BundleResolution::Landed {
            slot,
            relay_signatures,
            ..
        } => {
            println!("landed (slot {:?})", slot);
            for (i, sig) in relay_signatures.iter().enumerate() {
                println!("  {}: {}", i, sig);
            }
        }
        BundleResolution::Rejected { status } => println!("failed ({})", status),
        BundleResolution::TimedOut { attempts } => {
            println!("failed (no terminal status after {} polls)", attempts)
        }
        BundleResolution::Cancelled => println!("cancelled"),
    }
    Ok(())
}

#[cfg(feature = "mock-mode")]
async fn simulate(config: &LauncherConfig, request_path: &str) -> Result<()> {
    use launch_bundler::orchestrator::{LaunchOrchestrator, LaunchSettings};
    use launch_bundler::test_utils::MockEnvironment;

    let mut draft = load_request(request_path)?;
    let amount: f64 = draft.token_amount.trim().parse().unwrap_or(0.0);
    let env = MockEnvironment::new(amount * 2.0).await;
    draft.token_mint = env.mint.to_string();

    let mut settings = LaunchSettings::from_config(config)?;
    settings.token_program = env.token_program;
    let orchestrator = LaunchOrchestrator::new(env.services(), settings)?;
    let report = orchestrator.launch_draft(draft, CancelToken::new()).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
