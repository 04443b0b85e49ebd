//! Probe server entry point.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use probes::api::ProbeClient;
use probes::config::Config;
use probes::server::ProbeServer;
use probes::ServerError;
use probes::utils::shutdown_signal;
use probes::Probes;

/// Subject tracking the probe server's own listener.
const SERVER_SUBJECT: &str = "probe-server";

/// Startup, readiness and health probe server.
#[derive(Parser, Debug)]
#[command(name = "probes")]
#[command(about = "Serve startup, readiness and health probes over HTTP")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// Listen address (overrides PROBES_ADDR).
    #[arg(short, long)]
    addr: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the probe server (default).
    Run {
        /// Listen address (overrides PROBES_ADDR).
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Poll a probe URL; exit status 0 when it answers 2xx.
    Probe {
        /// Probe URL, e.g. http://127.0.0.1:8080/readyz.
        #[arg(long)]
        url: String,

        /// Request timeout in milliseconds.
        #[arg(long, default_value = "1000")]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("probes=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Probe { url, timeout_ms }) => cmd_probe(&url, timeout_ms).await,
        Some(Command::Run { addr }) => cmd_run(addr.or(args.addr)).await,
        None => cmd_run(args.addr).await,
    }
}

/// Load configuration, applying CLI overrides, and validate it.
fn load_config(addr_override: Option<String>) -> anyhow::Result<Config> {
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Some(addr) = addr_override {
        config.addr = addr;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("PROBES - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    let fmt_default = |value: Option<bool>, fallback: bool| match value {
        Some(v) => v.to_string(),
        None => format!("{} (built-in)", fallback),
    };

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Listen Address: {}", config.addr);
    println!("  Health Path: {}", config.health_path);
    println!("  Ready Path: {}", config.ready_path);
    println!("  Startup Path: {}", config.startup_path);
    println!("  Shutdown Timeout: {}s", config.shutdown_timeout_secs);
    println!("  Default Startup: {}", fmt_default(config.default_startup, false));
    println!("  Default Ready: {}", fmt_default(config.default_ready, false));
    println!("  Default Healthy: {}", fmt_default(config.default_healthy, true));
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Poll a single probe URL.
async fn cmd_probe(url: &str, timeout_ms: u64) -> anyhow::Result<()> {
    let client = ProbeClient::new(Duration::from_millis(timeout_ms))?;

    if client.check(url).await? {
        info!("Probe {} passed", url);
        Ok(())
    } else {
        Err(anyhow::anyhow!("Probe {} failed", url))
    }
}

/// Run the probe server until SIGINT/SIGTERM or until serving fails.
async fn cmd_run(addr_override: Option<String>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = load_config(addr_override)?;
    info!("Configuration loaded successfully");

    let probes = Arc::new(Probes::new(config.probe_opts()));
    probes
        .declare_startups([SERVER_SUBJECT])
        .declare_readies([SERVER_SUBJECT]);

    let opts = config.server_opts(Arc::clone(&probes))?;
    let server = Arc::new(ProbeServer::new(opts)?);

    let listener = server.bind().await?;
    info!("Probe server bound to {}", server.addr());
    probes.mark_started(SERVER_SUBJECT)?;
    probes.mark_ready(SERVER_SUBJECT)?;

    let running = Arc::clone(&server);
    let mut server_handle = tokio::spawn(async move { running.serve(listener).await });

    wait_for_stop(&mut server_handle, shutdown_signal()).await?;

    // Stop receiving traffic before the listener goes away.
    probes.mark_not_ready(SERVER_SUBJECT)?;

    let deadline = config.shutdown_timeout();
    if let Err(e) = server.shutdown(deadline).await {
        warn!("Graceful shutdown incomplete: {}", e);
        server_handle.abort();
        return Err(e.into());
    }

    server_handle.await??;
    info!("Shutdown complete");
    Ok(())
}

/// Wait for `signal` while watching the serve task.
///
/// Returns an error as soon as the task exits on its own, since nothing is
/// listening behind the probes any more.
async fn wait_for_stop<F>(
    server_handle: &mut JoinHandle<Result<(), ServerError>>,
    signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = signal => Ok(()),
        joined = server_handle => {
            joined??;
            Err(anyhow::anyhow!("Probe server stopped without a shutdown request"))
        }
    }
}
