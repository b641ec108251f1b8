//! Sluice Server Binary
//!
//! Serves `GET /` behind admission control and reports statistics
//! periodically until interrupted.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use sluice_config::{ConfigLoader, LogLevel, SluiceConfig};
use sluice_logging::init_logging;
use sluice_server::Server;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Gate forwarding retries on the shared retry bucket
    #[arg(long)]
    adaptive: bool,

    /// Requests per second accepted before shedding (0 disables)
    #[arg(long, value_name = "COUNT")]
    shed: Option<u64>,

    /// Compute deadline cutoff in milliseconds (0 disables)
    #[arg(long, value_name = "MS")]
    cutoff: Option<u64>,

    /// Upstream request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Requests allowed to wait for a worker slot
    #[arg(long, value_name = "COUNT")]
    queue: Option<usize>,

    /// Requests allowed to run concurrently
    #[arg(long, value_name = "COUNT")]
    thread: Option<usize>,

    /// Listening port
    #[arg(long)]
    port: Option<u16>,

    /// Upstream URL; when set, requests are forwarded instead of computed
    #[arg(long)]
    url: Option<String>,

    /// How long a queued request waits for a worker slot, in milliseconds
    #[arg(long, value_name = "MS")]
    backlog_timeout: Option<u64>,

    /// Stats report interval in milliseconds
    #[arg(long, value_name = "MS")]
    report_interval: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // File, then SLUICE_* environment, then flags
    let mut config = ConfigLoader::new().load(cli.config.as_ref())?;
    apply_cli_overrides(&mut config, &cli)?;
    config.validate_all()?;

    if cli.print_config {
        println!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    init_logging(&config.logging)?;

    let server = Server::new(config).await?;
    server.start().await
}

/// Apply CLI argument overrides to configuration
fn apply_cli_overrides(config: &mut SluiceConfig, cli: &Cli) -> Result<()> {
    if cli.adaptive {
        config.worker.forwarding.adaptive_retries = true;
    }
    if let Some(shed) = cli.shed {
        config.admission.load_shed_threshold = shed;
    }
    if let Some(cutoff) = cli.cutoff {
        config.worker.compute.deadline_cutoff = Duration::from_millis(cutoff);
    }
    if let Some(timeout) = cli.timeout {
        config.worker.forwarding.client_timeout = Duration::from_millis(timeout);
    }
    if let Some(queue) = cli.queue {
        config.admission.queue_length = queue;
    }
    if let Some(thread) = cli.thread {
        config.admission.thread_count = thread;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(url) = &cli.url {
        config.worker.forwarding.url = url.clone();
    }
    if let Some(backlog_timeout) = cli.backlog_timeout {
        config.admission.backlog_timeout = Duration::from_millis(backlog_timeout);
    }
    if let Some(report_interval) = cli.report_interval {
        config.stats.report_interval = Duration::from_millis(report_interval);
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level
            .parse::<LogLevel>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    Ok(())
}
