use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use http_loadgen::{logging, run_load, FileConfig, TracingReporter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing::instrument::WithSubscriber;

// =============================================================================
// Command Line
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "http-loadgen")]
#[command(about = "Concurrent HTTP load generator", long_about = None)]
struct Cli {
    /// JSON config file describing the request to send
    #[arg(long, global = true, env = "LOADGEN_CONFIG", default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a fixed number of requests through a pool of workers
    Test(TestArgs),
}

#[derive(Args, Debug)]
struct TestArgs {
    /// Number of requests
    #[arg(short = 'r', long = "request", env = "LOADGEN_REQUESTS", default_value = "100")]
    requests: u64,

    /// Number of workers
    #[arg(
        short = 'w',
        long = "worker",
        env = "LOADGEN_WORKERS",
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    workers: u64,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Test(args) => run_test(&cli.config, args).await,
    }
}

async fn run_test(config_path: &Path, args: TestArgs) -> Result<()> {
    let file_config = FileConfig::load(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    let run_config = file_config
        .to_run_config()
        .context("Invalid configuration")?;
    let workers = usize::try_from(args.workers).context("Worker count too large")?;

    let log = logging::build(file_config.log_path().as_deref());

    async move {
        info!("════════════════════════════════════════════════════════════");
        info!("{} {}", run_config.method, run_config.url);
        info!("Requests: {}", args.requests);
        info!("Workers: {}", workers);
        info!("Retries: {}", run_config.max_retries);
        info!("Timeout: {:?}", run_config.timeout);
        info!("════════════════════════════════════════════════════════════");

        run_load(
            Arc::new(run_config),
            args.requests,
            workers,
            Arc::new(TracingReporter::stdout()),
        )
        .await
        .context("Load run failed")?;

        Ok::<(), anyhow::Error>(())
    }
    .with_subscriber(log.dispatch)
    .await
}
